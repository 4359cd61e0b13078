use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use svcdeck_core::{Service, ServiceCategory, ServiceStatus};
use tracing::instrument;

use crate::app::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<ServiceCategory>,
}

/// 单个服务的状态响应
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub name: String,
    pub status: Option<ServiceStatus>,
}

fn filter_category(services: Vec<Service>, category: Option<ServiceCategory>) -> Vec<Service> {
    match category {
        Some(category) => services
            .into_iter()
            .filter(|s| s.category == category)
            .collect(),
        None => services,
    }
}

#[instrument(skip_all)]
pub async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Service>>, ApiError> {
    let services = state.manager.list_services().await?;
    Ok(Json(filter_category(services, query.category)))
}

#[instrument(skip_all)]
pub async fn refresh_services(
    State(state): State<AppState>,
) -> Result<Json<Vec<Service>>, ApiError> {
    Ok(Json(state.manager.refresh_services().await?))
}

#[instrument(skip_all, fields(service = %name))]
pub async fn get_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.manager.get_service_status(&name).await?;
    Ok(Json(StatusResponse {
        name,
        status: Some(status),
    }))
}

/// 操作成功后尽力回读一次状态，读取失败不影响结果
async fn status_after(state: &AppState, name: String) -> Json<StatusResponse> {
    let status = match state.manager.get_service_status(&name).await {
        Ok(status) => Some(status),
        Err(e) => {
            tracing::debug!(service = %name, error = %e, "status re-read failed");
            None
        }
    };
    Json(StatusResponse { name, status })
}

#[instrument(skip_all, fields(service = %name))]
pub async fn start_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.manager.start_service(&name).await?;
    Ok(status_after(&state, name).await)
}

#[instrument(skip_all, fields(service = %name))]
pub async fn stop_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.manager.stop_service(&name).await?;
    Ok(status_after(&state, name).await)
}

#[instrument(skip_all, fields(service = %name))]
pub async fn restart_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.manager.restart_service(&name).await?;
    Ok(status_after(&state, name).await)
}

#[instrument(skip_all, fields(service = %name))]
pub async fn enable_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.manager.enable_service(&name).await?;
    Ok(status_after(&state, name).await)
}

#[instrument(skip_all, fields(service = %name))]
pub async fn disable_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.manager.disable_service(&name).await?;
    Ok(status_after(&state, name).await)
}
