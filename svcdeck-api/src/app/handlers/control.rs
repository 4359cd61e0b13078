use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use svcdeck_core::PrivilegeInfo;
use tracing::instrument;

use crate::app::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub enabled: bool,
    #[serde(flatten)]
    pub privilege: PrivilegeInfo,
}

async fn control_state(state: &AppState) -> Json<ControlResponse> {
    Json(ControlResponse {
        enabled: state.manager.is_service_control_enabled(),
        privilege: state.manager.privilege_info().await,
    })
}

/// 开关写入会落盘，放到阻塞线程池执行
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> svcdeck_core::Result<T> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(f).await.map_err(|e| {
        ApiError::new(
            "system_error",
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("settings task failed: {e}"),
        )
    })?;
    Ok(outcome?)
}

pub async fn get_control(State(state): State<AppState>) -> Json<ControlResponse> {
    control_state(&state).await
}

#[instrument(skip_all, fields(enabled = payload.enabled))]
pub async fn set_control(
    State(state): State<AppState>,
    Json(payload): Json<ControlRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    let manager = state.manager.clone();
    run_blocking(move || manager.set_service_control_state(payload.enabled)).await?;
    Ok(control_state(&state).await)
}

#[instrument(skip_all)]
pub async fn toggle_control(
    State(state): State<AppState>,
) -> Result<Json<ControlResponse>, ApiError> {
    let manager = state.manager.clone();
    run_blocking(move || manager.toggle_service_control()).await?;
    Ok(control_state(&state).await)
}
