use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    disable_service, enable_service, get_control, get_status, health, list_services,
    refresh_services, restart_service, set_control, start_service, stop_service, toggle_control,
};
use super::middleware::auth_middleware;
use super::state::AppState;

/// 根据配置的来源列表构建 CorsLayer
fn build_cors_layer(cors_origins: Vec<String>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if cors_origins.is_empty() {
        base.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .into_iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        base.allow_origin(origins)
    }
}

/// Build the router with routes and middleware wired.
pub fn app_router(state: AppState, cors_origins: Vec<String>) -> Router {
    let service_routes = Router::new()
        .route("/services", get(list_services))
        .route("/services/refresh", post(refresh_services))
        .route("/services/:name/status", get(get_status))
        .route("/services/:name/start", post(start_service))
        .route("/services/:name/stop", post(stop_service))
        .route("/services/:name/restart", post(restart_service))
        .route("/services/:name/enable", post(enable_service))
        .route("/services/:name/disable", post(disable_service));

    let control_routes = Router::new()
        .route("/control", get(get_control).put(set_control))
        .route("/control/toggle", post(toggle_control));

    Router::new()
        .route("/health", get(health))
        .merge(service_routes)
        .merge(control_routes)
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_origins))
        .with_state(state)
}
