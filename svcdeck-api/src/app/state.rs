use std::sync::Arc;
use svcdeck_core::ServiceManager;

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ServiceManager>,
    /// Bearer token；未配置时不校验
    pub api_token: Option<String>,
}
