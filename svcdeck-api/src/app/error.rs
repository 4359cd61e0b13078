use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use svcdeck_core::{ErrorCode, ServiceError, StateConflict};

#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflict: Option<StateConflict>,
}

impl ApiError {
    pub fn new(code: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            service: None,
            conflict: None,
        }
    }

    pub fn unauthorized() -> Self {
        Self::new("unauthorized", StatusCode::UNAUTHORIZED, "unauthorized")
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let (code, status) = match err.code() {
            ErrorCode::PermissionDenied => ("permission_denied", StatusCode::FORBIDDEN),
            ErrorCode::ServiceNotFound => ("service_not_found", StatusCode::NOT_FOUND),
            ErrorCode::OperationTimeout => ("operation_timeout", StatusCode::GATEWAY_TIMEOUT),
            ErrorCode::InvalidState => ("invalid_state", StatusCode::CONFLICT),
            ErrorCode::SystemError => ("system_error", StatusCode::INTERNAL_SERVER_ERROR),
        };
        Self {
            status,
            code,
            message: err.message,
            service: err.service,
            conflict: err.conflict,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(&self)).into_response()
    }
}
