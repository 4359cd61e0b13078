use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt;
use thiserror::Error;

/// Common result type for core operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Flat failure taxonomy; callers pick retry / message strategy from this alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    PermissionDenied,
    ServiceNotFound,
    OperationTimeout,
    InvalidState,
    SystemError,
}

/// Why an operation was rejected with `InvalidState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateConflict {
    /// Service control is switched off in the settings.
    ControlDisabled,
    AlreadyRunning,
    AlreadyStarting,
    AlreadyStopped,
    AlreadyStopping,
}

/// Error surfaced by every core operation.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
    pub service: Option<String>,
    pub conflict: Option<StateConflict>,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.service {
            Some(name) => write!(f, "service '{}': {}", name, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            service: None,
            conflict: None,
        }
    }

    /// Attach the affected service name.
    pub fn for_service(mut self, name: impl Into<String>) -> Self {
        self.service = Some(name.into());
        self
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    pub fn not_found(name: &str) -> Self {
        Self::new(ErrorCode::ServiceNotFound, format!("service not found: {name}"))
            .for_service(name)
    }

    pub fn timeout(name: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::OperationTimeout, message).for_service(name)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SystemError, message)
    }

    /// `InvalidState` with a typed conflict; the message is derived from it.
    pub fn conflict(conflict: StateConflict) -> Self {
        let message = match conflict {
            StateConflict::ControlDisabled => "service control is disabled",
            StateConflict::AlreadyRunning => "service is already running",
            StateConflict::AlreadyStarting => "service is already starting",
            StateConflict::AlreadyStopped => "service is already stopped",
            StateConflict::AlreadyStopping => "service is already stopping",
        };
        let mut err = Self::new(ErrorCode::InvalidState, message);
        err.conflict = Some(conflict);
        err
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// True when the failure comes from the global control switch rather than the service.
    pub fn is_control_disabled(&self) -> bool {
        self.conflict == Some(StateConflict::ControlDisabled)
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(err.to_string()),
            _ => Self::system(err.to_string()),
        }
    }
}
