//! Source of the global "service control enabled" switch.

use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};

pub trait ControlSettings: Send + Sync {
    fn service_control_enabled(&self) -> bool;

    /// Persist the switch; implementations backed by storage may fail.
    fn set_service_control_enabled(&self, enabled: bool) -> Result<()>;
}

/// Process-local switch, enabled by default.
#[derive(Debug)]
pub struct InMemorySettings {
    enabled: AtomicBool,
}

impl InMemorySettings {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }
}

impl Default for InMemorySettings {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ControlSettings for InMemorySettings {
    fn service_control_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_service_control_enabled(&self, enabled: bool) -> Result<()> {
        self.enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }
}
