//! OS service adapter: the only layer that talks to the host's service manager.
//!
//! Backends implement the primitives (enumerate, query, request a transition,
//! persist a startup policy). The blocking `start` / `stop` / `restart`
//! operations are provided on top of them and share one polling discipline,
//! see [`PollPolicy`]. Every backend must translate its native failures into
//! [`ServiceError`](crate::ServiceError) before returning.

use crate::error::Result;
use crate::models::{RawService, ServiceStatus, StartupType};
use async_trait::async_trait;
use std::sync::Arc;

mod memory;
mod sc;
mod systemd;
mod transition;

pub use memory::{AdapterCalls, MemoryAdapter, MemoryService, TransitionBehavior};
pub use sc::ScAdapter;
pub use systemd::SystemdAdapter;
pub use transition::PollPolicy;

#[async_trait]
pub trait ServiceAdapter: Send + Sync {
    /// Enumerate every service visible at the current privilege level.
    /// Entries that cannot be queried individually are skipped.
    async fn list_services(&self) -> Result<Vec<RawService>>;

    /// Current state; `ServiceNotFound` when the name is unknown.
    async fn status(&self, name: &str) -> Result<ServiceStatus>;

    async fn startup_type(&self, name: &str) -> Result<StartupType>;

    async fn set_startup_type(&self, name: &str, startup: StartupType) -> Result<()>;

    /// Ask the OS to start the service without waiting for it.
    async fn request_start(&self, name: &str) -> Result<()>;

    /// Ask the OS to stop the service without waiting for it.
    async fn request_stop(&self, name: &str) -> Result<()>;

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy::default()
    }

    /// Start and wait until running, bounded by the poll policy.
    async fn start(&self, name: &str) -> Result<()> {
        self.request_start(name).await?;
        transition::wait_for(self, name, transition::Phase::Start).await
    }

    /// Stop and wait until stopped, bounded by the poll policy.
    async fn stop(&self, name: &str) -> Result<()> {
        self.request_stop(name).await?;
        transition::wait_for(self, name, transition::Phase::Stop).await
    }

    /// Stop (when needed) then start, each phase bounded separately.
    async fn restart(&self, name: &str) -> Result<()> {
        transition::restart(self, name).await
    }

    /// Allow manual launches again; run state is left untouched.
    async fn enable(&self, name: &str) -> Result<()> {
        self.set_startup_type(name, StartupType::Manual).await
    }

    /// Forbid launches; a running service keeps running.
    async fn disable(&self, name: &str) -> Result<()> {
        self.set_startup_type(name, StartupType::Disabled).await
    }
}

/// Backend for the platform this binary was built for.
pub fn native_adapter() -> Arc<dyn ServiceAdapter> {
    if cfg!(windows) {
        Arc::new(ScAdapter::new())
    } else {
        Arc::new(SystemdAdapter::new())
    }
}
