//! Simulated host used by tests and by the daemon's `memory` backend.

use super::{PollPolicy, ServiceAdapter};
use crate::error::{Result, ServiceError};
use crate::models::{RawService, ServiceStatus, StartupType};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::time::{Duration, Instant};

/// How a simulated service reacts to start/stop requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionBehavior {
    /// Reaches the requested state after the given delay.
    Settle(Duration),
    /// Stays in the pending state forever.
    Hang,
    /// Start requests fall back to stopped after the given delay; stops settle immediately.
    FailStart(Duration),
}

impl Default for TransitionBehavior {
    fn default() -> Self {
        TransitionBehavior::Settle(Duration::ZERO)
    }
}

/// Definition of one simulated service.
#[derive(Debug, Clone)]
pub struct MemoryService {
    name: String,
    display_name: String,
    status: ServiceStatus,
    startup_type: StartupType,
    behavior: TransitionBehavior,
    /// startup_type() 查询失败，用于验证探测的降级路径
    startup_lookup_fails: bool,
}

impl MemoryService {
    pub fn new(name: impl Into<String>, status: ServiceStatus) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            status,
            startup_type: StartupType::Manual,
            behavior: TransitionBehavior::default(),
            startup_lookup_fails: false,
        }
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn startup(mut self, startup_type: StartupType) -> Self {
        self.startup_type = startup_type;
        self
    }

    pub fn behavior(mut self, behavior: TransitionBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn failing_startup_lookup(mut self) -> Self {
        self.startup_lookup_fails = true;
        self
    }
}

#[derive(Debug)]
struct Pending {
    settles_to: ServiceStatus,
    at: Instant,
}

#[derive(Debug)]
struct Entry {
    spec: MemoryService,
    pending: Option<Pending>,
}

impl Entry {
    /// Apply a pending transition whose time has come.
    fn observe(&mut self) -> ServiceStatus {
        if let Some(pending) = &self.pending {
            if Instant::now() >= pending.at {
                self.spec.status = pending.settles_to;
                self.pending = None;
            }
        }
        self.spec.status
    }

    fn schedule(&mut self, pending_state: ServiceStatus, wanted: ServiceStatus) {
        self.spec.status = pending_state;
        self.pending = match self.spec.behavior {
            TransitionBehavior::Settle(delay) => Some(Pending {
                settles_to: wanted,
                at: Instant::now() + delay,
            }),
            TransitionBehavior::Hang => None,
            TransitionBehavior::FailStart(delay) if wanted == ServiceStatus::Running => {
                Some(Pending {
                    settles_to: ServiceStatus::Stopped,
                    at: Instant::now() + delay,
                })
            }
            TransitionBehavior::FailStart(_) => Some(Pending {
                settles_to: wanted,
                at: Instant::now(),
            }),
        };
    }
}

/// Number of calls made to each primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterCalls {
    pub list: usize,
    pub status: usize,
    pub startup_type: usize,
    pub set_startup_type: usize,
    pub start: usize,
    pub stop: usize,
}

#[derive(Debug, Default)]
struct Counters {
    list: AtomicUsize,
    status: AtomicUsize,
    startup_type: AtomicUsize,
    set_startup_type: AtomicUsize,
    start: AtomicUsize,
    stop: AtomicUsize,
}

/// In-process service table that behaves like a host service manager.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    services: Mutex<BTreeMap<String, Entry>>,
    listing_error: Mutex<Option<ServiceError>>,
    policy: PollPolicy,
    counters: Counters,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(self, spec: MemoryService) -> Self {
        self.insert(spec);
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add or replace a service at runtime.
    pub fn insert(&self, spec: MemoryService) {
        self.lock().insert(
            spec.name.clone(),
            Entry {
                spec,
                pending: None,
            },
        );
    }

    /// Force a state change, as an external actor (crash, admin) would.
    pub fn force_status(&self, name: &str, status: ServiceStatus) {
        if let Some(entry) = self.lock().get_mut(name) {
            entry.spec.status = status;
            entry.pending = None;
        }
    }

    /// Make subsequent enumerations fail with `err` (`None` restores them).
    pub fn fail_listing(&self, err: Option<ServiceError>) {
        *self
            .listing_error
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = err;
    }

    pub fn calls(&self) -> AdapterCalls {
        let c = &self.counters;
        AdapterCalls {
            list: c.list.load(Ordering::SeqCst),
            status: c.status.load(Ordering::SeqCst),
            startup_type: c.startup_type.load(Ordering::SeqCst),
            set_startup_type: c.set_startup_type.load(Ordering::SeqCst),
            start: c.start.load(Ordering::SeqCst),
            stop: c.stop.load(Ordering::SeqCst),
        }
    }

    /// A small demo host with a handful of database services.
    pub fn demo() -> Self {
        let settle = TransitionBehavior::Settle(Duration::from_millis(1200));
        Self::new()
            .with_service(
                MemoryService::new("postgresql-x64-16", ServiceStatus::Running)
                    .display_name("postgresql-x64-16 - PostgreSQL Server 16")
                    .startup(StartupType::Automatic)
                    .behavior(settle),
            )
            .with_service(
                MemoryService::new("MySQL80", ServiceStatus::Stopped)
                    .display_name("MySQL80")
                    .behavior(settle),
            )
            .with_service(
                MemoryService::new("Redis", ServiceStatus::Running)
                    .display_name("Redis")
                    .startup(StartupType::Automatic)
                    .behavior(settle),
            )
            .with_service(
                MemoryService::new("MongoDB", ServiceStatus::Stopped)
                    .display_name("MongoDB Server (MongoDB)")
                    .startup(StartupType::Disabled)
                    .behavior(settle),
            )
            .with_service(
                MemoryService::new("RabbitMQ", ServiceStatus::Running)
                    .display_name("RabbitMQ")
                    .behavior(settle),
            )
            .with_service(MemoryService::new("Winmgmt", ServiceStatus::Running))
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Entry>> {
        self.services.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ServiceAdapter for MemoryAdapter {
    async fn list_services(&self) -> Result<Vec<RawService>> {
        self.counters.list.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self
            .listing_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(err);
        }
        let mut services = self.lock();
        Ok(services
            .values_mut()
            .map(|entry| {
                let state = entry.observe();
                RawService::new(&entry.spec.name, &entry.spec.display_name, state)
            })
            .collect())
    }

    async fn status(&self, name: &str) -> Result<ServiceStatus> {
        self.counters.status.fetch_add(1, Ordering::SeqCst);
        let mut services = self.lock();
        let entry = services
            .get_mut(name)
            .ok_or_else(|| ServiceError::not_found(name))?;
        Ok(entry.observe())
    }

    async fn startup_type(&self, name: &str) -> Result<StartupType> {
        self.counters.startup_type.fetch_add(1, Ordering::SeqCst);
        let services = self.lock();
        let entry = services.get(name).ok_or_else(|| ServiceError::not_found(name))?;
        if entry.spec.startup_lookup_fails {
            return Err(
                ServiceError::system("failed to read service configuration").for_service(name),
            );
        }
        Ok(entry.spec.startup_type)
    }

    async fn set_startup_type(&self, name: &str, startup: StartupType) -> Result<()> {
        self.counters.set_startup_type.fetch_add(1, Ordering::SeqCst);
        let mut services = self.lock();
        let entry = services
            .get_mut(name)
            .ok_or_else(|| ServiceError::not_found(name))?;
        entry.spec.startup_type = startup;
        Ok(())
    }

    async fn request_start(&self, name: &str) -> Result<()> {
        self.counters.start.fetch_add(1, Ordering::SeqCst);
        let mut services = self.lock();
        let entry = services
            .get_mut(name)
            .ok_or_else(|| ServiceError::not_found(name))?;
        if entry.spec.startup_type == StartupType::Disabled {
            return Err(ServiceError::system("service is disabled").for_service(name));
        }
        entry.schedule(ServiceStatus::Starting, ServiceStatus::Running);
        Ok(())
    }

    async fn request_stop(&self, name: &str) -> Result<()> {
        self.counters.stop.fetch_add(1, Ordering::SeqCst);
        let mut services = self.lock();
        let entry = services
            .get_mut(name)
            .ok_or_else(|| ServiceError::not_found(name))?;
        entry.schedule(ServiceStatus::Stopping, ServiceStatus::Stopped);
        Ok(())
    }

    fn poll_policy(&self) -> PollPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn unknown_service_is_not_found() {
        let adapter = MemoryAdapter::new();
        let err = adapter.status("nope").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ServiceNotFound);
        assert_eq!(err.service.as_deref(), Some("nope"));
    }

    #[tokio::test]
    async fn disabled_service_refuses_to_start() {
        let adapter = MemoryAdapter::new().with_service(
            MemoryService::new("redis", ServiceStatus::Stopped).startup(StartupType::Disabled),
        );
        let err = adapter.start("redis").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SystemError);
        assert_eq!(adapter.status("redis").await.unwrap(), ServiceStatus::Stopped);
    }

    #[tokio::test]
    async fn disable_keeps_running_service_running() {
        let adapter =
            MemoryAdapter::new().with_service(MemoryService::new("redis", ServiceStatus::Running));
        adapter.disable("redis").await.unwrap();
        assert_eq!(adapter.startup_type("redis").await.unwrap(), StartupType::Disabled);
        assert_eq!(adapter.status("redis").await.unwrap(), ServiceStatus::Running);

        adapter.enable("redis").await.unwrap();
        assert_eq!(adapter.startup_type("redis").await.unwrap(), StartupType::Manual);
    }

    #[tokio::test]
    async fn listing_failure_is_reported() {
        let adapter = MemoryAdapter::demo();
        adapter.fail_listing(Some(ServiceError::permission_denied("access denied")));
        let err = adapter.list_services().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
        adapter.fail_listing(None);
        assert_eq!(adapter.list_services().await.unwrap().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_state_is_visible_until_settled() {
        let adapter = MemoryAdapter::new().with_service(
            MemoryService::new("redis", ServiceStatus::Stopped)
                .behavior(TransitionBehavior::Settle(Duration::from_secs(1))),
        );
        adapter.request_start("redis").await.unwrap();
        assert_eq!(adapter.status("redis").await.unwrap(), ServiceStatus::Starting);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(adapter.status("redis").await.unwrap(), ServiceStatus::Running);
    }
}
