//! Read-through store for detected services with a single collection-wide freshness clock.

use crate::models::{Service, ServiceStatus};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time::{Duration, Instant};

/// Default time-to-live for a full detection pass.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct CacheState {
    services: HashMap<String, Service>,
    /// Stamped only by `set_all`; drives `is_expired`.
    populated_at: Option<Instant>,
    /// Stamped by every write, informational only.
    last_write: Option<Instant>,
}

/// Concurrent `name -> Service` map guarded by a reader/writer lock.
///
/// `set` overwrites one record without touching the freshness stamp, so the
/// collection can still report expired right after a single-record update.
#[derive(Debug)]
pub struct ServiceCache {
    state: RwLock<CacheState>,
    ttl: Duration,
}

impl Default for ServiceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ServiceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, name: &str) -> Option<Service> {
        self.read().services.get(name).cloned()
    }

    /// Upsert a single record.
    pub fn set(&self, name: &str, service: Service) {
        let mut state = self.write();
        state.services.insert(name.to_string(), service);
        state.last_write = Some(Instant::now());
    }

    /// Overwrite the status of an already cached record; returns false when absent.
    pub fn update_status(&self, name: &str, status: ServiceStatus) -> bool {
        let mut state = self.write();
        let Some(existing) = state.services.get(name) else {
            return false;
        };
        let mut updated = existing.clone();
        updated.status = status;
        state.services.insert(name.to_string(), updated);
        state.last_write = Some(Instant::now());
        true
    }

    /// Replace the whole collection and restart the TTL.
    pub fn set_all(&self, services: Vec<Service>) {
        let fresh: HashMap<String, Service> = services
            .into_iter()
            .map(|svc| (svc.name.clone(), svc))
            .collect();
        let now = Instant::now();
        let mut state = self.write();
        state.services = fresh;
        state.populated_at = Some(now);
        state.last_write = Some(now);
    }

    /// Snapshot of every cached record, in no particular order.
    pub fn get_all(&self) -> Vec<Service> {
        self.read().services.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().services.is_empty()
    }

    /// Never populated, or older than the TTL.
    pub fn is_expired(&self) -> bool {
        match self.read().populated_at {
            None => true,
            Some(at) => at.elapsed() > self.ttl,
        }
    }

    /// Time since the last write of any kind.
    pub fn since_last_write(&self) -> Option<Duration> {
        self.read().last_write.map(|at| at.elapsed())
    }

    pub fn clear(&self) {
        let mut state = self.write();
        state.services.clear();
        state.populated_at = None;
        state.last_write = None;
    }

    // 锁中毒时沿用内部数据：缓存内容总是整条记录替换，不存在半写状态
    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
