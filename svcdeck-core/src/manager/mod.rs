use crate::adapter::{native_adapter, ServiceAdapter};
use crate::cache::ServiceCache;
use crate::detector::{PatternDetector, ServiceDetector};
use crate::error::{Result, ServiceError, StateConflict};
use crate::privilege::{PrivilegeGate, ProcessPrivilege};
use crate::settings::ControlSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::OnceCell;
use tokio::time::Duration;
use tracing::instrument;

mod lifecycle;
mod listing;

/// Elevation summary shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeInfo {
    pub is_elevated: bool,
    pub status_message: String,
    pub can_control_services: bool,
}

/// 服务编排器：组合探测、缓存、权限校验与适配器，对外提供列表与启停控制。
///
/// Cloning is cheap and every clone shares the same cache and memoised
/// elevation answer.
///
/// Precondition checks and the adapter call that follows are not serialised
/// per service, so two callers racing on one name can both pass the check.
#[derive(Clone)]
pub struct ServiceManager {
    adapter: Arc<dyn ServiceAdapter>,
    detector: Arc<dyn ServiceDetector>,
    cache: Arc<ServiceCache>,
    settings: Arc<dyn ControlSettings>,
    privilege: Arc<dyn PrivilegeGate>,
    elevated: Arc<OnceCell<bool>>,
    /// 正在重启中的服务 -> 并发重启次数
    restarting: Arc<RwLock<HashMap<String, usize>>>,
}

impl std::fmt::Debug for ServiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceManager")
            .field("cache", &self.cache)
            .field("elevated", &self.elevated.get())
            .finish_non_exhaustive()
    }
}

impl ServiceManager {
    /// Build with the default pattern detector over `adapter`.
    pub fn new(
        adapter: Arc<dyn ServiceAdapter>,
        settings: Arc<dyn ControlSettings>,
        privilege: Arc<dyn PrivilegeGate>,
    ) -> Self {
        let detector = Arc::new(PatternDetector::new(adapter.clone()));
        Self {
            adapter,
            detector,
            cache: Arc::new(ServiceCache::default()),
            settings,
            privilege,
            elevated: Arc::new(OnceCell::new()),
            restarting: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Host backend with real privilege detection.
    pub fn native(settings: Arc<dyn ControlSettings>) -> Self {
        Self::new(native_adapter(), settings, Arc::new(ProcessPrivilege))
    }

    pub fn with_detector(mut self, detector: Arc<dyn ServiceDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = Arc::new(ServiceCache::new(ttl));
        self
    }

    pub fn is_service_control_enabled(&self) -> bool {
        self.settings.service_control_enabled()
    }

    #[instrument(skip(self))]
    pub fn set_service_control_state(&self, enabled: bool) -> Result<()> {
        self.settings.set_service_control_enabled(enabled)?;
        tracing::info!(enabled, "service control switched");
        Ok(())
    }

    /// Flip the switch and return the new value.
    #[instrument(skip(self))]
    pub fn toggle_service_control(&self) -> Result<bool> {
        let enabled = !self.is_service_control_enabled();
        self.set_service_control_state(enabled)?;
        Ok(enabled)
    }

    /// 只查询一次，进程生命周期内复用结果
    pub async fn is_elevated(&self) -> bool {
        *self
            .elevated
            .get_or_init(|| async { self.privilege.is_elevated().await })
            .await
    }

    pub async fn elevation_status(&self) -> String {
        if self.is_elevated().await {
            "Running with administrator privileges".to_string()
        } else {
            "Running without administrator privileges".to_string()
        }
    }

    pub async fn privilege_info(&self) -> PrivilegeInfo {
        let is_elevated = self.is_elevated().await;
        PrivilegeInfo {
            is_elevated,
            status_message: self.elevation_status().await,
            can_control_services: is_elevated && self.is_service_control_enabled(),
        }
    }

    /// Drop all cached state; called from the process shutdown hook.
    pub fn shutdown(&self) {
        self.cache.clear();
        tracing::info!("service manager shut down, cache cleared");
    }

    fn ensure_control_enabled(&self) -> Result<()> {
        if self.is_service_control_enabled() {
            Ok(())
        } else {
            Err(ServiceError::conflict(StateConflict::ControlDisabled))
        }
    }

    /// Gate for every mutating operation.
    async fn require_elevation(&self, operation: &str) -> Result<()> {
        self.ensure_control_enabled()?;
        if !self.is_elevated().await {
            return Err(ServiceError::permission_denied(format!(
                "{operation} requires administrator privileges; restart svcdeck as administrator (or root)"
            )));
        }
        Ok(())
    }

    fn is_restarting(&self, name: &str) -> bool {
        self.restarting
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }
}
