//! 服务列表与状态查询：读穿缓存，仅在过期或显式刷新时重新探测。

use super::*;
use crate::error::ErrorCode;
use crate::models::{Service, ServiceStatus};

impl ServiceManager {
    /// Cached snapshot while fresh, otherwise a new detection pass.
    #[instrument(skip(self))]
    pub async fn list_services(&self) -> Result<Vec<Service>> {
        self.ensure_control_enabled()?;
        if !self.cache.is_expired() {
            return Ok(self.overlay_restarting(self.cache.get_all()));
        }
        self.detect_into_cache().await
    }

    /// Re-detect regardless of cache freshness.
    #[instrument(skip(self))]
    pub async fn refresh_services(&self) -> Result<Vec<Service>> {
        self.ensure_control_enabled()?;
        self.detect_into_cache().await
    }

    /// Fresh status straight from the adapter; updates the cached record if present.
    #[instrument(skip(self))]
    pub async fn get_service_status(&self, name: &str) -> Result<ServiceStatus> {
        self.ensure_control_enabled()?;
        if self.is_restarting(name) {
            return Ok(ServiceStatus::Restarting);
        }
        let status = self.adapter.status(name).await?;
        self.cache.update_status(name, status);
        Ok(status)
    }

    async fn detect_into_cache(&self) -> Result<Vec<Service>> {
        let services = self.detector.detect_services().await.map_err(|e| {
            tracing::warn!(error = %e, "service detection failed");
            with_guidance(e)
        })?;
        self.cache.set_all(services.clone());
        Ok(self.overlay_restarting(services))
    }

    fn overlay_restarting(&self, mut services: Vec<Service>) -> Vec<Service> {
        let restarting = self.restarting.read().unwrap_or_else(|e| e.into_inner());
        if restarting.is_empty() {
            return services;
        }
        for svc in services.iter_mut() {
            if restarting.contains_key(&svc.name) {
                svc.status = ServiceStatus::Restarting;
            }
        }
        services
    }
}

/// 权限不足时补充可操作的提示，错误码保持不变
fn with_guidance(mut err: ServiceError) -> ServiceError {
    if err.code() == ErrorCode::PermissionDenied {
        err.message = format!(
            "{}; run svcdeck as administrator (or root) to read service information",
            err.message
        );
    }
    err
}
