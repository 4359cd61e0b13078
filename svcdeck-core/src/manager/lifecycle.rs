//! 服务生命周期管理：启动、停止、重启与启动类型切换。

use super::*;
use crate::models::{ServiceStatus, StartupType};

impl ServiceManager {
    /// 启动服务：已运行或正在启动时直接拒绝，不触达适配器。
    #[instrument(skip(self))]
    pub async fn start_service(&self, name: &str) -> Result<()> {
        self.require_elevation("starting a service").await?;
        match self.adapter.status(name).await? {
            ServiceStatus::Running => return Err(conflict(StateConflict::AlreadyRunning, name)),
            ServiceStatus::Starting => return Err(conflict(StateConflict::AlreadyStarting, name)),
            _ => {}
        }
        self.adapter.start(name).await?;
        self.cache.clear();
        tracing::info!(service = %name, "service started");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn stop_service(&self, name: &str) -> Result<()> {
        self.require_elevation("stopping a service").await?;
        match self.adapter.status(name).await? {
            ServiceStatus::Stopped => return Err(conflict(StateConflict::AlreadyStopped, name)),
            ServiceStatus::Stopping => return Err(conflict(StateConflict::AlreadyStopping, name)),
            _ => {}
        }
        self.adapter.stop(name).await?;
        self.cache.clear();
        tracing::info!(service = %name, "service stopped");
        Ok(())
    }

    /// Valid from any state; reported as `Restarting` until it returns.
    #[instrument(skip(self))]
    pub async fn restart_service(&self, name: &str) -> Result<()> {
        self.require_elevation("restarting a service").await?;
        let _marker = self.mark_restarting(name);
        self.adapter.restart(name).await?;
        self.cache.clear();
        tracing::info!(service = %name, "service restarted");
        Ok(())
    }

    /// Set startup type to Manual; run state is untouched.
    #[instrument(skip(self))]
    pub async fn enable_service(&self, name: &str) -> Result<()> {
        self.require_elevation("enabling a service").await?;
        self.adapter.enable(name).await?;
        self.cache.clear();
        tracing::info!(service = %name, startup = %StartupType::Manual, "service enabled");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn disable_service(&self, name: &str) -> Result<()> {
        self.require_elevation("disabling a service").await?;
        self.adapter.disable(name).await?;
        self.cache.clear();
        tracing::info!(service = %name, startup = %StartupType::Disabled, "service disabled");
        Ok(())
    }

    /// 登记重启标记；返回的 guard 被丢弃（含调用方取消）时自动撤销
    fn mark_restarting(&self, name: &str) -> scopeguard::ScopeGuard<(), impl FnOnce(())> {
        *self
            .restarting
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(name.to_string())
            .or_insert(0) += 1;
        let restarting = self.restarting.clone();
        let name = name.to_string();
        scopeguard::guard((), move |_| {
            let mut map = restarting.write().unwrap_or_else(|e| e.into_inner());
            if let Some(count) = map.get_mut(&name) {
                *count -= 1;
                if *count == 0 {
                    map.remove(&name);
                }
            }
        })
    }
}

fn conflict(kind: StateConflict, name: &str) -> ServiceError {
    ServiceError::conflict(kind).for_service(name)
}
