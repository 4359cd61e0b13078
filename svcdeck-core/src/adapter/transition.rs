//! Bounded polling shared by every adapter backend.

use super::ServiceAdapter;
use crate::error::{Result, ServiceError};
use crate::models::ServiceStatus;
use tokio::time::{Duration, Instant};

/// How long a blocking transition may take and how often it is re-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Start,
    Stop,
    RestartStop,
    RestartStart,
}

impl Phase {
    fn target(self) -> ServiceStatus {
        match self {
            Phase::Start | Phase::RestartStart => ServiceStatus::Running,
            Phase::Stop | Phase::RestartStop => ServiceStatus::Stopped,
        }
    }

    /// Landing here means the OS gave up on the requested transition.
    fn contradiction(self) -> Option<ServiceStatus> {
        match self {
            Phase::Start | Phase::RestartStart => Some(ServiceStatus::Stopped),
            // 停止过程中短暂仍为 Running 属正常，不视为失败
            Phase::Stop | Phase::RestartStop => None,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Stop => "stop",
            Phase::RestartStop => "stop during restart",
            Phase::RestartStart => "start during restart",
        }
    }
}

/// Poll until the phase's target state is reached.
///
/// Sleeps one interval before each query, so a service that settles after
/// 1.2s is observed at 1.5s. Gives up once the elapsed time reaches the
/// policy timeout, never earlier.
pub(crate) async fn wait_for<A>(adapter: &A, name: &str, phase: Phase) -> Result<()>
where
    A: ServiceAdapter + ?Sized,
{
    let policy = adapter.poll_policy();
    let deadline = Instant::now() + policy.timeout;
    loop {
        tokio::time::sleep(policy.interval).await;
        // 查询本身也受截止时间约束，卡住的 systemctl / sc.exe 会在 drop 时被回收
        let status = match tokio::time::timeout_at(deadline, adapter.status(name)).await {
            Ok(status) => status?,
            Err(_) => return Err(timed_out(name, phase, policy)),
        };
        if status == phase.target() {
            tracing::debug!(service = %name, phase = phase.describe(), "transition complete");
            return Ok(());
        }
        if Some(status) == phase.contradiction() {
            return Err(ServiceError::system(format!(
                "service failed to {}: ended up {}",
                phase.describe(),
                status
            ))
            .for_service(name));
        }
        if Instant::now() >= deadline {
            return Err(timed_out(name, phase, policy));
        }
    }
}

fn timed_out(name: &str, phase: Phase, policy: PollPolicy) -> ServiceError {
    ServiceError::timeout(
        name,
        format!(
            "service {} operation timed out after {} seconds",
            phase.describe(),
            policy.timeout.as_secs()
        ),
    )
}

pub(crate) async fn restart<A>(adapter: &A, name: &str) -> Result<()>
where
    A: ServiceAdapter + ?Sized,
{
    match adapter.status(name).await? {
        ServiceStatus::Running | ServiceStatus::Starting | ServiceStatus::Restarting => {
            adapter.request_stop(name).await?;
            wait_for(adapter, name, Phase::RestartStop).await?;
        }
        // 已在停止中：不重复下发 stop，只等待其落定
        ServiceStatus::Stopping => wait_for(adapter, name, Phase::RestartStop).await?,
        ServiceStatus::Stopped => {}
    }
    adapter.request_start(name).await?;
    wait_for(adapter, name, Phase::RestartStart).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{MemoryAdapter, MemoryService, TransitionBehavior};
    use crate::error::ErrorCode;
    use crate::models::ServiceStatus;

    fn adapter_with(svc: MemoryService) -> MemoryAdapter {
        MemoryAdapter::new().with_service(svc)
    }

    #[tokio::test(start_paused = true)]
    async fn start_returns_once_running() {
        let adapter = adapter_with(
            MemoryService::new("pgsql-main", ServiceStatus::Stopped)
                .behavior(TransitionBehavior::Settle(Duration::from_millis(1200))),
        );
        let began = Instant::now();
        adapter.start("pgsql-main").await.unwrap();
        let took = began.elapsed();
        assert!(took >= Duration::from_millis(1500));
        assert!(took < Duration::from_millis(1600));
        assert_eq!(adapter.calls().status, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn start_times_out_at_thirty_seconds() {
        let adapter = adapter_with(
            MemoryService::new("pgsql-main", ServiceStatus::Stopped)
                .behavior(TransitionBehavior::Hang),
        );
        let began = Instant::now();
        let err = adapter.start("pgsql-main").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationTimeout);
        let took = began.elapsed();
        assert!(took >= Duration::from_secs(30));
        assert!(took <= Duration::from_millis(30_500));
    }

    #[tokio::test(start_paused = true)]
    async fn start_that_falls_back_to_stopped_is_a_system_error() {
        let adapter = adapter_with(
            MemoryService::new("redis", ServiceStatus::Stopped)
                .behavior(TransitionBehavior::FailStart(Duration::from_millis(700))),
        );
        let err = adapter.start("redis").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SystemError);
        assert_eq!(err.service.as_deref(), Some("redis"));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_stopped() {
        let adapter = adapter_with(
            MemoryService::new("redis", ServiceStatus::Running)
                .behavior(TransitionBehavior::Settle(Duration::from_secs(2))),
        );
        adapter.stop("redis").await.unwrap();
        assert_eq!(adapter.status("redis").await.unwrap(), ServiceStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_skips_stop_when_already_stopped() {
        let adapter = adapter_with(MemoryService::new("redis", ServiceStatus::Stopped));
        adapter.restart("redis").await.unwrap();
        let calls = adapter.calls();
        assert_eq!(calls.stop, 0);
        assert_eq!(calls.start, 1);
        assert_eq!(adapter.status("redis").await.unwrap(), ServiceStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_stops_then_starts_running_service() {
        let adapter = adapter_with(
            MemoryService::new("mongodb", ServiceStatus::Running)
                .behavior(TransitionBehavior::Settle(Duration::from_secs(1))),
        );
        adapter.restart("mongodb").await.unwrap();
        let calls = adapter.calls();
        assert_eq!(calls.stop, 1);
        assert_eq!(calls.start, 1);
        assert_eq!(adapter.status("mongodb").await.unwrap(), ServiceStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_from_stopping_waits_without_second_stop() {
        let adapter = adapter_with(
            MemoryService::new("mongodb", ServiceStatus::Running)
                .behavior(TransitionBehavior::Settle(Duration::from_secs(1))),
        );
        adapter.request_stop("mongodb").await.unwrap();
        assert_eq!(adapter.status("mongodb").await.unwrap(), ServiceStatus::Stopping);

        adapter.restart("mongodb").await.unwrap();
        let calls = adapter.calls();
        assert_eq!(calls.stop, 1);
        assert_eq!(calls.start, 1);
        assert_eq!(adapter.status("mongodb").await.unwrap(), ServiceStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_times_out_when_stop_hangs() {
        let adapter = adapter_with(
            MemoryService::new("mongodb", ServiceStatus::Running)
                .behavior(TransitionBehavior::Hang),
        );
        let began = Instant::now();
        let err = adapter.restart("mongodb").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationTimeout);
        assert!(began.elapsed() <= Duration::from_millis(30_500));
        assert_eq!(adapter.calls().start, 0);
    }

    /// Status queries that never answer, like a wedged `systemctl`.
    struct StuckQuery;

    #[async_trait::async_trait]
    impl ServiceAdapter for StuckQuery {
        async fn list_services(&self) -> Result<Vec<crate::models::RawService>> {
            Ok(Vec::new())
        }

        async fn status(&self, _name: &str) -> Result<ServiceStatus> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(ServiceStatus::Running)
        }

        async fn startup_type(&self, _name: &str) -> Result<crate::models::StartupType> {
            Ok(crate::models::StartupType::Manual)
        }

        async fn set_startup_type(
            &self,
            _name: &str,
            _startup: crate::models::StartupType,
        ) -> Result<()> {
            Ok(())
        }

        async fn request_start(&self, _name: &str) -> Result<()> {
            Ok(())
        }

        async fn request_stop(&self, _name: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_status_query_is_bounded_by_deadline() {
        let began = Instant::now();
        let err = StuckQuery.start("postgresql").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationTimeout);
        assert_eq!(err.service.as_deref(), Some("postgresql"));
        let took = began.elapsed();
        assert!(took >= Duration::from_secs(30));
        assert!(took <= Duration::from_millis(30_500));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_policy_shortens_timeout() {
        let adapter = adapter_with(
            MemoryService::new("redis", ServiceStatus::Running).behavior(TransitionBehavior::Hang),
        )
        .with_poll_policy(PollPolicy {
            timeout: Duration::from_secs(2),
            interval: Duration::from_millis(100),
        });
        let began = Instant::now();
        let err = adapter.stop("redis").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationTimeout);
        let took = began.elapsed();
        assert!(took >= Duration::from_secs(2) && took < Duration::from_millis(2100));
        assert!(err.message.contains("after 2 seconds"));
    }
}
