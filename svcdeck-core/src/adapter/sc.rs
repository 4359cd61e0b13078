//! Windows Service Control Manager backend driven through `sc.exe`.

use super::ServiceAdapter;
use crate::error::{Result, ServiceError};
use crate::models::{RawService, ServiceStatus, StartupType};
use async_trait::async_trait;
use tokio::process::Command;

const ERROR_ACCESS_DENIED: u32 = 5;
const ERROR_SERVICE_DOES_NOT_EXIST: u32 = 1060;
const ERROR_SERVICE_DISABLED: u32 = 1058;

#[derive(Debug, Clone)]
pub struct ScAdapter {
    program: String,
}

impl Default for ScAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScAdapter {
    pub fn new() -> Self {
        Self {
            program: "sc.exe".into(),
        }
    }

    /// sc.exe 在失败时同样把信息写到 stdout，因此统一从 stdout 解析错误码。
    async fn sc(&self, name: Option<&str>, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ServiceError::system(format!("failed to execute {}: {e}", self.program)))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }
        let verb = args.first().copied().unwrap_or("");
        Err(classify_failure(name, verb, &stdout))
    }
}

#[async_trait]
impl ServiceAdapter for ScAdapter {
    async fn list_services(&self) -> Result<Vec<RawService>> {
        let out = self
            .sc(None, &["query", "type=", "service", "state=", "all", "bufsize=", "65536"])
            .await?;
        Ok(parse_query_blocks(&out))
    }

    async fn status(&self, name: &str) -> Result<ServiceStatus> {
        let out = self.sc(Some(name), &["query", name]).await?;
        parse_state(&out).ok_or_else(|| {
            ServiceError::system("unrecognised sc query output").for_service(name)
        })
    }

    async fn startup_type(&self, name: &str) -> Result<StartupType> {
        let out = self.sc(Some(name), &["qc", name]).await?;
        Ok(parse_start_type(&out))
    }

    async fn set_startup_type(&self, name: &str, startup: StartupType) -> Result<()> {
        let mode = match startup {
            StartupType::Automatic => "auto",
            StartupType::Manual => "demand",
            StartupType::Disabled => "disabled",
        };
        self.sc(Some(name), &["config", name, "start=", mode])
            .await
            .map(|_| ())
    }

    async fn request_start(&self, name: &str) -> Result<()> {
        self.sc(Some(name), &["start", name]).await.map(|_| ())
    }

    async fn request_stop(&self, name: &str) -> Result<()> {
        self.sc(Some(name), &["stop", name]).await.map(|_| ())
    }
}

/// Split `KEY : VALUE` lines; values keep inner spacing.
fn field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (k, v) = line.split_once(':')?;
    if k.trim() == key {
        Some(v.trim())
    } else {
        None
    }
}

fn map_state_code(code: u32) -> ServiceStatus {
    match code {
        1 => ServiceStatus::Stopped,
        2 => ServiceStatus::Starting,
        3 => ServiceStatus::Stopping,
        // RUNNING / CONTINUE_PENDING / PAUSE_PENDING / PAUSED
        4..=7 => ServiceStatus::Running,
        _ => ServiceStatus::Stopped,
    }
}

/// `STATE : 4  RUNNING` -> Running.
fn parse_state(output: &str) -> Option<ServiceStatus> {
    output.lines().find_map(|line| {
        let value = field(line, "STATE")?;
        let code = value.split_whitespace().next()?.parse::<u32>().ok()?;
        Some(map_state_code(code))
    })
}

fn parse_start_type(output: &str) -> StartupType {
    let code = output.lines().find_map(|line| {
        field(line, "START_TYPE")?
            .split_whitespace()
            .next()?
            .parse::<u32>()
            .ok()
    });
    match code {
        Some(0..=2) => StartupType::Automatic,
        Some(4) => StartupType::Disabled,
        _ => StartupType::Manual,
    }
}

/// Parse the multi-record output of `sc query type= service state= all`.
fn parse_query_blocks(output: &str) -> Vec<RawService> {
    let mut services = Vec::new();
    let mut current: Option<(String, Option<String>, Option<ServiceStatus>)> = None;

    let mut flush = |entry: Option<(String, Option<String>, Option<ServiceStatus>)>| {
        // 无法解析状态的条目直接跳过，不影响整体枚举
        if let Some((name, display, Some(state))) = entry {
            let display = display.unwrap_or_else(|| name.clone());
            services.push(RawService::new(name, display, state));
        }
    };

    for line in output.lines() {
        if let Some(name) = field(line, "SERVICE_NAME") {
            flush(current.take());
            current = Some((name.to_string(), None, None));
        } else if let Some(display) = field(line, "DISPLAY_NAME") {
            if let Some(entry) = current.as_mut() {
                entry.1 = Some(display.to_string());
            }
        } else if let Some(state) = parse_state(line) {
            if let Some(entry) = current.as_mut() {
                entry.2 = Some(state);
            }
        }
    }
    flush(current.take());
    services
}

/// `[SC] StartService FAILED 1060:` -> 1060.
fn failure_code(output: &str) -> Option<u32> {
    let idx = output.find("FAILED")?;
    output[idx + "FAILED".len()..]
        .trim_start()
        .split(|c: char| !c.is_ascii_digit())
        .next()?
        .parse()
        .ok()
}

fn classify_failure(name: Option<&str>, verb: &str, output: &str) -> ServiceError {
    let err = match failure_code(output) {
        Some(ERROR_ACCESS_DENIED) => ServiceError::permission_denied(format!(
            "access denied by the Service Control Manager ({verb})"
        )),
        Some(ERROR_SERVICE_DOES_NOT_EXIST) => match name {
            Some(name) => return ServiceError::not_found(name),
            None => ServiceError::system(format!("sc {verb}: service does not exist")),
        },
        Some(ERROR_SERVICE_DISABLED) => ServiceError::system("service is disabled"),
        Some(code) => ServiceError::system(format!("sc {verb} failed with error {code}")),
        None => ServiceError::system(format!("sc {verb} failed: {}", output.trim())),
    };
    match name {
        Some(name) => err.for_service(name),
        None => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    const QUERY_ALL: &str = "
SERVICE_NAME: MySQL80
DISPLAY_NAME: MySQL80
        TYPE               : 10  WIN32_OWN_PROCESS
        STATE              : 4  RUNNING
                                (STOPPABLE, PAUSABLE, ACCEPTS_SHUTDOWN)
        WIN32_EXIT_CODE    : 0  (0x0)

SERVICE_NAME: postgresql-x64-14
DISPLAY_NAME: postgresql-x64-14 - PostgreSQL Server 14
        TYPE               : 10  WIN32_OWN_PROCESS
        STATE              : 1  STOPPED
        WIN32_EXIT_CODE    : 0  (0x0)

SERVICE_NAME: Redis
DISPLAY_NAME: Redis
        TYPE               : 10  WIN32_OWN_PROCESS
        STATE              : 2  START_PENDING
";

    #[test]
    fn parses_query_blocks() {
        let services = parse_query_blocks(QUERY_ALL);
        assert_eq!(services.len(), 3);
        assert_eq!(services[0].name, "MySQL80");
        assert_eq!(services[0].state, ServiceStatus::Running);
        assert_eq!(
            services[1].display_name,
            "postgresql-x64-14 - PostgreSQL Server 14"
        );
        assert_eq!(services[1].state, ServiceStatus::Stopped);
        assert_eq!(services[2].state, ServiceStatus::Starting);
    }

    #[test]
    fn paused_counts_as_running() {
        assert_eq!(
            parse_state("        STATE              : 7  PAUSED"),
            Some(ServiceStatus::Running)
        );
        assert_eq!(
            parse_state("        STATE              : 3  STOP_PENDING"),
            Some(ServiceStatus::Stopping)
        );
    }

    #[test]
    fn parses_start_type() {
        let qc = "
[SC] QueryServiceConfig SUCCESS

SERVICE_NAME: Redis
        TYPE               : 10  WIN32_OWN_PROCESS
        START_TYPE         : 4   DISABLED
        ERROR_CONTROL      : 1   NORMAL
";
        assert_eq!(parse_start_type(qc), StartupType::Disabled);
        assert_eq!(
            parse_start_type("        START_TYPE         : 2   AUTO_START"),
            StartupType::Automatic
        );
        assert_eq!(parse_start_type("garbage"), StartupType::Manual);
    }

    #[test]
    fn classifies_sc_failures() {
        let out = "[SC] OpenService FAILED 1060:\n\nThe specified service does not exist as an installed service.\n";
        assert_eq!(failure_code(out), Some(1060));
        assert_eq!(
            classify_failure(Some("nope"), "query", out).code(),
            ErrorCode::ServiceNotFound
        );

        let denied = "[SC] StartService: OpenService FAILED 5:\n\nAccess is denied.\n";
        let err = classify_failure(Some("MySQL80"), "start", denied);
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
        assert_eq!(err.service.as_deref(), Some("MySQL80"));

        let disabled = "[SC] StartService FAILED 1058:\n";
        assert_eq!(
            classify_failure(Some("x"), "start", disabled).code(),
            ErrorCode::SystemError
        );
    }
}
