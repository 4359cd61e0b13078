//! systemd backend driven through `systemctl`.
//!
//! Startup policy mapping: `enabled` units are Automatic, `masked` units are
//! Disabled, anything else (disabled / static / indirect) is Manual.

use super::ServiceAdapter;
use crate::error::{Result, ServiceError};
use crate::models::{RawService, ServiceStatus, StartupType};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct SystemdAdapter {
    program: String,
}

impl Default for SystemdAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemdAdapter {
    pub fn new() -> Self {
        Self {
            program: "systemctl".into(),
        }
    }

    /// Use a different `systemctl` binary (e.g. a wrapper script).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn systemctl(&self, name: Option<&str>, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.program)
            .args(args)
            .arg("--no-pager")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ServiceError::system(format!("failed to execute {}: {e}", self.program)))?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(classify_failure(name, args.first().copied().unwrap_or(""), &stderr))
    }

    async fn show(&self, name: &str, properties: &str) -> Result<HashMap<String, String>> {
        let unit = unit_name(name);
        let out = self
            .systemctl(Some(name), &["show", &unit, "--property", properties])
            .await?;
        let props = parse_properties(&out);
        if props.get("LoadState").map(String::as_str) == Some("not-found") {
            return Err(ServiceError::not_found(name));
        }
        Ok(props)
    }
}

#[async_trait]
impl ServiceAdapter for SystemdAdapter {
    async fn list_services(&self) -> Result<Vec<RawService>> {
        let units = self
            .systemctl(
                None,
                &["list-units", "--type=service", "--all", "--no-legend", "--plain"],
            )
            .await?;
        let mut found: BTreeMap<String, RawService> = parse_list_units(&units)
            .into_iter()
            .map(|svc| (svc.name.clone(), svc))
            .collect();

        // 未加载的已安装单元不会出现在 list-units 中，补齐为 Stopped
        match self
            .systemctl(
                None,
                &["list-unit-files", "--type=service", "--no-legend", "--plain"],
            )
            .await
        {
            Ok(files) => {
                for name in parse_unit_files(&files) {
                    found
                        .entry(name.clone())
                        .or_insert_with(|| RawService::new(name.clone(), name, ServiceStatus::Stopped));
                }
            }
            Err(e) => tracing::debug!(error = %e, "list-unit-files failed; using loaded units only"),
        }
        Ok(found.into_values().collect())
    }

    async fn status(&self, name: &str) -> Result<ServiceStatus> {
        let props = self.show(name, "LoadState,ActiveState,SubState").await?;
        let active = props.get("ActiveState").map(String::as_str).unwrap_or("");
        Ok(map_active_state(active))
    }

    async fn startup_type(&self, name: &str) -> Result<StartupType> {
        let props = self.show(name, "LoadState,UnitFileState").await?;
        let state = props.get("UnitFileState").map(String::as_str).unwrap_or("");
        Ok(map_unit_file_state(state))
    }

    async fn set_startup_type(&self, name: &str, startup: StartupType) -> Result<()> {
        let unit = unit_name(name);
        match startup {
            StartupType::Disabled => {
                self.systemctl(Some(name), &["mask", &unit]).await?;
            }
            StartupType::Manual => {
                self.systemctl(Some(name), &["unmask", &unit]).await?;
                self.systemctl(Some(name), &["disable", &unit]).await?;
            }
            StartupType::Automatic => {
                self.systemctl(Some(name), &["unmask", &unit]).await?;
                self.systemctl(Some(name), &["enable", &unit]).await?;
            }
        }
        Ok(())
    }

    async fn request_start(&self, name: &str) -> Result<()> {
        self.systemctl(Some(name), &["start", "--no-block", &unit_name(name)])
            .await
            .map(|_| ())
    }

    async fn request_stop(&self, name: &str) -> Result<()> {
        self.systemctl(Some(name), &["stop", "--no-block", &unit_name(name)])
            .await
            .map(|_| ())
    }
}

fn unit_name(name: &str) -> String {
    if name.ends_with(".service") {
        name.to_string()
    } else {
        format!("{name}.service")
    }
}

/// Parse `list-units --plain --no-legend`: `UNIT LOAD ACTIVE SUB DESCRIPTION...`.
fn parse_list_units(output: &str) -> Vec<RawService> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let unit = parts.next()?;
            let load = parts.next()?;
            let active = parts.next()?;
            let _sub = parts.next()?;
            if load == "not-found" {
                return None;
            }
            let name = unit.strip_suffix(".service")?;
            let description = parts.collect::<Vec<_>>().join(" ");
            let display = if description.is_empty() {
                name.to_string()
            } else {
                description
            };
            Some(RawService::new(name, display, map_active_state(active)))
        })
        .collect()
}

/// Parse `list-unit-files --plain --no-legend`, skipping template units.
fn parse_unit_files(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let unit = line.split_whitespace().next()?;
            let name = unit.strip_suffix(".service")?;
            if name.ends_with('@') {
                return None;
            }
            Some(name.to_string())
        })
        .collect()
}

fn parse_properties(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

fn map_active_state(active: &str) -> ServiceStatus {
    match active {
        "active" | "reloading" | "refreshing" => ServiceStatus::Running,
        "activating" => ServiceStatus::Starting,
        "deactivating" => ServiceStatus::Stopping,
        _ => ServiceStatus::Stopped,
    }
}

fn map_unit_file_state(state: &str) -> StartupType {
    match state {
        "enabled" | "enabled-runtime" | "linked" | "linked-runtime" | "alias" => {
            StartupType::Automatic
        }
        "masked" | "masked-runtime" => StartupType::Disabled,
        _ => StartupType::Manual,
    }
}

/// Translate `systemctl` stderr into the shared taxonomy.
fn classify_failure(name: Option<&str>, verb: &str, stderr: &str) -> ServiceError {
    let lower = stderr.to_ascii_lowercase();
    let message = stderr.trim();
    let err = if lower.contains("access denied")
        || lower.contains("authentication is required")
        || lower.contains("interactive authentication required")
        || lower.contains("permission denied")
    {
        ServiceError::permission_denied(format!("systemctl {verb}: {message}"))
    } else if lower.contains("not found")
        || lower.contains("not loaded")
        || lower.contains("does not exist")
    {
        match name {
            Some(name) => return ServiceError::not_found(name),
            None => ServiceError::system(format!("systemctl {verb}: {message}")),
        }
    } else {
        ServiceError::system(format!("systemctl {verb} failed: {message}"))
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

    #[test]
    fn parses_list_units_output() {
        let out = "\
postgresql@14-main.service loaded active   running PostgreSQL Cluster 14-main
redis-server.service       loaded inactive dead    Advanced key-value store
ghost.service              not-found inactive dead ghost.service
systemd-journald.socket    loaded active   running Journal Socket
";
        let services = parse_list_units(out);
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "postgresql@14-main");
        assert_eq!(services[0].display_name, "PostgreSQL Cluster 14-main");
        assert_eq!(services[0].state, ServiceStatus::Running);
        assert_eq!(services[1].state, ServiceStatus::Stopped);
    }

    #[test]
    fn unit_files_skip_templates() {
        let out = "postgresql@.service indirect enabled\nmysql.service disabled enabled\n";
        assert_eq!(parse_unit_files(out), vec!["mysql".to_string()]);
    }

    #[test]
    fn maps_states() {
        assert_eq!(map_active_state("activating"), ServiceStatus::Starting);
        assert_eq!(map_active_state("deactivating"), ServiceStatus::Stopping);
        assert_eq!(map_active_state("failed"), ServiceStatus::Stopped);
        assert_eq!(map_unit_file_state("enabled"), StartupType::Automatic);
        assert_eq!(map_unit_file_state("masked"), StartupType::Disabled);
        assert_eq!(map_unit_file_state("static"), StartupType::Manual);
    }

    #[test]
    fn parses_show_properties() {
        let props = parse_properties("LoadState=loaded\nActiveState=active\nSubState=running\n");
        assert_eq!(props.get("ActiveState").map(String::as_str), Some("active"));
    }

    #[test]
    fn classifies_failures() {
        let denied = classify_failure(
            Some("redis"),
            "start",
            "Failed to start redis.service: Access denied",
        );
        assert_eq!(denied.code(), ErrorCode::PermissionDenied);
        assert_eq!(denied.service.as_deref(), Some("redis"));

        let missing = classify_failure(
            Some("nope"),
            "start",
            "Failed to start nope.service: Unit nope.service not found.",
        );
        assert_eq!(missing.code(), ErrorCode::ServiceNotFound);

        let other = classify_failure(None, "list-units", "Failed to connect to bus");
        assert_eq!(other.code(), ErrorCode::SystemError);
        assert!(other.service.is_none());
    }

    #[test]
    fn appends_service_suffix_once() {
        assert_eq!(unit_name("redis"), "redis.service");
        assert_eq!(unit_name("redis.service"), "redis.service");
    }

    #[tokio::test]
    async fn missing_binary_is_a_system_error() {
        let adapter = SystemdAdapter::with_program("/nonexistent/systemctl-for-tests");
        let err = adapter.list_services().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SystemError);
    }
}
