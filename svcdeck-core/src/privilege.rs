//! Elevation checks consulted before mutating operations.

use async_trait::async_trait;
use tokio::process::Command;

/// Reports whether the current process may mutate host services.
#[async_trait]
pub trait PrivilegeGate: Send + Sync {
    async fn is_elevated(&self) -> bool;
}

/// Fixed answer, for tests and for the in-memory backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPrivilege(pub bool);

impl StaticPrivilege {
    pub fn elevated() -> Self {
        Self(true)
    }

    pub fn unprivileged() -> Self {
        Self(false)
    }
}

#[async_trait]
impl PrivilegeGate for StaticPrivilege {
    async fn is_elevated(&self) -> bool {
        self.0
    }
}

/// Inspects the real process token.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessPrivilege;

/// High / System mandatory integrity labels.
const ELEVATED_LABELS: [&str; 2] = ["S-1-16-12288", "S-1-16-16384"];

#[async_trait]
impl PrivilegeGate for ProcessPrivilege {
    async fn is_elevated(&self) -> bool {
        if cfg!(windows) {
            windows_elevated().await
        } else {
            unix_elevated().await
        }
    }
}

async fn windows_elevated() -> bool {
    match Command::new("whoami").arg("/groups").kill_on_drop(true).output().await {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout);
            ELEVATED_LABELS.iter().any(|label| text.contains(label))
        }
        Ok(_) => false,
        Err(e) => {
            tracing::warn!(error = %e, "failed to query process groups");
            false
        }
    }
}

async fn unix_elevated() -> bool {
    if let Ok(status) = tokio::fs::read_to_string("/proc/self/status").await {
        if let Some(uid) = effective_uid(&status) {
            return uid == 0;
        }
    }
    // 没有 procfs（如 macOS）时退回 id -u
    match Command::new("id").arg("-u").kill_on_drop(true).output().await {
        Ok(out) if out.status.success() => {
            String::from_utf8_lossy(&out.stdout).trim() == "0"
        }
        _ => false,
    }
}

/// `Uid:\t<real>\t<effective>\t<saved>\t<fs>` -> effective uid.
fn effective_uid(status: &str) -> Option<u32> {
    let line = status.lines().find(|l| l.starts_with("Uid:"))?;
    line.split_whitespace().nth(2)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_effective_uid_from_proc_status() {
        let status = "Name:\tsvcdeck\nUmask:\t0022\nUid:\t1000\t0\t1000\t1000\nGid:\t1000\t1000\t1000\t1000\n";
        assert_eq!(effective_uid(status), Some(0));
        assert_eq!(effective_uid("Name:\tx\n"), None);
    }

    #[tokio::test]
    async fn static_privilege_answers_as_configured() {
        assert!(StaticPrivilege::elevated().is_elevated().await);
        assert!(!StaticPrivilege::unprivileged().is_elevated().await);
    }
}
