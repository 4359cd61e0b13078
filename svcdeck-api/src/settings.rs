//! 控制开关的 JSON 持久化：<data_dir>/config.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use svcdeck_core::{ControlSettings, Result, ServiceError};

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct StoredSettings {
    service_enabled: bool,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            service_enabled: true,
        }
    }
}

/// File-backed control switch.
#[derive(Debug)]
pub struct JsonSettings {
    path: PathBuf,
    current: Mutex<StoredSettings>,
}

impl JsonSettings {
    /// Load `config.json` from `data_dir`, creating it with defaults when missing.
    /// A file that fails to parse is moved to `config.json.backup` and replaced.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(CONFIG_FILE);

        let (settings, needs_write) = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<StoredSettings>(&bytes) {
                Ok(settings) => (settings, false),
                Err(e) => {
                    let backup = dir.join(format!("{CONFIG_FILE}.backup"));
                    tracing::warn!(
                        error = %e,
                        backup = %backup.display(),
                        "config file is corrupted, restoring defaults"
                    );
                    fs::rename(&path, &backup)?;
                    (StoredSettings::default(), true)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (StoredSettings::default(), true),
            Err(e) => return Err(e.into()),
        };

        if needs_write {
            write_atomic(&path, &settings)?;
        }
        Ok(Self {
            path,
            current: Mutex::new(settings),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ControlSettings for JsonSettings {
    fn service_control_enabled(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .service_enabled
    }

    fn set_service_control_enabled(&self, enabled: bool) -> Result<()> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let next = StoredSettings {
            service_enabled: enabled,
        };
        // 落盘成功后再更新内存，失败时保持原值
        write_atomic(&self.path, &next)?;
        *current = next;
        Ok(())
    }
}

/// 先写临时文件再 rename，避免写到一半的配置
fn write_atomic(path: &Path, settings: &StoredSettings) -> Result<()> {
    let data = serde_json::to_vec_pretty(settings)
        .map_err(|e| ServiceError::system(format!("failed to encode settings: {e}")))?;
    let tmp = path.with_extension(format!("json.tmp.{}", std::process::id()));
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_default_file() {
        let dir = TempDir::new().unwrap();
        let settings = JsonSettings::open(dir.path()).unwrap();
        assert!(settings.service_control_enabled());
        let raw = fs::read_to_string(dir.path().join("config.json")).unwrap();
        assert!(raw.contains("\"service_enabled\": true"));
    }

    #[test]
    fn persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let settings = JsonSettings::open(dir.path()).unwrap();
        settings.set_service_control_enabled(false).unwrap();
        drop(settings);

        let reopened = JsonSettings::open(dir.path()).unwrap();
        assert!(!reopened.service_control_enabled());
    }

    #[test]
    fn corrupted_file_is_backed_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.json"), b"{not json").unwrap();

        let settings = JsonSettings::open(dir.path()).unwrap();
        assert!(settings.service_control_enabled());
        let backup = fs::read(dir.path().join("config.json.backup")).unwrap();
        assert_eq!(backup, b"{not json");
    }

    #[test]
    fn ignores_unrelated_keys() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.json"),
            br#"{"service_enabled": false, "global_hotkey": "Ctrl+Alt+R"}"#,
        )
        .unwrap();
        let settings = JsonSettings::open(dir.path()).unwrap();
        assert!(!settings.service_control_enabled());
    }
}
