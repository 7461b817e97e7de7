use crate::error::{CadenceError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIR: &str = ".cadence";
pub const CONFIG_FILE: &str = "config.yaml";

/// Poll intervals outside this range draw a warning.
pub const MIN_POLL_SECONDS: u64 = 3;
pub const MAX_POLL_SECONDS: u64 = 30;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:7070/api/v1".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// PollingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_task_queue")]
    pub task_queue_seconds: u64,
    #[serde(default = "default_event_feed")]
    pub event_feed_seconds: u64,
    #[serde(default = "default_analytics")]
    pub analytics_seconds: u64,
}

fn default_task_queue() -> u64 {
    5
}

fn default_event_feed() -> u64 {
    10
}

fn default_analytics() -> u64 {
    30
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            task_queue_seconds: default_task_queue(),
            event_feed_seconds: default_event_feed(),
            analytics_seconds: default_analytics(),
        }
    }
}

impl PollingConfig {
    pub fn task_queue(&self) -> Duration {
        Duration::from_secs(self.task_queue_seconds)
    }

    pub fn event_feed(&self) -> Duration {
        Duration::from_secs(self.event_feed_seconds)
    }

    pub fn analytics(&self) -> Duration {
        Duration::from_secs(self.analytics_seconds)
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    /// Sent as `X-Tenant-Id` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default)]
    pub polling: PollingConfig,
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(CONFIG_FILE)
}

pub fn user_config_path() -> Result<PathBuf> {
    let home = home::home_dir().ok_or(CadenceError::HomeNotFound)?;
    Ok(config_path(&home))
}

impl Config {
    /// Load `<root>/.cadence/config.yaml`, then `~/.cadence/config.yaml`,
    /// then fall back to defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let project = config_path(root);
        if project.exists() {
            return Self::load_file(&project);
        }
        match user_config_path() {
            Ok(user) if user.exists() => Self::load_file(&user),
            Ok(_) => Ok(Self::default()),
            Err(e) => {
                tracing::debug!(error = %e, "no home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&config_path(root), data.as_bytes())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("api.base_url '{url}' is not an http(s) URL"),
            });
        }

        if self.api.timeout_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "api.timeout_seconds must be greater than 0".to_string(),
            });
        }

        let intervals = [
            ("task_queue_seconds", self.polling.task_queue_seconds),
            ("event_feed_seconds", self.polling.event_feed_seconds),
            ("analytics_seconds", self.polling.analytics_seconds),
        ];
        for (name, secs) in intervals {
            if !(MIN_POLL_SECONDS..=MAX_POLL_SECONDS).contains(&secs) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "polling.{name} = {secs}s is outside {MIN_POLL_SECONDS}-{MAX_POLL_SECONDS}s"
                    ),
                });
            }
        }

        if matches!(&self.tenant, Some(t) if t.trim().is_empty()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "tenant is set but empty".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, cfg);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let cfg: Config = serde_yaml::from_str("api:\n  base_url: https://api.example.com/v1\n").unwrap();
        assert_eq!(cfg.api.base_url, "https://api.example.com/v1");
        assert_eq!(cfg.api.timeout_seconds, 10);
        assert_eq!(cfg.polling.analytics_seconds, 30);
    }

    #[test]
    fn save_then_load_from_project_root() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.tenant = Some("acme".into());
        cfg.polling.task_queue_seconds = 7;
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.tenant.as_deref(), Some("acme"));
        assert_eq!(loaded.polling.task_queue(), Duration::from_secs(7));
    }

    #[test]
    fn validate_flags_intervals_and_url() {
        let mut cfg = Config::default();
        cfg.api.base_url = "localhost:7070".into();
        cfg.polling.event_feed_seconds = 1;
        cfg.polling.analytics_seconds = 60;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.level == WarnLevel::Error));
        assert!(warnings.iter().any(|w| w.message.contains("event_feed_seconds")));
    }
}
