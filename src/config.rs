use crate::error::{AppError, Result};
use crate::registry::types::Instance;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_root_path")]
    pub root_path: String,

    #[serde(default = "default_poll_interval", with = "humantime_str")]
    pub poll_interval: Duration,

    #[serde(default = "default_request_timeout", with = "humantime_str")]
    pub request_timeout: Duration,

    #[serde(default = "default_history_size")]
    pub history_size: usize,

    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    #[serde(default = "default_biz_state_base_path")]
    pub biz_state_base_path: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub export_dir: Option<String>,

    #[serde(default)]
    pub instances: Vec<SeedInstance>,
}

/// An instance registered into the local coordination store at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedInstance {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub state: String,
}

impl From<&SeedInstance> for Instance {
    fn from(seed: &SeedInstance) -> Self {
        Instance::new(&seed.app_name, &seed.host, seed.port, &seed.state)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            poll_interval: default_poll_interval(),
            request_timeout: default_request_timeout(),
            history_size: default_history_size(),
            event_buffer: default_event_buffer(),
            biz_state_base_path: default_biz_state_base_path(),
            log_level: default_log_level(),
            export_dir: None,
            instances: Vec::new(),
        }
    }
}

impl Config {
    /// Loads `path`, or the per-user config file when no path is given.
    /// A missing per-user file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(&expand(&path.to_string_lossy())),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies command-line overrides and re-checks the result.
    pub fn with_overrides(
        mut self,
        interval: Option<Duration>,
        export_dir: Option<String>,
    ) -> Result<Self> {
        if let Some(interval) = interval {
            self.poll_interval = interval;
        }
        if let Some(dir) = export_dir {
            self.export_dir = Some(dir);
        }
        self.validate()?;
        Ok(self)
    }

    /// Rejects zero sizes and a request timeout that could outlive a tick.
    pub fn validate(&self) -> Result<()> {
        if self.history_size == 0 {
            return Err(AppError::Config("history_size must be at least 1".to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(AppError::Config("poll_interval must be non-zero".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(AppError::Config("request_timeout must be non-zero".to_string()));
        }
        if self.request_timeout >= self.poll_interval {
            return Err(AppError::Config(format!(
                "request_timeout ({}) must be shorter than poll_interval ({})",
                humantime::format_duration(self.request_timeout),
                humantime::format_duration(self.poll_interval)
            )));
        }
        Ok(())
    }

    /// Where exports go: the configured directory, else the platform data dir.
    pub fn export_dir(&self) -> PathBuf {
        match &self.export_dir {
            Some(dir) => expand(dir),
            None => directories::ProjectDirs::from("com", "appdashboard", "app-dashboard")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "appdashboard", "app-dashboard")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn default_root_path() -> String {
    "/apps".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_history_size() -> usize {
    4
}

fn default_event_buffer() -> usize {
    256
}

fn default_biz_state_base_path() -> String {
    "/actuator".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

mod humantime_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
