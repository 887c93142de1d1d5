//! `sandpad.yaml`: debounce windows, storage location, host-runner limits and
//! CDN overrides. Every key is optional.

use crate::error::ConfigError;
use directories::ProjectDirs;
use sandpad_preview::CdnTable;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "sandpad.yaml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub preview: PreviewConfig,
    pub storage: StorageConfig,
    pub runtime: RuntimeConfig,
    pub cdn: CdnTable,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub render_debounce_ms: u64,
    pub save_debounce_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            render_debounce_ms: 800,
            save_debounce_ms: 500,
        }
    }
}

impl PreviewConfig {
    pub fn render_debounce(&self) -> Duration {
        Duration::from_millis(self.render_debounce_ms)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the file-backed project store. Defaults to the platform
    /// data directory.
    pub dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .or_else(|| ProjectDirs::from("dev", "sandpad", "sandpad").map(|d| d.data_dir().join("projects")))
            .unwrap_or_else(|| PathBuf::from(".sandpad").join("projects"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Loop iterations allowed per host-thread JavaScript run.
    pub loop_iteration_limit: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            loop_iteration_limit: 1_000_000,
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read `path`. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(yaml) => {
                tracing::info!("Loaded config from {}", path.display());
                Self::from_yaml(&yaml, path)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// `./sandpad.yaml` if present, else the platform config directory.
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from(CONFIG_FILENAME);
        if local.exists() {
            return local;
        }
        ProjectDirs::from("dev", "sandpad", "sandpad")
            .map(|d| d.config_dir().join(CONFIG_FILENAME))
            .unwrap_or(local)
    }
}
