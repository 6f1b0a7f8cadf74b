//! Client settings: TOML file, then environment, then CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::path::{default_config_path, default_data_dir, expand_home};
use crate::error::{Result, ResultExt, SnapError};

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:12000/api/v1";

/// Maximum number of entries kept in the upload ledger.
pub const DEFAULT_LEDGER_CAPACITY: usize = 200;

/// Environment variable overriding `[api] base_url`.
pub const ENV_API_BASE_URL: &str = "SNAPPED_API_BASE_URL";
/// Environment variable overriding `[storage] data_dir`.
pub const ENV_DATA_DIR: &str = "SNAPPED_DATA_DIR";
/// Environment variable overriding `[api] timeout_secs`.
pub const ENV_TIMEOUT_SECS: &str = "SNAPPED_TIMEOUT_SECS";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub storage: StorageSettings,
    pub crop: CropSettings,
    pub history: HistorySettings,
}

/// Remote search API connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL, e.g. "http://127.0.0.1:12000/api/v1".
    pub base_url: String,
    /// Whole-request timeout.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Local storage for the upload ledger and cropped images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Defaults to the platform data directory when unset.
    pub data_dir: Option<PathBuf>,
    pub ledger_capacity: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
        }
    }
}

/// Centered-square crop policy.
///
/// The viewport stands in for the phone screen the square was originally
/// sized against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropSettings {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub width_fraction: f32,
    pub height_fraction: f32,
    /// JPEG quality (1-100) for cropped output.
    pub jpeg_quality: u8,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            viewport_width: 390,
            viewport_height: 844,
            width_fraction: 0.8,
            height_fraction: 0.5,
            jpeg_quality: 90,
        }
    }
}

/// Remote search history listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub limit: u32,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { limit: 50 }
    }
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(text).map_err(|e| SnapError::ConfigParse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would make every request fail.
    fn validate(&self) -> Result<()> {
        for (name, secs) in [
            ("api.timeout_secs", self.api.timeout_secs),
            ("api.connect_timeout_secs", self.api.connect_timeout_secs),
        ] {
            if secs == 0 {
                return Err(SnapError::ConfigParse(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }

    /// Load settings from a file.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// config file just yields defaults.
    #[instrument(skip_all, fields(explicit = explicit.is_some()))]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(p) => (Some(expand_home(p)?), true),
            None => (default_config_path(), false),
        };

        let Some(path) = path else {
            debug!("No config directory on this platform, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            if required {
                return Err(SnapError::ConfigNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!(path = %path.display(), "Config file absent, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings = Self::from_toml(&text)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(settings)
    }

    /// Apply environment overrides through a lookup function.
    ///
    /// Taking the lookup as a parameter keeps this testable without touching
    /// the process environment.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|s| !s.is_empty()) {
            self.api.base_url = url;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|s| !s.is_empty()) {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => self.api.timeout_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid {ENV_TIMEOUT_SECS}"),
            }
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Resolved data directory (with `~` expanded).
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => expand_home(dir),
            None => Ok(default_data_dir()),
        }
    }

    /// SQLite file holding the upload ledger.
    pub fn ledger_db_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("snapped.db"))
    }

    /// Directory cropped images are written to.
    pub fn crops_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("crops"))
    }
}
