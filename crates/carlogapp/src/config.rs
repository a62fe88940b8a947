//! # Configuration
//!
//! Configuration is loaded with [`confique`], layered in priority order:
//! 1. **Environment variables**: `CARLOG_DATA_DIR`, `CARLOG_DEFAULT_LEAD_KM`.
//! 2. **Config file**: `$CARLOG_CONFIG`, else `carlog.toml` in the OS config
//!    directory (via `directories`). A missing file is fine.
//! 3. **Compiled defaults**: via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `data_dir` | OS data dir | Where `ledger.json`, `cooldowns.json` and `attachments/` live |
//! | `default_lead_km` | `500` | Mileage warning lead when an interval sets none |
//! | `fire_hour` | `9` | Hour of day new intervals notify at |
//! | `fire_minute` | `0` | Minute of that hour |

use crate::error::{CarlogError, Result};
use crate::model::default_fire_time;
use chrono::NaiveTime;
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "CARLOG_CONFIG";
pub const CONFIG_FILE: &str = "carlog.toml";

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CarlogConfig {
    /// Data directory. When absent, the OS data directory is used.
    #[config(env = "CARLOG_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[config(env = "CARLOG_DEFAULT_LEAD_KM", default = 500.0)]
    pub default_lead_km: f64,

    #[config(default = 9)]
    pub fire_hour: u32,

    #[config(default = 0)]
    pub fire_minute: u32,
}

impl Default for CarlogConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_lead_km: 500.0,
            fire_hour: 9,
            fire_minute: 0,
        }
    }
}

pub(crate) fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "carlog", "carlog")
        .ok_or_else(|| CarlogError::Config("Could not determine home directory".to_string()))
}

impl CarlogConfig {
    /// Load from the environment and `file`, falling back to defaults.
    pub fn load_from(file: &Path) -> Result<Self> {
        Self::builder()
            .env()
            .file(file)
            .load()
            .map_err(|e| CarlogError::Config(e.to_string()))
    }

    /// Load from `$CARLOG_CONFIG` or the OS config directory.
    pub fn load() -> Result<Self> {
        let file = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => project_dirs()?.config_dir().join(CONFIG_FILE),
        };
        Self::load_from(&file)
    }

    /// Notification time for new intervals. Out-of-range values fall back to
    /// 09:00.
    pub fn fire_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.fire_hour, self.fire_minute, 0)
            .unwrap_or_else(default_fire_time)
    }
}
