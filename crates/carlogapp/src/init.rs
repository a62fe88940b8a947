//! # Data Directory Resolution
//!
//! Everything carlog persists lives in one directory:
//!
//! 1. An explicit override (the CLI's `--data-dir`) wins.
//! 2. Otherwise `data_dir` from the loaded [`CarlogConfig`] (which already
//!    folds in `CARLOG_DATA_DIR`).
//! 3. Otherwise the OS data directory from `directories`.
//!
//! [`initialize`] resolves that directory and opens the file-backed ports in
//! it. Nothing is created until the first write.

use crate::api::CarlogApi;
use crate::config::{project_dirs, CarlogConfig};
use crate::error::Result;
use crate::reminders::cooldown::COOLDOWN_FILE;
use crate::reminders::FsCooldowns;
use crate::store::files::FsFiles;
use crate::store::fs_backend::FsBackend;
use crate::store::FileStore;
use std::path::{Path, PathBuf};

pub const ATTACHMENTS_DIR: &str = "attachments";

pub struct CarlogContext {
    pub api: CarlogApi<FileStore, FsFiles>,
    pub cooldowns: FsCooldowns,
    pub data_dir: PathBuf,
}

/// Resolve the data directory without touching the filesystem.
pub fn resolve_data_dir(config: &CarlogConfig, data_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_override {
        return Ok(dir);
    }
    if let Some(dir) = &config.data_dir {
        return Ok(dir.clone());
    }
    Ok(project_dirs()?.data_dir().to_path_buf())
}

/// Open the ledger in the resolved data directory with an already loaded
/// configuration.
pub fn open(config: CarlogConfig, data_override: Option<PathBuf>) -> Result<CarlogContext> {
    let data_dir = resolve_data_dir(&config, data_override)?;
    tracing::debug!(data_dir = %data_dir.display(), "opening ledger");

    let store = FileStore::open(FsBackend::new(data_dir.clone()))?;
    let files = FsFiles::new(data_dir.join(ATTACHMENTS_DIR));
    let cooldowns = FsCooldowns::open(data_dir.join(COOLDOWN_FILE))?;

    Ok(CarlogContext {
        api: CarlogApi::new(store, files, config),
        cooldowns,
        data_dir,
    })
}

/// Load configuration from the usual places and open the ledger.
pub fn initialize(data_override: Option<PathBuf>) -> Result<CarlogContext> {
    open(CarlogConfig::load()?, data_override)
}

/// Like [`initialize`], reading configuration from `config_file`.
pub fn initialize_with(
    config_file: &Path,
    data_override: Option<PathBuf>,
) -> Result<CarlogContext> {
    open(CarlogConfig::load_from(config_file)?, data_override)
}
