use super::backend::StorageBackend;
use super::Tables;
use crate::error::{CarlogError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const LEDGER_FILE: &str = "ledger.json";

/// Keeps the whole record set in `<root>/ledger.json`.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_FILE)
    }
}

/// Write `content` next to `target` and rename it into place.
pub(crate) fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    let dir = target
        .parent()
        .ok_or_else(|| CarlogError::Store(format!("No parent dir for {}", target.display())))?;
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    let tmp = dir.join(format!(".carlog-{}.tmp", Uuid::new_v4()));
    fs::write(&tmp, content)?;
    fs::rename(&tmp, target)?;
    Ok(())
}

impl StorageBackend for FsBackend {
    fn load_tables(&self) -> Result<Tables> {
        let path = self.ledger_path();
        if !path.exists() {
            return Ok(Tables::default());
        }
        let content = fs::read_to_string(path)?;
        let tables: Tables = serde_json::from_str(&content)?;
        Ok(tables)
    }

    fn save_tables(&self, tables: &Tables) -> Result<()> {
        let content = serde_json::to_vec_pretty(tables)?;
        write_atomic(&self.ledger_path(), &content)
    }
}
