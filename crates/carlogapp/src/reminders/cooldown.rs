//! Cooldown stamps for the immediate mileage alert.
//!
//! A tiny key-value store of "last fired" moments. The file variant keeps
//! `cooldowns.json` next to the ledger and rewrites it on every stamp.

use crate::error::Result;
use crate::store::fs_backend::write_atomic;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

pub const COOLDOWN_FILE: &str = "cooldowns.json";

pub trait CooldownStore {
    fn last_fired(&self, key: &str) -> Option<DateTime<Utc>>;

    fn stamp(&mut self, key: &str, at: DateTime<Utc>) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemCooldowns {
    stamps: BTreeMap<String, DateTime<Utc>>,
}

impl MemCooldowns {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CooldownStore for MemCooldowns {
    fn last_fired(&self, key: &str) -> Option<DateTime<Utc>> {
        self.stamps.get(key).copied()
    }

    fn stamp(&mut self, key: &str, at: DateTime<Utc>) -> Result<()> {
        self.stamps.insert(key.to_string(), at);
        Ok(())
    }
}

pub struct FsCooldowns {
    path: PathBuf,
    stamps: BTreeMap<String, DateTime<Utc>>,
}

impl FsCooldowns {
    /// Load stamps from `path`; a missing file means no stamps.
    pub fn open(path: PathBuf) -> Result<Self> {
        let stamps = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, stamps })
    }
}

impl CooldownStore for FsCooldowns {
    fn last_fired(&self, key: &str) -> Option<DateTime<Utc>> {
        self.stamps.get(key).copied()
    }

    fn stamp(&mut self, key: &str, at: DateTime<Utc>) -> Result<()> {
        self.stamps.insert(key.to_string(), at);
        let content = serde_json::to_vec_pretty(&self.stamps)?;
        write_atomic(&self.path, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fs_cooldowns_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COOLDOWN_FILE);
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        let mut store = FsCooldowns::open(path.clone()).unwrap();
        assert_eq!(store.last_fired("k"), None);
        store.stamp("k", at).unwrap();

        let reopened = FsCooldowns::open(path).unwrap();
        assert_eq!(reopened.last_fired("k"), Some(at));
    }
}
