//! Attachment byte port.
//!
//! Attachments only know a storage path; reading and writing the bytes behind
//! it goes through [`AttachmentFiles`]. Errors are typed as
//! [`CarlogError::File`] so callers can log and skip a single attachment
//! without aborting the surrounding export or import.

use super::fs_backend::write_atomic;
use crate::error::{CarlogError, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

pub trait AttachmentFiles {
    /// `Ok(None)` when nothing is stored at `path`.
    fn read_bytes(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Store `bytes` under a fresh name and return its storage path.
    fn write_bytes(&self, bytes: &[u8], suggested_extension: Option<&str>) -> Result<String>;

    /// Drop the bytes at `path`. Removing nothing is not an error.
    fn remove(&self, path: &str) -> Result<()>;
}

fn file_name(extension: Option<&str>) -> String {
    match extension
        .map(|e| e.trim_start_matches('.'))
        .filter(|e| !e.is_empty())
    {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}

/// Attachment bytes as files in one directory. Storage paths are file names
/// relative to that directory.
pub struct FsFiles {
    dir: PathBuf,
}

impl FsFiles {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        // Storage paths are bare file names; anything else would escape the dir.
        if path.is_empty() || path.contains(['/', '\\']) || path.starts_with('.') {
            return Err(CarlogError::File(format!("Invalid storage path: {path:?}")));
        }
        Ok(self.dir.join(path))
    }
}

impl AttachmentFiles for FsFiles {
    fn read_bytes(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let full = self.resolve(path)?;
        if !full.exists() {
            return Ok(None);
        }
        fs::read(&full)
            .map(Some)
            .map_err(|e| CarlogError::File(format!("{}: {}", full.display(), e)))
    }

    fn write_bytes(&self, bytes: &[u8], suggested_extension: Option<&str>) -> Result<String> {
        let name = file_name(suggested_extension);
        write_atomic(&self.dir.join(&name), bytes)
            .map_err(|e| CarlogError::File(format!("{}: {}", name, e)))?;
        Ok(name)
    }

    fn remove(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        match fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CarlogError::File(format!("{}: {}", full.display(), e))),
        }
    }
}

/// In-memory attachment bytes for tests.
#[derive(Default)]
pub struct MemFiles {
    files: RefCell<HashMap<String, Vec<u8>>>,
    fail_writes: RefCell<bool>,
}

impl MemFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, path: &str, bytes: &[u8]) {
        self.files
            .borrow_mut()
            .insert(path.to_string(), bytes.to_vec());
    }

    pub fn len(&self) -> usize {
        self.files.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.borrow().is_empty()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.borrow_mut() = fail;
    }
}

impl AttachmentFiles for MemFiles {
    fn read_bytes(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.borrow().get(path).cloned())
    }

    fn write_bytes(&self, bytes: &[u8], suggested_extension: Option<&str>) -> Result<String> {
        if *self.fail_writes.borrow() {
            return Err(CarlogError::File("Simulated write error".to_string()));
        }
        let name = format!("memory://{}", file_name(suggested_extension));
        self.put(&name, bytes);
        Ok(name)
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.files.borrow_mut().remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let files = FsFiles::new(dir.path().join("attachments"));

        let path = files.write_bytes(b"%PDF-1.7", Some(".pdf")).unwrap();
        assert!(path.ends_with(".pdf"));
        assert_eq!(files.read_bytes(&path).unwrap(), Some(b"%PDF-1.7".to_vec()));

        files.remove(&path).unwrap();
        assert_eq!(files.read_bytes(&path).unwrap(), None);
        files.remove(&path).unwrap();
    }

    #[test]
    fn test_fs_files_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let files = FsFiles::new(dir.path().to_path_buf());
        assert_eq!(files.read_bytes("nope.jpg").unwrap(), None);
    }

    #[test]
    fn test_fs_files_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let files = FsFiles::new(dir.path().to_path_buf());
        assert!(matches!(
            files.read_bytes("../ledger.json"),
            Err(CarlogError::File(_))
        ));
    }

    #[test]
    fn test_mem_files_simulated_failure() {
        let files = MemFiles::new();
        files.set_fail_writes(true);
        assert!(files.write_bytes(b"x", None).is_err());
        assert!(files.is_empty());
    }
}
