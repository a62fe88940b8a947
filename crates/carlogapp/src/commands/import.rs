use super::{CmdMessage, CmdResult};
use crate::backup::{decode, import_document};
use crate::error::Result;
use crate::store::files::AttachmentFiles;
use crate::store::DataStore;
use std::fs;
use std::path::Path;

/// Read a backup file (plain or gzip) and reconcile it into the store.
pub fn run<S, F>(store: &mut S, files: &F, path: &Path) -> Result<CmdResult>
where
    S: DataStore,
    F: AttachmentFiles + ?Sized,
{
    let bytes = fs::read(path)?;
    let doc = decode(&bytes)?;
    let summary = import_document(&doc, store, files)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Imported {} vehicle(s), {} entries, {} interval(s), {} service record(s).",
        summary.vehicles_upserted,
        summary.entries_upserted,
        summary.maintenance_intervals_upserted,
        summary.service_book_entries_upserted
    )));
    if summary.attachments_skipped > 0 {
        result.add_message(CmdMessage::warning(format!(
            "{} attachment file(s) could not be restored.",
            summary.attachments_skipped
        )));
    }
    result.import_summary = Some(summary);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CarlogError;
    use crate::model::Vehicle;
    use crate::store::files::MemFiles;
    use crate::store::mem_backend::MemBackend;
    use crate::store::MemoryStore;

    #[test]
    fn test_malformed_file_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"{\"vehicles\": [").unwrap();

        let mut store = MemoryStore::open(MemBackend::new()).unwrap();
        let err = run(&mut store, &MemFiles::new(), &path).unwrap_err();

        assert!(matches!(err, CarlogError::Decode(_)));
        assert!(!store.has_uncommitted_changes());
        assert!(store.fetch::<Vehicle>(|_| true).is_empty());
    }
}
