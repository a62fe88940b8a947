use super::{CmdMessage, CmdResult};
use crate::backup::{encode, encode_gzip, export_document};
use crate::error::Result;
use crate::store::files::AttachmentFiles;
use crate::store::fs_backend::write_atomic;
use crate::store::DataStore;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Default backup file name for an export made at `at`.
pub fn default_file_name(at: &DateTime<Utc>) -> String {
    format!("carlog-{}.json", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Write a backup of the whole store to `out`. A `.gz` extension selects
/// gzip compression.
pub fn run<S, F>(store: &S, files: &F, out: &Path, exported_at: DateTime<Utc>) -> Result<CmdResult>
where
    S: DataStore,
    F: AttachmentFiles + ?Sized,
{
    let outcome = export_document(store, files, exported_at);
    let gzip = out.extension().is_some_and(|ext| ext == "gz");
    let bytes = if gzip {
        encode_gzip(&outcome.document)?
    } else {
        encode(&outcome.document)?
    };
    write_atomic(out, &bytes)?;
    tracing::info!(path = %out.display(), bytes = bytes.len(), "backup written");

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Exported {} vehicle(s) to {}",
        outcome.document.vehicles.len(),
        out.display()
    )));
    if outcome.attachments_skipped > 0 {
        result.add_message(CmdMessage::warning(format!(
            "{} attachment(s) could not be read and were left out.",
            outcome.attachments_skipped
        )));
    }
    result.output_path = Some(PathBuf::from(out));
    Ok(result)
}
