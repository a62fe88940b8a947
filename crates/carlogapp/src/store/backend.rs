use super::Tables;
use crate::error::Result;

/// Raw persistence for the record set.
/// This trait handles the "how" of storage (filesystem vs memory),
/// while LedgerStore handles the "what" (relationships, cascades, commit).
pub trait StorageBackend {
    /// Load the last saved record set. A backend with nothing saved yet
    /// returns empty tables.
    fn load_tables(&self) -> Result<Tables>;

    /// Replace the saved record set.
    /// MUST be atomic (e.g. write to tmp then rename) so a failed save leaves
    /// the previous state readable.
    fn save_tables(&self, tables: &Tables) -> Result<()>;
}
