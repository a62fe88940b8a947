//! # Backup Codec
//!
//! A backup is one self-describing JSON document holding every vehicle and
//! everything it owns, with attachment bytes inlined as base64.
//!
//! - [`export::export_document`] snapshots a store. Output is deterministic
//!   for a given store state and export timestamp.
//! - [`document::decode`] parses bytes (plain or gzip). It is the only step
//!   that can reject a document, and it runs before anything is mutated.
//! - [`import::import_document`] reconciles a decoded document into a store
//!   by id: insert when absent, full replace when present. It commits once.
//!
//! ## Format Versions
//!
//! | Version | Adds |
//! |---------|------|
//! | < 5 | vehicles, entries, intervals, service book, attachments |
//! | 5 | wheel sets, entry wheel-set link, vehicle current wheel set |
//! | 7 | structured purchase line items |
//!
//! Fields a document does not carry because of its version are left as they
//! are on existing rows. Rows missing from a document are never deleted.

pub mod document;
pub mod export;
pub mod import;

pub use document::{decode, encode, encode_gzip, BackupDocument, CURRENT_FORMAT_VERSION};
pub use export::{export_document, ExportOutcome};
pub use import::{import_document, ImportSummary};
