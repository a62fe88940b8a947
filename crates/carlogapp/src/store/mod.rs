//! # Storage Layer
//!
//! The record store is a port: the rest of the crate talks to [`DataStore`]
//! and never to a storage engine. Two traits split the work, the same way pads
//! were split between business logic and raw I/O:
//!
//! - [`DataStore`]: typed insert / update / fetch / delete / commit over the six
//!   record kinds, with cascading deletes.
//! - [`backend::StorageBackend`]: loads and saves the whole record set. Knows
//!   nothing about relationships.
//!
//! [`ledger_store::LedgerStore`] implements the first on top of the second.
//!
//! ## Working Set and Commit
//!
//! A store keeps a *working set* in memory. Every mutation edits the working
//! set only; [`DataStore::commit`] hands it to the backend in one write, and
//! [`DataStore::rollback`] reloads the last committed state. The backup import
//! relies on this to be all-or-nothing.
//!
//! ## Record Mapping
//!
//! Each model type implements [`Record`], naming its [`RecordKind`] and the
//! table in [`Tables`] that holds it. That mapping is the whole schema.
//!
//! ## Cascades
//!
//! | Deleted | Effect |
//! |---------|--------|
//! | Vehicle | entries (and their attachments), intervals, service book, wheel sets removed |
//! | LogEntry | its attachments removed |
//! | WheelSet | vehicle pointers and entry links to it cleared |
//! | MaintenanceInterval | entry links and explicit attachment scopes to it cleared |
//!
//! Removed attachments are reported in [`DeleteReport::orphaned_files`] so the
//! caller can drop the bytes.
//!
//! ## Storage Layout (file backend)
//!
//! ```text
//! <data dir>/
//! ├── ledger.json         # All records
//! ├── cooldowns.json      # Mileage alert cooldown stamps
//! └── attachments/        # Attachment bytes, one file per attachment
//! ```

use crate::error::Result;
use crate::model::{
    Attachment, LogEntry, MaintenanceInterval, ServiceBookEntry, Vehicle, WheelSet,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub mod backend;
pub mod files;
pub mod fs_backend;
pub mod ledger_store;
pub mod mem_backend;

pub type MemoryStore = ledger_store::LedgerStore<mem_backend::MemBackend>;
pub type FileStore = ledger_store::LedgerStore<fs_backend::FsBackend>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Vehicle,
    LogEntry,
    MaintenanceInterval,
    ServiceBookEntry,
    Attachment,
    WheelSet,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Vehicle => "Vehicle",
            RecordKind::LogEntry => "Log entry",
            RecordKind::MaintenanceInterval => "Maintenance interval",
            RecordKind::ServiceBookEntry => "Service book entry",
            RecordKind::Attachment => "Attachment",
            RecordKind::WheelSet => "Wheel set",
        };
        f.write_str(name)
    }
}

/// Every record kind, one table each, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub vehicles: BTreeMap<Uuid, Vehicle>,
    #[serde(default)]
    pub entries: BTreeMap<Uuid, LogEntry>,
    #[serde(default)]
    pub maintenance_intervals: BTreeMap<Uuid, MaintenanceInterval>,
    #[serde(default)]
    pub service_book: BTreeMap<Uuid, ServiceBookEntry>,
    #[serde(default)]
    pub attachments: BTreeMap<Uuid, Attachment>,
    #[serde(default)]
    pub wheel_sets: BTreeMap<Uuid, WheelSet>,
}

/// Maps a model type onto its table.
pub trait Record: Clone {
    const KIND: RecordKind;

    fn id(&self) -> Uuid;
    fn table(tables: &Tables) -> &BTreeMap<Uuid, Self>;
    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Uuid, Self>;
}

macro_rules! impl_record {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl Record for $ty {
            const KIND: RecordKind = RecordKind::$kind;

            fn id(&self) -> Uuid {
                self.id
            }

            fn table(tables: &Tables) -> &BTreeMap<Uuid, Self> {
                &tables.$field
            }

            fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Uuid, Self> {
                &mut tables.$field
            }
        }
    };
}

impl_record!(Vehicle, Vehicle, vehicles);
impl_record!(LogEntry, LogEntry, entries);
impl_record!(
    MaintenanceInterval,
    MaintenanceInterval,
    maintenance_intervals
);
impl_record!(ServiceBookEntry, ServiceBookEntry, service_book);
impl_record!(Attachment, Attachment, attachments);
impl_record!(WheelSet, WheelSet, wheel_sets);

/// Report from a delete, including cascaded rows.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub removed: usize,
    /// Storage paths of removed attachments that had bytes on disk.
    pub orphaned_files: Vec<String>,
}

/// Abstract record store.
///
/// Implementations are single-writer and not reentrant: callers must not
/// interleave two mutating operations on overlapping records.
pub trait DataStore {
    /// Add a new row. Fails if the id already exists.
    fn insert<R: Record>(&mut self, record: R) -> Result<()>;

    /// Overwrite an existing row. Fails if the id is unknown.
    fn update<R: Record>(&mut self, record: R) -> Result<()>;

    fn get<R: Record>(&self, id: &Uuid) -> Option<R>;

    fn fetch<R: Record>(&self, predicate: impl Fn(&R) -> bool) -> Vec<R>;

    fn fetch_sorted<R: Record>(
        &self,
        predicate: impl Fn(&R) -> bool,
        compare: impl FnMut(&R, &R) -> Ordering,
    ) -> Vec<R> {
        let mut rows = self.fetch(predicate);
        rows.sort_by(compare);
        rows
    }

    /// Remove a row and everything it owns.
    fn delete<R: Record>(&mut self, id: &Uuid) -> Result<DeleteReport>;

    /// Persist the working set.
    fn commit(&mut self) -> Result<()>;

    /// Discard uncommitted changes.
    fn rollback(&mut self) -> Result<()>;

    fn has_uncommitted_changes(&self) -> bool;
}
