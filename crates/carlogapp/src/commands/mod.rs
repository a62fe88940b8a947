//! # Command Layer
//!
//! Each command lives in its own submodule as plain functions over a
//! [`DataStore`](crate::store::DataStore) and the other ports. Commands do the
//! work; they never print, parse arguments, or pick exit codes.
//!
//! ## Structured Returns
//!
//! Commands return [`CmdResult`], not strings:
//! - `vehicles`: vehicles to list
//! - `entries`: log entries, oldest first
//! - `wheel_sets`: wheel sets of a vehicle
//! - `statuses`: due status per maintenance interval
//! - `syncs`: reminder sync outcome per interval
//! - `changed_entries`: entries whose stored fuel consumption changed
//! - `import_summary`: counts from a backup import
//! - `messages`: leveled messages (info, success, warning, error)
//!
//! The CLI decides how to render them.
//!
//! ## Write Path
//!
//! Every mutating command follows the same order: edit the working set,
//! recompute derived fuel consumption for the affected vehicle, apply the
//! wheel-set rule where it applies, commit once. Reminder sync runs after a
//! commit, never before.
//!
//! ## Command Modules
//!
//! - [`vehicles`]: list, add, delete vehicles
//! - [`entries`]: list, save and delete log entries
//! - [`intervals`]: add maintenance intervals, record a completed service
//! - [`wheel_sets`]: list and add wheel sets
//! - [`recalc`]: recompute fuel consumption for every vehicle
//! - [`status`]: due/overdue status of intervals
//! - [`reminders`]: notification sync for one or all vehicles
//! - [`export`]: write a backup file
//! - [`import`]: read a backup file into the store

use crate::backup::ImportSummary;
use crate::error::Result;
use crate::model::{LogEntry, MaintenanceInterval, Vehicle, WheelSet};
use crate::reminders::{IntervalStatus, SyncReport};
use crate::store::files::AttachmentFiles;
use crate::store::DataStore;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

pub mod entries;
pub mod export;
pub mod import;
pub mod intervals;
pub mod recalc;
pub mod reminders;
pub mod status;
pub mod vehicles;
pub mod wheel_sets;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// Due status of one interval, with enough context to render it.
#[derive(Debug, Clone, Serialize)]
pub struct StatusRow {
    pub vehicle_name: String,
    pub interval: MaintenanceInterval,
    pub current_km: Option<f64>,
    pub status: IntervalStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntervalSync {
    pub vehicle_id: Uuid,
    pub interval_id: Uuid,
    pub title: String,
    pub report: SyncReport,
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub vehicles: Vec<Vehicle>,
    pub entries: Vec<LogEntry>,
    pub wheel_sets: Vec<WheelSet>,
    pub statuses: Vec<StatusRow>,
    pub syncs: Vec<IntervalSync>,
    pub changed_entries: Vec<Uuid>,
    pub import_summary: Option<ImportSummary>,
    pub output_path: Option<PathBuf>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_vehicles(mut self, vehicles: Vec<Vehicle>) -> Self {
        self.vehicles = vehicles;
        self
    }

    pub fn with_entries(mut self, entries: Vec<LogEntry>) -> Self {
        self.entries = entries;
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<StatusRow>) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn with_syncs(mut self, syncs: Vec<IntervalSync>) -> Self {
        self.syncs = syncs;
        self
    }
}

/// Run `work` against the working set and commit it, or roll back if any
/// step fails.
pub(crate) fn committed<S, T>(store: &mut S, work: impl FnOnce(&mut S) -> Result<T>) -> Result<T>
where
    S: DataStore,
{
    match work(store).and_then(|value| store.commit().map(|()| value)) {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Err(rollback) = store.rollback() {
                tracing::error!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}

/// Drop the bytes of attachments removed by a delete. Failures only warn:
/// the rows are already gone.
pub(crate) fn remove_orphans<F>(files: &F, paths: &[String], result: &mut CmdResult)
where
    F: AttachmentFiles + ?Sized,
{
    for path in paths {
        if let Err(e) = files.remove(path) {
            tracing::warn!(path = %path, error = %e, "orphaned attachment not removed");
            result.add_message(CmdMessage::warning(format!("Could not remove {path}: {e}")));
        }
    }
}
