use super::backend::StorageBackend;
use super::{DataStore, DeleteReport, Record, RecordKind, Tables};
use crate::error::{CarlogError, Result};
use crate::model::IntervalScope;
use uuid::Uuid;

pub struct LedgerStore<B: StorageBackend> {
    /// The underlying storage backend.
    /// Exposed as pub(crate) for testing and internal access only.
    pub(crate) backend: B,
    working: Tables,
    dirty: bool,
}

impl<B: StorageBackend> LedgerStore<B> {
    /// Open the store, loading the committed state into the working set.
    pub fn open(backend: B) -> Result<Self> {
        let working = backend.load_tables()?;
        Ok(Self {
            backend,
            working,
            dirty: false,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn remove_row<R: Record>(&mut self, id: &Uuid) -> Result<R> {
        R::table_mut(&mut self.working)
            .remove(id)
            .ok_or(CarlogError::NotFound(R::KIND, *id))
    }

    fn remove_attachments_of(&mut self, entry_ids: &[Uuid], report: &mut DeleteReport) {
        self.working.attachments.retain(|_, a| {
            if entry_ids.contains(&a.entry_id) {
                report.removed += 1;
                if a.is_materialized() {
                    report.orphaned_files.push(a.storage_path.clone());
                }
                false
            } else {
                true
            }
        });
    }

    fn cascade(&mut self, kind: RecordKind, id: &Uuid, report: &mut DeleteReport) {
        match kind {
            RecordKind::Vehicle => {
                let entry_ids: Vec<Uuid> = self
                    .working
                    .entries
                    .values()
                    .filter(|e| e.vehicle_id == *id)
                    .map(|e| e.id)
                    .collect();
                self.remove_attachments_of(&entry_ids, report);

                let before = self.row_count();
                self.working.entries.retain(|_, e| e.vehicle_id != *id);
                self.working
                    .maintenance_intervals
                    .retain(|_, m| m.vehicle_id != *id);
                self.working.service_book.retain(|_, s| s.vehicle_id != *id);
                self.working.wheel_sets.retain(|_, w| w.vehicle_id != *id);
                report.removed += before - self.row_count();
            }
            RecordKind::LogEntry => {
                self.remove_attachments_of(&[*id], report);
            }
            RecordKind::WheelSet => {
                for vehicle in self.working.vehicles.values_mut() {
                    if vehicle.current_wheel_set_id == Some(*id) {
                        vehicle.current_wheel_set_id = None;
                    }
                }
                for entry in self.working.entries.values_mut() {
                    if entry.wheel_set_id == Some(*id) {
                        entry.wheel_set_id = None;
                    }
                }
            }
            RecordKind::MaintenanceInterval => {
                for entry in self.working.entries.values_mut() {
                    entry.maintenance_interval_ids.remove(id);
                }
                for attachment in self.working.attachments.values_mut() {
                    if let IntervalScope::Only(ids) = &mut attachment.scope {
                        ids.remove(id);
                    }
                }
            }
            RecordKind::ServiceBookEntry | RecordKind::Attachment => {}
        }
    }

    fn row_count(&self) -> usize {
        let t = &self.working;
        t.vehicles.len()
            + t.entries.len()
            + t.maintenance_intervals.len()
            + t.service_book.len()
            + t.attachments.len()
            + t.wheel_sets.len()
    }
}

impl<B: StorageBackend> DataStore for LedgerStore<B> {
    fn insert<R: Record>(&mut self, record: R) -> Result<()> {
        let id = record.id();
        let table = R::table_mut(&mut self.working);
        if table.contains_key(&id) {
            return Err(CarlogError::Duplicate(R::KIND, id));
        }
        table.insert(id, record);
        self.dirty = true;
        Ok(())
    }

    fn update<R: Record>(&mut self, record: R) -> Result<()> {
        let id = record.id();
        let slot = R::table_mut(&mut self.working)
            .get_mut(&id)
            .ok_or(CarlogError::NotFound(R::KIND, id))?;
        *slot = record;
        self.dirty = true;
        Ok(())
    }

    fn get<R: Record>(&self, id: &Uuid) -> Option<R> {
        R::table(&self.working).get(id).cloned()
    }

    fn fetch<R: Record>(&self, predicate: impl Fn(&R) -> bool) -> Vec<R> {
        R::table(&self.working)
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    fn delete<R: Record>(&mut self, id: &Uuid) -> Result<DeleteReport> {
        let removed: R = self.remove_row(id)?;
        let mut report = DeleteReport {
            removed: 1,
            ..Default::default()
        };
        self.cascade(R::KIND, &removed.id(), &mut report);
        self.dirty = true;
        Ok(report)
    }

    fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.backend
            .save_tables(&self.working)
            .map_err(|e| match e {
                CarlogError::Store(_) => e,
                other => CarlogError::Store(other.to_string()),
            })?;
        self.dirty = false;
        tracing::debug!(rows = self.row_count(), "committed ledger");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.working = self.backend.load_tables()?;
        self.dirty = false;
        tracing::debug!("rolled back uncommitted ledger changes");
        Ok(())
    }

    fn has_uncommitted_changes(&self) -> bool {
        self.dirty
    }
}
