//! # API Facade
//!
//! A thin facade over the command layer and the single entry point for every
//! ledger operation, whatever the UI.
//!
//! The facade dispatches to [`commands`], fills in settings the caller should
//! not have to repeat (default lead distance, notification time) and returns
//! structured [`CmdResult`]s. It holds no business logic and does no I/O of
//! its own.
//!
//! ## Generic Over the Ports
//!
//! `CarlogApi<S, F>` is generic over the record store and the attachment
//! byte store:
//! - Production: `CarlogApi<FileStore, FsFiles>`
//! - Testing: `CarlogApi<MemoryStore, MemFiles>`
//!
//! Notification centre and cooldown store are passed per call: they belong to
//! the platform, not to the ledger.

use crate::commands::{self, CmdResult};
use crate::config::CarlogConfig;
use crate::error::Result;
use crate::fuel::{compute_draft, FuelDraft};
use crate::model::{LogEntry, MaintenanceInterval};
use crate::reminders::{CooldownStore, NotificationCenter};
use crate::store::files::AttachmentFiles;
use crate::store::DataStore;
use chrono::{DateTime, FixedOffset, Utc};
use std::path::Path;
use uuid::Uuid;

pub struct CarlogApi<S: DataStore, F: AttachmentFiles> {
    store: S,
    files: F,
    config: CarlogConfig,
}

impl<S: DataStore, F: AttachmentFiles> CarlogApi<S, F> {
    pub fn new(store: S, files: F, config: CarlogConfig) -> Self {
        Self {
            store,
            files,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    pub fn config(&self) -> &CarlogConfig {
        &self.config
    }

    pub fn list_vehicles(&self) -> Result<CmdResult> {
        commands::vehicles::list(&self.store)
    }

    pub fn add_vehicle(
        &mut self,
        name: &str,
        initial_odometer_km: Option<f64>,
    ) -> Result<CmdResult> {
        commands::vehicles::add(&mut self.store, name, initial_odometer_km)
    }

    pub fn delete_vehicle(&mut self, id: &Uuid) -> Result<CmdResult> {
        commands::vehicles::delete(&mut self.store, &self.files, id)
    }

    pub fn list_entries(&self, vehicle_id: &Uuid) -> Result<CmdResult> {
        commands::entries::list(&self.store, vehicle_id)
    }

    pub fn save_entry(&mut self, entry: LogEntry) -> Result<CmdResult> {
        commands::entries::save(&mut self.store, entry)
    }

    pub fn delete_entry(&mut self, id: &Uuid) -> Result<CmdResult> {
        commands::entries::delete(&mut self.store, &self.files, id)
    }

    pub fn list_wheel_sets(&self, vehicle_id: &Uuid) -> Result<CmdResult> {
        commands::wheel_sets::list(&self.store, vehicle_id)
    }

    pub fn add_wheel_set(&mut self, vehicle_id: &Uuid, name: &str) -> Result<CmdResult> {
        commands::wheel_sets::add(&mut self.store, vehicle_id, name)
    }

    /// Live consumption preview for a fuel entry being edited.
    pub fn draft_consumption(&self, vehicle_id: &Uuid, draft: &FuelDraft) -> Option<f64> {
        let history = self
            .store
            .fetch::<LogEntry>(|e| e.vehicle_id == *vehicle_id && e.is_fuel());
        compute_draft(&history, draft)
    }

    /// New interval for `vehicle_id`, notifying at the configured time.
    pub fn new_interval(&self, vehicle_id: Uuid, title: &str) -> MaintenanceInterval {
        let mut interval = MaintenanceInterval::new(vehicle_id, title);
        interval.notifications.fire_time = self.config.fire_time();
        interval
    }

    pub fn add_interval(&mut self, interval: MaintenanceInterval) -> Result<CmdResult> {
        commands::intervals::add(&mut self.store, interval)
    }

    pub fn record_service(
        &mut self,
        interval_id: &Uuid,
        done: commands::intervals::ServiceDone,
    ) -> Result<CmdResult> {
        commands::intervals::record_service(&mut self.store, interval_id, done)
    }

    pub fn recalc(&mut self) -> Result<CmdResult> {
        commands::recalc::run(&mut self.store)
    }

    pub fn status(
        &self,
        vehicle_id: Option<&Uuid>,
        now: &DateTime<FixedOffset>,
    ) -> Result<CmdResult> {
        commands::status::run(&self.store, vehicle_id, now, self.config.default_lead_km)
    }

    pub async fn sync_reminders<N, C>(
        &self,
        center: &N,
        cooldowns: &mut C,
        vehicle_id: Option<&Uuid>,
        now: DateTime<FixedOffset>,
    ) -> Result<CmdResult>
    where
        N: NotificationCenter + ?Sized,
        C: CooldownStore + ?Sized,
    {
        commands::reminders::run(
            &self.store,
            center,
            cooldowns,
            vehicle_id,
            now,
            self.config.default_lead_km,
        )
        .await
    }

    pub fn export(&self, out: &Path, exported_at: DateTime<Utc>) -> Result<CmdResult> {
        commands::export::run(&self.store, &self.files, out, exported_at)
    }

    pub fn import(&mut self, path: &Path) -> Result<CmdResult> {
        commands::import::run(&mut self.store, &self.files, path)
    }

    /// Import, then re-sync reminders for every vehicle.
    pub async fn import_and_sync<N, C>(
        &mut self,
        path: &Path,
        center: &N,
        cooldowns: &mut C,
        now: DateTime<FixedOffset>,
    ) -> Result<CmdResult>
    where
        N: NotificationCenter + ?Sized,
        C: CooldownStore + ?Sized,
    {
        let mut result = self.import(path)?;
        let synced = self.sync_reminders(center, cooldowns, None, now).await?;
        result.syncs = synced.syncs;
        result.messages.extend(synced.messages);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FillKind;
    use crate::reminders::{MemCooldowns, RecordingCenter};
    use crate::store::files::MemFiles;
    use crate::store::mem_backend::MemBackend;
    use crate::store::MemoryStore;
    use chrono::{NaiveTime, TimeZone};

    fn api() -> CarlogApi<MemoryStore, MemFiles> {
        let config = CarlogConfig {
            fire_hour: 7,
            fire_minute: 15,
            ..CarlogConfig::default()
        };
        CarlogApi::new(
            MemoryStore::open(MemBackend::new()).unwrap(),
            MemFiles::new(),
            config,
        )
    }

    #[test]
    fn test_new_interval_uses_configured_fire_time() {
        let api = api();
        let interval = api.new_interval(Uuid::new_v4(), "Oil");
        assert_eq!(
            interval.notifications.fire_time,
            NaiveTime::from_hms_opt(7, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_draft_consumption_reads_vehicle_history() {
        let mut api = api();
        let vehicle_id = api.add_vehicle("Hatch", None).unwrap().vehicles[0].id;
        let day = |d| Utc.with_ymd_and_hms(2024, 6, d, 9, 0, 0).unwrap();
        let first = LogEntry::fuel(vehicle_id, day(1), Some(20_000.0), 30.0, FillKind::Full);
        api.save_entry(first).unwrap();

        let draft = FuelDraft {
            id: None,
            date: day(9),
            odometer_km: Some(20_512.0),
            liters: Some(32.0),
            fill_kind: FillKind::Full,
        };
        assert_eq!(api.draft_consumption(&vehicle_id, &draft), Some(6.25));
        assert_eq!(api.draft_consumption(&Uuid::new_v4(), &draft), None);
    }

    #[tokio::test]
    async fn test_import_and_sync() {
        let mut api = api();
        let added = api.add_vehicle("Hatch", Some(9_700.0)).unwrap();
        let vehicle_id = added.vehicles[0].id;
        let mut interval = api.new_interval(vehicle_id, "Oil");
        interval.interval_km = Some(5_000.0);
        interval.last_done_odometer_km = Some(5_000.0);
        api.add_interval(interval).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        api.export(&path, now).unwrap();

        let mut restored = self::api();
        let center = RecordingCenter::new();
        let result = restored
            .import_and_sync(&path, &center, &mut MemCooldowns::new(), now.fixed_offset())
            .await
            .unwrap();

        assert_eq!(result.import_summary.unwrap().vehicles_upserted, 1);
        assert_eq!(result.syncs.len(), 1);
        assert_eq!(center.pending().len(), 1);
    }
}
