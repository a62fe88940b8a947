//! Fixtures shared by unit tests.

use crate::model::{FillKind, LogEntry, MaintenanceInterval, Vehicle};
use crate::store::mem_backend::MemBackend;
use crate::store::{DataStore, MemoryStore};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Noon UTC on the given day.
pub fn day(year: i32, month: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, d, 12, 0, 0)
        .single()
        .expect("valid fixture date")
}

pub fn full_fill(vehicle_id: Uuid, date: DateTime<Utc>, km: f64, liters: f64) -> LogEntry {
    LogEntry::fuel(vehicle_id, date, Some(km), liters, FillKind::Full)
}

pub fn partial_fill(vehicle_id: Uuid, date: DateTime<Utc>, km: f64, liters: f64) -> LogEntry {
    LogEntry::fuel(vehicle_id, date, Some(km), liters, FillKind::Partial)
}

/// Oil change every `km` / `months`, last done at `last_km` on `last_date`.
pub fn oil_interval(
    vehicle_id: Uuid,
    km: f64,
    months: u32,
    last_km: f64,
    last_date: DateTime<Utc>,
) -> MaintenanceInterval {
    let mut interval = MaintenanceInterval::new(vehicle_id, "Oil change");
    interval.interval_km = Some(km);
    interval.interval_months = Some(months);
    interval.last_done_odometer_km = Some(last_km);
    interval.last_done_date = Some(last_date);
    interval
}

/// A committed in-memory store holding one vehicle.
pub fn store_with_vehicle(name: &str) -> (MemoryStore, Vehicle) {
    let mut store = MemoryStore::open(MemBackend::new()).expect("failed to open store");
    let vehicle = Vehicle::new(name);
    store
        .insert(vehicle.clone())
        .expect("fixture insert failed");
    store.commit().expect("fixture commit failed");
    (store, vehicle)
}

#[cfg(test)]
pub use fs_env::TestEnv;
