use super::{CmdMessage, CmdResult, StatusRow};
use crate::error::{CarlogError, Result};
use crate::model::{LogEntry, MaintenanceInterval, Vehicle};
use crate::reminders::{current_km, derive_status, DueStatus};
use crate::store::{DataStore, RecordKind};
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

/// Status of every enabled interval, for one vehicle or all of them.
pub fn run<S: DataStore>(
    store: &S,
    vehicle_id: Option<&Uuid>,
    now: &DateTime<FixedOffset>,
    default_lead_km: f64,
) -> Result<CmdResult> {
    let vehicles: Vec<Vehicle> = match vehicle_id {
        Some(id) => {
            let vehicle = store
                .get(id)
                .ok_or(CarlogError::NotFound(RecordKind::Vehicle, *id))?;
            vec![vehicle]
        }
        None => store.fetch_sorted(
            |_| true,
            |a: &Vehicle, b: &Vehicle| (a.created_at, a.id).cmp(&(b.created_at, b.id)),
        ),
    };

    let mut rows = Vec::new();
    for vehicle in &vehicles {
        let entries = store.fetch::<LogEntry>(|e| e.vehicle_id == vehicle.id);
        let km = current_km(vehicle, &entries);
        let intervals = store.fetch_sorted::<MaintenanceInterval>(
            |m| m.vehicle_id == vehicle.id && m.is_enabled,
            |a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)),
        );
        for interval in intervals {
            let status = derive_status(&interval, km, now, default_lead_km);
            rows.push(StatusRow {
                vehicle_name: vehicle.name.clone(),
                interval,
                current_km: km,
                status,
            });
        }
    }

    let mut result = CmdResult::default();
    let attention = rows
        .iter()
        .filter(|r| r.status.worst() >= DueStatus::Warning)
        .count();
    if rows.is_empty() {
        result.add_message(CmdMessage::info("No maintenance intervals."));
    } else if attention > 0 {
        result.add_message(CmdMessage::warning(format!(
            "{attention} interval(s) need attention."
        )));
    }
    Ok(result.with_statuses(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntryKind;
    use crate::store::mem_backend::MemBackend;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_status_uses_latest_odometer() {
        let mut store = MemoryStore::open(MemBackend::new()).unwrap();
        let vehicle = Vehicle::new("Hatch");
        let mut interval = MaintenanceInterval::new(vehicle.id, "Oil");
        interval.interval_km = Some(10_000.0);
        interval.last_done_odometer_km = Some(5_000.0);
        let mut reading = LogEntry::new(vehicle.id, EntryKind::Odometer, Utc::now());
        reading.odometer_km = Some(14_600.0);
        let mut disabled = MaintenanceInterval::new(vehicle.id, "Coolant");
        disabled.is_enabled = false;
        store.insert(vehicle.clone()).unwrap();
        store.insert(interval).unwrap();
        store.insert(disabled).unwrap();
        store.insert(reading).unwrap();

        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .unwrap();
        let result = run(&store, Some(&vehicle.id), &now, 500.0).unwrap();

        assert_eq!(result.statuses.len(), 1);
        let row = &result.statuses[0];
        assert_eq!(row.current_km, Some(14_600.0));
        assert_eq!(row.status.km_until_due, Some(400.0));
        assert_eq!(row.status.worst(), DueStatus::Warning);
        assert_eq!(result.messages.len(), 1);
    }

    #[test]
    fn test_unknown_vehicle() {
        let store = MemoryStore::open(MemBackend::new()).unwrap();
        let now = Utc::now().fixed_offset();
        assert!(run(&store, Some(&Uuid::new_v4()), &now, 500.0).is_err());
    }
}
