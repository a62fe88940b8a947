use super::{committed, CmdMessage, CmdResult};
use crate::error::Result;
use crate::fuel::recalculate_all;
use crate::model::{LogEntry, Vehicle};
use crate::store::DataStore;
use uuid::Uuid;

/// Recompute fuel consumption for one vehicle in the working set. Only rows
/// whose value changed are written back. Does not commit.
pub fn recalc_vehicle<S: DataStore>(store: &mut S, vehicle_id: &Uuid) -> Result<Vec<Uuid>> {
    // All kinds: an entry edited away from fuel may still hold a value.
    let mut entries = store.fetch::<LogEntry>(|e| e.vehicle_id == *vehicle_id);
    let changed = recalculate_all(&mut entries);
    for entry in entries.into_iter().filter(|e| changed.contains(&e.id)) {
        store.update(entry)?;
    }
    Ok(changed)
}

pub fn run<S: DataStore>(store: &mut S) -> Result<CmdResult> {
    let vehicle_ids: Vec<Uuid> = store
        .fetch::<Vehicle>(|_| true)
        .iter()
        .map(|v| v.id)
        .collect();

    let changed = committed(store, |s| {
        let mut changed = Vec::new();
        for id in &vehicle_ids {
            changed.extend(recalc_vehicle(s, id)?);
        }
        Ok(changed)
    })?;

    let mut result = CmdResult::default();
    if changed.is_empty() {
        result.add_message(CmdMessage::info("Fuel consumption already up to date."));
    } else {
        result.add_message(CmdMessage::success(format!(
            "Updated fuel consumption on {} entries.",
            changed.len()
        )));
    }
    result.changed_entries = changed;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FillKind;
    use crate::store::mem_backend::MemBackend;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_run_fills_missing_consumption_and_is_stable() {
        let mut store = MemoryStore::open(MemBackend::new()).unwrap();
        let vehicle = Vehicle::new("Hatch");
        let day = |d| Utc.with_ymd_and_hms(2024, 4, d, 9, 0, 0).unwrap();
        let first = LogEntry::fuel(vehicle.id, day(1), Some(10_000.0), 40.0, FillKind::Full);
        let second = LogEntry::fuel(vehicle.id, day(8), Some(10_500.0), 45.0, FillKind::Full);
        store.insert(vehicle).unwrap();
        store.insert(first).unwrap();
        store.insert(second.clone()).unwrap();
        store.commit().unwrap();

        let result = run(&mut store).unwrap();
        assert_eq!(result.changed_entries, vec![second.id]);
        let saved: LogEntry = store.get(&second.id).unwrap();
        assert!((saved.fuel_consumption.unwrap() - 9.0).abs() < 1e-9);
        assert_eq!(store.backend().save_count(), 2);

        let again = run(&mut store).unwrap();
        assert!(again.changed_entries.is_empty());
        assert_eq!(store.backend().save_count(), 2);
    }
}
