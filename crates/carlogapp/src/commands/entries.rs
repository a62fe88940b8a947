use super::recalc::recalc_vehicle;
use super::{committed, remove_orphans, CmdMessage, CmdResult};
use crate::error::{CarlogError, Result};
use crate::model::{EntryKind, LogEntry, Vehicle, WheelSet};
use crate::ordering::compare_entries;
use crate::store::files::AttachmentFiles;
use crate::store::{DataStore, RecordKind};
use crate::wheels::update_vehicle_current_wheel_set_if_latest;
use uuid::Uuid;

/// Entries of one vehicle in canonical order.
pub fn list<S: DataStore>(store: &S, vehicle_id: &Uuid) -> Result<CmdResult> {
    store
        .get::<Vehicle>(vehicle_id)
        .ok_or(CarlogError::NotFound(RecordKind::Vehicle, *vehicle_id))?;
    let entries = store.fetch_sorted(|e: &LogEntry| e.vehicle_id == *vehicle_id, compare_entries);
    let mut result = CmdResult::default();
    if entries.is_empty() {
        result.add_message(CmdMessage::info("No entries yet."));
    }
    Ok(result.with_entries(entries))
}

/// Insert or replace a log entry, then refresh everything derived from it.
///
/// When an edit moves the entry to another vehicle, the vehicle it left is
/// recomputed too.
pub fn save<S: DataStore>(store: &mut S, mut entry: LogEntry) -> Result<CmdResult> {
    if !entry.is_fuel() {
        entry.fuel_consumption = None;
    }
    let mut vehicle: Vehicle = store
        .get(&entry.vehicle_id)
        .ok_or(CarlogError::NotFound(RecordKind::Vehicle, entry.vehicle_id))?;
    if let Some(wheel_set_id) = entry.wheel_set_id {
        store
            .get::<WheelSet>(&wheel_set_id)
            .ok_or(CarlogError::NotFound(RecordKind::WheelSet, wheel_set_id))?;
    }

    let (changed, wheels_moved) = committed(store, |s| {
        let previous_vehicle = match s.get::<LogEntry>(&entry.id) {
            Some(prior) => {
                s.update(entry.clone())?;
                Some(prior.vehicle_id).filter(|id| *id != vehicle.id)
            }
            None => {
                s.insert(entry.clone())?;
                None
            }
        };
        let mut changed = recalc_vehicle(s, &vehicle.id)?;
        if let Some(previous) = previous_vehicle {
            changed.extend(recalc_vehicle(s, &previous)?);
        }

        let mut wheels_moved = false;
        if entry.kind == EntryKind::TireService {
            let all = s.fetch::<LogEntry>(|e| e.vehicle_id == vehicle.id);
            wheels_moved = update_vehicle_current_wheel_set_if_latest(
                &mut vehicle,
                &all,
                &entry.id,
                &entry.date,
                entry.wheel_set_id,
            );
            if wheels_moved {
                s.update(vehicle.clone())?;
            }
        }
        Ok((changed, wheels_moved))
    })?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Saved {} entry.",
        entry.kind.as_raw()
    )));
    if wheels_moved {
        result.add_message(CmdMessage::info(format!(
            "{} now runs on the serviced wheel set.",
            vehicle.name
        )));
    }
    result.changed_entries = changed;
    Ok(result)
}

pub fn delete<S, F>(store: &mut S, files: &F, id: &Uuid) -> Result<CmdResult>
where
    S: DataStore,
    F: AttachmentFiles + ?Sized,
{
    let entry: LogEntry = store
        .get(id)
        .ok_or(CarlogError::NotFound(RecordKind::LogEntry, *id))?;

    let (report, changed) = committed(store, |s| {
        let report = s.delete::<LogEntry>(id)?;
        let changed = recalc_vehicle(s, &entry.vehicle_id)?;
        Ok((report, changed))
    })?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Deleted entry and {} attachment(s).",
        report.removed - 1
    )));
    remove_orphans(files, &report.orphaned_files, &mut result);
    result.changed_entries = changed;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attachment, FillKind};
    use crate::store::files::MemFiles;
    use crate::store::MemoryStore;
    use crate::test_utils::store_with_vehicle;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, d, 9, 0, 0).unwrap()
    }

    fn setup() -> (MemoryStore, Vehicle) {
        store_with_vehicle("Hatch")
    }

    fn consumption_of(store: &MemoryStore, id: &Uuid) -> f64 {
        let entry: LogEntry = store.get(id).unwrap();
        entry.fuel_consumption.unwrap()
    }

    #[test]
    fn test_save_partial_fill_updates_closing_fill() {
        let (mut store, vehicle) = setup();
        let a = LogEntry::fuel(vehicle.id, day(1), Some(10_000.0), 40.0, FillKind::Full);
        let c = LogEntry::fuel(vehicle.id, day(5), Some(10_400.0), 35.0, FillKind::Full);
        save(&mut store, a).unwrap();
        save(&mut store, c.clone()).unwrap();
        let first = consumption_of(&store, &c.id);
        assert!((first - 8.75).abs() < 1e-9);

        let b = LogEntry::fuel(vehicle.id, day(3), Some(10_200.0), 10.0, FillKind::Partial);
        let result = save(&mut store, b).unwrap();

        assert_eq!(result.changed_entries, vec![c.id]);
        let c = store.get::<LogEntry>(&c.id).unwrap();
        assert!((c.fuel_consumption.unwrap() - 11.25).abs() < 1e-9);
        assert!(!store.has_uncommitted_changes());

        let listed = list(&store, &vehicle.id).unwrap();
        let dates: Vec<_> = listed.entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![day(1), day(3), day(5)]);
    }

    #[test]
    fn test_edit_away_from_fuel_clears_consumption() {
        let (mut store, vehicle) = setup();
        let a = LogEntry::fuel(vehicle.id, day(1), Some(10_000.0), 40.0, FillKind::Full);
        let b = LogEntry::fuel(vehicle.id, day(5), Some(10_500.0), 40.0, FillKind::Full);
        save(&mut store, a).unwrap();
        save(&mut store, b.clone()).unwrap();
        let mut edited = store.get::<LogEntry>(&b.id).unwrap();
        assert!(edited.fuel_consumption.is_some());

        edited.kind = EntryKind::Service;
        save(&mut store, edited).unwrap();

        let stored = store.get::<LogEntry>(&b.id).unwrap();
        assert_eq!(stored.kind, EntryKind::Service);
        assert_eq!(stored.fuel_consumption, None);
    }

    #[test]
    fn test_moving_entry_recomputes_vehicle_it_left() {
        let (mut store, hatch) = setup();
        let van = Vehicle::new("Van");
        store.insert(van.clone()).unwrap();
        store.commit().unwrap();

        let a = LogEntry::fuel(hatch.id, day(1), Some(10_000.0), 40.0, FillKind::Full);
        let b = LogEntry::fuel(hatch.id, day(3), Some(10_200.0), 10.0, FillKind::Partial);
        let c = LogEntry::fuel(hatch.id, day(5), Some(10_400.0), 35.0, FillKind::Full);
        for entry in [a, b.clone(), c.clone()] {
            save(&mut store, entry).unwrap();
        }
        let before = consumption_of(&store, &c.id);
        assert!((before - 11.25).abs() < 1e-9);

        let mut moved = store.get::<LogEntry>(&b.id).unwrap();
        moved.vehicle_id = van.id;
        let result = save(&mut store, moved).unwrap();

        assert!(result.changed_entries.contains(&c.id));
        let after = consumption_of(&store, &c.id);
        assert!((after - 8.75).abs() < 1e-9);
        assert_eq!(store.get::<LogEntry>(&b.id).unwrap().vehicle_id, van.id);
    }

    #[test]
    fn test_save_unknown_vehicle() {
        let (mut store, _) = setup();
        let orphan = LogEntry::new(Uuid::new_v4(), EntryKind::Note, day(1));
        assert!(matches!(
            save(&mut store, orphan),
            Err(CarlogError::NotFound(RecordKind::Vehicle, _))
        ));
    }

    #[test]
    fn test_backdated_tire_service_keeps_current_wheels() {
        let (mut store, vehicle) = setup();
        let summer = WheelSet::new(vehicle.id, "Summer");
        let winter = WheelSet::new(vehicle.id, "Winter");
        store.insert(summer.clone()).unwrap();
        store.insert(winter.clone()).unwrap();

        let mut recent = LogEntry::new(vehicle.id, EntryKind::TireService, day(20));
        recent.wheel_set_id = Some(winter.id);
        save(&mut store, recent).unwrap();

        let mut old = LogEntry::new(vehicle.id, EntryKind::TireService, day(2));
        old.wheel_set_id = Some(summer.id);
        save(&mut store, old).unwrap();

        let vehicle: Vehicle = store.get(&vehicle.id).unwrap();
        assert_eq!(vehicle.current_wheel_set_id, Some(winter.id));
    }

    #[test]
    fn test_delete_removes_attachment_bytes() {
        let (mut store, vehicle) = setup();
        let files = MemFiles::new();
        let entry = LogEntry::new(vehicle.id, EntryKind::Purchase, day(1));
        let mut attachment = Attachment::new(entry.id, "r.pdf", "com.adobe.pdf");
        attachment.storage_path = "memory://r.pdf".into();
        files.put("memory://r.pdf", b"pdf");
        save(&mut store, entry.clone()).unwrap();
        store.insert(attachment).unwrap();
        store.commit().unwrap();

        delete(&mut store, &files, &entry.id).unwrap();

        assert!(files.is_empty());
        assert!(store.fetch::<Attachment>(|_| true).is_empty());
    }
}
