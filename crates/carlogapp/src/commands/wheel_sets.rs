use super::{committed, CmdMessage, CmdResult};
use crate::error::{CarlogError, Result};
use crate::model::{Vehicle, WheelSet};
use crate::store::{DataStore, RecordKind};
use uuid::Uuid;

/// Wheel sets of one vehicle, oldest first.
pub fn list<S: DataStore>(store: &S, vehicle_id: &Uuid) -> Result<CmdResult> {
    let vehicle: Vehicle = store
        .get(vehicle_id)
        .ok_or(CarlogError::NotFound(RecordKind::Vehicle, *vehicle_id))?;
    let sets = store.fetch_sorted::<WheelSet>(
        |w| w.vehicle_id == vehicle.id,
        |a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)),
    );

    let mut result = CmdResult::default();
    let current_id = vehicle.current_wheel_set_id;
    match sets.iter().find(|w| Some(w.id) == current_id) {
        Some(current) => result.add_message(CmdMessage::info(format!(
            "{} runs on {}.",
            vehicle.name, current.name
        ))),
        None if sets.is_empty() => result.add_message(CmdMessage::info("No wheel sets yet.")),
        None => {}
    }
    result.wheel_sets = sets;
    Ok(result)
}

pub fn add<S: DataStore>(store: &mut S, vehicle_id: &Uuid, name: &str) -> Result<CmdResult> {
    store
        .get::<Vehicle>(vehicle_id)
        .ok_or(CarlogError::NotFound(RecordKind::Vehicle, *vehicle_id))?;
    let set = WheelSet::new(*vehicle_id, name);
    committed(store, |s| s.insert(set.clone()))?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Added wheel set {}. Log a tire service to fit it.",
        set.name
    )));
    result.wheel_sets = vec![set];
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::entries;
    use crate::model::{EntryKind, LogEntry};
    use crate::test_utils::{day, store_with_vehicle};

    #[test]
    fn test_fitting_through_tire_service() {
        let (mut store, vehicle) = store_with_vehicle("Hatch");
        let added = add(&mut store, &vehicle.id, "Summer").unwrap();
        let summer = added.wheel_sets[0].id;

        let listed = list(&store, &vehicle.id).unwrap();
        assert_eq!(listed.wheel_sets.len(), 1);
        assert!(listed.messages.is_empty());

        let mut fit = LogEntry::new(vehicle.id, EntryKind::TireService, day(2024, 4, 2));
        fit.wheel_set_id = Some(summer);
        entries::save(&mut store, fit).unwrap();

        let listed = list(&store, &vehicle.id).unwrap();
        assert_eq!(listed.messages[0].content, "Hatch runs on Summer.");
    }

    #[test]
    fn test_add_to_unknown_vehicle() {
        let (mut store, _) = store_with_vehicle("Hatch");
        assert!(matches!(
            add(&mut store, &Uuid::new_v4(), "Winter"),
            Err(CarlogError::NotFound(RecordKind::Vehicle, _))
        ));
    }
}
