//! Wheel-set currency: only the most recent tire-service record may move a
//! vehicle's `current_wheel_set_id`. Editing an older, backdated record must
//! not clobber the set the vehicle actually runs today.

use crate::model::{EntryKind, LogEntry, Vehicle};
use crate::ordering::compare_date_and_id;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use uuid::Uuid;

/// True when no other tire-service entry sorts after the candidate under
/// `(date, id)`.
pub fn is_latest_tire_service_entry(
    all_entries: &[LogEntry],
    candidate_id: &Uuid,
    candidate_date: &DateTime<Utc>,
) -> bool {
    !all_entries.iter().any(|e| {
        e.kind == EntryKind::TireService
            && e.id != *candidate_id
            && compare_date_and_id(&e.date, &e.id, candidate_date, candidate_id)
                == Ordering::Greater
    })
}

/// Point the vehicle at `wheel_set_id` if the candidate is the latest
/// tire service. Returns whether the pointer changed.
pub fn update_vehicle_current_wheel_set_if_latest(
    vehicle: &mut Vehicle,
    all_entries: &[LogEntry],
    candidate_id: &Uuid,
    candidate_date: &DateTime<Utc>,
    wheel_set_id: Option<Uuid>,
) -> bool {
    let Some(wheel_set_id) = wheel_set_id else {
        return false;
    };
    if !is_latest_tire_service_entry(all_entries, candidate_id, candidate_date) {
        return false;
    }
    if vehicle.current_wheel_set_id == Some(wheel_set_id) {
        return false;
    }
    vehicle.current_wheel_set_id = Some(wheel_set_id);
    true
}
