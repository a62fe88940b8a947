//! Due/overdue classification for a maintenance interval.
//!
//! Pure: everything is derived from the interval, the vehicle's current
//! odometer and "now". The distance and date channels are evaluated
//! independently; [`IntervalStatus::worst`] folds them for display.

use crate::model::{LogEntry, MaintenanceInterval, Vehicle};
use chrono::{DateTime, FixedOffset, Months, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DueStatus {
    /// Not enough baseline data to say.
    Unknown,
    Ok,
    Warning,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalStatus {
    pub next_due_km: Option<f64>,
    pub km_until_due: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub days_until_due: Option<i64>,
    pub by_distance: DueStatus,
    pub by_date: DueStatus,
}

impl IntervalStatus {
    pub fn worst(&self) -> DueStatus {
        self.by_distance.max(self.by_date)
    }
}

/// Odometer reading at which the interval is next due.
pub fn next_due_km(interval: &MaintenanceInterval) -> Option<f64> {
    Some(interval.last_done_odometer_km? + interval.interval_km?)
}

/// Calendar date on which the interval is next due, in the offset of `tz`.
/// Month arithmetic clamps to the end of shorter months.
pub fn due_date(interval: &MaintenanceInterval, tz: &FixedOffset) -> Option<NaiveDate> {
    let last_done = interval.last_done_date?.with_timezone(tz).date_naive();
    let months = interval.interval_months?;
    last_done.checked_add_months(Months::new(months))
}

fn classify(remaining: f64, lead: f64) -> DueStatus {
    if remaining < 0.0 {
        DueStatus::Overdue
    } else if remaining <= lead {
        DueStatus::Warning
    } else {
        DueStatus::Ok
    }
}

pub fn derive_status(
    interval: &MaintenanceInterval,
    current_km: Option<f64>,
    now: &DateTime<FixedOffset>,
    default_lead_km: f64,
) -> IntervalStatus {
    let next_km = next_due_km(interval);
    let km_until_due = next_km.zip(current_km).map(|(due, cur)| due - cur);
    let lead_km = interval.notifications.lead_km.unwrap_or(default_lead_km);
    let by_distance = km_until_due
        .map(|km| classify(km, lead_km))
        .unwrap_or(DueStatus::Unknown);

    let due = due_date(interval, &now.timezone());
    let days_until_due = due.map(|d| (d - now.date_naive()).num_days());
    let by_date = days_until_due
        .map(|days| classify(days as f64, f64::from(interval.notifications.lead_days)))
        .unwrap_or(DueStatus::Unknown);

    IntervalStatus {
        next_due_km: next_km,
        km_until_due,
        due_date: due,
        days_until_due,
        by_distance,
        by_date,
    }
}

/// Best known odometer reading: the highest one logged, else the vehicle's
/// initial reading.
pub fn current_km(vehicle: &Vehicle, entries: &[LogEntry]) -> Option<f64> {
    entries
        .iter()
        .filter(|e| e.vehicle_id == vehicle.id)
        .filter_map(|e| e.odometer_km)
        .max_by(|a, b| a.total_cmp(b))
        .or(vehicle.initial_odometer_km)
}
