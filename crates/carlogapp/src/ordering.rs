//! Total orders over log entries.
//!
//! Fuel windows and the wheel-set rule both need an order in which two
//! distinct entries never compare equal. The last key component is always the
//! identifier. Identifiers compare as their lowercase hyphenated strings; for
//! UUIDs that is the same as comparing their bytes, so [`Uuid`]'s `Ord` is used
//! directly.

use crate::model::LogEntry;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use uuid::Uuid;

/// `(date, odometer ?? -inf, id)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryOrderKey {
    pub date: DateTime<Utc>,
    pub odometer_km: Option<f64>,
    pub id: Uuid,
}

impl EntryOrderKey {
    pub fn of(entry: &LogEntry) -> Self {
        Self {
            date: entry.date,
            odometer_km: entry.odometer_km,
            id: entry.id,
        }
    }
}

impl Eq for EntryOrderKey {}

impl PartialOrd for EntryOrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntryOrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| compare_odometer(self.odometer_km, other.odometer_km))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Missing readings sort before every present one.
fn compare_odometer(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.total_cmp(&b),
    }
}

pub fn compare_entries(a: &LogEntry, b: &LogEntry) -> Ordering {
    EntryOrderKey::of(a).cmp(&EntryOrderKey::of(b))
}

/// `(date, id)` order used by the wheel-set rule, which ignores odometers.
pub fn compare_date_and_id(
    a_date: &DateTime<Utc>,
    a_id: &Uuid,
    b_date: &DateTime<Utc>,
    b_id: &Uuid,
) -> Ordering {
    a_date.cmp(b_date).then_with(|| a_id.cmp(b_id))
}
