//! # Fuel Consumption
//!
//! Derives L/100km for full fill-ups from an ordered fuel history.
//!
//! Only a full tank gives a trustworthy volume-to-distance ratio, so a window
//! runs from one full fill to the next. Partial fills (top-ups) inside the
//! window are folded into the closing fill's litres:
//!
//! ```text
//! A full  10 000 km  40 L
//! B part  10 200 km  10 L   ─┐
//! C full  10 400 km  35 L   ─┴─ (10 + 35) / (10 400 − 10 000) × 100 = 11.25
//! ```
//!
//! The window is computed over the [`EntryOrderKey`] order; entries are never
//! reordered by odometer alone.
//!
//! Both entry points are pure: [`recalculate_all`] rewrites the
//! `fuel_consumption` field of the slice it is handed and reports which rows
//! changed, [`compute_draft`] previews a value for an unsaved entry.

use crate::model::{FillKind, LogEntry};
use crate::ordering::EntryOrderKey;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The parts of a fuel entry the window rule looks at.
#[derive(Debug, Clone, Copy)]
struct FuelPoint {
    key: EntryOrderKey,
    liters: Option<f64>,
    full: bool,
}

impl FuelPoint {
    fn of(entry: &LogEntry) -> Self {
        Self {
            key: EntryOrderKey::of(entry),
            liters: entry.liters,
            full: entry.is_full_fill(),
        }
    }

    fn positive_odometer(&self) -> Option<f64> {
        self.key.odometer_km.filter(|km| *km > 0.0)
    }
}

/// Consumption for `points[i]`, with `points` sorted by key.
fn window_consumption(points: &[FuelPoint], i: usize) -> Option<f64> {
    let current = &points[i];
    if !current.full {
        return None;
    }
    let odometer = current.positive_odometer()?;
    let liters = current.liters.filter(|l| *l > 0.0)?;

    let prev = (0..i)
        .rev()
        .find(|&j| points[j].full && points[j].positive_odometer().is_some())?;
    let prev_odometer = points[prev].positive_odometer()?;

    let distance = odometer - prev_odometer;
    if distance <= 0.0 {
        return None;
    }

    let between: f64 = points[prev + 1..i].iter().filter_map(|p| p.liters).sum();
    let liters_sum = liters + between;
    if liters_sum <= 0.0 {
        return None;
    }

    Some(liters_sum / distance * 100.0)
}

/// Recompute `fuel_consumption` for every fuel entry in `entries`.
///
/// A non-fuel entry never carries a value; a stale one (left over from an
/// entry whose kind was edited) is cleared. Returns the ids of entries whose
/// value changed, cleared non-fuel rows first, then fuel rows in fuel order,
/// so the caller persists only those.
pub fn recalculate_all(entries: &mut [LogEntry]) -> Vec<Uuid> {
    let mut changed = Vec::new();
    for entry in entries.iter_mut().filter(|e| !e.is_fuel()) {
        if entry.fuel_consumption.take().is_some() {
            changed.push(entry.id);
        }
    }

    let mut order: Vec<usize> = (0..entries.len())
        .filter(|&i| entries[i].is_fuel())
        .collect();
    order.sort_by_key(|&i| EntryOrderKey::of(&entries[i]));

    let points: Vec<FuelPoint> = order.iter().map(|&i| FuelPoint::of(&entries[i])).collect();

    for (pos, &idx) in order.iter().enumerate() {
        let value = window_consumption(&points, pos);
        let entry = &mut entries[idx];
        if entry.fuel_consumption != value {
            entry.fuel_consumption = value;
            changed.push(entry.id);
        }
    }
    changed
}

/// A fuel entry that is being edited and has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelDraft {
    /// Set when editing an existing entry; that entry is then ignored in
    /// the history and the draft takes its place.
    pub id: Option<Uuid>,
    pub date: DateTime<Utc>,
    pub odometer_km: Option<f64>,
    pub liters: Option<f64>,
    pub fill_kind: FillKind,
}

/// Preview the consumption `draft` would get if saved next to `existing`.
///
/// A new draft (no id) sorts after any stored entry with the same date and
/// odometer.
pub fn compute_draft(existing: &[LogEntry], draft: &FuelDraft) -> Option<f64> {
    let draft_id = draft.id.unwrap_or(Uuid::from_u128(u128::MAX));
    let draft_point = FuelPoint {
        key: EntryOrderKey {
            date: draft.date,
            odometer_km: draft.odometer_km,
            id: draft_id,
        },
        liters: draft.liters,
        full: draft.fill_kind == FillKind::Full,
    };

    let mut points: Vec<FuelPoint> = existing
        .iter()
        .filter(|e| e.is_fuel() && Some(e.id) != draft.id)
        .map(FuelPoint::of)
        .collect();
    points.push(draft_point);
    points.sort_by_key(|p| p.key);

    let pos = points.iter().position(|p| p.key == draft_point.key)?;
    window_consumption(&points, pos)
}
