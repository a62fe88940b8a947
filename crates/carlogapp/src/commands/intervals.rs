use super::{committed, CmdMessage, CmdResult};
use crate::error::{CarlogError, Result};
use crate::model::{MaintenanceInterval, PerformedBy, ServiceBookEntry, Vehicle};
use crate::store::{DataStore, RecordKind};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub fn add<S: DataStore>(store: &mut S, interval: MaintenanceInterval) -> Result<CmdResult> {
    store
        .get::<Vehicle>(&interval.vehicle_id)
        .ok_or(CarlogError::NotFound(RecordKind::Vehicle, interval.vehicle_id))?;

    let title = interval.title.clone();
    committed(store, |s| s.insert(interval))?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Added interval \"{title}\".")));
    Ok(result)
}

/// A completed service, as entered by the user.
#[derive(Debug, Clone)]
pub struct ServiceDone {
    pub date: DateTime<Utc>,
    pub odometer_km: Option<f64>,
    pub performed_by: PerformedBy,
    pub notes: Option<String>,
}

/// Reset the interval's baseline to this service and log it in the service
/// book.
pub fn record_service<S: DataStore>(
    store: &mut S,
    interval_id: &Uuid,
    done: ServiceDone,
) -> Result<CmdResult> {
    let mut interval: MaintenanceInterval = store
        .get(interval_id)
        .ok_or(CarlogError::NotFound(RecordKind::MaintenanceInterval, *interval_id))?;

    interval.last_done_date = Some(done.date);
    if done.odometer_km.is_some() {
        interval.last_done_odometer_km = done.odometer_km;
    }
    let book = ServiceBookEntry {
        id: Uuid::new_v4(),
        vehicle_id: interval.vehicle_id,
        interval_id: interval.id,
        title: interval.title.clone(),
        date: done.date,
        odometer_km: done.odometer_km,
        performed_by: done.performed_by,
        service_name: None,
        oil_brand: None,
        oil_viscosity: None,
        oil_spec: None,
        notes: done.notes,
    };

    let title = interval.title.clone();
    committed(store, |s| {
        s.update(interval)?;
        s.insert(book)
    })?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Recorded \"{title}\" as done.")));
    Ok(result)
}
