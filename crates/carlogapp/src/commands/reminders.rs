use super::{CmdMessage, CmdResult, IntervalSync};
use crate::error::{CarlogError, Result};
use crate::model::{LogEntry, MaintenanceInterval, Vehicle};
use crate::reminders::{
    current_km, sync_interval, CooldownStore, NotificationCenter, ReminderContext,
};
use crate::store::{DataStore, RecordKind};
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

/// Sync every interval of one vehicle, in title order.
pub async fn sync_vehicle<S, N, C>(
    store: &S,
    center: &N,
    cooldowns: &mut C,
    vehicle_id: &Uuid,
    now: DateTime<FixedOffset>,
    default_lead_km: f64,
) -> Result<Vec<IntervalSync>>
where
    S: DataStore,
    N: NotificationCenter + ?Sized,
    C: CooldownStore + ?Sized,
{
    let vehicle: Vehicle = store
        .get(vehicle_id)
        .ok_or(CarlogError::NotFound(RecordKind::Vehicle, *vehicle_id))?;
    let entries = store.fetch::<LogEntry>(|e| e.vehicle_id == vehicle.id);
    let ctx = ReminderContext {
        now,
        current_km: current_km(&vehicle, &entries),
        default_lead_km,
    };

    let intervals = store.fetch_sorted::<MaintenanceInterval>(
        |m| m.vehicle_id == vehicle.id,
        |a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)),
    );
    let mut syncs = Vec::with_capacity(intervals.len());
    for interval in intervals {
        let report = sync_interval(center, cooldowns, &interval, &ctx).await;
        syncs.push(IntervalSync {
            vehicle_id: vehicle.id,
            interval_id: interval.id,
            title: interval.title,
            report,
        });
    }
    Ok(syncs)
}

/// Sync one vehicle, or every vehicle in creation order.
pub async fn run<S, N, C>(
    store: &S,
    center: &N,
    cooldowns: &mut C,
    vehicle_id: Option<&Uuid>,
    now: DateTime<FixedOffset>,
    default_lead_km: f64,
) -> Result<CmdResult>
where
    S: DataStore,
    N: NotificationCenter + ?Sized,
    C: CooldownStore + ?Sized,
{
    let vehicle_ids: Vec<Uuid> = match vehicle_id {
        Some(id) => vec![*id],
        None => store
            .fetch_sorted::<Vehicle>(
                |_| true,
                |a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)),
            )
            .into_iter()
            .map(|v| v.id)
            .collect(),
    };

    let mut syncs = Vec::new();
    for id in &vehicle_ids {
        let found = sync_vehicle(store, center, cooldowns, id, now, default_lead_km).await?;
        syncs.extend(found);
    }

    let mut result = CmdResult::default();
    let scheduled: usize = syncs.iter().map(|s| s.report.scheduled.len()).sum();
    let failures: usize = syncs.iter().map(|s| s.report.failures.len()).sum();
    result.add_message(CmdMessage::success(format!(
        "Synced {} interval(s), {} notification(s) scheduled.",
        syncs.len(),
        scheduled
    )));
    if failures > 0 {
        result.add_message(CmdMessage::warning(format!(
            "{failures} notification call(s) failed; see log."
        )));
    }
    Ok(result.with_syncs(syncs))
}
