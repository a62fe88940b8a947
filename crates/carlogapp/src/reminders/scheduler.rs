//! Idempotent reminder sync for one maintenance interval.
//!
//! Every sync starts by cancelling all six ids the interval owns and then
//! re-arms whatever still applies, so running it twice in a row leaves the
//! same pending set. Port failures never abort a sync; they are logged and
//! collected in [`SyncReport::failures`].

use super::cooldown::CooldownStore;
use super::notify::{
    mileage_cooldown_key, AuthorizationOptions, AuthorizationStatus, FireSpec, NotificationCenter,
    NotificationContent, NotificationIds, NotificationRequest,
};
use super::status::{due_date, next_due_km};
use crate::model::{MaintenanceInterval, RepeatPolicy};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

const WEEK_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Inputs the scheduler cannot derive from the interval itself.
#[derive(Debug, Clone, Copy)]
pub struct ReminderContext {
    /// Current moment, in the offset used for calendar arithmetic.
    pub now: DateTime<FixedOffset>,
    pub current_km: Option<f64>,
    pub default_lead_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    Disabled,
    NotAuthorized,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Ids whose cancellation was requested.
    pub cancelled: Vec<String>,
    pub scheduled: Vec<String>,
    pub skipped: Option<SkipReason>,
    pub failures: Vec<String>,
}

impl SyncReport {
    fn fail(&mut self, what: &str, err: impl std::fmt::Display) {
        tracing::warn!(error = %err, "{}", what);
        self.failures.push(format!("{what}: {err}"));
    }
}

fn fire_moment(
    date: NaiveDate,
    interval: &MaintenanceInterval,
    tz: FixedOffset,
) -> Option<DateTime<FixedOffset>> {
    date.and_time(interval.notifications.fire_time)
        .and_local_timezone(tz)
        .single()
}

fn repeat_spec(interval: &MaintenanceInterval) -> Option<FireSpec> {
    match interval.notifications.repeat {
        RepeatPolicy::None => None,
        RepeatPolicy::Daily => Some(FireSpec::Daily {
            time: interval.notifications.fire_time,
        }),
        RepeatPolicy::Weekly => Some(FireSpec::After {
            seconds: WEEK_SECONDS,
        }),
    }
}

fn content(interval: &MaintenanceInterval, body: String) -> NotificationContent {
    NotificationContent {
        title: interval.title.clone(),
        body,
        thread_id: format!("maintenance.{}", interval.id),
    }
}

fn cooldown_elapsed(
    last: Option<DateTime<Utc>>,
    now: &DateTime<FixedOffset>,
    repeat: RepeatPolicy,
) -> bool {
    let Some(last) = last else {
        return true;
    };
    match repeat {
        RepeatPolicy::Daily => last.with_timezone(&now.timezone()).date_naive() != now.date_naive(),
        RepeatPolicy::None | RepeatPolicy::Weekly => {
            now.with_timezone(&Utc) - last >= Duration::days(7)
        }
    }
}

/// Schedule one request, recording the outcome. Returns whether it took.
async fn schedule_one<N>(center: &N, report: &mut SyncReport, request: NotificationRequest) -> bool
where
    N: NotificationCenter + ?Sized,
{
    let id = request.id.clone();
    match center.schedule(request).await {
        Ok(()) => {
            report.scheduled.push(id);
            true
        }
        Err(e) => {
            report.fail(&format!("schedule {id}"), e);
            false
        }
    }
}

async fn ensure_authorized<N>(center: &N, report: &mut SyncReport) -> bool
where
    N: NotificationCenter + ?Sized,
{
    match center.authorization_status().await {
        status if status.allows_delivery() => true,
        AuthorizationStatus::NotDetermined => {
            match center
                .request_authorization(AuthorizationOptions::default())
                .await
            {
                Ok(granted) => granted,
                Err(e) => {
                    report.fail("request authorization", e);
                    false
                }
            }
        }
        _ => false,
    }
}

async fn sync_date_channel<N>(
    center: &N,
    report: &mut SyncReport,
    interval: &MaintenanceInterval,
    ids: &NotificationIds,
    ctx: &ReminderContext,
) where
    N: NotificationCenter + ?Sized,
{
    let tz = ctx.now.timezone();
    let Some(due) = due_date(interval, &tz) else {
        return;
    };
    let Some(due_at) = fire_moment(due, interval, tz) else {
        return;
    };

    if due_at > ctx.now {
        let request = NotificationRequest {
            id: ids.due.clone(),
            fire: FireSpec::At { at: due_at },
            content: content(interval, format!("Due today ({due})")),
        };
        schedule_one(center, report, request).await;

        let lead_days = interval.notifications.lead_days;
        if lead_days > 0 {
            let warn_at = due
                .checked_sub_signed(Duration::days(i64::from(lead_days)))
                .and_then(|d| fire_moment(d, interval, tz));
            if let Some(warn_at) = warn_at.filter(|at| *at > ctx.now) {
                let request = NotificationRequest {
                    id: ids.warning.clone(),
                    fire: FireSpec::At { at: warn_at },
                    content: content(interval, format!("Due in {lead_days} days ({due})")),
                };
                schedule_one(center, report, request).await;
            }
        }
    } else if let Some(fire) = repeat_spec(interval) {
        let request = NotificationRequest {
            id: ids.overdue.clone(),
            fire,
            content: content(interval, format!("Overdue since {due}")),
        };
        schedule_one(center, report, request).await;
    }
}

async fn sync_mileage_channel<N, C>(
    center: &N,
    cooldowns: &mut C,
    report: &mut SyncReport,
    interval: &MaintenanceInterval,
    ids: &NotificationIds,
    ctx: &ReminderContext,
) where
    N: NotificationCenter + ?Sized,
    C: CooldownStore + ?Sized,
{
    let (Some(due_km), Some(current_km)) = (next_due_km(interval), ctx.current_km) else {
        return;
    };
    let km_left = due_km - current_km;
    let lead_km = interval
        .notifications
        .lead_km
        .unwrap_or(ctx.default_lead_km);
    if km_left > lead_km {
        return;
    }

    let body = if km_left < 0.0 {
        format!("Overdue by {:.0} km", -km_left)
    } else {
        format!("Due in {km_left:.0} km")
    };

    let key = mileage_cooldown_key(&interval.id);
    let repeat = interval.notifications.repeat;
    if cooldown_elapsed(cooldowns.last_fired(&key), &ctx.now, repeat) {
        let request = NotificationRequest {
            id: ids.mileage_now.clone(),
            fire: FireSpec::Immediate,
            content: content(interval, body.clone()),
        };
        // A failed alert leaves the cooldown open for the next sync.
        if schedule_one(center, report, request).await {
            if let Err(e) = cooldowns.stamp(&key, ctx.now.with_timezone(&Utc)) {
                report.fail("stamp mileage cooldown", e);
            }
        }
    } else {
        tracing::debug!(interval = %interval.id, "mileage alert in cooldown");
    }

    if let Some(fire) = repeat_spec(interval) {
        let request = NotificationRequest {
            id: ids.mileage_repeat.clone(),
            fire,
            content: content(interval, body),
        };
        schedule_one(center, report, request).await;
    }
}

/// Bring the pending notifications of `interval` in line with its state.
pub async fn sync_interval<N, C>(
    center: &N,
    cooldowns: &mut C,
    interval: &MaintenanceInterval,
    ctx: &ReminderContext,
) -> SyncReport
where
    N: NotificationCenter + ?Sized,
    C: CooldownStore + ?Sized,
{
    let mut report = SyncReport::default();
    let ids = NotificationIds::for_interval(&interval.id);
    let all = ids.all();

    if let Err(e) = center.cancel_pending(&all).await {
        report.fail("cancel pending", e);
    }
    if let Err(e) = center.cancel_delivered(&all).await {
        report.fail("cancel delivered", e);
    }
    report.cancelled = all;

    if !interval.is_enabled || !interval.notifications.any_channel_enabled() {
        report.skipped = Some(SkipReason::Disabled);
        return report;
    }

    if !ensure_authorized(center, &mut report).await {
        tracing::info!(interval = %interval.id, "notifications not authorized");
        report.skipped = Some(SkipReason::NotAuthorized);
        return report;
    }

    if interval.notifications.date_enabled {
        sync_date_channel(center, &mut report, interval, &ids, ctx).await;
    }
    if interval.notifications.mileage_enabled {
        sync_mileage_channel(center, cooldowns, &mut report, interval, &ids, ctx).await;
    }

    tracing::debug!(
        interval = %interval.id,
        scheduled = report.scheduled.len(),
        failures = report.failures.len(),
        "synced reminders"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::cooldown::MemCooldowns;
    use crate::reminders::notify::RecordingCenter;
    use chrono::{NaiveTime, TimeZone};
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
    }

    fn ctx(now: DateTime<FixedOffset>, current_km: Option<f64>) -> ReminderContext {
        ReminderContext {
            now,
            current_km,
            default_lead_km: 500.0,
        }
    }

    fn dated_interval(repeat: RepeatPolicy) -> MaintenanceInterval {
        let mut interval = MaintenanceInterval::new(Uuid::new_v4(), "Inspection");
        interval.interval_months = Some(12);
        interval.last_done_date = Some(Utc.with_ymd_and_hms(2023, 6, 15, 10, 0, 0).unwrap());
        interval.notifications.mileage_enabled = false;
        interval.notifications.lead_days = 14;
        interval.notifications.repeat = repeat;
        interval
    }

    #[tokio::test]
    async fn test_future_due_date_schedules_due_and_warning() {
        let center = RecordingCenter::new();
        let mut cooldowns = MemCooldowns::new();
        let interval = dated_interval(RepeatPolicy::None);
        let ids = NotificationIds::for_interval(&interval.id);

        let report = sync_interval(
            &center,
            &mut cooldowns,
            &interval,
            &ctx(at(2024, 1, 1, 12), None),
        )
        .await;

        assert_eq!(report.scheduled, vec![ids.due.clone(), ids.warning.clone()]);
        assert_eq!(
            center.pending_request(&ids.due).unwrap().fire,
            FireSpec::At {
                at: at(2024, 6, 15, 9),
            }
        );
        assert_eq!(
            center.pending_request(&ids.warning).unwrap().fire,
            FireSpec::At {
                at: at(2024, 6, 1, 9),
            }
        );
    }

    #[tokio::test]
    async fn test_past_warning_is_not_scheduled() {
        let center = RecordingCenter::new();
        let interval = dated_interval(RepeatPolicy::None);
        let ids = NotificationIds::for_interval(&interval.id);

        let report = sync_interval(
            &center,
            &mut MemCooldowns::new(),
            &interval,
            &ctx(at(2024, 6, 10, 12), None),
        )
        .await;
        assert_eq!(report.scheduled, vec![ids.due]);
    }

    #[tokio::test]
    async fn test_overdue_repeat_patterns() {
        let now = at(2024, 7, 1, 12);

        let center = RecordingCenter::new();
        let daily = dated_interval(RepeatPolicy::Daily);
        sync_interval(&center, &mut MemCooldowns::new(), &daily, &ctx(now, None)).await;
        let overdue = NotificationIds::for_interval(&daily.id).overdue;
        assert_eq!(
            center.pending_request(&overdue).unwrap().fire,
            FireSpec::Daily {
                time: NaiveTime::from_hms_opt(9, 0, 0).unwrap()
            }
        );

        let center = RecordingCenter::new();
        let weekly = dated_interval(RepeatPolicy::Weekly);
        sync_interval(&center, &mut MemCooldowns::new(), &weekly, &ctx(now, None)).await;
        let overdue = NotificationIds::for_interval(&weekly.id).overdue;
        assert_eq!(
            center.pending_request(&overdue).unwrap().fire,
            FireSpec::After {
                seconds: WEEK_SECONDS
            }
        );

        let center = RecordingCenter::new();
        let none = dated_interval(RepeatPolicy::None);
        let report = sync_interval(&center, &mut MemCooldowns::new(), &none, &ctx(now, None)).await;
        assert!(report.scheduled.is_empty());
    }

    #[tokio::test]
    async fn test_mileage_warning_fires_now() {
        // Due at 15 000 km; 400 km left at 14 600 is inside the 500 km lead.
        let center = RecordingCenter::new();
        let mut interval = MaintenanceInterval::new(Uuid::new_v4(), "Oil change");
        interval.interval_km = Some(10_000.0);
        interval.last_done_odometer_km = Some(5_000.0);
        interval.notifications.date_enabled = false;
        interval.notifications.lead_km = Some(500.0);
        let ids = NotificationIds::for_interval(&interval.id);

        let report = sync_interval(
            &center,
            &mut MemCooldowns::new(),
            &interval,
            &ctx(at(2024, 1, 1, 12), Some(14_600.0)),
        )
        .await;

        assert_eq!(report.scheduled, vec![ids.mileage_now.clone()]);
        let request = center.pending_request(&ids.mileage_now).unwrap();
        assert_eq!(request.fire, FireSpec::Immediate);
        assert_eq!(request.content.body, "Due in 400 km");
    }

    #[tokio::test]
    async fn test_mileage_outside_lead_schedules_nothing() {
        let center = RecordingCenter::new();
        let mut interval = MaintenanceInterval::new(Uuid::new_v4(), "Oil change");
        interval.interval_km = Some(10_000.0);
        interval.last_done_odometer_km = Some(5_000.0);

        let report = sync_interval(
            &center,
            &mut MemCooldowns::new(),
            &interval,
            &ctx(at(2024, 1, 1, 12), Some(9_600.0)),
        )
        .await;
        assert!(report.scheduled.is_empty());
        assert!(report.skipped.is_none());
    }

    #[tokio::test]
    async fn test_disabled_interval_only_cancels() {
        let center = RecordingCenter::new();
        let mut interval = dated_interval(RepeatPolicy::Daily);
        let ids = NotificationIds::for_interval(&interval.id);
        let mut cooldowns = MemCooldowns::new();
        let now = ctx(at(2024, 1, 1, 12), None);

        sync_interval(&center, &mut cooldowns, &interval, &now).await;
        assert!(!center.pending().is_empty());

        interval.is_enabled = false;
        let report = sync_interval(&center, &mut cooldowns, &interval, &now).await;

        assert_eq!(report.skipped, Some(SkipReason::Disabled));
        assert_eq!(report.cancelled, ids.all());
        assert!(center.pending().is_empty());
        assert!(center.cancelled_delivered().contains(&ids.legacy_warning));
    }

    #[tokio::test]
    async fn test_denied_authorization_stops_after_cancel() {
        let center = RecordingCenter::with_status(AuthorizationStatus::NotDetermined);
        center.set_grant_on_request(false);
        let interval = dated_interval(RepeatPolicy::None);

        let report = sync_interval(
            &center,
            &mut MemCooldowns::new(),
            &interval,
            &ctx(at(2024, 1, 1, 12), None),
        )
        .await;

        assert_eq!(report.skipped, Some(SkipReason::NotAuthorized));
        assert!(report.scheduled.is_empty());
    }

    #[tokio::test]
    async fn test_schedule_failure_is_reported_not_raised() {
        let center = RecordingCenter::new();
        center.set_fail_schedule(true);
        let interval = dated_interval(RepeatPolicy::None);

        let report = sync_interval(
            &center,
            &mut MemCooldowns::new(),
            &interval,
            &ctx(at(2024, 1, 1, 12), None),
        )
        .await;

        assert!(report.scheduled.is_empty());
        assert_eq!(report.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_mileage_alert_does_not_start_cooldown() {
        let center = RecordingCenter::new();
        let mut interval = MaintenanceInterval::new(Uuid::new_v4(), "Oil change");
        interval.interval_km = Some(10_000.0);
        interval.last_done_odometer_km = Some(5_000.0);
        interval.notifications.date_enabled = false;
        interval.notifications.repeat = RepeatPolicy::Weekly;
        let ids = NotificationIds::for_interval(&interval.id);
        let key = mileage_cooldown_key(&interval.id);
        let mut cooldowns = MemCooldowns::new();
        let now = ctx(at(2024, 1, 1, 12), Some(14_600.0));

        center.set_fail_schedule(true);
        let report = sync_interval(&center, &mut cooldowns, &interval, &now).await;
        assert!(!report.failures.is_empty());
        assert_eq!(cooldowns.last_fired(&key), None);

        // Same day, schedule works again: the alert is not suppressed.
        center.set_fail_schedule(false);
        let report = sync_interval(&center, &mut cooldowns, &interval, &now).await;
        assert!(report.scheduled.contains(&ids.mileage_now));
        assert!(cooldowns.last_fired(&key).is_some());
    }

    #[test]
    fn test_cooldown_rules() {
        let now = at(2024, 3, 10, 8);
        let earlier_today = Utc.with_ymd_and_hms(2024, 3, 9, 23, 0, 0).unwrap(); // 01:00 local
        let yesterday = Utc.with_ymd_and_hms(2024, 3, 9, 20, 0, 0).unwrap(); // 22:00 local

        assert!(cooldown_elapsed(None, &now, RepeatPolicy::Weekly));
        assert!(!cooldown_elapsed(Some(earlier_today), &now, RepeatPolicy::Daily));
        assert!(cooldown_elapsed(Some(yesterday), &now, RepeatPolicy::Daily));

        let six_days = now.with_timezone(&Utc) - Duration::days(6);
        let seven_days = now.with_timezone(&Utc) - Duration::days(7);
        assert!(!cooldown_elapsed(Some(six_days), &now, RepeatPolicy::Weekly));
        assert!(cooldown_elapsed(Some(seven_days), &now, RepeatPolicy::None));
    }
}
