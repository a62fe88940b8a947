use carlogapp::model::{MaintenanceInterval, RepeatPolicy};
use carlogapp::reminders::cooldown::COOLDOWN_FILE;
use carlogapp::reminders::{
    sync_interval, AuthorizationStatus, FireSpec, FsCooldowns, MemCooldowns, NotificationIds,
    RecordingCenter, ReminderContext, SkipReason,
};
use chrono::{DateTime, FixedOffset, TimeZone};
use uuid::Uuid;

fn at(month: u32, day: u32, hour: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(2 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, month, day, hour, 0, 0)
        .unwrap()
}

fn ctx(now: DateTime<FixedOffset>, current_km: Option<f64>) -> ReminderContext {
    ReminderContext {
        now,
        current_km,
        default_lead_km: 500.0,
    }
}

fn dated_interval() -> MaintenanceInterval {
    let mut interval = MaintenanceInterval::new(Uuid::new_v4(), "Inspection");
    interval.interval_months = Some(12);
    interval.last_done_date = Some(at(1, 15, 10).to_utc());
    interval.notifications.mileage_enabled = false;
    interval
}

fn mileage_interval(repeat: RepeatPolicy) -> MaintenanceInterval {
    let mut interval = MaintenanceInterval::new(Uuid::new_v4(), "Oil change");
    interval.interval_km = Some(10_000.0);
    interval.last_done_odometer_km = Some(5_000.0);
    interval.notifications.date_enabled = false;
    interval.notifications.repeat = repeat;
    interval
}

#[tokio::test]
async fn test_sync_twice_leaves_same_pending_set() {
    let center = RecordingCenter::new();
    let mut cooldowns = MemCooldowns::new();
    let interval = dated_interval();
    let ids = NotificationIds::for_interval(&interval.id);
    let now = ctx(at(6, 1, 12), None);

    let first = sync_interval(&center, &mut cooldowns, &interval, &now).await;
    let pending_after_first = center.pending_ids();
    let second = sync_interval(&center, &mut cooldowns, &interval, &now).await;

    assert_eq!(first, second);
    assert_eq!(center.pending_ids(), pending_after_first);
    assert_eq!(center.pending().len(), 2);

    let due = center.pending_request(&ids.due).unwrap();
    let due_at = at(1, 15, 9) + chrono::Duration::days(366);
    assert_eq!(due.fire, FireSpec::At { at: due_at });
    let warning = center.pending_request(&ids.warning).unwrap();
    let warn_at = at(1, 1, 9) + chrono::Duration::days(366);
    assert_eq!(warning.fire, FireSpec::At { at: warn_at });
}

#[tokio::test]
async fn test_mileage_cooldown_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(COOLDOWN_FILE);
    let center = RecordingCenter::new();
    let interval = mileage_interval(RepeatPolicy::Weekly);
    let ids = NotificationIds::for_interval(&interval.id);

    let mut cooldowns = FsCooldowns::open(path.clone()).unwrap();
    let first_day = ctx(at(3, 1, 8), Some(14_600.0));
    let report = sync_interval(&center, &mut cooldowns, &interval, &first_day).await;
    assert!(report.scheduled.contains(&ids.mileage_now));
    assert!(report.scheduled.contains(&ids.mileage_repeat));
    drop(cooldowns);

    let mut cooldowns = FsCooldowns::open(path.clone()).unwrap();
    let next_day = ctx(at(3, 2, 8), Some(14_700.0));
    let report = sync_interval(&center, &mut cooldowns, &interval, &next_day).await;
    assert_eq!(report.scheduled, vec![ids.mileage_repeat.clone()]);

    let mut cooldowns = FsCooldowns::open(path).unwrap();
    let next_week = ctx(at(3, 8, 8), Some(15_100.0));
    let report = sync_interval(&center, &mut cooldowns, &interval, &next_week).await;
    assert!(report.scheduled.contains(&ids.mileage_now));
    let alert = center.pending_request(&ids.mileage_now).unwrap();
    assert_eq!(alert.content.body, "Overdue by 100 km");
}

#[tokio::test]
async fn test_denied_authorization_schedules_nothing() {
    let center = RecordingCenter::with_status(AuthorizationStatus::NotDetermined);
    center.set_grant_on_request(false);
    let interval = mileage_interval(RepeatPolicy::Daily);

    let report = sync_interval(
        &center,
        &mut MemCooldowns::new(),
        &interval,
        &ctx(at(3, 1, 8), Some(14_900.0)),
    )
    .await;

    assert_eq!(report.skipped, Some(SkipReason::NotAuthorized));
    assert_eq!(report.cancelled.len(), 6);
    assert!(center.pending().is_empty());
    assert_eq!(center.status(), AuthorizationStatus::Denied);
}

#[tokio::test]
async fn test_overdue_by_date_repeats_daily() {
    let center = RecordingCenter::new();
    let mut interval = dated_interval();
    interval.notifications.repeat = RepeatPolicy::Daily;
    let ids = NotificationIds::for_interval(&interval.id);

    let mut stale = interval.clone();
    stale.last_done_date = Some(at(1, 15, 10).to_utc() - chrono::Duration::days(400));
    let now = ctx(at(1, 20, 12), None);
    let report = sync_interval(&center, &mut MemCooldowns::new(), &stale, &now).await;
    assert_eq!(report.scheduled, vec![ids.overdue.clone()]);
    assert!(matches!(
        center.pending_request(&ids.overdue).unwrap().fire,
        FireSpec::Daily { .. }
    ));
}
