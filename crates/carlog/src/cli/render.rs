use carlogapp::backup::ImportSummary;
use carlogapp::commands::{CmdMessage, IntervalSync, MessageLevel, StatusRow};
use carlogapp::model::{LogEntry, Vehicle, WheelSet};
use carlogapp::reminders::{DueStatus, FireSpec, NotificationRequest};
use chrono::{DateTime, Local, Utc};
use colored::{ColoredString, Colorize};
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const TIME_WIDTH: usize = 16;
const NAME_WIDTH: usize = 24;
const ALERT_MARKER: &str = "⚑";

pub(super) fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

pub(super) fn print_vehicles(vehicles: &[Vehicle]) {
    for vehicle in vehicles {
        let name = name_cell(&vehicle.name);
        let odometer = vehicle
            .initial_odometer_km
            .map(|km| format!("{km:>9.0} km"))
            .unwrap_or_else(|| " ".repeat(12));
        println!(
            "  {} {} {}  {}",
            name.bold(),
            odometer,
            vehicle.id.to_string().dimmed(),
            format_time_ago(vehicle.created_at).dimmed()
        );
    }
}

pub(super) fn print_wheel_sets(sets: &[WheelSet]) {
    for set in sets {
        let name = name_cell(&set.name);
        let tires = [
            &set.tire_brand,
            &set.tire_model,
            &set.tire_size,
            &set.tire_season,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .collect::<Vec<_>>()
        .join(" ");
        let id = set.id.to_string();
        println!("  {} {} {}", name.bold(), tires, id.dimmed());
    }
}

fn entry_detail(entry: &LogEntry) -> String {
    let mut parts = Vec::new();
    if let Some(liters) = entry.liters {
        parts.push(format!("{liters:.2} L"));
    }
    if let Some(l100) = entry.fuel_consumption {
        parts.push(format!("{l100:.2} L/100km"));
    }
    if let Some(title) = &entry.service_title {
        parts.push(title.clone());
    }
    if let Some(cost) = entry.total_cost {
        parts.push(format!("{cost:.2}"));
    }
    if let Some(notes) = &entry.notes {
        parts.push(notes.replace('\n', " "));
    }
    parts.join(" · ")
}

pub(super) fn format_entry_line(entry: &LogEntry) -> String {
    let date = entry.date.with_timezone(&Local).format("%Y-%m-%d");
    let kind = format!("{:<12}", entry.kind.as_raw());
    let odometer = entry
        .odometer_km
        .map(|km| format!("{km:>9.0} km"))
        .unwrap_or_else(|| " ".repeat(12));
    let fixed = 2 + 10 + 1 + 12 + 1 + 12 + 2;
    let detail = truncate_to_width(&entry_detail(entry), LINE_WIDTH.saturating_sub(fixed));
    format!("  {date} {kind} {odometer}  {detail}")
}

pub(super) fn print_entries(entries: &[LogEntry]) {
    for entry in entries {
        println!("{}", format_entry_line(entry));
    }
}

fn status_label(status: DueStatus) -> ColoredString {
    match status {
        DueStatus::Unknown => "unknown".dimmed(),
        DueStatus::Ok => "ok".green(),
        DueStatus::Warning => "due soon".yellow(),
        DueStatus::Overdue => "overdue".red().bold(),
    }
}

pub(super) fn format_remaining(row: &StatusRow) -> String {
    let mut parts = Vec::new();
    match row.status.km_until_due {
        Some(km) if km < 0.0 => parts.push(format!("{:.0} km over", -km)),
        Some(km) => parts.push(format!("{km:.0} km left")),
        None => {}
    }
    match (row.status.days_until_due, row.status.due_date) {
        (Some(days), Some(date)) if days < 0 => parts.push(format!("{} days late ({date})", -days)),
        (Some(days), Some(date)) => parts.push(format!("{days} days ({date})")),
        _ => {}
    }
    parts.join(", ")
}

pub(super) fn print_statuses(rows: &[StatusRow]) {
    let mut last_vehicle: Option<&str> = None;
    for row in rows {
        if last_vehicle != Some(row.vehicle_name.as_str()) {
            let odometer = row
                .current_km
                .map(|km| format!(" ({km:.0} km)"))
                .unwrap_or_default();
            println!("{}{}", row.vehicle_name.bold(), odometer.dimmed());
            last_vehicle = Some(row.vehicle_name.as_str());
        }
        let title = name_cell(&row.interval.title);
        let label = status_label(row.status.worst());
        let label_pad = " ".repeat(10usize.saturating_sub(label.chars().count()));
        println!("  {title} {label}{label_pad} {}", format_remaining(row));
    }
}

pub(super) fn print_syncs(syncs: &[IntervalSync]) {
    for sync in syncs {
        let outcome = match sync.report.skipped {
            Some(reason) => format!("skipped ({reason:?})").dimmed(),
            None if sync.report.scheduled.is_empty() => "nothing to schedule".dimmed(),
            None => format!("{} scheduled", sync.report.scheduled.len()).normal(),
        };
        println!("  {} {}", sync.title, outcome);
        for failure in &sync.report.failures {
            println!("    {}", failure.red());
        }
    }
}

pub(super) fn describe_fire(fire: &FireSpec) -> String {
    match fire {
        FireSpec::Immediate => "now".to_string(),
        FireSpec::At { at } => at.format("%Y-%m-%d %H:%M").to_string(),
        FireSpec::After { seconds } => format!("in {} days", seconds / 86_400),
        FireSpec::Daily { time } => format!("daily at {}", time.format("%H:%M")),
    }
}

pub(super) fn print_alerts(alerts: &[NotificationRequest]) {
    for alert in alerts {
        println!(
            "{} {}: {}",
            ALERT_MARKER.yellow(),
            alert.content.title.bold(),
            alert.content.body
        );
    }
}

pub(super) fn print_outbox(pending: &[NotificationRequest]) {
    if pending.is_empty() {
        println!("{}", "No reminders pending.".dimmed());
        return;
    }
    for request in pending {
        let when = format!("{:<18}", describe_fire(&request.fire));
        println!(
            "  {} {}: {}",
            when.cyan(),
            request.content.title.bold(),
            request.content.body
        );
    }
}

pub(super) fn print_import_summary(summary: &ImportSummary) {
    let rows = [
        ("vehicles", summary.vehicles_upserted),
        ("entries", summary.entries_upserted),
        ("intervals", summary.maintenance_intervals_upserted),
        ("service book", summary.service_book_entries_upserted),
        ("wheel sets", summary.wheel_sets_upserted),
        ("attachments", summary.attachments_upserted),
    ];
    for (label, count) in rows {
        println!("  {:<14}{:>6}", label.dimmed(), count);
    }
}

fn name_cell(name: &str) -> String {
    pad_to_width(&truncate_to_width(name, NAME_WIDTH), NAME_WIDTH)
}

fn pad_to_width(s: &str, width: usize) -> String {
    let padding = width.saturating_sub(s.width());
    format!("{s}{}", " ".repeat(padding))
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }
    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let formatter = Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
