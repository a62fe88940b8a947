//! # Dispatch
//!
//! Turns a parsed [`Cli`] into API calls and renders what comes back.
//! Selectors typed by the user (vehicle names, interval titles) are resolved
//! to ids here; the library only ever sees ids.

use super::outbox::FileOutbox;
use super::render;
use super::setup::{
    Cli, Commands, EntryCommands, IntervalCommands, KindArg, ReminderCommands, RepeatArg,
    VehicleCommands, WheelCommands,
};
use anyhow::{anyhow, bail, Context, Result};
use carlogapp::commands::intervals::ServiceDone;
use carlogapp::commands::{export::default_file_name, CmdResult};
use carlogapp::init::{initialize, CarlogContext};
use carlogapp::model::{
    EntryKind, FillKind, LogEntry, MaintenanceInterval, PerformedBy, RepeatPolicy, Vehicle,
    WheelSet,
};
use carlogapp::store::DataStore;
use chrono::{DateTime, FixedOffset, Local};
use clap::Parser;
use std::path::PathBuf;
use uuid::Uuid;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = initialize(cli.data_dir.clone()).context("failed to open the ledger")?;
    let now = cli.now.unwrap_or_else(|| Local::now().fixed_offset());
    let command = cli.command.unwrap_or(Commands::Status { vehicle: None });
    dispatch(ctx, command, now).await
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(
    mut ctx: CarlogContext,
    command: Commands,
    now: DateTime<FixedOffset>,
) -> Result<()> {
    let result = match command {
        Commands::Vehicles { action } => match action.unwrap_or(VehicleCommands::List) {
            VehicleCommands::List => ctx.api.list_vehicles()?,
            VehicleCommands::Add { name, odometer } => ctx.api.add_vehicle(&name, odometer)?,
            VehicleCommands::Delete { vehicle } => {
                let id = resolve_vehicle(&ctx, &vehicle)?;
                ctx.api.delete_vehicle(&id)?
            }
        },
        Commands::Fuel {
            vehicle,
            odometer,
            liters,
            price,
            partial,
            date,
            station,
        } => {
            let vehicle_id = resolve_vehicle(&ctx, &vehicle)?;
            let fill = if partial {
                FillKind::Partial
            } else {
                FillKind::Full
            };
            let date = date.unwrap_or_else(|| now.to_utc());
            let mut entry = LogEntry::fuel(vehicle_id, date, odometer, liters, fill);
            entry.price_per_liter = price;
            entry.total_cost = price.map(|p| p * liters);
            entry.fuel_station = station;
            let saved = entry.id;
            let result = ctx.api.save_entry(entry)?;
            if let Some(l100) = ctx
                .api
                .store()
                .get::<LogEntry>(&saved)
                .and_then(|e| e.fuel_consumption)
            {
                println!("{l100:.2} L/100km");
            }
            with_reminders(&mut ctx, Some(&vehicle_id), now, result).await?
        }
        Commands::Entries { action } => match action {
            EntryCommands::List { vehicle } => {
                let id = resolve_vehicle(&ctx, &vehicle)?;
                ctx.api.list_entries(&id)?
            }
            EntryCommands::Add {
                vehicle,
                kind,
                odometer,
                date,
                cost,
                title,
                notes,
                wheel_set,
                intervals,
            } => {
                let vehicle_id = resolve_vehicle(&ctx, &vehicle)?;
                let date = date.unwrap_or_else(|| now.to_utc());
                let mut entry = LogEntry::new(vehicle_id, entry_kind(kind), date);
                entry.odometer_km = odometer;
                entry.total_cost = cost;
                entry.service_title = title;
                entry.notes = notes;
                if let Some(selector) = wheel_set {
                    entry.wheel_set_id = Some(resolve_wheel_set(&ctx, &vehicle_id, &selector)?);
                }
                for selector in &intervals {
                    entry
                        .maintenance_interval_ids
                        .insert(resolve_interval(&ctx, Some(&vehicle_id), selector)?);
                }
                let result = ctx.api.save_entry(entry)?;
                with_reminders(&mut ctx, Some(&vehicle_id), now, result).await?
            }
            EntryCommands::Delete { id } => {
                let id = Uuid::parse_str(&id).with_context(|| format!("not an entry id: {id}"))?;
                ctx.api.delete_entry(&id)?
            }
        },
        Commands::Intervals { action } => match action {
            IntervalCommands::Add {
                vehicle,
                title,
                km,
                months,
                last_km,
                last_date,
                lead_days,
                lead_km,
                repeat,
            } => {
                let vehicle_id = resolve_vehicle(&ctx, &vehicle)?;
                let mut interval = ctx.api.new_interval(vehicle_id, &title);
                interval.interval_km = km;
                interval.interval_months = months;
                interval.last_done_odometer_km = last_km;
                interval.last_done_date = last_date;
                if let Some(days) = lead_days {
                    interval.notifications.lead_days = days;
                }
                if let Some(km) = lead_km {
                    interval.notifications.lead_km = Some(km);
                }
                interval.notifications.repeat = repeat_policy(repeat);
                let result = ctx.api.add_interval(interval)?;
                with_reminders(&mut ctx, Some(&vehicle_id), now, result).await?
            }
            IntervalCommands::Done {
                interval,
                odometer,
                date,
                owner,
                notes,
            } => {
                let interval_id = resolve_interval(&ctx, None, &interval)?;
                let done = ServiceDone {
                    date: date.unwrap_or_else(|| now.to_utc()),
                    odometer_km: odometer,
                    performed_by: if owner {
                        PerformedBy::Owner
                    } else {
                        PerformedBy::Shop
                    },
                    notes,
                };
                let result = ctx.api.record_service(&interval_id, done)?;
                let vehicle_id = ctx
                    .api
                    .store()
                    .get::<MaintenanceInterval>(&interval_id)
                    .map(|m| m.vehicle_id);
                with_reminders(&mut ctx, vehicle_id.as_ref(), now, result).await?
            }
        },
        Commands::Wheels { action } => match action {
            WheelCommands::List { vehicle } => {
                let id = resolve_vehicle(&ctx, &vehicle)?;
                ctx.api.list_wheel_sets(&id)?
            }
            WheelCommands::Add { vehicle, name } => {
                let id = resolve_vehicle(&ctx, &vehicle)?;
                ctx.api.add_wheel_set(&id, &name)?
            }
        },
        Commands::Status { vehicle } => {
            let id = vehicle.map(|v| resolve_vehicle(&ctx, &v)).transpose()?;
            ctx.api.status(id.as_ref(), &now)?
        }
        Commands::Reminders { action } => match action {
            ReminderCommands::Sync { vehicle } => {
                let id = vehicle.map(|v| resolve_vehicle(&ctx, &v)).transpose()?;
                let outbox = FileOutbox::open(&ctx.data_dir)?;
                let result = ctx
                    .api
                    .sync_reminders(&outbox, &mut ctx.cooldowns, id.as_ref(), now)
                    .await?;
                render::print_syncs(&result.syncs);
                render::print_alerts(&outbox.take_fresh());
                result
            }
            ReminderCommands::List => {
                let outbox = FileOutbox::open(&ctx.data_dir)?;
                render::print_outbox(&outbox.pending());
                CmdResult::default()
            }
        },
        Commands::Recalc => ctx.api.recalc()?,
        Commands::Export { out } => {
            let exported_at = now.to_utc();
            let out = out.unwrap_or_else(|| PathBuf::from(default_file_name(&exported_at)));
            ctx.api.export(&out, exported_at)?
        }
        Commands::Import { file, no_sync } => {
            let result = if no_sync {
                ctx.api.import(&file)?
            } else {
                let outbox = FileOutbox::open(&ctx.data_dir)?;
                let result = ctx
                    .api
                    .import_and_sync(&file, &outbox, &mut ctx.cooldowns, now)
                    .await?;
                render::print_alerts(&outbox.take_fresh());
                result
            };
            if let Some(summary) = &result.import_summary {
                render::print_import_summary(summary);
            }
            result
        }
    };

    print_result(&result);
    Ok(())
}

/// Re-arm reminders for the vehicle a write touched. Sync problems only warn:
/// the write itself already succeeded.
async fn with_reminders(
    ctx: &mut CarlogContext,
    vehicle_id: Option<&Uuid>,
    now: DateTime<FixedOffset>,
    mut result: CmdResult,
) -> Result<CmdResult> {
    let Some(vehicle_id) = vehicle_id else {
        return Ok(result);
    };
    let outbox = FileOutbox::open(&ctx.data_dir)?;
    match ctx
        .api
        .sync_reminders(&outbox, &mut ctx.cooldowns, Some(vehicle_id), now)
        .await
    {
        Ok(synced) => {
            render::print_alerts(&outbox.take_fresh());
            result.syncs = synced.syncs;
        }
        Err(e) => tracing::warn!(error = %e, "reminder sync failed"),
    }
    Ok(result)
}

fn print_result(result: &CmdResult) {
    render::print_vehicles(&result.vehicles);
    render::print_entries(&result.entries);
    render::print_wheel_sets(&result.wheel_sets);
    render::print_statuses(&result.statuses);
    if let Some(path) = &result.output_path {
        tracing::debug!(path = %path.display(), "output written");
    }
    render::print_messages(&result.messages);
}

fn entry_kind(kind: KindArg) -> EntryKind {
    match kind {
        KindArg::Service => EntryKind::Service,
        KindArg::TireService => EntryKind::TireService,
        KindArg::Purchase => EntryKind::Purchase,
        KindArg::Tolls => EntryKind::Tolls,
        KindArg::Fines => EntryKind::Fines,
        KindArg::Carwash => EntryKind::Carwash,
        KindArg::Parking => EntryKind::Parking,
        KindArg::Odometer => EntryKind::Odometer,
        KindArg::Note => EntryKind::Note,
    }
}

fn repeat_policy(repeat: RepeatArg) -> RepeatPolicy {
    match repeat {
        RepeatArg::None => RepeatPolicy::None,
        RepeatArg::Daily => RepeatPolicy::Daily,
        RepeatArg::Weekly => RepeatPolicy::Weekly,
    }
}

/// An id, or a case-insensitive name that matches exactly one candidate.
fn pick<T>(
    what: &str,
    selector: &str,
    candidates: Vec<T>,
    id: impl Fn(&T) -> Uuid,
    name: impl Fn(&T) -> &str,
) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(selector) {
        if candidates.iter().any(|c| id(c) == uuid) {
            return Ok(uuid);
        }
        bail!("no {what} with id {uuid}");
    }
    let matches: Vec<Uuid> = candidates
        .iter()
        .filter(|c| name(c).eq_ignore_ascii_case(selector))
        .map(&id)
        .collect();
    match matches.as_slice() {
        [one] => Ok(*one),
        [] => Err(anyhow!("no {what} named \"{selector}\"")),
        _ => Err(anyhow!("\"{selector}\" matches several {what}s; use the id")),
    }
}

fn resolve_vehicle(ctx: &CarlogContext, selector: &str) -> Result<Uuid> {
    let vehicles = ctx.api.store().fetch::<Vehicle>(|_| true);
    pick("vehicle", selector, vehicles, |v| v.id, |v| v.name.as_str())
}

fn resolve_wheel_set(ctx: &CarlogContext, vehicle_id: &Uuid, selector: &str) -> Result<Uuid> {
    let sets = ctx
        .api
        .store()
        .fetch::<WheelSet>(|w| w.vehicle_id == *vehicle_id);
    pick("wheel set", selector, sets, |w| w.id, |w| w.name.as_str())
}

fn resolve_interval(
    ctx: &CarlogContext,
    vehicle_id: Option<&Uuid>,
    selector: &str,
) -> Result<Uuid> {
    let intervals = ctx
        .api
        .store()
        .fetch::<MaintenanceInterval>(|m| vehicle_id.map_or(true, |v| m.vehicle_id == *v));
    pick(
        "interval",
        selector,
        intervals,
        |m| m.id,
        |m| m.title.as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        id: Uuid,
        name: &'static str,
    }

    fn named(name: &'static str) -> Named {
        Named {
            id: Uuid::new_v4(),
            name,
        }
    }

    fn pick_named(list: &[Named], selector: &str) -> Result<Uuid> {
        let candidates: Vec<&Named> = list.iter().collect();
        pick("vehicle", selector, candidates, |c| c.id, |c| c.name)
    }

    #[test]
    fn test_pick_by_name_and_id() {
        let list = vec![named("Hatch"), named("Van")];
        let hatch = list[0].id;
        assert_eq!(pick_named(&list, "hatch").unwrap(), hatch);
        assert_eq!(pick_named(&list, &hatch.to_string()).unwrap(), hatch);
    }

    #[test]
    fn test_pick_rejects_ambiguous_and_unknown() {
        let list = vec![named("Hatch"), named("Van"), named("van")];
        let err = pick_named(&list, "VAN").unwrap_err();
        assert!(err.to_string().contains("several"));
        assert!(pick_named(&list, "Truck").is_err());
        assert!(pick_named(&list, &Uuid::new_v4().to_string()).is_err());
    }
}
