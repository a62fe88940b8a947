use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "carlog", bin_name = "carlog", version, disable_help_subcommand = true)]
#[command(about = "Fuel, service and reminder ledger for your vehicles", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory (overrides config and CARLOG_DATA_DIR)
    #[arg(long, global = true, value_name = "DIR", help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help_heading = "Options")]
    pub verbose: u8,

    /// Evaluate as of this RFC 3339 moment instead of the current time
    #[arg(long, global = true, hide = true, value_parser = parse_moment)]
    pub now: Option<DateTime<FixedOffset>>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage vehicles
    #[command(alias = "v", display_order = 1)]
    Vehicles {
        #[command(subcommand)]
        action: Option<VehicleCommands>,
    },

    /// Log a fuel fill
    #[command(alias = "f", display_order = 2)]
    Fuel {
        /// Vehicle name or id
        vehicle: String,

        /// Odometer reading in km
        #[arg(short, long)]
        odometer: Option<f64>,

        /// Litres filled
        #[arg(short, long)]
        liters: f64,

        /// Price per litre
        #[arg(long)]
        price: Option<f64>,

        /// Top-up rather than a full tank
        #[arg(long)]
        partial: bool,

        /// Fill date (YYYY-MM-DD), default today
        #[arg(short, long, value_parser = parse_day)]
        date: Option<DateTime<Utc>>,

        #[arg(long)]
        station: Option<String>,
    },

    /// Log entries other than fuel, or list a vehicle's log
    #[command(alias = "e", display_order = 3)]
    Entries {
        #[command(subcommand)]
        action: EntryCommands,
    },

    /// Manage maintenance intervals
    #[command(alias = "i", display_order = 4)]
    Intervals {
        #[command(subcommand)]
        action: IntervalCommands,
    },

    /// List or add wheel sets
    #[command(alias = "w", display_order = 5)]
    Wheels {
        #[command(subcommand)]
        action: WheelCommands,
    },

    /// Show due status of maintenance intervals
    #[command(alias = "st", display_order = 6)]
    Status {
        /// Only this vehicle (name or id)
        #[arg(long)]
        vehicle: Option<String>,
    },

    /// Schedule or inspect maintenance reminders
    #[command(display_order = 7)]
    Reminders {
        #[command(subcommand)]
        action: ReminderCommands,
    },

    /// Recompute fuel consumption for every vehicle
    #[command(display_order = 10)]
    Recalc,

    /// Write a backup file (.gz for compressed)
    #[command(display_order = 11)]
    Export {
        /// Output file, default carlog-<timestamp>.json in the current directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Restore a backup file and re-sync reminders
    #[command(display_order = 12)]
    Import {
        file: PathBuf,

        /// Skip the reminder sync after importing
        #[arg(long)]
        no_sync: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum VehicleCommands {
    /// List vehicles
    #[command(alias = "ls")]
    List,

    /// Add a vehicle
    Add {
        name: String,

        /// Odometer reading when the vehicle was added
        #[arg(long)]
        odometer: Option<f64>,
    },

    /// Delete a vehicle and everything logged for it
    #[command(alias = "rm")]
    Delete {
        /// Vehicle name or id
        vehicle: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum WheelCommands {
    /// List a vehicle's wheel sets
    #[command(alias = "ls")]
    List {
        /// Vehicle name or id
        vehicle: String,
    },

    /// Add a wheel set
    Add {
        /// Vehicle name or id
        vehicle: String,

        name: String,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Service,
    TireService,
    Purchase,
    Tolls,
    Fines,
    Carwash,
    Parking,
    Odometer,
    Note,
}

#[derive(Subcommand, Debug)]
pub enum EntryCommands {
    /// List a vehicle's log, oldest first
    #[command(alias = "ls")]
    List {
        /// Vehicle name or id
        vehicle: String,
    },

    /// Log a non-fuel entry
    Add {
        /// Vehicle name or id
        vehicle: String,

        #[arg(value_enum)]
        kind: KindArg,

        #[arg(short, long)]
        odometer: Option<f64>,

        #[arg(short, long, value_parser = parse_day)]
        date: Option<DateTime<Utc>>,

        #[arg(long)]
        cost: Option<f64>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Wheel set fitted (tire service only), by name or id
        #[arg(long)]
        wheel_set: Option<String>,

        /// Maintenance intervals this service covers, by title or id
        #[arg(long = "interval")]
        intervals: Vec<String>,
    },

    /// Delete an entry by id
    #[command(alias = "rm")]
    Delete { id: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RepeatArg {
    None,
    Daily,
    Weekly,
}

#[derive(Subcommand, Debug)]
pub enum IntervalCommands {
    /// Add a maintenance interval
    Add {
        /// Vehicle name or id
        vehicle: String,

        title: String,

        /// Distance between services, km
        #[arg(long)]
        km: Option<f64>,

        /// Time between services, months
        #[arg(long)]
        months: Option<u32>,

        /// Odometer at the last service
        #[arg(long)]
        last_km: Option<f64>,

        /// Date of the last service (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        last_date: Option<DateTime<Utc>>,

        /// Days of warning before the due date
        #[arg(long)]
        lead_days: Option<u32>,

        /// Kilometres of warning before the due distance
        #[arg(long)]
        lead_km: Option<f64>,

        #[arg(long, value_enum, default_value = "none")]
        repeat: RepeatArg,
    },

    /// Record a service as done, resetting the interval
    Done {
        /// Interval title or id
        interval: String,

        #[arg(short, long)]
        odometer: Option<f64>,

        #[arg(short, long, value_parser = parse_day)]
        date: Option<DateTime<Utc>>,

        /// Done by the owner rather than a shop
        #[arg(long)]
        owner: bool,

        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReminderCommands {
    /// Re-arm notifications for one or all vehicles
    Sync {
        #[arg(long)]
        vehicle: Option<String>,
    },

    /// Show the notification outbox
    #[command(alias = "ls")]
    List,
}

/// `YYYY-MM-DD` as local noon.
pub fn parse_day(raw: &str) -> Result<DateTime<Utc>, String> {
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("{raw}: {e}"))?;
    let noon = day
        .and_hms_opt(12, 0, 0)
        .ok_or_else(|| format!("{raw}: invalid time"))?;
    Local
        .from_local_datetime(&noon)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| format!("{raw}: not a local time"))
}

pub fn parse_moment(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(raw).map_err(|e| format!("{raw}: {e}"))
}
