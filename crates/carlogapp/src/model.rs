//! # Domain Model
//!
//! Plain records for everything the ledger stores. There is no implicit schema:
//! each record kind is mapped to its own table by [`crate::store::Record`], and
//! relationships are expressed as foreign-key ids (`vehicle_id`, `entry_id`)
//! that the store uses to enforce cascading deletes.
//!
//! ## Ownership Graph
//!
//! ```text
//! Vehicle ──┬── LogEntry ──── Attachment
//!           ├── MaintenanceInterval
//!           ├── ServiceBookEntry
//!           └── WheelSet  ◄── Vehicle.current_wheel_set_id (reference only)
//! ```
//!
//! ## Raw-Value Enumerations
//!
//! Several enums travel through backups as raw strings (`kindRaw`,
//! `fillKindRaw`, `repeatRaw`, `performedByRaw`). Parsing never fails: an
//! unknown or legacy raw value maps to the enum's documented fallback variant,
//! so documents written by newer builds still import.
//!
//! | Enum | Fallback |
//! |------|----------|
//! | [`EntryKind`] | `note` |
//! | [`FillKind`] | `full` |
//! | [`RepeatPolicy`] | `none` |
//! | [`PerformedBy`] | `shop` |
//!
//! ## Optionality
//!
//! Absent values are `None`, never empty strings. The backup codec relies on
//! this to write and read back exactly the fields that were present.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub name: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub generation: Option<String>,
    pub year: Option<i32>,
    pub engine: Option<String>,
    pub body_style: Option<String>,
    pub color: Option<String>,
    pub plate: Option<String>,
    pub vin: Option<String>,
    pub initial_odometer_km: Option<f64>,
    pub created_at: DateTime<Utc>,
    /// The wheel set the vehicle is believed to be running. A reference, not
    /// ownership: the wheel set row is owned through `WheelSet::vehicle_id`.
    pub current_wheel_set_id: Option<Uuid>,
}

impl Vehicle {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name, Utc::now())
    }

    pub fn with_id(id: Uuid, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            make: None,
            model: None,
            generation: None,
            year: None,
            engine: None,
            body_style: None,
            color: None,
            plate: None,
            vin: None,
            initial_odometer_km: None,
            created_at,
            current_wheel_set_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    Fuel,
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

impl EntryKind {
    pub const ALL: [EntryKind; 10] = [
        EntryKind::Fuel,
        EntryKind::Service,
        EntryKind::TireService,
        EntryKind::Purchase,
        EntryKind::Tolls,
        EntryKind::Fines,
        EntryKind::Carwash,
        EntryKind::Parking,
        EntryKind::Odometer,
        EntryKind::Note,
    ];

    pub fn as_raw(&self) -> &'static str {
        match self {
            EntryKind::Fuel => "fuel",
            EntryKind::Service => "service",
            EntryKind::TireService => "tireService",
            EntryKind::Purchase => "purchase",
            EntryKind::Tolls => "tolls",
            EntryKind::Fines => "fines",
            EntryKind::Carwash => "carwash",
            EntryKind::Parking => "parking",
            EntryKind::Odometer => "odometer",
            EntryKind::Note => "note",
        }
    }

    /// Unknown raw values become [`EntryKind::Note`].
    pub fn from_raw(raw: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_raw() == raw)
            .unwrap_or(EntryKind::Note)
    }

    /// Kinds whose entries carry the service payload.
    pub fn is_service(&self) -> bool {
        matches!(self, EntryKind::Service | EntryKind::TireService)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FillKind {
    /// Tank filled to capacity. Anchors consumption windows.
    #[default]
    Full,
    /// Top-up; its litres fold into the next full fill.
    Partial,
}

impl FillKind {
    pub fn as_raw(&self) -> &'static str {
        match self {
            FillKind::Full => "full",
            FillKind::Partial => "partial",
        }
    }

    /// Unknown raw values become [`FillKind::Full`]; entries written before
    /// partial fills existed were always full fills.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "partial" => FillKind::Partial,
            _ => FillKind::Full,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub title: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub kind: EntryKind,
    pub date: DateTime<Utc>,
    pub odometer_km: Option<f64>,
    pub total_cost: Option<f64>,
    pub notes: Option<String>,

    // Fuel
    pub liters: Option<f64>,
    pub price_per_liter: Option<f64>,
    pub fuel_station: Option<String>,
    pub fill_kind: Option<FillKind>,
    /// L/100km, derived by [`crate::fuel`]. Never set by hand.
    pub fuel_consumption: Option<f64>,

    // Service / tire service
    pub service_title: Option<String>,
    pub service_details: Option<String>,
    pub checklist: Vec<String>,
    pub maintenance_interval_ids: BTreeSet<Uuid>,
    pub wheel_set_id: Option<Uuid>,

    // Purchase
    pub purchase_category: Option<String>,
    pub purchase_vendor: Option<String>,
    pub purchase_items: Vec<PurchaseItem>,
}

impl LogEntry {
    pub fn new(vehicle_id: Uuid, kind: EntryKind, date: DateTime<Utc>) -> Self {
        Self::with_id(Uuid::new_v4(), vehicle_id, kind, date)
    }

    pub fn with_id(id: Uuid, vehicle_id: Uuid, kind: EntryKind, date: DateTime<Utc>) -> Self {
        Self {
            id,
            vehicle_id,
            kind,
            date,
            odometer_km: None,
            total_cost: None,
            notes: None,
            liters: None,
            price_per_liter: None,
            fuel_station: None,
            fill_kind: None,
            fuel_consumption: None,
            service_title: None,
            service_details: None,
            checklist: Vec::new(),
            maintenance_interval_ids: BTreeSet::new(),
            wheel_set_id: None,
            purchase_category: None,
            purchase_vendor: None,
            purchase_items: Vec::new(),
        }
    }

    /// Convenience constructor for a fuel fill-up.
    pub fn fuel(
        vehicle_id: Uuid,
        date: DateTime<Utc>,
        odometer_km: Option<f64>,
        liters: f64,
        fill_kind: FillKind,
    ) -> Self {
        let mut entry = Self::new(vehicle_id, EntryKind::Fuel, date);
        entry.odometer_km = odometer_km;
        entry.liters = Some(liters);
        entry.fill_kind = Some(fill_kind);
        entry
    }

    pub fn is_fuel(&self) -> bool {
        self.kind == EntryKind::Fuel
    }

    /// A fuel entry without a recorded fill kind counts as a full fill.
    pub fn is_full_fill(&self) -> bool {
        self.is_fuel() && self.fill_kind.unwrap_or_default() == FillKind::Full
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepeatPolicy {
    #[default]
    None,
    Daily,
    Weekly,
}

impl RepeatPolicy {
    pub fn as_raw(&self) -> &'static str {
        match self {
            RepeatPolicy::None => "none",
            RepeatPolicy::Daily => "daily",
            RepeatPolicy::Weekly => "weekly",
        }
    }

    /// Unknown raw values become [`RepeatPolicy::None`].
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "daily" => RepeatPolicy::Daily,
            "weekly" => RepeatPolicy::Weekly,
            _ => RepeatPolicy::None,
        }
    }
}

pub const DEFAULT_LEAD_DAYS: u32 = 14;

pub fn default_fire_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub date_enabled: bool,
    pub mileage_enabled: bool,
    pub lead_days: u32,
    /// `None` falls back to the configured default (500 km).
    pub lead_km: Option<f64>,
    /// Local time-of-day at which date-based reminders fire.
    pub fire_time: NaiveTime,
    pub repeat: RepeatPolicy,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            date_enabled: true,
            mileage_enabled: true,
            lead_days: DEFAULT_LEAD_DAYS,
            lead_km: None,
            fire_time: default_fire_time(),
            repeat: RepeatPolicy::None,
        }
    }
}

impl NotificationSettings {
    pub fn any_channel_enabled(&self) -> bool {
        self.date_enabled || self.mileage_enabled
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceInterval {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub title: String,
    pub template_key: Option<String>,
    pub interval_km: Option<f64>,
    pub interval_months: Option<u32>,
    pub last_done_date: Option<DateTime<Utc>>,
    pub last_done_odometer_km: Option<f64>,
    pub notifications: NotificationSettings,
    pub is_enabled: bool,
}

impl MaintenanceInterval {
    pub fn new(vehicle_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            title: title.into(),
            template_key: None,
            interval_km: None,
            interval_months: None,
            last_done_date: None,
            last_done_odometer_km: None,
            notifications: NotificationSettings::default(),
            is_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PerformedBy {
    Owner,
    #[default]
    Shop,
}

impl PerformedBy {
    pub fn as_raw(&self) -> &'static str {
        match self {
            PerformedBy::Owner => "owner",
            PerformedBy::Shop => "shop",
        }
    }

    /// Unknown raw values become [`PerformedBy::Shop`].
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "owner" => PerformedBy::Owner,
            _ => PerformedBy::Shop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceBookEntry {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub interval_id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub odometer_km: Option<f64>,
    pub performed_by: PerformedBy,
    pub service_name: Option<String>,
    pub oil_brand: Option<String>,
    pub oil_viscosity: Option<String>,
    pub oil_spec: Option<String>,
    pub notes: Option<String>,
}

/// Which of the owning entry's linked maintenance intervals an attachment
/// belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntervalScope {
    /// Every interval currently linked to the entry, including ones linked later.
    #[default]
    All,
    /// An explicit subset. Empty means the attachment applies to none.
    Only(BTreeSet<Uuid>),
}

impl IntervalScope {
    pub fn applies_to(&self, interval_id: &Uuid) -> bool {
        match self {
            IntervalScope::All => true,
            IntervalScope::Only(ids) => ids.contains(interval_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub original_file_name: String,
    /// Media-type tag, e.g. `public.jpeg` or `com.adobe.pdf`.
    pub uti: String,
    pub file_extension: Option<String>,
    /// Location understood by [`crate::store::files::AttachmentFiles`].
    /// Empty until the bytes have been materialized.
    pub storage_path: String,
    pub file_size_bytes: Option<u64>,
    pub scope: IntervalScope,
}

impl Attachment {
    pub fn new(
        entry_id: Uuid,
        original_file_name: impl Into<String>,
        uti: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entry_id,
            created_at: Utc::now(),
            original_file_name: original_file_name.into(),
            uti: uti.into(),
            file_extension: None,
            storage_path: String::new(),
            file_size_bytes: None,
            scope: IntervalScope::All,
        }
    }

    pub fn is_materialized(&self) -> bool {
        !self.storage_path.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelSet {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub name: String,
    pub tire_brand: Option<String>,
    pub tire_model: Option<String>,
    pub tire_size: Option<String>,
    pub tire_season: Option<String>,
    pub rim_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WheelSet {
    pub fn new(vehicle_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            name: name.into(),
            tire_brand: None,
            tire_model: None,
            tire_size: None,
            tire_season: None,
            rim_description: None,
            created_at: Utc::now(),
        }
    }
}
