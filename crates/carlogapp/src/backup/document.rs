//! Wire shape of a backup document.
//!
//! These DTOs mirror the JSON field for field. They are deliberately separate
//! from the model: the document carries raw enum strings, base64 payloads and
//! legacy fields that the model never holds.

use crate::error::{CarlogError, Result};
use chrono::{DateTime, NaiveTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use uuid::Uuid;

pub const CURRENT_FORMAT_VERSION: u32 = 7;
/// First version that carries wheel sets and the current wheel set pointer.
pub const WHEEL_SETS_SINCE: u32 = 5;
/// First version that carries structured purchase line items.
pub const PURCHASE_ITEMS_SINCE: u32 = 7;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn default_format_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_lead_days() -> u32 {
    crate::model::DEFAULT_LEAD_DAYS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub vehicles: Vec<VehicleDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDoc {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_odometer_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entries: Vec<EntryDoc>,
    #[serde(default)]
    pub maintenance_intervals: Vec<IntervalDoc>,
    #[serde(default)]
    pub service_book_entries: Vec<ServiceBookDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheel_sets: Option<Vec<WheelSetDoc>>,
    #[serde(
        rename = "currentWheelSetID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_wheel_set_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDoc {
    pub id: Uuid,
    pub kind_raw: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odometer_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liters: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_liter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_station: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_kind_raw: Option<String>,
    #[serde(
        rename = "fuelConsumptionLPer100Km",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub fuel_consumption: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_checklist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_interval_ids: Option<Vec<Uuid>>,
    /// Single-link field written by builds that predate multi-interval links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_interval_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheel_set_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_items: Option<Vec<PurchaseItemDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentDoc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItemDoc {
    pub title: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDoc {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub original_file_name: String,
    pub uti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_interval_ids: Option<Vec<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to_all_maintenance_intervals: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalDoc {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_months: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_done_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_done_odometer_km: Option<f64>,
    #[serde(default = "default_true")]
    pub date_notifications_enabled: bool,
    #[serde(default = "default_true")]
    pub mileage_notifications_enabled: bool,
    #[serde(default = "default_lead_days")]
    pub lead_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fire_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_raw: Option<String>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBookDoc {
    pub id: Uuid,
    pub interval_id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odometer_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed_by_raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oil_brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oil_viscosity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oil_spec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelSetDoc {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tire_brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tire_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tire_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tire_season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rim_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Pretty-printed JSON with a trailing newline.
pub fn encode(doc: &BackupDocument) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(doc)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn encode_gzip(doc: &BackupDocument) -> Result<Vec<u8>> {
    let json = encode(doc)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

/// Parse a document, plain or gzip-compressed. Nothing is touched on failure.
pub fn decode(bytes: &[u8]) -> Result<BackupDocument> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut json = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut json)
            .map_err(|e| CarlogError::Decode(format!("gzip: {e}")))?;
        return decode_json(&json);
    }
    decode_json(bytes)
}

fn decode_json(bytes: &[u8]) -> Result<BackupDocument> {
    serde_json::from_slice(bytes).map_err(|e| CarlogError::Decode(e.to_string()))
}
