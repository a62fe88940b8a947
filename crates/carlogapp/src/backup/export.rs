use super::document::{
    AttachmentDoc, BackupDocument, EntryDoc, IntervalDoc, PurchaseItemDoc, ServiceBookDoc,
    VehicleDoc, WheelSetDoc, CURRENT_FORMAT_VERSION,
};
use crate::model::{
    Attachment, IntervalScope, LogEntry, MaintenanceInterval, ServiceBookEntry, Vehicle, WheelSet,
};
use crate::ordering::compare_entries;
use crate::store::files::AttachmentFiles;
use crate::store::DataStore;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub document: BackupDocument,
    /// Attachments left out because their bytes could not be read.
    pub attachments_skipped: usize,
}

/// Snapshot the whole store as a backup document.
///
/// Ordering is fixed for every collection so that the same store state and
/// `exported_at` always encode to the same bytes.
pub fn export_document<S, F>(store: &S, files: &F, exported_at: DateTime<Utc>) -> ExportOutcome
where
    S: DataStore,
    F: AttachmentFiles + ?Sized,
{
    let mut skipped = 0;
    let vehicles = store.fetch_sorted::<Vehicle>(
        |_| true,
        |a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)),
    );

    let vehicles = vehicles
        .into_iter()
        .map(|vehicle| vehicle_doc(store, files, vehicle, &mut skipped))
        .collect();

    if skipped > 0 {
        tracing::warn!(skipped, "export left out unreadable attachments");
    }
    ExportOutcome {
        document: BackupDocument {
            format_version: CURRENT_FORMAT_VERSION,
            exported_at: Some(exported_at),
            vehicles,
        },
        attachments_skipped: skipped,
    }
}

fn vehicle_doc<S, F>(store: &S, files: &F, vehicle: Vehicle, skipped: &mut usize) -> VehicleDoc
where
    S: DataStore,
    F: AttachmentFiles + ?Sized,
{
    let id = vehicle.id;
    let entries = store
        .fetch_sorted::<LogEntry>(|e| e.vehicle_id == id, compare_entries)
        .into_iter()
        .map(|entry| {
            let attachments = store
                .fetch_sorted::<Attachment>(
                    |a| a.entry_id == entry.id,
                    |a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)),
                )
                .into_iter()
                .filter_map(|a| attachment_doc(files, a, skipped))
                .collect();
            entry_doc(entry, attachments)
        })
        .collect();

    let maintenance_intervals = store
        .fetch_sorted::<MaintenanceInterval>(
            |m| m.vehicle_id == id,
            |a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)),
        )
        .into_iter()
        .map(interval_doc)
        .collect();

    let service_book_entries = store
        .fetch_sorted::<ServiceBookEntry>(
            |s| s.vehicle_id == id,
            |a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)),
        )
        .into_iter()
        .map(service_book_doc)
        .collect();

    let wheel_sets = store
        .fetch_sorted::<WheelSet>(
            |w| w.vehicle_id == id,
            |a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)),
        )
        .into_iter()
        .map(wheel_set_doc)
        .collect();

    VehicleDoc {
        id,
        name: vehicle.name,
        make: vehicle.make,
        model: vehicle.model,
        generation: vehicle.generation,
        year: vehicle.year,
        engine: vehicle.engine,
        body_style: vehicle.body_style,
        color: vehicle.color,
        plate: vehicle.plate,
        vin: vehicle.vin,
        initial_odometer_km: vehicle.initial_odometer_km,
        created_at: Some(vehicle.created_at),
        entries,
        maintenance_intervals,
        service_book_entries,
        wheel_sets: Some(wheel_sets),
        current_wheel_set_id: vehicle.current_wheel_set_id,
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn entry_doc(entry: LogEntry, attachments: Vec<AttachmentDoc>) -> EntryDoc {
    EntryDoc {
        id: entry.id,
        kind_raw: entry.kind.as_raw().to_string(),
        date: entry.date,
        odometer_km: entry.odometer_km,
        total_cost: entry.total_cost,
        notes: entry.notes,
        liters: entry.liters,
        price_per_liter: entry.price_per_liter,
        fuel_station: entry.fuel_station,
        fill_kind_raw: entry.fill_kind.map(|k| k.as_raw().to_string()),
        fuel_consumption: entry.fuel_consumption,
        service_title: entry.service_title,
        service_details: entry.service_details,
        service_checklist: non_empty(entry.checklist),
        maintenance_interval_ids: non_empty(entry.maintenance_interval_ids.into_iter().collect()),
        maintenance_interval_id: None,
        wheel_set_id: entry.wheel_set_id,
        purchase_category: entry.purchase_category,
        purchase_vendor: entry.purchase_vendor,
        purchase_items: non_empty(
            entry
                .purchase_items
                .into_iter()
                .map(|item| PurchaseItemDoc {
                    title: item.title,
                    price: item.price,
                })
                .collect(),
        ),
        attachments: non_empty(attachments),
    }
}

/// `None` when the attachment has bytes on record that cannot be read.
fn attachment_doc<F>(
    files: &F,
    attachment: Attachment,
    skipped: &mut usize,
) -> Option<AttachmentDoc>
where
    F: AttachmentFiles + ?Sized,
{
    let data_base64 = if attachment.is_materialized() {
        match files.read_bytes(&attachment.storage_path) {
            Ok(Some(bytes)) => Some(STANDARD.encode(bytes)),
            Ok(None) => {
                tracing::warn!(
                    attachment = %attachment.id,
                    path = %attachment.storage_path,
                    "attachment bytes missing"
                );
                *skipped += 1;
                return None;
            }
            Err(e) => {
                tracing::warn!(attachment = %attachment.id, error = %e, "attachment unreadable");
                *skipped += 1;
                return None;
            }
        }
    } else {
        None
    };

    let (maintenance_interval_ids, applies_to_all) = match attachment.scope {
        IntervalScope::All => (None, true),
        IntervalScope::Only(ids) => (Some(ids.into_iter().collect()), false),
    };

    Some(AttachmentDoc {
        id: attachment.id,
        created_at: attachment.created_at,
        original_file_name: attachment.original_file_name,
        uti: attachment.uti,
        file_extension: attachment.file_extension,
        file_size_bytes: attachment.file_size_bytes,
        data_base64,
        maintenance_interval_ids,
        applies_to_all_maintenance_intervals: Some(applies_to_all),
    })
}

fn interval_doc(interval: MaintenanceInterval) -> IntervalDoc {
    let n = interval.notifications;
    IntervalDoc {
        id: interval.id,
        title: interval.title,
        template_key: interval.template_key,
        interval_km: interval.interval_km,
        interval_months: interval.interval_months,
        last_done_date: interval.last_done_date,
        last_done_odometer_km: interval.last_done_odometer_km,
        date_notifications_enabled: n.date_enabled,
        mileage_notifications_enabled: n.mileage_enabled,
        lead_days: n.lead_days,
        lead_km: n.lead_km,
        fire_time: Some(n.fire_time),
        repeat_raw: Some(n.repeat.as_raw().to_string()),
        is_enabled: interval.is_enabled,
    }
}

fn service_book_doc(entry: ServiceBookEntry) -> ServiceBookDoc {
    ServiceBookDoc {
        id: entry.id,
        interval_id: entry.interval_id,
        title: entry.title,
        date: entry.date,
        odometer_km: entry.odometer_km,
        performed_by_raw: Some(entry.performed_by.as_raw().to_string()),
        service_name: entry.service_name,
        oil_brand: entry.oil_brand,
        oil_viscosity: entry.oil_viscosity,
        oil_spec: entry.oil_spec,
        notes: entry.notes,
    }
}

fn wheel_set_doc(wheels: WheelSet) -> WheelSetDoc {
    WheelSetDoc {
        id: wheels.id,
        name: wheels.name,
        tire_brand: wheels.tire_brand,
        tire_model: wheels.tire_model,
        tire_size: wheels.tire_size,
        tire_season: wheels.tire_season,
        rim_description: wheels.rim_description,
        created_at: wheels.created_at,
    }
}
