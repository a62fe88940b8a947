use super::document::{
    AttachmentDoc, BackupDocument, EntryDoc, IntervalDoc, ServiceBookDoc, VehicleDoc,
    WheelSetDoc, PURCHASE_ITEMS_SINCE, WHEEL_SETS_SINCE,
};
use crate::error::Result;
use crate::model::{
    default_fire_time, Attachment, EntryKind, FillKind, IntervalScope, LogEntry,
    MaintenanceInterval, NotificationSettings, PerformedBy, PurchaseItem, RepeatPolicy,
    ServiceBookEntry, Vehicle, WheelSet,
};
use crate::store::files::AttachmentFiles;
use crate::store::{DataStore, Record};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub vehicles_upserted: usize,
    pub entries_upserted: usize,
    pub maintenance_intervals_upserted: usize,
    pub service_book_entries_upserted: usize,
    pub wheel_sets_upserted: usize,
    pub attachments_upserted: usize,
    /// Attachment payloads that could not be restored. The metadata row is
    /// still imported, with an empty storage path.
    pub attachments_skipped: usize,
}

/// Reconcile a decoded document into the store and commit once.
///
/// Any failure rolls the store back to its last committed state, so either
/// the whole document lands or none of it does. Attachment bytes already
/// written by a failed import are not removed.
pub fn import_document<S, F>(
    doc: &BackupDocument,
    store: &mut S,
    files: &F,
) -> Result<ImportSummary>
where
    S: DataStore,
    F: AttachmentFiles + ?Sized,
{
    let result = apply(doc, store, files).and_then(|summary| {
        store.commit()?;
        Ok(summary)
    });

    match result {
        Ok(summary) => {
            tracing::info!(
                vehicles = summary.vehicles_upserted,
                entries = summary.entries_upserted,
                intervals = summary.maintenance_intervals_upserted,
                service_book = summary.service_book_entries_upserted,
                "import committed"
            );
            Ok(summary)
        }
        Err(e) => {
            if let Err(rollback) = store.rollback() {
                tracing::error!(error = %rollback, "rollback after failed import failed");
            }
            Err(e)
        }
    }
}

/// Children paired with the vehicle that lists them, first occurrence of
/// each id only.
fn unique_children<'a, T>(
    vehicles: &[&'a VehicleDoc],
    children: impl Fn(&'a VehicleDoc) -> &'a [T],
    id: impl Fn(&T) -> Uuid,
) -> Vec<(&'a VehicleDoc, &'a T)> {
    let mut seen = HashSet::new();
    vehicles
        .iter()
        .copied()
        .flat_map(|v| children(v).iter().map(move |c| (v, c)))
        .filter(|(_, c)| seen.insert(id(c)))
        .collect()
}

fn upsert<S, R>(store: &mut S, id: Uuid, build: impl FnOnce(Option<R>) -> R) -> Result<()>
where
    S: DataStore,
    R: Record,
{
    match store.get::<R>(&id) {
        Some(existing) => store.update(build(Some(existing))),
        None => store.insert(build(None)),
    }
}

fn apply<S, F>(doc: &BackupDocument, store: &mut S, files: &F) -> Result<ImportSummary>
where
    S: DataStore,
    F: AttachmentFiles + ?Sized,
{
    let mut summary = ImportSummary::default();
    let version = doc.format_version;
    let fallback_created = doc.exported_at.unwrap_or_else(Utc::now);

    let mut seen = HashSet::new();
    let vehicles: Vec<&VehicleDoc> = doc.vehicles.iter().filter(|v| seen.insert(v.id)).collect();

    for v in &vehicles {
        upsert(store, v.id, |existing: Option<Vehicle>| {
            apply_vehicle(v, existing, version, fallback_created)
        })?;
        summary.vehicles_upserted += 1;
    }

    if version >= WHEEL_SETS_SINCE {
        let wheel_sets = unique_children(
            &vehicles,
            |v| v.wheel_sets.as_deref().unwrap_or_default(),
            |w: &WheelSetDoc| w.id,
        );
        for (v, w) in wheel_sets {
            upsert(store, w.id, |_: Option<WheelSet>| wheel_set_from(v.id, w))?;
            summary.wheel_sets_upserted += 1;
        }
    }

    let entries = unique_children(&vehicles, |v| v.entries.as_slice(), |e: &EntryDoc| e.id);
    let mut seen_attachments = HashSet::new();
    for (v, e) in entries {
        upsert(store, e.id, |existing: Option<LogEntry>| {
            apply_entry(v.id, e, existing, version)
        })?;
        summary.entries_upserted += 1;

        for a in e.attachments.as_deref().unwrap_or_default() {
            if !seen_attachments.insert(a.id) {
                continue;
            }
            let existing = store.get::<Attachment>(&a.id);
            let mut row = attachment_from(e.id, a, existing.as_ref());
            if !row.is_materialized() {
                if let Some(bytes) = a.data_base64.as_deref().and_then(decode_payload) {
                    match files.write_bytes(&bytes, row.file_extension.as_deref()) {
                        Ok(path) => row.storage_path = path,
                        Err(err) => {
                            tracing::warn!(
                                attachment = %a.id,
                                error = %err,
                                "attachment bytes not restored"
                            );
                            summary.attachments_skipped += 1;
                        }
                    }
                }
            }
            match existing {
                Some(_) => store.update(row)?,
                None => store.insert(row)?,
            }
            summary.attachments_upserted += 1;
        }
    }

    let intervals = unique_children(
        &vehicles,
        |v| v.maintenance_intervals.as_slice(),
        |m: &IntervalDoc| m.id,
    );
    for (v, m) in intervals {
        upsert(store, m.id, |_: Option<MaintenanceInterval>| interval_from(v.id, m))?;
        summary.maintenance_intervals_upserted += 1;
    }

    let service_book = unique_children(
        &vehicles,
        |v| v.service_book_entries.as_slice(),
        |s: &ServiceBookDoc| s.id,
    );
    for (v, s) in service_book {
        upsert(store, s.id, |_: Option<ServiceBookEntry>| service_book_from(v.id, s))?;
        summary.service_book_entries_upserted += 1;
    }

    Ok(summary)
}

/// Bad base64 counts as no payload.
fn decode_payload(data: &str) -> Option<Vec<u8>> {
    match STANDARD.decode(data) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed attachment payload");
            None
        }
    }
}

fn apply_vehicle(
    doc: &VehicleDoc,
    existing: Option<Vehicle>,
    version: u32,
    fallback_created: DateTime<Utc>,
) -> Vehicle {
    let created_at = doc
        .created_at
        .or(existing.as_ref().map(|v| v.created_at))
        .unwrap_or(fallback_created);
    let current_wheel_set_id = if version >= WHEEL_SETS_SINCE {
        doc.current_wheel_set_id
    } else {
        existing.and_then(|v| v.current_wheel_set_id)
    };

    Vehicle {
        id: doc.id,
        name: doc.name.clone(),
        make: doc.make.clone(),
        model: doc.model.clone(),
        generation: doc.generation.clone(),
        year: doc.year,
        engine: doc.engine.clone(),
        body_style: doc.body_style.clone(),
        color: doc.color.clone(),
        plate: doc.plate.clone(),
        vin: doc.vin.clone(),
        initial_odometer_km: doc.initial_odometer_km,
        created_at,
        current_wheel_set_id,
    }
}

fn wheel_set_from(vehicle_id: Uuid, doc: &WheelSetDoc) -> WheelSet {
    WheelSet {
        id: doc.id,
        vehicle_id,
        name: doc.name.clone(),
        tire_brand: doc.tire_brand.clone(),
        tire_model: doc.tire_model.clone(),
        tire_size: doc.tire_size.clone(),
        tire_season: doc.tire_season.clone(),
        rim_description: doc.rim_description.clone(),
        created_at: doc.created_at,
    }
}

fn linked_interval_ids(doc: &EntryDoc) -> BTreeSet<Uuid> {
    match (&doc.maintenance_interval_ids, doc.maintenance_interval_id) {
        (Some(ids), _) => ids.iter().copied().collect(),
        (None, Some(legacy)) => BTreeSet::from([legacy]),
        (None, None) => BTreeSet::new(),
    }
}

fn apply_entry(
    vehicle_id: Uuid,
    doc: &EntryDoc,
    existing: Option<LogEntry>,
    version: u32,
) -> LogEntry {
    let wheel_set_id = if version >= WHEEL_SETS_SINCE {
        doc.wheel_set_id
    } else {
        existing.as_ref().and_then(|e| e.wheel_set_id)
    };
    let purchase_items = if version >= PURCHASE_ITEMS_SINCE {
        doc.purchase_items
            .iter()
            .flatten()
            .map(|item| PurchaseItem {
                title: item.title.clone(),
                price: item.price,
            })
            .collect()
    } else {
        existing.map(|e| e.purchase_items).unwrap_or_default()
    };

    LogEntry {
        id: doc.id,
        vehicle_id,
        kind: EntryKind::from_raw(&doc.kind_raw),
        date: doc.date,
        odometer_km: doc.odometer_km,
        total_cost: doc.total_cost,
        notes: doc.notes.clone(),
        liters: doc.liters,
        price_per_liter: doc.price_per_liter,
        fuel_station: doc.fuel_station.clone(),
        fill_kind: doc.fill_kind_raw.as_deref().map(FillKind::from_raw),
        fuel_consumption: doc.fuel_consumption,
        service_title: doc.service_title.clone(),
        service_details: doc.service_details.clone(),
        checklist: doc.service_checklist.clone().unwrap_or_default(),
        maintenance_interval_ids: linked_interval_ids(doc),
        wheel_set_id,
        purchase_category: doc.purchase_category.clone(),
        purchase_vendor: doc.purchase_vendor.clone(),
        purchase_items,
    }
}

fn scope_from(doc: &AttachmentDoc) -> IntervalScope {
    let ids = || -> BTreeSet<Uuid> {
        doc.maintenance_interval_ids
            .iter()
            .flatten()
            .copied()
            .collect()
    };
    match doc.applies_to_all_maintenance_intervals {
        Some(true) => IntervalScope::All,
        Some(false) => IntervalScope::Only(ids()),
        None => {
            let ids = ids();
            if ids.is_empty() {
                IntervalScope::All
            } else {
                IntervalScope::Only(ids)
            }
        }
    }
}

/// Full replace of the metadata; the storage path survives from the
/// existing row so materialized bytes are never overwritten.
fn attachment_from(
    entry_id: Uuid,
    doc: &AttachmentDoc,
    existing: Option<&Attachment>,
) -> Attachment {
    Attachment {
        id: doc.id,
        entry_id,
        created_at: doc.created_at,
        original_file_name: doc.original_file_name.clone(),
        uti: doc.uti.clone(),
        file_extension: doc.file_extension.clone(),
        storage_path: existing.map(|a| a.storage_path.clone()).unwrap_or_default(),
        file_size_bytes: doc.file_size_bytes,
        scope: scope_from(doc),
    }
}

fn interval_from(vehicle_id: Uuid, doc: &IntervalDoc) -> MaintenanceInterval {
    MaintenanceInterval {
        id: doc.id,
        vehicle_id,
        title: doc.title.clone(),
        template_key: doc.template_key.clone(),
        interval_km: doc.interval_km,
        interval_months: doc.interval_months,
        last_done_date: doc.last_done_date,
        last_done_odometer_km: doc.last_done_odometer_km,
        notifications: NotificationSettings {
            date_enabled: doc.date_notifications_enabled,
            mileage_enabled: doc.mileage_notifications_enabled,
            lead_days: doc.lead_days,
            lead_km: doc.lead_km,
            fire_time: doc.fire_time.unwrap_or_else(default_fire_time),
            repeat: doc
                .repeat_raw
                .as_deref()
                .map(RepeatPolicy::from_raw)
                .unwrap_or_default(),
        },
        is_enabled: doc.is_enabled,
    }
}

fn service_book_from(vehicle_id: Uuid, doc: &ServiceBookDoc) -> ServiceBookEntry {
    ServiceBookEntry {
        id: doc.id,
        vehicle_id,
        interval_id: doc.interval_id,
        title: doc.title.clone(),
        date: doc.date,
        odometer_km: doc.odometer_km,
        performed_by: doc
            .performed_by_raw
            .as_deref()
            .map(PerformedBy::from_raw)
            .unwrap_or_default(),
        service_name: doc.service_name.clone(),
        oil_brand: doc.oil_brand.clone(),
        oil_viscosity: doc.oil_viscosity.clone(),
        oil_spec: doc.oil_spec.clone(),
        notes: doc.notes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::document::decode;
    use crate::error::CarlogError;
    use crate::store::files::MemFiles;
    use crate::store::mem_backend::MemBackend;
    use crate::store::MemoryStore;

    const VEHICLE: &str = "11111111-1111-4111-8111-111111111111";
    const ENTRY: &str = "22222222-2222-4222-8222-222222222222";
    const INTERVAL: &str = "33333333-3333-4333-8333-333333333333";
    const ATTACHMENT: &str = "44444444-4444-4444-8444-444444444444";
    const WHEELS: &str = "55555555-5555-4555-8555-555555555555";

    fn uuid(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::open(MemBackend::new()).unwrap()
    }

    fn doc(version: u32, entry_extra: &str, vehicle_extra: &str) -> BackupDocument {
        let json = format!(
            r#"{{
                "formatVersion": {version},
                "vehicles": [{{
                    "id": "{VEHICLE}",
                    "name": "Hatch",
                    "createdAt": "2024-01-01T00:00:00Z",
                    "entries": [{{
                        "id": "{ENTRY}",
                        "kindRaw": "tireService",
                        "date": "2024-02-01T10:00:00Z"
                        {entry_extra}
                    }}]
                    {vehicle_extra}
                }}]
            }}"#
        );
        decode(json.as_bytes()).unwrap()
    }

    fn import(document: &BackupDocument, store: &mut MemoryStore) -> ImportSummary {
        import_document(document, store, &MemFiles::new()).unwrap()
    }

    #[test]
    fn test_legacy_single_interval_id() {
        let mut store = store();
        let extra = format!(r#", "maintenanceIntervalId": "{INTERVAL}""#);
        import(&doc(3, &extra, ""), &mut store);

        let entry: LogEntry = store.get(&uuid(ENTRY)).unwrap();
        assert_eq!(
            entry.maintenance_interval_ids,
            BTreeSet::from([uuid(INTERVAL)])
        );
    }

    #[test]
    fn test_wheel_fields_gated_by_version() {
        let wheels = format!(
            r#", "wheelSets": [{{"id": "{WHEELS}", "name": "Winter",
                                "createdAt": "2024-01-02T00:00:00Z"}}],
                "currentWheelSetID": "{WHEELS}""#
        );
        let link = format!(r#", "wheelSetId": "{WHEELS}""#);

        let mut old = store();
        import(&doc(4, &link, &wheels), &mut old);
        let vehicle: Vehicle = old.get(&uuid(VEHICLE)).unwrap();
        let entry: LogEntry = old.get(&uuid(ENTRY)).unwrap();
        assert_eq!(vehicle.current_wheel_set_id, None);
        assert_eq!(entry.wheel_set_id, None);
        assert!(old.fetch::<WheelSet>(|_| true).is_empty());

        let mut new = store();
        let summary = import(&doc(5, &link, &wheels), &mut new);
        let vehicle: Vehicle = new.get(&uuid(VEHICLE)).unwrap();
        assert_eq!(vehicle.current_wheel_set_id, Some(uuid(WHEELS)));
        assert_eq!(summary.wheel_sets_upserted, 1);
    }

    #[test]
    fn test_purchase_items_gated_by_version() {
        let items = r#", "purchaseVendor": "Shop",
            "purchaseItems": [{"title": "Wipers", "price": 19.5}]"#;

        let mut store = store();
        import(&doc(7, items, ""), &mut store);
        let entry: LogEntry = store.get(&uuid(ENTRY)).unwrap();
        assert_eq!(entry.purchase_items.len(), 1);

        // A v6 document carries no items: the row keeps the ones it has.
        import(&doc(6, r#", "purchaseVendor": "Other""#, ""), &mut store);
        let entry: LogEntry = store.get(&uuid(ENTRY)).unwrap();
        assert_eq!(entry.purchase_items[0].title, "Wipers");
        assert_eq!(entry.purchase_vendor.as_deref(), Some("Other"));
    }

    #[test]
    fn test_attachment_scope_rules() {
        let attachments = |fields: &str| {
            format!(
                r#", "attachments": [{{"id": "{ATTACHMENT}", "createdAt": "2024-02-01T10:00:00Z",
                    "originalFileName": "r.jpg", "uti": "public.jpeg" {fields}}}]"#
            )
        };
        let scope_of = |fields: &str| {
            let mut store = store();
            import(&doc(7, &attachments(fields), ""), &mut store);
            store.get::<Attachment>(&uuid(ATTACHMENT)).unwrap().scope
        };

        assert_eq!(scope_of(""), IntervalScope::All);
        assert_eq!(
            scope_of(
                r#", "appliesToAllMaintenanceIntervals": false, "maintenanceIntervalIds": []"#
            ),
            IntervalScope::Only(BTreeSet::new())
        );
        assert_eq!(
            scope_of(&format!(r#", "maintenanceIntervalIds": ["{INTERVAL}"]"#)),
            IntervalScope::Only(BTreeSet::from([uuid(INTERVAL)]))
        );
        assert_eq!(
            scope_of(&format!(
                r#", "appliesToAllMaintenanceIntervals": true,
                    "maintenanceIntervalIds": ["{INTERVAL}"]"#
            )),
            IntervalScope::All
        );
    }

    #[test]
    fn test_materialized_attachment_is_not_overwritten() {
        let mut store = store();
        let files = MemFiles::new();
        let payload = format!(
            r#", "attachments": [{{"id": "{ATTACHMENT}", "createdAt": "2024-02-01T10:00:00Z",
                "originalFileName": "r.jpg", "uti": "public.jpeg", "fileExtension": "jpg",
                "dataBase64": "aGVsbG8="}}]"#
        );
        let d = doc(7, &payload, "");

        import_document(&d, &mut store, &files).unwrap();
        let first = store.get::<Attachment>(&uuid(ATTACHMENT)).unwrap();
        assert!(first.storage_path.ends_with(".jpg"));
        assert_eq!(
            files.read_bytes(&first.storage_path).unwrap(),
            Some(b"hello".to_vec())
        );

        import_document(&d, &mut store, &files).unwrap();
        let second = store.get::<Attachment>(&uuid(ATTACHMENT)).unwrap();
        assert_eq!(second.storage_path, first.storage_path);
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_bad_payload_and_write_failure_leave_path_empty() {
        let payload = |data: &str| {
            format!(
                r#", "attachments": [{{"id": "{ATTACHMENT}", "createdAt": "2024-02-01T10:00:00Z",
                    "originalFileName": "r.jpg", "uti": "public.jpeg", "dataBase64": "{data}"}}]"#
            )
        };

        let mut store = store();
        let summary = import(&doc(7, &payload("!!not base64!!"), ""), &mut store);
        assert_eq!(summary.attachments_skipped, 0);
        let attachment: Attachment = store.get(&uuid(ATTACHMENT)).unwrap();
        assert!(!attachment.is_materialized());

        let mut store = self::store();
        let files = MemFiles::new();
        files.set_fail_writes(true);
        let document = doc(7, &payload("aGVsbG8="), "");
        let summary = import_document(&document, &mut store, &files).unwrap();
        assert_eq!(summary.attachments_skipped, 1);
        assert_eq!(summary.attachments_upserted, 1);
    }

    #[test]
    fn test_duplicate_ids_first_wins() {
        let json = format!(
            r#"{{"formatVersion": 7, "vehicles": [
                {{"id": "{VEHICLE}", "name": "First"}},
                {{"id": "{VEHICLE}", "name": "Second"}}
            ]}}"#
        );
        let mut store = store();
        let summary = import(&decode(json.as_bytes()).unwrap(), &mut store);
        assert_eq!(summary.vehicles_upserted, 1);
        assert_eq!(store.get::<Vehicle>(&uuid(VEHICLE)).unwrap().name, "First");
    }

    #[test]
    fn test_unknown_raw_values_fall_back() {
        let json = format!(
            r#"{{"formatVersion": 7, "vehicles": [{{"id": "{VEHICLE}", "name": "Hatch",
                "entries": [{{"id": "{ENTRY}", "kindRaw": "hovercraft",
                              "date": "2024-02-01T10:00:00Z", "fillKindRaw": "brimming"}}],
                "maintenanceIntervals": [{{"id": "{INTERVAL}", "title": "Oil",
                                           "repeatRaw": "hourly"}}]
            }}]}}"#
        );
        let mut store = store();
        import(&decode(json.as_bytes()).unwrap(), &mut store);

        let entry: LogEntry = store.get(&uuid(ENTRY)).unwrap();
        assert_eq!(entry.kind, EntryKind::Note);
        assert_eq!(entry.fill_kind, Some(FillKind::Full));
        let interval: MaintenanceInterval = store.get(&uuid(INTERVAL)).unwrap();
        assert_eq!(interval.notifications.repeat, RepeatPolicy::None);
        assert_eq!(interval.notifications.lead_days, 14);
        assert!(interval.is_enabled);
    }

    #[test]
    fn test_failed_commit_rolls_back() {
        let backend = MemBackend::new();
        backend.set_simulate_write_error(true);
        let mut store = MemoryStore::open(backend).unwrap();

        let document = doc(7, "", "");
        let files = MemFiles::new();
        let err = import_document(&document, &mut store, &files).unwrap_err();
        assert!(matches!(err, CarlogError::Store(_)));
        assert!(!store.has_uncommitted_changes());
        assert!(store.fetch::<Vehicle>(|_| true).is_empty());
    }
}
