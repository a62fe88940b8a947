use super::{committed, remove_orphans, CmdMessage, CmdResult};
use crate::error::{CarlogError, Result};
use crate::model::Vehicle;
use crate::store::files::AttachmentFiles;
use crate::store::{DataStore, RecordKind};
use uuid::Uuid;

/// Vehicles in creation order.
pub fn list<S: DataStore>(store: &S) -> Result<CmdResult> {
    let vehicles = store.fetch_sorted::<Vehicle>(
        |_| true,
        |a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)),
    );
    let mut result = CmdResult::default();
    if vehicles.is_empty() {
        result.add_message(CmdMessage::info("No vehicles yet."));
    }
    Ok(result.with_vehicles(vehicles))
}

pub fn add<S: DataStore>(
    store: &mut S,
    name: &str,
    initial_odometer_km: Option<f64>,
) -> Result<CmdResult> {
    let mut vehicle = Vehicle::new(name);
    vehicle.initial_odometer_km = initial_odometer_km;
    committed(store, |s| s.insert(vehicle.clone()))?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Added {}.", vehicle.name)));
    Ok(result.with_vehicles(vec![vehicle]))
}

/// Delete a vehicle with everything it owns, including attachment bytes.
pub fn delete<S, F>(store: &mut S, files: &F, id: &Uuid) -> Result<CmdResult>
where
    S: DataStore,
    F: AttachmentFiles + ?Sized,
{
    let vehicle: Vehicle = store
        .get(id)
        .ok_or(CarlogError::NotFound(RecordKind::Vehicle, *id))?;
    let report = committed(store, |s| s.delete::<Vehicle>(id))?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Deleted {} and {} related record(s).",
        vehicle.name,
        report.removed - 1
    )));
    remove_orphans(files, &report.orphaned_files, &mut result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::files::MemFiles;
    use crate::store::mem_backend::MemBackend;
    use crate::store::MemoryStore;

    #[test]
    fn test_add_list_delete() {
        let mut store = MemoryStore::open(MemBackend::new()).unwrap();
        let added = add(&mut store, "Hatch", Some(1_200.0)).unwrap();
        let id = added.vehicles[0].id;

        let listed = list(&store).unwrap();
        assert_eq!(listed.vehicles.len(), 1);
        assert_eq!(listed.vehicles[0].initial_odometer_km, Some(1_200.0));

        delete(&mut store, &MemFiles::new(), &id).unwrap();
        let listed = list(&store).unwrap();
        assert!(listed.vehicles.is_empty());
        assert_eq!(listed.messages.len(), 1);
    }

    #[test]
    fn test_delete_cascades_on_disk() {
        use crate::model::{Attachment, EntryKind, LogEntry};
        use crate::test_utils::{day, oil_interval, TestEnv};

        let mut env = TestEnv::new();
        let id = add(&mut env.store, "Wagon", None).unwrap().vehicles[0].id;
        let entry = LogEntry::new(id, EntryKind::Service, day(2024, 2, 1));
        let mut attachment = Attachment::new(entry.id, "invoice.pdf", "com.adobe.pdf");
        attachment.storage_path = env.files.write_bytes(b"%PDF", Some("pdf")).unwrap();
        let stored = env.root.join("attachments").join(&attachment.storage_path);
        env.store.insert(entry).unwrap();
        env.store.insert(attachment).unwrap();
        env.store
            .insert(oil_interval(id, 15_000.0, 12, 0.0, day(2024, 1, 1)))
            .unwrap();
        env.store.commit().unwrap();
        assert!(stored.exists());

        let result = delete(&mut env.store, &env.files, &id).unwrap();

        assert!(result.messages[0].content.contains("3 related"));
        assert!(!stored.exists());
        let reopened = env.reopen();
        assert!(reopened.fetch::<Vehicle>(|_| true).is_empty());
        assert!(reopened.fetch::<Attachment>(|_| true).is_empty());
    }
}
