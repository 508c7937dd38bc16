//! Integration tests for the checklist repositories and their port adapters.
//!
//! Exercises the persistence layer against a real database:
//! - Header create and lookup by either context column
//! - Partial unique indexes surfacing as `CoreError::Conflict`
//! - Batch child inserts, duplicate keys and cascade delete
//! - Transactional rewrite of a whole aggregate
//! - The aggregate service running on the Postgres adapters

use std::sync::Arc;

use assert_matches::assert_matches;
use recon_core::checklist::aggregate::{Checklist, ChecklistRecord, ChecklistStatus};
use recon_core::checklist::evidence::Evidence;
use recon_core::checklist::context::{ContextId, ContextKind};
use recon_core::checklist::item::{ChecklistItem, ItemStatus};
use recon_core::checklist::memory::{InMemoryObjectStore, RecordingTimelinePublisher};
use recon_core::checklist::ports::{
    ChecklistItemRepository, ChecklistRepository, ChecklistUnitOfWork, EvidenceRepository,
    VehicleStatusWriter,
};
use recon_core::checklist::service::{
    AddChecklistItemCommand, ChecklistPorts, ChecklistService, CreateChecklistCommand,
    SubmitChecklistCommand,
};
use recon_core::checklist::value_objects::{EvidenceKey, ItemKey, StoragePath};
use recon_core::error::CoreError;
use recon_core::types::new_entity_id;
use recon_db::adapters::{
    PgChecklistItemRepository, PgChecklistRepository, PgChecklistUnitOfWork, PgEvidenceRepository,
    PgVehicleStatusWriter,
};
use recon_db::models::checklist::{CreateChecklist, CreateChecklistItem};
use recon_db::repositories::{ChecklistItemRepo, ChecklistRepo, EvidenceRepo, VehicleRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_record(context: ContextId, vehicle_id: &str) -> ChecklistRecord {
    let now = chrono::Utc::now();
    ChecklistRecord {
        id: new_entity_id(),
        vehicle_id: vehicle_id.to_string(),
        context,
        partner_id: "partner-1".to_string(),
        status: ChecklistStatus::Draft,
        created_at: now,
        updated_at: now,
    }
}

fn new_item(checklist_id: uuid::Uuid, key: &str, status: &str) -> CreateChecklistItem {
    CreateChecklistItem {
        id: new_entity_id(),
        checklist_id,
        item_key: key.to_string(),
        status: status.to_string(),
        notes: None,
        created_at: chrono::Utc::now(),
    }
}

fn pg_service(pool: &PgPool, timeline: Arc<RecordingTimelinePublisher>) -> ChecklistService {
    let store = Arc::new(InMemoryObjectStore::new());
    ChecklistService::new(ChecklistPorts {
        checklists: Arc::new(PgChecklistRepository::new(pool.clone())),
        items: Arc::new(PgChecklistItemRepository::new(pool.clone())),
        evidences: Arc::new(PgEvidenceRepository::new(pool.clone())),
        unit_of_work: Arc::new(PgChecklistUnitOfWork::new(pool.clone())),
        timeline,
        vehicles: Arc::new(PgVehicleStatusWriter::new(pool.clone())),
        signer: store.clone(),
        uploader: store,
    })
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_and_find_by_each_context_column(pool: PgPool) {
    let quote = new_record(ContextId::quote("Q-1").unwrap(), "V-1");
    let inspection = new_record(ContextId::inspection("I-1").unwrap(), "V-1");

    ChecklistRepo::create(&pool, &CreateChecklist::from(&quote))
        .await
        .unwrap();
    ChecklistRepo::create(&pool, &CreateChecklist::from(&inspection))
        .await
        .unwrap();

    let found = ChecklistRepo::find_by_context(&pool, ContextKind::Quote, "Q-1", "V-1")
        .await
        .unwrap()
        .expect("quote checklist should exist");
    assert_eq!(found.id, quote.id);
    assert_eq!(found.quote_id.as_deref(), Some("Q-1"));
    assert!(found.inspection_id.is_none());

    let found = ChecklistRepo::find_by_context(&pool, ContextKind::Inspection, "I-1", "V-1")
        .await
        .unwrap()
        .expect("inspection checklist should exist");
    assert_eq!(found.id, inspection.id);

    let missing = ChecklistRepo::find_by_context(&pool, ContextKind::Quote, "I-1", "V-1")
        .await
        .unwrap();
    assert!(missing.is_none(), "context kinds must not cross-match");

    let all = ChecklistRepo::list_by_vehicle(&pool, "V-1").await.unwrap();
    assert_eq!(all.len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_context_and_vehicle_is_conflict(pool: PgPool) {
    let repo = PgChecklistRepository::new(pool.clone());
    let context = ContextId::quote("Q-1").unwrap();

    repo.save(&new_record(context.clone(), "V-1")).await.unwrap();
    let err = repo.save(&new_record(context.clone(), "V-1")).await.unwrap_err();
    assert_matches!(err, CoreError::Conflict(_));

    // Same quote on another vehicle is a different checklist.
    repo.save(&new_record(context, "V-2")).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_of_missing_checklist_is_not_found(pool: PgPool) {
    let repo = PgChecklistRepository::new(pool);
    let err = repo
        .update(&new_record(ContextId::quote("Q-404").unwrap(), "V-1"))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "checklist", .. });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stored_header_round_trips_into_record(pool: PgPool) {
    let repo = PgChecklistRepository::new(pool);
    let record = new_record(ContextId::inspection("I-9").unwrap(), "V-9");
    repo.save(&record).await.unwrap();

    let mut changed = record.clone();
    changed.status = ChecklistStatus::Submitted;
    changed.updated_at = record.updated_at + chrono::Duration::hours(1);
    repo.update(&changed).await.unwrap();

    let loaded = repo.find_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(loaded.context, record.context);
    assert_eq!(loaded.status, ChecklistStatus::Submitted);
    assert_eq!(
        loaded.updated_at.timestamp_micros(),
        changed.updated_at.timestamp_micros()
    );
    assert_eq!(
        loaded.created_at.timestamp_micros(),
        record.created_at.timestamp_micros()
    );
}

// ---------------------------------------------------------------------------
// Children
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_many_is_atomic_on_duplicate_key(pool: PgPool) {
    let record = new_record(ContextId::quote("Q-1").unwrap(), "V-1");
    ChecklistRepo::create(&pool, &CreateChecklist::from(&record))
        .await
        .unwrap();

    let rows = vec![
        new_item(record.id, "brakes", "ok"),
        new_item(record.id, "brakes", "needs_repair"),
    ];
    let result = ChecklistItemRepo::create_many(&pool, &rows).await;
    assert!(result.is_err(), "duplicate item keys must fail");

    let stored = ChecklistItemRepo::list_by_checklist(&pool, record.id)
        .await
        .unwrap();
    assert!(stored.is_empty(), "failed batch must not leave partial rows");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn adapter_maps_duplicate_item_to_conflict(pool: PgPool) {
    let record = new_record(ContextId::quote("Q-1").unwrap(), "V-1");
    PgChecklistRepository::new(pool.clone())
        .save(&record)
        .await
        .unwrap();
    let items = PgChecklistItemRepository::new(pool);

    let item = ChecklistItem::new(record.id, ItemKey::create("tyres").unwrap(), ItemStatus::Ok, None);
    items.save_many(std::slice::from_ref(&item)).await.unwrap();

    let again = ChecklistItem::new(record.id, ItemKey::create("tyres").unwrap(), ItemStatus::Ok, None);
    let err = items.save_many(&[again]).await.unwrap_err();
    assert_matches!(err, CoreError::Conflict(_));

    let loaded = items.find_by_checklist_id(record.id).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id(), item.id());
    assert_eq!(loaded[0].status(), ItemStatus::Ok);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_checklist_cascades_to_children(pool: PgPool) {
    let record = new_record(ContextId::quote("Q-1").unwrap(), "V-1");
    ChecklistRepo::create(&pool, &CreateChecklist::from(&record))
        .await
        .unwrap();
    ChecklistItemRepo::create_many(&pool, &[new_item(record.id, "lights", "ok")])
        .await
        .unwrap();

    sqlx::query("DELETE FROM vehicle_checklists WHERE id = $1")
        .bind(record.id)
        .execute(&pool)
        .await
        .unwrap();

    let items = ChecklistItemRepo::list_by_checklist(&pool, record.id)
        .await
        .unwrap();
    let evidences = EvidenceRepo::list_by_checklist(&pool, record.id)
        .await
        .unwrap();
    assert!(items.is_empty());
    assert!(evidences.is_empty());
}

// ---------------------------------------------------------------------------
// Vehicles
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn vehicle_status_writer_requires_existing_vehicle(pool: PgPool) {
    let writer = PgVehicleStatusWriter::new(pool.clone());

    let err = writer.update_status("V-404", "needs_attention").await.unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "vehicle", .. });

    VehicleRepo::create(&pool, "V-1", "pending").await.unwrap();
    writer.update_status("V-1", "needs_attention").await.unwrap();
    let vehicle = VehicleRepo::find_by_id(&pool, "V-1").await.unwrap().unwrap();
    assert_eq!(vehicle.status, "needs_attention");
}

// ---------------------------------------------------------------------------
// Unit of work
// ---------------------------------------------------------------------------

fn domain_item(checklist_id: uuid::Uuid, key: &str) -> ChecklistItem {
    ChecklistItem::new(checklist_id, ItemKey::create(key).unwrap(), ItemStatus::Ok, None)
}

fn domain_evidence(checklist_id: uuid::Uuid, key: &str) -> Evidence {
    Evidence::new(
        checklist_id,
        EvidenceKey::create(key).unwrap(),
        StoragePath::create(&format!("{checklist_id}/{key}.jpg")).unwrap(),
        None,
        None,
    )
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn replace_contents_rewrites_header_and_children(pool: PgPool) {
    let record = new_record(ContextId::quote("Q-1").unwrap(), "V-1");
    let repo = PgChecklistRepository::new(pool.clone());
    repo.save(&record).await.unwrap();
    ChecklistItemRepo::create_many(&pool, &[new_item(record.id, "old", "ok")])
        .await
        .unwrap();

    let mut checklist = Checklist::reconstruct(record.clone(), Vec::new(), Vec::new()).unwrap();
    checklist.add_item(domain_item(record.id, "engine")).unwrap();
    checklist.add_evidence(domain_evidence(record.id, "front")).unwrap();
    checklist.submit().unwrap();
    PgChecklistUnitOfWork::new(pool.clone())
        .replace_contents(&checklist)
        .await
        .unwrap();

    let header = repo.find_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(header.status, ChecklistStatus::Submitted);
    let keys: Vec<String> = PgChecklistItemRepository::new(pool.clone())
        .find_by_checklist_id(record.id)
        .await
        .unwrap()
        .iter()
        .map(|i| i.item_key().value().to_string())
        .collect();
    assert_eq!(keys, vec!["engine"]);
    let evidences = PgEvidenceRepository::new(pool)
        .find_by_checklist_id(record.id)
        .await
        .unwrap();
    assert_eq!(evidences.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_replace_contents_rolls_back_every_write(pool: PgPool) {
    let record = new_record(ContextId::quote("Q-1").unwrap(), "V-1");
    let repo = PgChecklistRepository::new(pool.clone());
    repo.save(&record).await.unwrap();
    ChecklistItemRepo::create_many(&pool, &[new_item(record.id, "lights", "ok")])
        .await
        .unwrap();

    // The header and item writes succeed; the second evidence hits the
    // unique key and aborts the transaction.
    let mut checklist = Checklist::reconstruct(
        record.clone(),
        vec![domain_item(record.id, "engine")],
        vec![
            domain_evidence(record.id, "front"),
            domain_evidence(record.id, "front"),
        ],
    )
    .unwrap();
    checklist.submit().unwrap();
    let err = PgChecklistUnitOfWork::new(pool.clone())
        .replace_contents(&checklist)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Conflict(_));

    let header = repo.find_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(header.status, ChecklistStatus::Draft);
    let items = ChecklistItemRepo::list_by_checklist(&pool, record.id)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item_key, "lights");
    assert!(EvidenceRepo::list_by_checklist(&pool, record.id)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn replace_contents_of_missing_checklist_is_not_found(pool: PgPool) {
    let record = new_record(ContextId::quote("Q-404").unwrap(), "V-1");
    let checklist = Checklist::reconstruct(record, Vec::new(), Vec::new()).unwrap();
    let err = PgChecklistUnitOfWork::new(pool)
        .replace_contents(&checklist)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "checklist", .. });
}

// ---------------------------------------------------------------------------
// Service on Postgres
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn service_lifecycle_on_postgres(pool: PgPool) {
    VehicleRepo::create(&pool, "V-1", "pending").await.unwrap();
    let timeline = Arc::new(RecordingTimelinePublisher::new());
    let service = pg_service(&pool, timeline.clone());

    let checklist = service
        .create_checklist(CreateChecklistCommand {
            vehicle_id: "V-1".into(),
            context: Some(ContextId::quote("Q-1").unwrap()),
            partner_id: "partner-1".into(),
        })
        .await
        .unwrap();
    service
        .add_checklist_item(AddChecklistItemCommand {
            checklist_id: checklist.id(),
            item_key: "brakes".into(),
            status: ItemStatus::NeedsRepair,
            notes: Some("pads worn".into()),
        })
        .await
        .unwrap();

    let submitted = service
        .submit_checklist(SubmitChecklistCommand {
            checklist_id: checklist.id(),
        })
        .await
        .unwrap();
    assert_eq!(submitted.status(), ChecklistStatus::Submitted);

    let header = ChecklistRepo::find_by_id(&pool, checklist.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.status, "submitted");

    let vehicle = VehicleRepo::find_by_id(&pool, "V-1").await.unwrap().unwrap();
    assert_eq!(vehicle.status, "needs_attention");
    assert_eq!(timeline.published().len(), 1);

    let err = service
        .create_checklist(CreateChecklistCommand {
            vehicle_id: "V-1".into(),
            context: Some(ContextId::quote("Q-1").unwrap()),
            partner_id: "partner-1".into(),
        })
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Conflict(_));
}
