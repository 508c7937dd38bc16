/// Checklist, item and evidence identifiers are UUID v7 (time-ordered).
pub type EntityId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh time-ordered identifier.
pub fn new_entity_id() -> EntityId {
    uuid::Uuid::now_v7()
}
