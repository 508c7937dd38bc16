//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod checklist_item_repo;
pub mod checklist_repo;
pub mod evidence_repo;
pub mod timeline_repo;
pub mod vehicle_repo;

pub use checklist_item_repo::ChecklistItemRepo;
pub use checklist_repo::ChecklistRepo;
pub use evidence_repo::EvidenceRepo;
pub use timeline_repo::TimelineRepo;
pub use vehicle_repo::VehicleRepo;
