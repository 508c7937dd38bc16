//! Recon checklist domain and migration layer.
//!
//! Pure domain logic and application services. Infrastructure (Postgres,
//! object storage, event bus, HTTP) lives in the sibling crates and plugs in
//! through the ports in [`checklist::ports`].

pub mod alert;
pub mod checklist;
pub mod error;
pub mod metric_names;
pub mod migration;
pub mod types;
