//! In-process event bus and vehicle timeline plumbing.
//!
//! - [`EventBus`]: publish/subscribe hub backed by `tokio::sync::broadcast`.
//! - [`DomainEvent`]: the event envelope carried on the bus.
//! - [`BusTimelinePublisher`]: the checklist timeline port, publishing onto the bus.
//! - [`EventPersistence`]: background task writing vehicle events to
//!   `vehicle_timeline`.

pub mod bus;
pub mod persistence;
pub mod publisher;

pub use bus::{DomainEvent, EventBus};
pub use persistence::EventPersistence;
pub use publisher::BusTimelinePublisher;
