//! Durable vehicle timeline.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes every event that names a vehicle into `vehicle_timeline`. It
//! runs as a background task and stops when the bus is dropped.

use recon_db::models::timeline::{CreateTimelineEntry, TimelineEntry};
use recon_db::repositories::TimelineRepo;
use recon_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::DomainEvent;

pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop until the channel closes.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => match Self::persist(&pool, &event).await {
                    Ok(Some(entry)) => {
                        tracing::debug!(
                            timeline_id = entry.id,
                            event_type = %event.event_type,
                            "Timeline entry written"
                        );
                    }
                    Ok(None) => {
                        tracing::debug!(
                            event_type = %event.event_type,
                            "Event has no vehicle, not added to timeline"
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to persist event"
                        );
                    }
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event persistence lagged, some events were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }

    /// Write one event to `vehicle_timeline`; events without a vehicle are skipped.
    pub async fn persist(
        pool: &DbPool,
        event: &DomainEvent,
    ) -> Result<Option<TimelineEntry>, sqlx::Error> {
        let Some(vehicle_id) = event.vehicle_id.as_deref() else {
            return Ok(None);
        };

        let entry = CreateTimelineEntry {
            vehicle_id: vehicle_id.to_string(),
            event_type: event.event_type.clone(),
            payload: event.payload.clone(),
        };
        TimelineRepo::insert(pool, &entry).await.map(Some)
    }
}
