//! [`TimelinePublisher`] implementation that emits onto the [`EventBus`].

use std::sync::Arc;

use async_trait::async_trait;
use recon_core::checklist::context::ContextId;
use recon_core::checklist::ports::TimelinePublisher;
use recon_core::error::CoreResult;
use recon_core::metric_names::EVENT_CHECKLIST_SUBMITTED;
use recon_core::types::EntityId;
use serde_json::json;

use crate::bus::{DomainEvent, EventBus};

/// Publishes checklist submissions as `checklist.submitted` events.
///
/// Never fails: durability is the job of whichever subscriber persists
/// the timeline.
#[derive(Clone)]
pub struct BusTimelinePublisher {
    bus: Arc<EventBus>,
}

impl BusTimelinePublisher {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl TimelinePublisher for BusTimelinePublisher {
    async fn publish_checklist_submitted(
        &self,
        checklist_id: EntityId,
        context: &ContextId,
        vehicle_id: &str,
    ) -> CoreResult<()> {
        self.bus.publish(
            DomainEvent::new(EVENT_CHECKLIST_SUBMITTED)
                .with_source("checklist", checklist_id)
                .with_vehicle(vehicle_id)
                .with_payload(json!({
                    "checklist_id": checklist_id,
                    "context": context,
                })),
        );
        tracing::debug!(%checklist_id, vehicle_id, "Published checklist submission");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submission_is_published_with_context_payload() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let publisher = BusTimelinePublisher::new(bus.clone());

        let checklist_id = recon_core::types::new_entity_id();
        let context = ContextId::inspection("I-7").unwrap();
        publisher
            .publish_checklist_submitted(checklist_id, &context, "V-7")
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, EVENT_CHECKLIST_SUBMITTED);
        assert_eq!(event.vehicle_id.as_deref(), Some("V-7"));
        assert_eq!(
            event.source_entity_id.as_deref(),
            Some(checklist_id.to_string().as_str())
        );
        assert_eq!(event.payload["checklist_id"], checklist_id.to_string());
        assert_eq!(event.payload["context"]["id"], "I-7");
    }
}
