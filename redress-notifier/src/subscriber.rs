use std::sync::Arc;

use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;

use redress_shared::types::event::{payloads, routing_keys, Event};

use crate::bus::ChangeEvent;
use crate::AppState;

/// Consume the whole complaint change feed and republish each event on the
/// in-process bus.
pub async fn listen_complaint_changes(state: Arc<AppState>) -> anyhow::Result<()> {
    let mut consumer = state
        .rabbitmq
        .subscribe("redress-notifier.changes", &[routing_keys::COMPLAINTS_ALL])
        .await?;

    tracing::info!("listening for complaint change events");

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                match serde_json::from_slice::<Event<payloads::ComplaintTouched>>(&delivery.data) {
                    Ok(event) => {
                        let data = event.data;
                        state.bus.emit(ChangeEvent {
                            id: event.id,
                            event_type: event.event_type,
                            timestamp: event.timestamp,
                            complaint_id: data.complaint_id,
                            owner_id: data.owner_id,
                            category_id: data.category_id,
                            table: data.table,
                            action: data.action,
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to deserialize change event");
                    }
                }
                let _ = delivery.ack(BasicAckOptions::default()).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "change consumer error");
            }
        }
    }

    Ok(())
}
