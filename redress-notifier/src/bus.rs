// In-process change bus.
//
// The RabbitMQ consumer republishes every complaint change event on a
// single `tokio::sync::broadcast` channel; each connected SSE client holds
// one receiver. Events are refetch triggers only: a client that receives
// one re-reads the complaint aggregate, so lost or duplicated deliveries
// cost at most a redundant fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// A complaint change, flattened from the wire envelope for fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: Uuid,
    /// Routing key, e.g. `redress.complaints.complaint.updated`
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub complaint_id: Uuid,
    pub owner_id: Uuid,
    pub category_id: Option<Uuid>,
    pub table: String,
    pub action: String,
}

const BUS_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Subscribe a new consumer. Dropping the receiver tears the
    /// subscription down.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers. Returns how many received
    /// it; zero subscribers is not an error.
    pub fn emit(&self, event: ChangeEvent) -> usize {
        let receivers = self.tx.receiver_count();
        if receivers > 0 {
            let _ = self.tx.send(event.clone());
        }
        debug!(
            event_type = %event.event_type,
            complaint_id = %event.complaint_id,
            receivers,
            "change event emitted"
        );
        receivers
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(complaint_id: Uuid, owner_id: Uuid) -> ChangeEvent {
        ChangeEvent {
            id: Uuid::now_v7(),
            event_type: "redress.complaints.complaint.updated".into(),
            timestamp: Utc::now(),
            complaint_id,
            owner_id,
            category_id: None,
            table: "complaints".into(),
            action: "update".into(),
        }
    }

    #[tokio::test]
    async fn bus_fanout() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let evt = change(Uuid::new_v4(), Uuid::new_v4());
        let n = bus.emit(evt.clone());
        assert_eq!(n, 2);

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.id, e2.id);
        assert_eq!(e1.complaint_id, evt.complaint_id);
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_fine() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(change(Uuid::new_v4(), Uuid::new_v4())), 0);
    }

    #[tokio::test]
    async fn dropped_receiver_leaves_the_bus() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);
        assert_eq!(bus.emit(change(Uuid::new_v4(), Uuid::new_v4())), 0);
    }
}
