use uuid::Uuid;

use redress_shared::clients::rabbitmq::RabbitMQClient;
use redress_shared::types::event::{payloads, routing_keys, Event};

use crate::models::Complaint;

async fn publish_touched(
    rabbitmq: &RabbitMQClient,
    routing_key: &str,
    complaint_id: Uuid,
    owner_id: Uuid,
    category_id: Option<Uuid>,
    table: &str,
    action: &str,
    actor: Uuid,
) {
    let event = Event::new(
        "redress-complaints",
        routing_key,
        payloads::ComplaintTouched {
            complaint_id,
            owner_id,
            category_id,
            table: table.to_string(),
            action: action.to_string(),
        },
    )
    .with_user(actor);

    if let Err(e) = rabbitmq.publish(routing_key, &event).await {
        tracing::error!(error = %e, routing_key = %routing_key, "failed to publish change event");
    }
}

pub async fn publish_complaint_created(rabbitmq: &RabbitMQClient, complaint: &Complaint, actor: Uuid) {
    publish_touched(
        rabbitmq,
        routing_keys::COMPLAINT_CREATED,
        complaint.id,
        complaint.user_id,
        complaint.category_id,
        "complaints",
        "insert",
        actor,
    )
    .await;
}

pub async fn publish_complaint_updated(rabbitmq: &RabbitMQClient, complaint: &Complaint, actor: Uuid) {
    publish_touched(
        rabbitmq,
        routing_keys::COMPLAINT_UPDATED,
        complaint.id,
        complaint.user_id,
        complaint.category_id,
        "complaints",
        "update",
        actor,
    )
    .await;
}

pub async fn publish_complaint_deleted(rabbitmq: &RabbitMQClient, complaint: &Complaint, actor: Uuid) {
    publish_touched(
        rabbitmq,
        routing_keys::COMPLAINT_DELETED,
        complaint.id,
        complaint.user_id,
        complaint.category_id,
        "complaints",
        "delete",
        actor,
    )
    .await;
}

pub async fn publish_note_added(rabbitmq: &RabbitMQClient, complaint: &Complaint, actor: Uuid) {
    publish_touched(
        rabbitmq,
        routing_keys::NOTE_ADDED,
        complaint.id,
        complaint.user_id,
        complaint.category_id,
        "complaint_notes",
        "insert",
        actor,
    )
    .await;
}

pub async fn publish_note_deleted(rabbitmq: &RabbitMQClient, complaint: &Complaint, actor: Uuid) {
    publish_touched(
        rabbitmq,
        routing_keys::NOTE_DELETED,
        complaint.id,
        complaint.user_id,
        complaint.category_id,
        "complaint_notes",
        "delete",
        actor,
    )
    .await;
}

pub async fn publish_message_sent(rabbitmq: &RabbitMQClient, complaint: &Complaint, actor: Uuid) {
    publish_touched(
        rabbitmq,
        routing_keys::MESSAGE_SENT,
        complaint.id,
        complaint.user_id,
        complaint.category_id,
        "complaint_messages",
        "insert",
        actor,
    )
    .await;
}
