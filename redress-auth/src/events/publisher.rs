use uuid::Uuid;

use redress_shared::clients::rabbitmq::RabbitMQClient;
use redress_shared::types::auth::UserRole;
use redress_shared::types::event::{payloads, routing_keys, Event};

pub async fn publish_user_registered(
    rabbitmq: &RabbitMQClient,
    user_id: Uuid,
    name: &str,
    email: &str,
    role: UserRole,
) {
    let event = Event::new(
        "redress-auth",
        routing_keys::AUTH_USER_REGISTERED,
        payloads::UserRegistered {
            user_id,
            name: name.to_string(),
            email: email.to_string(),
            role,
        },
    )
    .with_user(user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::AUTH_USER_REGISTERED, &event).await {
        tracing::error!(error = %e, "failed to publish user.registered event");
    }
}

pub async fn publish_role_changed(rabbitmq: &RabbitMQClient, user_id: Uuid, role: UserRole) {
    let event = Event::new(
        "redress-auth",
        routing_keys::AUTH_ROLE_CHANGED,
        payloads::RoleChanged { user_id, role },
    )
    .with_user(user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::AUTH_ROLE_CHANGED, &event).await {
        tracing::error!(error = %e, "failed to publish user.role_changed event");
    }
}
