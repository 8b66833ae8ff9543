use std::sync::Arc;

use diesel::prelude::*;
use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;

use redress_shared::types::event::{payloads, routing_keys, Event};

use crate::models::NewProfile;
use crate::schema::profiles;
use crate::AppState;

/// Listen for auth events and keep the local profile mirror current.
/// The mirror feeds actor names in timelines and the assignment-target
/// scope check; it is refreshed idempotently so duplicate deliveries are
/// harmless.
pub async fn listen_auth_events(state: Arc<AppState>) -> anyhow::Result<()> {
    let mut consumer = state
        .rabbitmq
        .subscribe(
            "redress-complaints.auth",
            &[
                routing_keys::AUTH_USER_REGISTERED,
                routing_keys::AUTH_ROLE_CHANGED,
            ],
        )
        .await?;

    tracing::info!("listening for auth events");

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                let routing_key = delivery.routing_key.to_string();

                if routing_key == routing_keys::AUTH_USER_REGISTERED {
                    match serde_json::from_slice::<Event<payloads::UserRegistered>>(&delivery.data) {
                        Ok(event) => {
                            let data = &event.data;
                            if let Err(e) = upsert_profile(
                                &state,
                                data.user_id,
                                &data.name,
                                &data.email,
                                &data.role.to_string(),
                            ) {
                                tracing::error!(error = %e, user_id = %data.user_id, "failed to mirror registered user");
                            } else {
                                tracing::info!(user_id = %data.user_id, "profile mirrored");
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to deserialize user.registered event");
                        }
                    }
                } else if routing_key == routing_keys::AUTH_ROLE_CHANGED {
                    match serde_json::from_slice::<Event<payloads::RoleChanged>>(&delivery.data) {
                        Ok(event) => {
                            let data = &event.data;
                            if let Err(e) = update_role(&state, data.user_id, &data.role.to_string()) {
                                tracing::error!(error = %e, user_id = %data.user_id, "failed to mirror role change");
                            } else {
                                tracing::info!(user_id = %data.user_id, role = %data.role, "role mirrored");
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to deserialize user.role_changed event");
                        }
                    }
                }

                let _ = delivery.ack(BasicAckOptions::default()).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "auth consumer error");
            }
        }
    }

    Ok(())
}

fn upsert_profile(
    state: &Arc<AppState>,
    user_id: uuid::Uuid,
    name: &str,
    email: &str,
    role: &str,
) -> anyhow::Result<()> {
    let mut conn = state.db.get()?;

    diesel::insert_into(profiles::table)
        .values(&NewProfile {
            user_id,
            name: name.to_string(),
            email: email.to_string(),
            role: role.to_string(),
        })
        .on_conflict(profiles::user_id)
        .do_update()
        .set((
            profiles::name.eq(name),
            profiles::email.eq(email),
            profiles::role.eq(role),
            profiles::updated_at.eq(chrono::Utc::now()),
        ))
        .execute(&mut conn)?;

    Ok(())
}

fn update_role(state: &Arc<AppState>, user_id: uuid::Uuid, role: &str) -> anyhow::Result<()> {
    let mut conn = state.db.get()?;

    diesel::update(profiles::table.find(user_id))
        .set((
            profiles::role.eq(role),
            profiles::updated_at.eq(chrono::Utc::now()),
        ))
        .execute(&mut conn)?;

    Ok(())
}
