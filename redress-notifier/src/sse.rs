// Server-Sent Events endpoint.
//
//   GET /events?scope=mine
//   GET /events?scope=all[&complaint_id=<uuid>]
//   Authorization: Bearer <jwt>
//
// The connection stays open and streams change events as they arrive.
// `scope=mine` delivers events for complaints the caller owns; `scope=all`
// requires a staff role and delivers the whole feed (category admins narrow
// it client-side using the event's category_id). Events carry no
// authoritative state: clients refetch the affected complaint on receipt.
//
// Dropping the response tears down the underlying broadcast receiver, so an
// abandoned detail view stops consuming the feed.

use axum::extract::{Query, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use redress_shared::errors::{AppError, AppResult, ErrorCode};
use redress_shared::types::auth::AuthUser;

use crate::bus::ChangeEvent;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SseQuery {
    /// "mine" (default) or "all"
    pub scope: Option<String>,
    /// Narrow the stream to a single complaint.
    pub complaint_id: Option<Uuid>,
}

/// The caller's resolved subscription scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionScope {
    /// Complaints owned by this user.
    Mine(Uuid),
    /// The whole feed (staff only).
    All,
}

impl SseQuery {
    pub fn resolve(&self, user: &AuthUser) -> AppResult<SubscriptionScope> {
        match self.scope.as_deref() {
            None | Some("mine") => Ok(SubscriptionScope::Mine(user.id)),
            Some("all") => {
                if !user.role.is_staff() {
                    return Err(AppError::new(
                        ErrorCode::Forbidden,
                        "scope=all requires a staff role",
                    ));
                }
                Ok(SubscriptionScope::All)
            }
            Some(other) => Err(AppError::new(
                ErrorCode::ValidationError,
                format!("unknown scope '{other}', expected 'mine' or 'all'"),
            )),
        }
    }
}

/// Whether an event should be delivered to a subscription.
pub fn event_matches(
    scope: &SubscriptionScope,
    complaint_filter: Option<Uuid>,
    event: &ChangeEvent,
) -> bool {
    if let Some(id) = complaint_filter {
        if event.complaint_id != id {
            return false;
        }
    }
    match scope {
        SubscriptionScope::Mine(user_id) => event.owner_id == *user_id,
        SubscriptionScope::All => true,
    }
}

/// `GET /events` -- SSE stream of change events for the caller's scope.
///
/// A heartbeat comment every 15 seconds keeps the connection alive through
/// proxies.
pub async fn sse_events(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    let scope = query.resolve(&user)?;
    let complaint_filter = query.complaint_id;

    let mut rx = state.bus.subscribe();

    info!(
        user_id = %user.id,
        scope = ?scope,
        complaint_id = ?complaint_filter,
        "SSE client connected"
    );

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !event_matches(&scope, complaint_filter, &event) {
                        continue;
                    }

                    let json = match serde_json::to_string(&event) {
                        Ok(j) => j,
                        Err(e) => {
                            warn!("SSE: failed to serialize event: {e}");
                            continue;
                        }
                    };

                    let sse_event = SseEvent::default()
                        .event(event.event_type.clone())
                        .id(event.id.to_string())
                        .data(json);

                    yield Ok(sse_event);
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("SSE client lagged, skipped {n} events");
                    // Tell the client it missed data so it refetches.
                    let warning = SseEvent::default()
                        .event("_warning")
                        .data(format!("{{\"message\":\"lagged, skipped {n} events\"}}"));
                    yield Ok(warning);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    info!("SSE: event bus closed, ending stream");
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use redress_shared::types::auth::UserRole;

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role,
            token_id: Uuid::new_v4(),
        }
    }

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

    #[test]
    fn default_scope_is_mine() {
        let student = user(UserRole::Student);
        let query = SseQuery { scope: None, complaint_id: None };
        assert_eq!(query.resolve(&student).unwrap(), SubscriptionScope::Mine(student.id));
    }

    #[test]
    fn students_cannot_subscribe_to_all() {
        let student = user(UserRole::Student);
        let query = SseQuery { scope: Some("all".into()), complaint_id: None };
        assert!(query.resolve(&student).is_err());

        let staff = user(UserRole::CategoryAdmin);
        assert_eq!(query.resolve(&staff).unwrap(), SubscriptionScope::All);
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let staff = user(UserRole::Admin);
        let query = SseQuery { scope: Some("everything".into()), complaint_id: None };
        assert!(query.resolve(&staff).is_err());
    }

    #[test]
    fn mine_scope_filters_by_owner() {
        let owner = Uuid::new_v4();
        let scope = SubscriptionScope::Mine(owner);

        assert!(event_matches(&scope, None, &change(Uuid::new_v4(), owner)));
        assert!(!event_matches(&scope, None, &change(Uuid::new_v4(), Uuid::new_v4())));
    }

    #[test]
    fn complaint_filter_narrows_any_scope() {
        let complaint_id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let owner = Uuid::new_v4();

        let mine = SubscriptionScope::Mine(owner);
        assert!(event_matches(&mine, Some(complaint_id), &change(complaint_id, owner)));
        assert!(!event_matches(&mine, Some(complaint_id), &change(other, owner)));

        let all = SubscriptionScope::All;
        assert!(event_matches(&all, Some(complaint_id), &change(complaint_id, owner)));
        assert!(!event_matches(&all, Some(complaint_id), &change(other, owner)));
    }

    #[test]
    fn all_scope_sees_every_owner() {
        let all = SubscriptionScope::All;
        assert!(event_matches(&all, None, &change(Uuid::new_v4(), Uuid::new_v4())));
    }
}
