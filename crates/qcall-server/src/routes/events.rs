//! Event Stream Route
//!
//! Displays and dashboards subscribe without a room and receive every
//! event. Counter screens subscribe to `counter-{n}` and receive global
//! events plus that room's events.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use utoipa::IntoParams;

use crate::AppState;
use qcall::Room;

#[derive(Debug, Deserialize, IntoParams)]
pub struct EventsQuery {
    /// `counter-{number}` or `department-{id}`
    pub room: Option<String>,
}

/// Subscribe to broadcast events
#[utoipa::path(
    get,
    path = "/events",
    params(EventsQuery),
    responses(
        (status = 200, description = "text/event-stream of broadcast events"),
        (status = 400, description = "Unknown room")
    ),
    tag = "Events"
)]
pub async fn subscribe_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let room = query
        .room
        .as_deref()
        .map(str::parse::<Room>)
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    tracing::debug!(
        room = ?room.map(|r| r.to_string()),
        subscribers = state.broadcaster.subscriber_count() + 1,
        "SSE subscriber connected"
    );

    Ok(Sse::new(state.broadcaster.subscribe_sse(room)).keep_alive(KeepAlive::default()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/events", get(subscribe_events))
}
