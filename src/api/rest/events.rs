//! Event store endpoints

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{failure, read_json, ErrorResponse};
use crate::event_store::EventStore;
use crate::types::{Candidate, Event, EventId};

/// Response carrying one event
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub ok: bool,
    pub event: Event,
}

/// Response carrying a list of events
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub ok: bool,
    pub events: Vec<Event>,
}

/// Query parameters for listing events
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsParams {
    /// Filter by event type
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// Filter by subject
    pub subject: Option<String>,
}

/// POST /add - Build, validate and store an event from a candidate
pub async fn add_event(State(store): State<Arc<EventStore>>, body: Bytes) -> Response {
    let candidate: Candidate = match read_json(&body) {
        Ok(candidate) => candidate,
        Err(response) => return response,
    };

    match store.add_event(candidate) {
        Ok(event) => {
            tracing::info!(event_id = %event.id(), "Added event to store");
            Json(EventResponse { ok: true, event }).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to add event to store");
            failure(e.to_string())
        }
    }
}

/// GET /events - All events oldest first, optionally filtered by type and/or subject
pub async fn list_events(
    State(store): State<Arc<EventStore>>,
    Query(params): Query<ListEventsParams>,
) -> impl IntoResponse {
    let events = match (params.event_type, params.subject) {
        (Some(event_type), Some(subject)) => store
            .get_events_by_type(&event_type)
            .into_iter()
            .filter(|e| e.subject() == subject)
            .collect(),
        (Some(event_type), None) => store.get_events_by_type(&event_type),
        (None, Some(subject)) => store.get_events_by_subject(&subject),
        (None, None) => store.get_events(),
    };

    Json(EventsResponse { ok: true, events })
}

/// GET /events/:id - Get a single event
pub async fn get_event(
    State(store): State<Arc<EventStore>>,
    Path(id): Path<EventId>,
) -> Response {
    match store.get_event(&id) {
        Some(event) => Json(EventResponse { ok: true, event }).into_response(),
        None => {
            tracing::debug!(event_id = %id, "Event not found");
            let error = ErrorResponse::new(format!("event {} not found", id));
            (StatusCode::NOT_FOUND, Json(error)).into_response()
        }
    }
}
