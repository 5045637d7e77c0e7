//! Retry queue endpoints

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::{failure, read_json};
use crate::queue::DeliveryQueue;
use crate::types::{Event, EventRecord, QueueItem};

/// Response for an accepted event
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub ok: bool,
    pub queue_size: usize,
}

/// Response listing dead-lettered items
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLettersResponse {
    pub ok: bool,
    pub dead_letters: Vec<QueueItem>,
}

/// POST /enqueue - Validate an event and add it to the queue
///
/// Waits while the queue is full.
pub async fn enqueue(State(queue): State<Arc<DeliveryQueue>>, body: Bytes) -> Response {
    let record: EventRecord = match read_json(&body) {
        Ok(record) => record,
        Err(response) => return response,
    };

    let event = match Event::try_from(record) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid event");
            return failure(e.to_string());
        }
    };

    let event_id = event.id();
    match queue.enqueue(event).await {
        Ok(queue_size) => {
            tracing::info!(%event_id, queue_size, "Enqueued event");
            Json(EnqueueResponse {
                ok: true,
                queue_size,
            })
            .into_response()
        }
        Err(e) => {
            tracing::warn!(%event_id, error = %e, "Could not enqueue event");
            failure(e.to_string())
        }
    }
}

/// GET /dead-letters - Items that exhausted their attempts
pub async fn dead_letters(State(queue): State<Arc<DeliveryQueue>>) -> impl IntoResponse {
    Json(DeadLettersResponse {
        ok: true,
        dead_letters: queue.dead_letters(),
    })
}
