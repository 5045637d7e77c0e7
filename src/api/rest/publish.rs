//! Pub/sub endpoint

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};

use super::{failure, read_json, OkResponse};
use crate::bus::Publisher;
use crate::delivery::Deliver;
use crate::types::{Event, EventRecord};

/// POST /publish - Validate an event and deliver it to every subscriber
pub async fn publish<D: Deliver>(
    State(publisher): State<Arc<Publisher<D>>>,
    body: Bytes,
) -> Response {
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

    match publisher.publish(&event).await {
        Ok(()) => Json(OkResponse::new()).into_response(),
        Err(e) => failure(e.to_string()),
    }
}
