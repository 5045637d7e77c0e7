//! REST handlers for the three service roles
//!
//! Every business outcome is answered with HTTP 200 and a
//! `{ "ok": bool, "error"?: string }` envelope:
//! - `POST /enqueue` - Add an event to the retry queue
//! - `GET /dead-letters` - Events that exhausted their delivery attempts
//! - `POST /publish` - Fan an event out to all subscribers
//! - `POST /add` - Store a new event built from a candidate
//! - `GET /events` - List stored events, optionally by `type` or `subject`
//! - `GET /events/:id` - Get a single stored event
//!
//! Status codes other than 200 are reserved for transport problems such as
//! malformed JSON (400) or an unknown event id (404).

pub mod events;
pub mod publish;
pub mod queue;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

/// Failed-request envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}

/// Success envelope with no payload
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn new() -> Self {
        Self { ok: true }
    }
}

impl Default for OkResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Business-logic failure: still HTTP 200
pub fn failure(error: impl Into<String>) -> Response {
    (StatusCode::OK, Json(ErrorResponse::new(error))).into_response()
}

/// Decode a JSON request body, answering 400 when it is not valid JSON for `T`
pub fn read_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "Rejected malformed JSON body");
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!("invalid JSON: {}", e))),
        )
            .into_response()
    })
}
