//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::rest::{events, publish, queue};
use crate::bus::Publisher;
use crate::delivery::Deliver;
use crate::event_store::EventStore;
use crate::queue::DeliveryQueue;

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Router for the retry queue role
pub fn queue_router(queue: Arc<DeliveryQueue>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/enqueue", post(queue::enqueue))
        .route("/dead-letters", get(queue::dead_letters))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(queue)
}

/// Router for the pub/sub bus role
pub fn bus_router<D: Deliver>(publisher: Arc<Publisher<D>>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/publish", post(publish::publish::<D>))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(publisher)
}

/// Router for the event store role
pub fn database_router(store: Arc<EventStore>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/add", post(events::add_event))
        .route("/events", get(events::list_events))
        .route("/events/:id", get(events::get_event))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
