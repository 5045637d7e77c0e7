//! HTTP API for the queue, bus and event store roles
//!
//! This module provides one axum router per service role.

pub mod http;
pub mod rest;

pub use http::{bus_router, database_router, queue_router};
