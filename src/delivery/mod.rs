//! Webhook delivery
//!
//! The queue and the bus never talk HTTP themselves; they are handed a
//! [`Deliver`] implementation. [`WebhookSender`] is the production one,
//! tests inject their own.

mod webhook;

use std::future::Future;

use crate::types::Event;

pub use webhook::WebhookSender;

/// Errors from a single delivery attempt
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The request never produced a response (DNS, connect, timeout)
    #[error("webhook request to {url} failed: {message}")]
    Transport { url: String, message: String },
    /// The endpoint answered with a non-2xx status
    #[error("webhook {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    /// Catch-all for injected sinks
    #[error("delivery to {url} rejected: {reason}")]
    Rejected { url: String, reason: String },
}

impl DeliveryError {
    pub fn rejected(url: impl Into<String>, reason: impl Into<String>) -> Self {
        DeliveryError::Rejected {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Delivers one event to one endpoint
pub trait Deliver: Send + Sync + 'static {
    fn deliver(
        &self,
        url: &str,
        event: &Event,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

impl<D: Deliver> Deliver for std::sync::Arc<D> {
    fn deliver(
        &self,
        url: &str,
        event: &Event,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        (**self).deliver(url, event)
    }
}
