//! HTTP webhook transport

use std::time::Duration;

use super::{Deliver, DeliveryError};
use crate::types::Event;

/// HTTP request timeout for a single delivery attempt
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts events as JSON to webhook URLs
#[derive(Debug, Clone)]
pub struct WebhookSender {
    client: reqwest::Client,
}

impl WebhookSender {
    /// Create a sender with the default request timeout
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Deliver for WebhookSender {
    async fn deliver(&self, url: &str, event: &Event) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(url)
            .json(event)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Body is informational only
        match response.text().await {
            Ok(body) => tracing::debug!(url, event_id = %event.id(), body = %body, "Webhook response"),
            Err(e) => tracing::debug!(url, error = %e, "Could not read webhook response body"),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Candidate;
    use serde_json::json;

    #[test]
    fn test_new_builds_client() {
        assert!(WebhookSender::new().is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = DeliveryError::Status {
            url: "http://localhost:4000".to_string(),
            status: 502,
        };
        assert_eq!(err.to_string(), "webhook http://localhost:4000 returned HTTP 502");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let sender = WebhookSender::with_timeout(Duration::from_millis(500)).unwrap();
        let event = Event::new(Candidate::new(
            "user.new",
            "https://example.com",
            "/users/1",
            json!({}),
        ))
        .unwrap();

        // Port 9 (discard) on localhost is not expected to accept HTTP
        let err = sender
            .deliver("http://127.0.0.1:9/webhook", &event)
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Transport { .. }));
    }
}
