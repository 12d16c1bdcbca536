//! Push notification delivery
//!
//! The server does not speak Web Push itself. Messages are handed to a push
//! gateway over a small JSON webhook; without a gateway they are only logged.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::PushConfig;

#[derive(Debug, Error)]
pub enum NotificationError {
    /// The gateway reports the subscription no longer exists
    #[error("Subscription is gone: {0}")]
    Gone(String),

    #[error("Push gateway returned {status}: {body}")]
    Gateway { status: u16, body: String },

    #[error("Push request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Notification payload delivered to one device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// Extra data for the client, such as the reminder id
    pub data: serde_json::Value,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, endpoint: &str, message: &PushMessage) -> Result<(), NotificationError>;
}

#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    endpoint: &'a str,
    title: &'a str,
    body: &'a str,
    data: &'a serde_json::Value,
}

/// Sender that POSTs each message to the configured push gateway
#[derive(Debug, Clone)]
pub struct WebhookPushSender {
    client: Client,
    gateway_url: String,
    gateway_key: Option<String>,
}

impl WebhookPushSender {
    pub fn new(gateway_url: impl Into<String>, gateway_key: Option<String>) -> Result<Self, NotificationError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            gateway_url: gateway_url.into(),
            gateway_key,
        })
    }
}

#[async_trait]
impl NotificationSender for WebhookPushSender {
    async fn send(&self, endpoint: &str, message: &PushMessage) -> Result<(), NotificationError> {
        let payload = GatewayRequest {
            endpoint,
            title: &message.title,
            body: &message.body,
            data: &message.data,
        };

        let mut request = self.client.post(&self.gateway_url).json(&payload);
        if let Some(key) = &self.gateway_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        match status {
            s if s.is_success() => {
                debug!("Push delivered to {}", endpoint);
                Ok(())
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(NotificationError::Gone(endpoint.to_string())),
            _ => Err(NotificationError::Gateway {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

/// Sender used when no gateway is configured
#[derive(Debug, Clone, Default)]
pub struct LoggingPushSender;

#[async_trait]
impl NotificationSender for LoggingPushSender {
    async fn send(&self, endpoint: &str, message: &PushMessage) -> Result<(), NotificationError> {
        info!(endpoint = %endpoint, title = %message.title, "Push gateway not configured, notification logged only");
        Ok(())
    }
}

/// Pick the webhook sender when a gateway is configured, the logging one otherwise
pub fn sender_from_config(config: &PushConfig) -> Result<Arc<dyn NotificationSender>, NotificationError> {
    match &config.gateway_url {
        Some(url) => Ok(Arc::new(WebhookPushSender::new(url.clone(), config.gateway_key.clone())?)),
        None => Ok(Arc::new(LoggingPushSender)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> PushMessage {
        PushMessage {
            title: "Take Sumatriptan".to_string(),
            body: "50mg".to_string(),
            data: serde_json::json!({ "reminder_id": "abc" }),
        }
    }

    #[tokio::test]
    async fn test_webhook_posts_payload_with_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/push"))
            .and(header("authorization", "Bearer gateway-key"))
            .and(body_partial_json(serde_json::json!({
                "endpoint": "device-1",
                "title": "Take Sumatriptan"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let sender = WebhookPushSender::new(format!("{}/push", server.uri()), Some("gateway-key".into())).unwrap();
        sender.send("device-1", &message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_gone_subscription_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let sender = WebhookPushSender::new(format!("{}/push", server.uri()), None).unwrap();
        let result = sender.send("device-1", &message()).await;
        assert!(matches!(result, Err(NotificationError::Gone(_))));
    }

    #[tokio::test]
    async fn test_gateway_failure_is_not_gone() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let sender = WebhookPushSender::new(format!("{}/push", server.uri()), None).unwrap();
        let result = sender.send("device-1", &message()).await;
        assert!(matches!(result, Err(NotificationError::Gateway { status: 500, .. })));
    }

    #[test]
    fn test_logging_sender_always_succeeds() {
        let result = tokio_test::block_on(LoggingPushSender.send("device-1", &message()));
        assert!(result.is_ok());
    }
}
