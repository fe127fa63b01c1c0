//! Push delivery providers.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use serde::Serialize;

use dispatch_database::PushSubscription;

/// Notification content handed to the provider.
#[derive(Debug, Clone, Serialize)]
pub struct PushPayload {
    /// Sender display name.
    pub title: String,
    /// Message content.
    pub body: String,
    /// Deep-link into the chat.
    pub link: String,
}

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    Delivered,
    /// The endpoint is permanently gone; the stored subscription should be
    /// pruned and the delivery not retried.
    Gone,
    /// Any other failure. Logged and swallowed by the dispatcher.
    Failed(String),
}

/// A push delivery backend.
pub trait PushProvider: Send + Sync {
    fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> impl Future<Output = PushOutcome> + Send;
}

/// Provider that posts the payload to the subscription endpoint over HTTPS.
pub struct WebPushProvider {
    client: reqwest::Client,
}

impl WebPushProvider {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build push http client")?;
        Ok(Self { client })
    }
}

impl PushProvider for WebPushProvider {
    async fn send(&self, subscription: &PushSubscription, payload: &PushPayload) -> PushOutcome {
        let body = serde_json::json!({
            "title": payload.title,
            "body": payload.body,
            "link": payload.link,
            "keys": {
                "auth": subscription.auth_key,
                "p256dh": subscription.p256dh_key,
            },
        });

        let response = self
            .client
            .post(&subscription.endpoint)
            .json(&body)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => PushOutcome::Delivered,
            Ok(response)
                if response.status() == StatusCode::GONE
                    || response.status() == StatusCode::NOT_FOUND =>
            {
                PushOutcome::Gone
            }
            Ok(response) => PushOutcome::Failed(format!("provider returned {}", response.status())),
            Err(error) => PushOutcome::Failed(error.to_string()),
        }
    }
}
