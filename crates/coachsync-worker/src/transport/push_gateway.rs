//! Push gateway client.
//!
//! Payload encryption and VAPID signing live in the gateway. This client
//! POSTs `{subscription, payload, ttl}` with a bearer key and maps the
//! status the gateway relays from the push service onto [`PushError`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use coachsync_core::config::PushConfig;
use coachsync_core::error::{AppError, ErrorKind};
use coachsync_core::result::AppResult;
use coachsync_core::traits::{PushError, PushTarget, PushTransport};

#[derive(Debug, Serialize)]
struct SubscriptionKeys<'a> {
    p256dh: &'a str,
    auth: &'a str,
}

#[derive(Debug, Serialize)]
struct SubscriptionBody<'a> {
    endpoint: &'a str,
    keys: SubscriptionKeys<'a>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    subscription: SubscriptionBody<'a>,
    payload: &'a serde_json::Value,
    ttl: u64,
}

/// [`PushTransport`] over an HTTP push gateway.
#[derive(Debug, Clone)]
pub struct PushGatewayClient {
    client: reqwest::Client,
    gateway_url: Option<String>,
    api_key: Option<String>,
    ttl_seconds: u64,
}

impl PushGatewayClient {
    /// Build a client from configuration. Missing credentials yield an
    /// unconfigured client rather than an error.
    pub fn new(config: &PushConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build push HTTP client", e)
            })?;

        Ok(Self {
            client,
            gateway_url: config.gateway_url.clone(),
            api_key: config.api_key.clone(),
            ttl_seconds: config.ttl_seconds,
        })
    }
}

#[async_trait]
impl PushTransport for PushGatewayClient {
    fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.gateway_url) && present(&self.api_key)
    }

    async fn send(&self, target: &PushTarget, payload: &serde_json::Value) -> Result<(), PushError> {
        let (Some(url), Some(api_key)) = (self.gateway_url.as_deref(), self.api_key.as_deref())
        else {
            return Err(PushError::from_status(Some(401), "push gateway not configured"));
        };

        let body = SendRequest {
            subscription: SubscriptionBody {
                endpoint: &target.endpoint,
                keys: SubscriptionKeys {
                    p256dh: &target.p256dh,
                    auth: &target.auth,
                },
            },
            payload,
            ttl: self.ttl_seconds,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PushError::from_status(None, format!("push request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        let message = if detail.trim().is_empty() {
            format!("push gateway returned HTTP {}", status.as_u16())
        } else {
            format!("push gateway returned HTTP {}: {}", status.as_u16(), detail.trim())
        };
        Err(PushError::from_status(Some(status.as_u16()), message))
    }
}
