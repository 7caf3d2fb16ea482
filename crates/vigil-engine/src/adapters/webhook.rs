//! Webhook adapter: POSTs `{"text": ...}` to every destination URL.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use vigil_store::config::WebhookConfig;

use crate::adapter::{Alert, ChannelAdapter, Delivery};
use crate::commands::CommandDispatch;
use crate::errors::AdapterError;

pub struct WebhookAdapter {
    name: String,
    client: reqwest::Client,
}

impl WebhookAdapter {
    /// # Errors
    ///
    /// `Connect` when the HTTP client cannot be built.
    pub fn new(name: impl Into<String>, config: &WebhookConfig) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AdapterError::Connect {
                reason: format!("failed to create HTTP client: {}", err),
            })?;
        Ok(Self {
            name: name.into(),
            client,
        })
    }

    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<(), AdapterError> {
        let failed = |reason: String| AdapterError::Delivery {
            destination: url.to_string(),
            reason,
        };
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| failed(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!(
                "HTTP {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            )));
        }
        Ok(())
    }

    /// Every destination gets one attempt; the first failure is reported
    /// after all attempts are made.
    async fn post_all(&self, urls: &[String], body: &serde_json::Value) -> Result<(), AdapterError> {
        let mut first_error = None;
        for url in urls {
            if let Err(err) = self.post(url, body).await {
                tracing::warn!(adapter = %self.name, error = %err, "Webhook post failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl ChannelAdapter for WebhookAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "webhook"
    }

    async fn connect(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn serve(&self, _commands: CommandDispatch) -> Result<(), AdapterError> {
        futures::future::pending::<()>().await;
        Ok(())
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<(), AdapterError> {
        let lines = delivery.plain_lines();
        if lines.is_empty() {
            return Ok(());
        }
        let body = json!({ "text": lines.join("\n") });
        self.post_all(&delivery.destinations, &body).await
    }

    async fn deliver_alert(&self, alert: &Alert) -> Result<(), AdapterError> {
        let body = json!({ "text": alert.text });
        self.post_all(&alert.destinations, &body).await
    }

    async fn disconnect(&self) {}
}
