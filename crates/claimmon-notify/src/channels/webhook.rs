use crate::channels::backoff;
use crate::error::{NotifyError, Result};
use crate::plugin::{parse_config, ChannelPlugin};
use crate::utils::{truncate_string, MAX_BODY_LENGTH};
use crate::NotificationChannel;
use async_trait::async_trait;
use claimmon_common::types::Alert;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

const ATTEMPTS: u32 = 3;

/// POSTs the alert as JSON to a fixed URL.
pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
    headers: BTreeMap<String, String>,
}

impl WebhookChannel {
    pub fn new(url: &str, headers: BTreeMap<String, String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            headers,
        })
    }

    fn payload(alert: &Alert) -> Value {
        serde_json::json!({
            "source": "claimmon",
            "alert": alert,
        })
    }

    async fn post_once(&self, payload: &Value) -> Result<()> {
        let mut request = self.client.post(&self.url).json(payload);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let resp = request.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = match resp.text().await {
            Ok(text) => truncate_string(&text, MAX_BODY_LENGTH),
            Err(e) => format!("[Failed to read response body: {e}]"),
        };
        Err(NotifyError::ApiError {
            service: "webhook".to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let payload = Self::payload(alert);

        let mut attempt = 0;
        loop {
            match self.post_once(&payload).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt + 1 < ATTEMPTS => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url = %self.url,
                        error = %e,
                        "Webhook send failed, retrying"
                    );
                    tokio::time::sleep(backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(url = %self.url, error = %e, "Webhook failed after {ATTEMPTS} attempts");
                    return Err(e);
                }
            }
        }
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

// Plugin

#[derive(Deserialize)]
struct WebhookConfig {
    url: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

pub struct WebhookPlugin;

impl ChannelPlugin for WebhookPlugin {
    fn name(&self) -> &str {
        "webhook"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        let cfg: WebhookConfig = parse_config("webhook", config)?;
        if !(cfg.url.starts_with("http://") || cfg.url.starts_with("https://")) {
            return Err(NotifyError::InvalidConfig(format!(
                "webhook: url must be http(s), got '{}'",
                cfg.url
            )));
        }
        Ok(())
    }

    fn create_channel(&self, config: &Value) -> Result<Box<dyn NotificationChannel>> {
        let cfg: WebhookConfig = parse_config("webhook", config)?;
        Ok(Box::new(WebhookChannel::new(
            &cfg.url,
            cfg.headers,
            Duration::from_millis(cfg.timeout_ms),
        )?))
    }
}
