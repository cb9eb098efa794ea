use crate::channels::backoff;
use crate::error::{NotifyError, Result};
use crate::plugin::{parse_config, ChannelPlugin};
use crate::utils::short_text;
use crate::NotificationChannel;
use async_trait::async_trait;
use claimmon_common::types::Alert;
use serde::Deserialize;
use serde_json::Value;

/// Longest SMS body sent to the gateway.
const MAX_SMS_CHARS: usize = 320;

pub struct SmsChannel {
    client: reqwest::Client,
    gateway_url: String,
    api_key: String,
    phone_numbers: Vec<String>,
}

impl SmsChannel {
    pub fn new(gateway_url: &str, api_key: &str, phone_numbers: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url: gateway_url.to_string(),
            api_key: api_key.to_string(),
            phone_numbers,
        }
    }

    fn format_message(alert: &Alert) -> String {
        short_text(alert).chars().take(MAX_SMS_CHARS).collect()
    }

    async fn send_one(&self, phone: &str, message: &str) -> Result<()> {
        let payload = serde_json::json!({
            "to": phone,
            "message": message,
        });

        let mut last_err = None;
        for attempt in 0..3u32 {
            match self
                .client
                .post(&self.gateway_url)
                .bearer_auth(&self.api_key)
                .json(&payload)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    let status = resp.status();
                    tracing::warn!(
                        attempt = attempt + 1,
                        phone = %phone,
                        status = %status,
                        "SMS gateway returned error, retrying"
                    );
                    last_err = Some(NotifyError::ApiError {
                        service: "sms".to_string(),
                        status: status.as_u16(),
                        body: String::new(),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        phone = %phone,
                        error = %e,
                        "SMS send failed, retrying"
                    );
                    last_err = Some(e.into());
                }
            }
            if attempt < 2 {
                tokio::time::sleep(backoff(attempt)).await;
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    /// Texts every configured number; fails if any number could not be reached.
    async fn send(&self, alert: &Alert) -> Result<()> {
        let message = Self::format_message(alert);

        let mut first_err = None;
        for phone in &self.phone_numbers {
            if let Err(e) = self.send_one(phone, &message).await {
                tracing::error!(phone = %phone, error = %e, "SMS failed after 3 attempts");
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn channel_name(&self) -> &str {
        "sms"
    }
}

// Plugin

#[derive(Deserialize)]
struct SmsConfig {
    gateway_url: String,
    api_key: String,
    phone_numbers: Vec<String>,
}

pub struct SmsPlugin;

impl ChannelPlugin for SmsPlugin {
    fn name(&self) -> &str {
        "sms"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        let cfg: SmsConfig = parse_config("sms", config)?;
        if cfg.phone_numbers.is_empty() {
            return Err(NotifyError::InvalidConfig(
                "sms: phone_numbers is empty".to_string(),
            ));
        }
        Ok(())
    }

    fn create_channel(&self, config: &Value) -> Result<Box<dyn NotificationChannel>> {
        let cfg: SmsConfig = parse_config("sms", config)?;
        Ok(Box::new(SmsChannel::new(
            &cfg.gateway_url,
            &cfg.api_key,
            cfg.phone_numbers,
        )))
    }
}
