use crate::error::Result;
use crate::plugin::ChannelPlugin;
use crate::NotificationChannel;
use async_trait::async_trait;
use claimmon_common::types::Alert;
use serde_json::Value;

/// Writes alerts to the process log. Never fails.
pub struct ConsoleChannel;

#[async_trait]
impl NotificationChannel for ConsoleChannel {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let actions: Vec<&str> = alert.actions.iter().map(|a| a.action.as_str()).collect();
        if alert.level.is_severe() {
            tracing::error!(
                target: "claimmon::alert",
                alert_id = %alert.id,
                level = %alert.level,
                category = %alert.category,
                actions = ?actions,
                "{}: {}",
                alert.title,
                alert.message
            );
        } else {
            tracing::warn!(
                target: "claimmon::alert",
                alert_id = %alert.id,
                level = %alert.level,
                category = %alert.category,
                actions = ?actions,
                "{}: {}",
                alert.title,
                alert.message
            );
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "console"
    }
}

pub struct ConsolePlugin;

impl ChannelPlugin for ConsolePlugin {
    fn name(&self) -> &str {
        "console"
    }

    fn validate_config(&self, _config: &Value) -> Result<()> {
        Ok(())
    }

    fn create_channel(&self, _config: &Value) -> Result<Box<dyn NotificationChannel>> {
        Ok(Box::new(ConsoleChannel))
    }
}
