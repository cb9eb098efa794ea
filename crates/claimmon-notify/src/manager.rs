use crate::plugin::ChannelRegistry;
use crate::routing::ChannelRoute;
use crate::utils::redact_sensitive_json;
use crate::NotificationChannel;
use claimmon_common::types::{Alert, AlertLevel};
use serde_json::Value;
use std::collections::HashMap;

pub struct NotificationManager {
    channels: Vec<Box<dyn NotificationChannel>>,
    routes: Vec<ChannelRoute>,
}

impl NotificationManager {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>, routes: Vec<ChannelRoute>) -> Self {
        Self { channels, routes }
    }

    /// Route every alert to every channel.
    pub fn broadcast(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        let routes = (0..channels.len())
            .map(|channel_index| ChannelRoute {
                min_level: AlertLevel::Info,
                channel_index,
            })
            .collect();
        Self::new(channels, routes)
    }

    /// Build the channels named in `enabled` through `registry`.
    ///
    /// `settings` holds each channel type's JSON settings and `min_levels`
    /// its minimum alert level (default `info`). Channels that fail to build
    /// are logged and skipped.
    pub fn from_settings(
        registry: &ChannelRegistry,
        enabled: &[String],
        settings: &HashMap<String, Value>,
        min_levels: &HashMap<String, AlertLevel>,
    ) -> Self {
        let mut channels = Vec::new();
        let mut routes = Vec::new();

        for name in enabled {
            let config = settings.get(name).cloned().unwrap_or(Value::Null);
            match registry.create_channel(name, &config) {
                Ok(channel) => {
                    let min_level = min_levels.get(name).copied().unwrap_or(AlertLevel::Info);
                    tracing::info!(channel = %name, min_level = %min_level, "Notification channel ready");
                    routes.push(ChannelRoute {
                        min_level,
                        channel_index: channels.len(),
                    });
                    channels.push(channel);
                }
                Err(e) => {
                    tracing::error!(
                        channel = %name,
                        config = %redact_sensitive_json(&config),
                        error = %e,
                        "Skipping notification channel"
                    );
                }
            }
        }

        Self::new(channels, routes)
    }

    /// Deliver `alert` to every routed channel. A failing channel is logged
    /// and never stops delivery to the rest. Returns how many channels
    /// accepted the alert.
    pub async fn notify(&self, alert: &Alert) -> usize {
        let mut delivered = 0;
        for route in &self.routes {
            if !route.should_send(alert.level) {
                continue;
            }

            if let Some(channel) = self.channels.get(route.channel_index) {
                match channel.send(alert).await {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        tracing::error!(
                            channel = channel.channel_name(),
                            alert_id = %alert.id,
                            error = %e,
                            "Failed to send notification"
                        );
                    }
                }
            }
        }
        delivered
    }

    pub fn channels(&self) -> &[Box<dyn NotificationChannel>] {
        &self.channels
    }
}
