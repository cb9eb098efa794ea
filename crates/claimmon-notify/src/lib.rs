//! Alert notification delivery with pluggable channels.
//!
//! Stored alerts are routed to one or more [`NotificationChannel`]
//! implementations according to each channel's minimum level. Built-in
//! channels are console (tracing), webhook, email (SMTP) and SMS.

pub mod channels;
pub mod error;
pub mod manager;
pub mod plugin;
pub mod routing;
pub mod utils;


use async_trait::async_trait;
use claimmon_common::types::Alert;

/// A delivery target for alerts (log sink, HTTP endpoint, SMTP relay, SMS
/// gateway).
///
/// Implementations are created by the matching [`plugin::ChannelPlugin`].
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers the alert through this channel.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails after retries (if applicable).
    async fn send(&self, alert: &Alert) -> error::Result<()>;

    /// Returns the channel type name (e.g., `"email"`, `"webhook"`).
    fn channel_name(&self) -> &str;
}
