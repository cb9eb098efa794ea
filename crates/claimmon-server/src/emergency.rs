//! Regional emergency data source.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use claimmon_common::types::{EmergencyEvent, RegionalMetrics};
use serde::Deserialize;
use std::time::Duration;

/// One fetch of the regional emergency feed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmergencyReport {
    #[serde(default)]
    pub events: Vec<EmergencyEvent>,
    #[serde(default)]
    pub emergency_traffic_percent: f64,
}

impl EmergencyReport {
    /// Regional snapshot section for this report. Affected counties are the
    /// sorted, de-duplicated union over all events.
    pub fn into_regional(self, now: DateTime<Utc>) -> RegionalMetrics {
        let mut counties: Vec<String> = self
            .events
            .iter()
            .flat_map(|e| e.counties.iter().cloned())
            .collect();
        counties.sort();
        counties.dedup();

        RegionalMetrics {
            active_events: self.events,
            affected_counties: counties,
            emergency_traffic_percent: self.emergency_traffic_percent,
            last_updated: Some(now),
        }
    }
}

#[async_trait]
pub trait EmergencyFeed: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<EmergencyReport>;
}

/// Feed served as JSON over HTTP.
pub struct HttpEmergencyFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpEmergencyFeed {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build emergency feed client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl EmergencyFeed for HttpEmergencyFeed {
    async fn fetch(&self) -> anyhow::Result<EmergencyReport> {
        let report = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<EmergencyReport>()
            .await
            .with_context(|| format!("invalid emergency feed payload from {}", self.url))?;
        Ok(report)
    }
}
