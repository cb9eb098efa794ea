//! Health-check result types and the worst-case status reduction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl From<bool> for CheckStatus {
    fn from(ok: bool) -> Self {
        if ok {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        }
    }
}

/// Overall status of the monitored process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthCheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub critical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: Vec<HealthCheckResult>,
    /// Seconds since the monitor was constructed.
    pub uptime_secs: u64,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Fold probe results into one status: any `fail` is unhealthy, otherwise
/// any `warn` is degraded, otherwise healthy. An empty set is healthy.
///
/// # Examples
///
/// ```
/// use claimmon_common::health::{reduce_status, CheckStatus, HealthStatus};
///
/// assert_eq!(reduce_status([CheckStatus::Pass, CheckStatus::Warn]), HealthStatus::Degraded);
/// assert_eq!(reduce_status([CheckStatus::Warn, CheckStatus::Fail]), HealthStatus::Unhealthy);
/// assert_eq!(reduce_status([]), HealthStatus::Healthy);
/// ```
pub fn reduce_status<I>(statuses: I) -> HealthStatus
where
    I: IntoIterator<Item = CheckStatus>,
{
    match statuses.into_iter().max() {
        Some(CheckStatus::Fail) => HealthStatus::Unhealthy,
        Some(CheckStatus::Warn) => HealthStatus::Degraded,
        _ => HealthStatus::Healthy,
    }
}

impl HealthReport {
    /// Report used when the aggregation itself could not run.
    pub fn internal_failure(message: &str, uptime_secs: u64, version: &str) -> Self {
        let now = Utc::now();
        Self {
            status: HealthStatus::Unhealthy,
            checks: vec![HealthCheckResult {
                name: "system".to_string(),
                status: CheckStatus::Fail,
                critical: true,
                latency_ms: None,
                message: Some(message.to_string()),
                checked_at: now,
            }],
            uptime_secs,
            version: version.to_string(),
            timestamp: now,
        }
    }
}
