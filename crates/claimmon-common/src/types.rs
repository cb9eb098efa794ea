use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use utoipa::ToSchema;

/// Alert severity, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use claimmon_common::types::AlertLevel;
///
/// let level: AlertLevel = "error".parse().unwrap();
/// assert_eq!(level, AlertLevel::Error);
/// assert_eq!(level.to_string(), "error");
/// assert!(AlertLevel::Critical > AlertLevel::Error);
/// assert!(AlertLevel::Warning > AlertLevel::Info);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl AlertLevel {
    /// Error-level logging is reserved for `error` and `critical` alerts.
    pub fn is_severe(self) -> bool {
        self >= AlertLevel::Error
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "info"),
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Error => write!(f, "error"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for AlertLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(AlertLevel::Info),
            "warning" | "warn" => Ok(AlertLevel::Warning),
            "error" => Ok(AlertLevel::Error),
            "critical" => Ok(AlertLevel::Critical),
            _ => Err(format!("unknown alert level: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Performance,
    Security,
    Business,
    Ai,
    Regional,
    System,
}

impl std::fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertCategory::Performance => "performance",
            AlertCategory::Security => "security",
            AlertCategory::Business => "business",
            AlertCategory::Ai => "ai",
            AlertCategory::Regional => "regional",
            AlertCategory::System => "system",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for AlertCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "performance" => Ok(AlertCategory::Performance),
            "security" => Ok(AlertCategory::Security),
            "business" => Ok(AlertCategory::Business),
            "ai" => Ok(AlertCategory::Ai),
            "regional" => Ok(AlertCategory::Regional),
            "system" => Ok(AlertCategory::System),
            _ => Err(format!("unknown alert category: {s}")),
        }
    }
}

/// Urgency of a suggested remediation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActionSeverity {
    Low,
    Medium,
    High,
}

/// A suggested remediation attached to an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AlertAction {
    /// Human-readable label, e.g. "Switch to cheaper model".
    pub label: String,
    /// Machine-readable action key, e.g. `switch_model`.
    pub action: String,
    pub severity: ActionSeverity,
}

impl AlertAction {
    pub fn new(label: &str, action: &str, severity: ActionSeverity) -> Self {
        Self {
            label: label.to_string(),
            action: action.to_string(),
            severity,
        }
    }
}

/// Structured context describing why an alert was raised.
///
/// Each producer of alerts has its own variant; `Custom` carries
/// arbitrary string pairs for callers of the public `create_alert` API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertContext {
    Threshold {
        metric: String,
        value: f64,
        threshold: f64,
    },
    AiCost {
        /// `None` for totals across all providers.
        provider: Option<String>,
        /// `daily`, `monthly` or `per_user`.
        period: String,
        spend: f64,
        limit: f64,
    },
    Emergency {
        event_id: String,
        event_type: String,
        counties: Vec<String>,
    },
    Probe {
        probe: String,
        error: Option<String>,
    },
    Custom {
        fields: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Resolution {
    pub note: Option<String>,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AlertMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<AlertContext>,
    /// Set once by the first successful resolve; never overwritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    pub id: String,
    pub level: AlertLevel,
    pub category: AlertCategory,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    #[serde(default)]
    pub metadata: AlertMetadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<AlertAction>,
}

/// Everything needed to create an alert except the id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub level: AlertLevel,
    pub category: AlertCategory,
    pub title: String,
    pub message: String,
    pub context: Option<AlertContext>,
    pub actions: Vec<AlertAction>,
}

impl AlertDraft {
    pub fn new(level: AlertLevel, category: AlertCategory, title: &str, message: &str) -> Self {
        Self {
            level,
            category,
            title: title.to_string(),
            message: message.to_string(),
            context: None,
            actions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: AlertContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_actions(mut self, actions: Vec<AlertAction>) -> Self {
        self.actions = actions;
        self
    }
}

/// Optional filters for listing alerts; set fields are ANDed together.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct AlertFilter {
    pub level: Option<AlertLevel>,
    pub category: Option<AlertCategory>,
    pub resolved: Option<bool>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        self.level.is_none_or(|l| alert.level == l)
            && self.category.is_none_or(|c| alert.category == c)
            && self.resolved.is_none_or(|r| alert.resolved == r)
    }
}

// ---- Metrics snapshot ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResponseTime {
    pub avg: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PerformanceMetrics {
    /// Milliseconds.
    pub response_time: ResponseTime,
    /// Requests per minute.
    pub throughput: f64,
    /// Percentage of requests answered with a 5xx status.
    pub error_rate: f64,
    /// Percentage of physical memory in use.
    pub memory_usage: f64,
    /// Percentage of total CPU in use.
    pub cpu_usage: f64,
    pub sample_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BusinessMetrics {
    pub active_users: u64,
    pub new_signups: u64,
    pub claims_processed: u64,
    pub documents_uploaded: u64,
    pub ai_requests: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProviderMetrics {
    pub requests: u64,
    pub avg_latency_ms: f64,
    pub error_rate: f64,
    pub daily_cost: f64,
    pub monthly_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AiMetrics {
    pub providers: HashMap<String, ProviderMetrics>,
    pub total_daily_cost: f64,
    pub total_monthly_cost: f64,
    /// Daily spend divided by active users; 0 when nobody is active.
    pub cost_per_user: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SecurityMetrics {
    pub failed_logins: u64,
    pub blocked_requests: u64,
    pub suspicious_activity: u64,
    pub rate_limit_hits: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EmergencySeverity {
    Advisory,
    Watch,
    Warning,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmergencyEvent {
    pub id: String,
    /// e.g. `hurricane`, `flood`, `tornado`.
    pub event_type: String,
    pub severity: EmergencySeverity,
    pub title: String,
    #[serde(default)]
    pub counties: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RegionalMetrics {
    pub active_events: Vec<EmergencyEvent>,
    pub affected_counties: Vec<String>,
    /// Share of traffic attributed to emergency-related activity (percent).
    pub emergency_traffic_percent: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// The single current record of all monitored metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetricsSnapshot {
    pub performance: PerformanceMetrics,
    pub business: BusinessMetrics,
    pub ai: AiMetrics,
    pub security: SecurityMetrics,
    pub regional: RegionalMetrics,
    pub collected_at: Option<DateTime<Utc>>,
}

/// Running aggregate for one `category:name` metric key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetricAggregate {
    pub count: u64,
    pub sum: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricAggregate {
    pub fn first(value: f64) -> Self {
        Self {
            count: 1,
            sum: value,
            avg: value,
            min: value,
            max: value,
        }
    }

    pub fn observe(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.avg = self.sum / self.count as f64;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// One timestamped `record_metric` observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetricObservation {
    pub category: String,
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}
