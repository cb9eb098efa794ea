use claimmon_alert::engine::AlertPolicy;
use claimmon_alert::rules::ai_cost::AiCostLimits;
use claimmon_alert::rules::threshold::{ThresholdSet, Tier};
use claimmon_common::types::AlertLevel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Reported by the health endpoint; defaults to the crate version.
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub intervals: IntervalConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub alerting: AlertingConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub emergency: EmergencyConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            version: default_version(),
            intervals: IntervalConfig::default(),
            thresholds: ThresholdConfig::default(),
            alerting: AlertingConfig::default(),
            health: HealthConfig::default(),
            emergency: EmergencyConfig::default(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Timer periods in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalConfig {
    #[serde(default = "default_metrics_collection")]
    pub metrics_collection: u64,
    #[serde(default = "default_alert_check")]
    pub alert_check: u64,
    #[serde(default = "default_health_check")]
    pub health_check: u64,
    /// Period of the AI spend scan.
    #[serde(default = "default_business_metrics")]
    pub business_metrics: u64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            metrics_collection: default_metrics_collection(),
            alert_check: default_alert_check(),
            health_check: default_health_check(),
            business_metrics: default_business_metrics(),
        }
    }
}

fn default_metrics_collection() -> u64 {
    30_000
}

fn default_alert_check() -> u64 {
    60_000
}

fn default_health_check() -> u64 {
    30_000
}

fn default_business_metrics() -> u64 {
    300_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Milliseconds.
    #[serde(default = "default_response_time")]
    pub response_time: Tier,
    /// Percent of requests answered with 5xx.
    #[serde(default = "default_error_rate")]
    pub error_rate: Tier,
    /// Percent.
    #[serde(default = "default_memory_usage")]
    pub memory_usage: Tier,
    /// Percent.
    #[serde(default = "default_cpu_usage")]
    pub cpu_usage: Tier,
    /// Failed logins in the trailing five minutes.
    #[serde(default = "default_failed_logins")]
    pub failed_logins: Tier,
    /// Minimum seconds between repeat drafts of one threshold rule at the
    /// same level. Zero leaves repeats to duplicate suppression.
    #[serde(default)]
    pub cooldown_secs: u64,
    #[serde(default)]
    pub ai_costs: AiCostConfig,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            response_time: default_response_time(),
            error_rate: default_error_rate(),
            memory_usage: default_memory_usage(),
            cpu_usage: default_cpu_usage(),
            failed_logins: default_failed_logins(),
            cooldown_secs: 0,
            ai_costs: AiCostConfig::default(),
        }
    }
}

fn default_response_time() -> Tier {
    Tier::new(1000.0, 3000.0)
}

fn default_error_rate() -> Tier {
    Tier::new(5.0, 10.0)
}

fn default_memory_usage() -> Tier {
    Tier::new(80.0, 90.0)
}

fn default_cpu_usage() -> Tier {
    Tier::new(80.0, 95.0)
}

fn default_failed_logins() -> Tier {
    Tier::new(20.0, 100.0)
}

impl ThresholdConfig {
    pub fn threshold_set(&self) -> ThresholdSet {
        ThresholdSet {
            response_time: self.response_time,
            error_rate: self.error_rate,
            memory_usage: self.memory_usage,
            cpu_usage: self.cpu_usage,
            failed_logins: self.failed_logins,
            cooldown_secs: self.cooldown_secs,
        }
    }
}

/// AI spend limits in USD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiCostConfig {
    #[serde(default = "default_daily_warning")]
    pub daily_warning: f64,
    #[serde(default = "default_daily_critical")]
    pub daily_critical: f64,
    #[serde(default = "default_monthly_warning")]
    pub monthly_warning: f64,
    #[serde(default = "default_monthly_critical")]
    pub monthly_critical: f64,
    #[serde(default = "default_provider_daily_warning")]
    pub provider_daily_warning: f64,
    #[serde(default = "default_provider_daily_critical")]
    pub provider_daily_critical: f64,
    #[serde(default = "default_cost_per_user_warning")]
    pub cost_per_user_warning: f64,
}

impl Default for AiCostConfig {
    fn default() -> Self {
        Self {
            daily_warning: default_daily_warning(),
            daily_critical: default_daily_critical(),
            monthly_warning: default_monthly_warning(),
            monthly_critical: default_monthly_critical(),
            provider_daily_warning: default_provider_daily_warning(),
            provider_daily_critical: default_provider_daily_critical(),
            cost_per_user_warning: default_cost_per_user_warning(),
        }
    }
}

fn default_daily_warning() -> f64 {
    50.0
}

fn default_daily_critical() -> f64 {
    100.0
}

fn default_monthly_warning() -> f64 {
    1000.0
}

fn default_monthly_critical() -> f64 {
    2000.0
}

fn default_provider_daily_warning() -> f64 {
    25.0
}

fn default_provider_daily_critical() -> f64 {
    50.0
}

fn default_cost_per_user_warning() -> f64 {
    0.5
}

impl AiCostConfig {
    pub fn limits(&self) -> AiCostLimits {
        AiCostLimits {
            daily: Tier::new(self.daily_warning, self.daily_critical),
            monthly: Tier::new(self.monthly_warning, self.monthly_critical),
            provider_daily: Tier::new(self.provider_daily_warning, self.provider_daily_critical),
            cost_per_user_warning: self.cost_per_user_warning,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// When false alerts are still stored but never dispatched.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Any of `console`, `webhook`, `email`, `sms`.
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    #[serde(default = "default_true")]
    pub suppress_duplicates: bool,
    #[serde(default = "default_max_alerts_per_hour")]
    pub max_alerts_per_hour: usize,
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,
    #[serde(default = "default_max_retained")]
    pub max_retained: usize,
    /// Per channel type settings handed to the channel plugin.
    #[serde(default)]
    pub channel_settings: HashMap<String, serde_json::Value>,
    /// Per channel type minimum level; channels without an entry get everything.
    #[serde(default)]
    pub min_level: HashMap<String, AlertLevel>,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: default_channels(),
            suppress_duplicates: true,
            max_alerts_per_hour: default_max_alerts_per_hour(),
            dedup_window_secs: default_dedup_window_secs(),
            max_retained: default_max_retained(),
            channel_settings: HashMap::new(),
            min_level: HashMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_channels() -> Vec<String> {
    vec!["console".to_string()]
}

fn default_max_alerts_per_hour() -> usize {
    100
}

fn default_dedup_window_secs() -> u64 {
    300
}

fn default_max_retained() -> usize {
    1000
}

impl AlertingConfig {
    pub fn policy(&self) -> AlertPolicy {
        AlertPolicy {
            suppress_duplicates: self.suppress_duplicates,
            max_alerts_per_hour: self.max_alerts_per_hour,
            dedup_window_secs: self.dedup_window_secs,
            max_retained: self.max_retained,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Per-probe timeout.
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
    /// How often each built-in probe is re-run by the health timer.
    #[serde(default = "default_probe_interval_ms")]
    pub interval_ms: u64,
    /// Health URL of the hosted database backend. The database probe is
    /// skipped when unset.
    #[serde(default)]
    pub database_url: Option<String>,
    /// AI provider name to reachability URL.
    #[serde(default)]
    pub ai_endpoints: BTreeMap<String, String>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_probe_timeout_ms(),
            interval_ms: default_probe_interval_ms(),
            database_url: None,
            ai_endpoints: BTreeMap::new(),
        }
    }
}

fn default_probe_timeout_ms() -> u64 {
    5000
}

fn default_probe_interval_ms() -> u64 {
    30_000
}

impl HealthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyConfig {
    /// JSON feed of active regional emergencies. Regional checks are off
    /// when unset.
    #[serde(default)]
    pub feed_url: Option<String>,
    #[serde(default = "default_feed_timeout_ms")]
    pub timeout_ms: u64,
    /// Share of traffic attributable to emergencies that raises a warning.
    #[serde(default = "default_traffic_warning_percent")]
    pub traffic_warning_percent: f64,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            feed_url: None,
            timeout_ms: default_feed_timeout_ms(),
            traffic_warning_percent: default_traffic_warning_percent(),
        }
    }
}

fn default_feed_timeout_ms() -> u64 {
    10_000
}

fn default_traffic_warning_percent() -> f64 {
    30.0
}

impl MonitorConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
