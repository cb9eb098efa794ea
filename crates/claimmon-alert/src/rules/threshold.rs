use crate::AlertRule;
use claimmon_common::types::{
    AlertCategory, AlertContext, AlertDraft, AlertLevel, MetricsSnapshot,
};
use serde::{Deserialize, Serialize};

/// Warning and critical limits for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub warning: f64,
    pub critical: f64,
}

impl Tier {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }
}

/// Reads the watched value out of a snapshot.
pub type Extractor = fn(&MetricsSnapshot) -> f64;

/// Raises a critical alert when the value is above the critical limit,
/// otherwise a warning when it is above the warning limit. Never both for
/// one metric.
pub struct TwoTierThreshold {
    pub id: String,
    /// Used as the alert title, e.g. `"High Response Time"`.
    pub name: String,
    /// Metric path reported in the alert context, e.g. `"performance.response_time.avg"`.
    pub metric: String,
    pub unit: String,
    pub category: AlertCategory,
    pub tier: Tier,
    pub cooldown_secs: u64,
    pub extract: Extractor,
}

impl TwoTierThreshold {
    /// Breached level and the limit that was crossed.
    pub fn classify(&self, value: f64) -> Option<(AlertLevel, f64)> {
        if value > self.tier.critical {
            Some((AlertLevel::Critical, self.tier.critical))
        } else if value > self.tier.warning {
            Some((AlertLevel::Warning, self.tier.warning))
        } else {
            None
        }
    }
}

impl AlertRule for TwoTierThreshold {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> AlertCategory {
        self.category
    }

    fn cooldown_secs(&self) -> u64 {
        self.cooldown_secs
    }

    fn evaluate(&self, snapshot: &MetricsSnapshot) -> Vec<AlertDraft> {
        let value = (self.extract)(snapshot);
        let Some((level, limit)) = self.classify(value) else {
            return Vec::new();
        };

        let message = format!(
            "{} is {:.2}{unit}, above the {} limit of {:.2}{unit}",
            self.metric,
            value,
            level,
            limit,
            unit = self.unit,
        );
        vec![
            AlertDraft::new(level, self.category, &self.name, &message).with_context(
                AlertContext::Threshold {
                    metric: self.metric.clone(),
                    value,
                    threshold: limit,
                },
            ),
        ]
    }
}

/// Built-in performance and security thresholds.
pub struct ThresholdSet {
    pub response_time: Tier,
    pub error_rate: Tier,
    pub memory_usage: Tier,
    pub cpu_usage: Tier,
    pub failed_logins: Tier,
    /// Applied to every threshold rule; zero disables it.
    pub cooldown_secs: u64,
}

fn greater_than_rule(
    id: &str,
    name: &str,
    metric: &str,
    unit: &str,
    category: AlertCategory,
    tier: Tier,
    cooldown_secs: u64,
    extract: Extractor,
) -> Box<dyn AlertRule> {
    Box::new(TwoTierThreshold {
        id: id.to_string(),
        name: name.to_string(),
        metric: metric.to_string(),
        unit: unit.to_string(),
        category,
        tier,
        cooldown_secs,
        extract,
    })
}

fn response_time(s: &MetricsSnapshot) -> f64 {
    s.performance.response_time.avg
}

fn error_rate(s: &MetricsSnapshot) -> f64 {
    s.performance.error_rate
}

fn memory_usage(s: &MetricsSnapshot) -> f64 {
    s.performance.memory_usage
}

fn cpu_usage(s: &MetricsSnapshot) -> f64 {
    s.performance.cpu_usage
}

fn failed_logins(s: &MetricsSnapshot) -> f64 {
    s.security.failed_logins as f64
}

impl ThresholdSet {
    pub fn into_rules(self) -> Vec<Box<dyn AlertRule>> {
        vec![
            greater_than_rule(
                "response-time",
                "High Response Time",
                "performance.response_time.avg",
                "ms",
                AlertCategory::Performance,
                self.response_time,
                self.cooldown_secs,
                response_time,
            ),
            greater_than_rule(
                "error-rate",
                "High Error Rate",
                "performance.error_rate",
                "%",
                AlertCategory::Performance,
                self.error_rate,
                self.cooldown_secs,
                error_rate,
            ),
            greater_than_rule(
                "memory-usage",
                "High Memory Usage",
                "performance.memory_usage",
                "%",
                AlertCategory::Performance,
                self.memory_usage,
                self.cooldown_secs,
                memory_usage,
            ),
            greater_than_rule(
                "cpu-usage",
                "High CPU Usage",
                "performance.cpu_usage",
                "%",
                AlertCategory::Performance,
                self.cpu_usage,
                self.cooldown_secs,
                cpu_usage,
            ),
            greater_than_rule(
                "failed-logins",
                "Failed Login Spike",
                "security.failed_logins",
                "",
                AlertCategory::Security,
                self.failed_logins,
                self.cooldown_secs,
                failed_logins,
            ),
        ]
    }
}
