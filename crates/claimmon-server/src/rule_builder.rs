use crate::config::MonitorConfig;
use claimmon_alert::rules::ai_cost::AiCostRule;
use claimmon_alert::rules::emergency::RegionalEmergencyRule;
use claimmon_alert::AlertRule;
use claimmon_common::types::AlertCategory;

/// Categories evaluated by the alert-check timer.
pub const SYSTEM_CATEGORIES: &[AlertCategory] = &[AlertCategory::Performance, AlertCategory::Security];

/// Build the static rule set from configuration.
pub fn build_rules(config: &MonitorConfig) -> Vec<Box<dyn AlertRule>> {
    let mut rules = config.thresholds.threshold_set().into_rules();
    rules.push(Box::new(AiCostRule::new(config.thresholds.ai_costs.limits())));
    rules.push(Box::new(RegionalEmergencyRule {
        traffic_warning_percent: config.emergency.traffic_warning_percent,
    }));

    tracing::info!(count = rules.len(), "Alert rules loaded");
    rules
}
