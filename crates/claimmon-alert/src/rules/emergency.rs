use crate::AlertRule;
use claimmon_common::types::{
    ActionSeverity, AlertAction, AlertCategory, AlertContext, AlertDraft, AlertLevel,
    EmergencySeverity, MetricsSnapshot,
};

/// Critical alert for every emergency-level regional event, plus a warning
/// when emergency-driven traffic passes `traffic_warning_percent`.
pub struct RegionalEmergencyRule {
    pub traffic_warning_percent: f64,
}

impl AlertRule for RegionalEmergencyRule {
    fn id(&self) -> &str {
        "regional-emergency"
    }

    fn name(&self) -> &str {
        "Regional emergency"
    }

    fn category(&self) -> AlertCategory {
        AlertCategory::Regional
    }

    fn evaluate(&self, snapshot: &MetricsSnapshot) -> Vec<AlertDraft> {
        let regional = &snapshot.regional;
        let mut drafts: Vec<AlertDraft> = regional
            .active_events
            .iter()
            .filter(|e| e.severity == EmergencySeverity::Emergency)
            .map(|event| {
                let counties = if event.counties.is_empty() {
                    "unspecified counties".to_string()
                } else {
                    event.counties.join(", ")
                };
                AlertDraft::new(
                    AlertLevel::Critical,
                    AlertCategory::Regional,
                    &format!("Emergency: {}", event.title),
                    &format!("{} emergency affecting {counties}", event.event_type),
                )
                .with_context(AlertContext::Emergency {
                    event_id: event.id.clone(),
                    event_type: event.event_type.clone(),
                    counties: event.counties.clone(),
                })
                .with_actions(vec![
                    AlertAction::new(
                        "Activate emergency claim workflows",
                        "activate_emergency_mode",
                        ActionSeverity::High,
                    ),
                    AlertAction::new(
                        "Scale claim intake capacity",
                        "scale_intake",
                        ActionSeverity::Medium,
                    ),
                ])
            })
            .collect();

        if regional.emergency_traffic_percent > self.traffic_warning_percent {
            drafts.push(
                AlertDraft::new(
                    AlertLevel::Warning,
                    AlertCategory::Regional,
                    "Emergency Traffic Surge",
                    &format!(
                        "{:.1}% of traffic is emergency-related (limit {:.1}%)",
                        regional.emergency_traffic_percent, self.traffic_warning_percent
                    ),
                )
                .with_context(AlertContext::Threshold {
                    metric: "regional.emergency_traffic_percent".to_string(),
                    value: regional.emergency_traffic_percent,
                    threshold: self.traffic_warning_percent,
                }),
            );
        }

        drafts
    }
}
