use crate::rules::threshold::Tier;
use crate::AlertRule;
use claimmon_common::types::{
    ActionSeverity, AlertAction, AlertCategory, AlertContext, AlertDraft, AlertLevel,
    MetricsSnapshot,
};
use serde::{Deserialize, Serialize};

/// Spend limits in USD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AiCostLimits {
    pub daily: Tier,
    pub monthly: Tier,
    /// Daily spend of any single provider.
    pub provider_daily: Tier,
    /// Daily spend divided by active users.
    pub cost_per_user_warning: f64,
}

/// Two-tier checks on daily, monthly and per-provider AI spend plus a
/// warning on spend per active user.
pub struct AiCostRule {
    limits: AiCostLimits,
}

impl AiCostRule {
    pub fn new(limits: AiCostLimits) -> Self {
        Self { limits }
    }
}

/// Remediation suggested with every critical spend alert.
fn cost_actions() -> Vec<AlertAction> {
    vec![
        AlertAction::new(
            "Review AI usage by feature",
            "review_usage",
            ActionSeverity::High,
        ),
        AlertAction::new(
            "Switch to cheaper models",
            "switch_model",
            ActionSeverity::Medium,
        ),
        AlertAction::new(
            "Enable response caching",
            "enable_caching",
            ActionSeverity::Medium,
        ),
    ]
}

fn classify(spend: f64, tier: Tier) -> Option<(AlertLevel, f64)> {
    if spend > tier.critical {
        Some((AlertLevel::Critical, tier.critical))
    } else if spend > tier.warning {
        Some((AlertLevel::Warning, tier.warning))
    } else {
        None
    }
}

fn spend_draft(
    title: &str,
    subject: &str,
    provider: Option<&str>,
    period: &str,
    spend: f64,
    tier: Tier,
) -> Option<AlertDraft> {
    let (level, limit) = classify(spend, tier)?;
    let message = format!("{subject} ${spend:.2} exceeds the {level} limit of ${limit:.2}");
    let draft = AlertDraft::new(level, AlertCategory::Ai, title, &message).with_context(
        AlertContext::AiCost {
            provider: provider.map(str::to_string),
            period: period.to_string(),
            spend,
            limit,
        },
    );
    Some(if level == AlertLevel::Critical {
        draft.with_actions(cost_actions())
    } else {
        draft
    })
}

impl AlertRule for AiCostRule {
    fn id(&self) -> &str {
        "ai-costs"
    }

    fn name(&self) -> &str {
        "AI spend"
    }

    fn category(&self) -> AlertCategory {
        AlertCategory::Ai
    }

    fn evaluate(&self, snapshot: &MetricsSnapshot) -> Vec<AlertDraft> {
        let ai = &snapshot.ai;
        let mut drafts = Vec::new();

        drafts.extend(spend_draft(
            "AI Daily Spend",
            "Daily AI spend",
            None,
            "daily",
            ai.total_daily_cost,
            self.limits.daily,
        ));
        drafts.extend(spend_draft(
            "AI Monthly Spend",
            "Monthly AI spend",
            None,
            "monthly",
            ai.total_monthly_cost,
            self.limits.monthly,
        ));

        let mut providers: Vec<_> = ai.providers.iter().collect();
        providers.sort_by(|a, b| a.0.cmp(b.0));
        for (name, provider) in providers {
            drafts.extend(spend_draft(
                &format!("AI Provider Spend: {name}"),
                &format!("Daily {name} spend"),
                Some(name.as_str()),
                "daily",
                provider.daily_cost,
                self.limits.provider_daily,
            ));
        }

        if ai.cost_per_user > self.limits.cost_per_user_warning {
            let message = format!(
                "AI spend per active user ${:.2} exceeds ${:.2}",
                ai.cost_per_user, self.limits.cost_per_user_warning
            );
            drafts.push(
                AlertDraft::new(
                    AlertLevel::Warning,
                    AlertCategory::Ai,
                    "AI Cost Per User",
                    &message,
                )
                .with_context(AlertContext::AiCost {
                    provider: None,
                    period: "per_user".to_string(),
                    spend: ai.cost_per_user,
                    limit: self.limits.cost_per_user_warning,
                }),
            );
        }

        drafts
    }
}
