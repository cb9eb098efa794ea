use crate::window::SlidingWindow;
use crate::AlertRule;
use chrono::{DateTime, Duration, Utc};
use claimmon_common::types::{
    Alert, AlertCategory, AlertDraft, AlertFilter, AlertLevel, AlertMetadata, MetricsSnapshot,
    Resolution,
};
use std::collections::{HashMap, VecDeque};

const RATE_WINDOW_SECS: u64 = 3600;

/// Admission policy for new alerts.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertPolicy {
    pub suppress_duplicates: bool,
    pub max_alerts_per_hour: usize,
    /// Identical unresolved alerts inside this window are suppressed.
    pub dedup_window_secs: u64,
    /// Oldest alerts are dropped beyond this many.
    pub max_retained: usize,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            suppress_duplicates: true,
            max_alerts_per_hour: 100,
            dedup_window_secs: 300,
            max_retained: 1000,
        }
    }
}

/// What happened to a create request. Every variant carries the generated
/// id; only `Created` refers to a stored alert.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(Alert),
    Duplicate { id: String },
    RateLimited { id: String },
}

impl CreateOutcome {
    pub fn id(&self) -> &str {
        match self {
            CreateOutcome::Created(alert) => &alert.id,
            CreateOutcome::Duplicate { id } | CreateOutcome::RateLimited { id } => id,
        }
    }

    pub fn alert(&self) -> Option<&Alert> {
        match self {
            CreateOutcome::Created(alert) => Some(alert),
            _ => None,
        }
    }
}

/// Key: (rule_id, title, level)
type CooldownKey = (String, String, AlertLevel);

pub struct AlertEngine {
    policy: AlertPolicy,
    rules: Vec<Box<dyn AlertRule>>,
    /// Newest first.
    alerts: VecDeque<Alert>,
    admitted: SlidingWindow,
    /// End of the cooldown per key. Only rules with a non-zero cooldown
    /// insert here, and expired entries are pruned on every evaluation.
    cooling_until: HashMap<CooldownKey, DateTime<Utc>>,
}

impl AlertEngine {
    pub fn new(policy: AlertPolicy, rules: Vec<Box<dyn AlertRule>>) -> Self {
        Self {
            policy,
            rules,
            alerts: VecDeque::new(),
            admitted: SlidingWindow::new(RATE_WINDOW_SECS),
            cooling_until: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    pub fn rules(&self) -> &[Box<dyn AlertRule>] {
        &self.rules
    }

    /// Get a rule by its ID.
    pub fn get_rule(&self, id: &str) -> Option<&dyn AlertRule> {
        self.rules.iter().find(|r| r.id() == id).map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub(crate) fn cooling_keys(&self) -> usize {
        self.cooling_until.len()
    }

    /// Turn a draft into an alert record unless it is a recent duplicate or
    /// the hourly budget is spent.
    pub fn create(&mut self, draft: AlertDraft, now: DateTime<Utc>) -> CreateOutcome {
        let id = claimmon_common::id::next_alert_id();

        if self.policy.suppress_duplicates {
            let cutoff = now - Duration::seconds(self.policy.dedup_window_secs as i64);
            let duplicate = self.alerts.iter().any(|a| {
                !a.resolved
                    && a.title == draft.title
                    && a.category == draft.category
                    && a.level == draft.level
                    && a.timestamp > cutoff
            });
            if duplicate {
                tracing::debug!(
                    title = %draft.title,
                    category = %draft.category,
                    level = %draft.level,
                    "Alert suppressed (duplicate)"
                );
                return CreateOutcome::Duplicate { id };
            }
        }

        if self.admitted.count(now) >= self.policy.max_alerts_per_hour {
            tracing::warn!(
                title = %draft.title,
                limit = self.policy.max_alerts_per_hour,
                "Alert dropped (hourly rate limit reached)"
            );
            return CreateOutcome::RateLimited { id };
        }

        let alert = Alert {
            id,
            level: draft.level,
            category: draft.category,
            title: draft.title,
            message: draft.message,
            timestamp: now,
            resolved: false,
            metadata: AlertMetadata {
                context: draft.context,
                resolution: None,
            },
            actions: draft.actions,
        };

        self.admitted.push(now);
        self.alerts.push_front(alert.clone());
        self.alerts.truncate(self.policy.max_retained);

        if alert.level.is_severe() {
            tracing::error!(
                alert_id = %alert.id,
                level = %alert.level,
                category = %alert.category,
                title = %alert.title,
                message = %alert.message,
                "Alert raised"
            );
        } else {
            tracing::warn!(
                alert_id = %alert.id,
                level = %alert.level,
                category = %alert.category,
                title = %alert.title,
                message = %alert.message,
                "Alert raised"
            );
        }

        CreateOutcome::Created(alert)
    }

    /// Mark an alert resolved. Returns false only when the id is unknown;
    /// resolving an already resolved alert changes nothing.
    pub fn resolve(&mut self, id: &str, note: Option<String>, now: DateTime<Utc>) -> bool {
        let Some(alert) = self.alerts.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        if alert.resolved {
            return true;
        }
        alert.resolved = true;
        alert.metadata.resolution = Some(Resolution {
            note,
            resolved_at: now,
        });
        tracing::info!(alert_id = %id, title = %alert.title, "Alert resolved");
        true
    }

    pub fn get(&self, id: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }

    /// Alerts matching `filter`, newest first.
    pub fn list(&self, filter: &AlertFilter) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts
    }

    /// Run every rule of the given categories against `snapshot` and return
    /// the drafts that are not inside their rule's cooldown.
    pub fn evaluate(
        &mut self,
        snapshot: &MetricsSnapshot,
        categories: &[AlertCategory],
        now: DateTime<Utc>,
    ) -> Vec<AlertDraft> {
        let mut drafts = Vec::new();
        self.cooling_until.retain(|_, until| *until > now);

        for rule in &self.rules {
            if !categories.contains(&rule.category()) {
                continue;
            }

            let cooldown_secs = rule.cooldown_secs();
            for draft in rule.evaluate(snapshot) {
                if cooldown_secs == 0 {
                    drafts.push(draft);
                    continue;
                }

                let key = (rule.id().to_string(), draft.title.clone(), draft.level);
                if self.cooling_until.contains_key(&key) {
                    tracing::debug!(
                        rule_id = rule.id(),
                        title = %draft.title,
                        "Alert suppressed (cooldown)"
                    );
                } else {
                    self.cooling_until
                        .insert(key, now + Duration::seconds(cooldown_secs as i64));
                    drafts.push(draft);
                }
            }
        }

        drafts
    }
}
