use crate::engine::{AlertEngine, AlertPolicy, CreateOutcome};
use crate::rules::ai_cost::{AiCostLimits, AiCostRule};
use crate::rules::emergency::RegionalEmergencyRule;
use crate::rules::threshold::{ThresholdSet, Tier, TwoTierThreshold};
use crate::AlertRule;
use chrono::{Duration, Utc};
use claimmon_common::types::{
    AlertCategory, AlertContext, AlertDraft, AlertFilter, AlertLevel, EmergencyEvent,
    EmergencySeverity, MetricsSnapshot, ProviderMetrics,
};

fn draft(level: AlertLevel, title: &str) -> AlertDraft {
    AlertDraft::new(level, AlertCategory::Performance, title, "details")
}

fn thresholds() -> ThresholdSet {
    ThresholdSet {
        response_time: Tier::new(100.0, 200.0),
        error_rate: Tier::new(5.0, 10.0),
        memory_usage: Tier::new(80.0, 90.0),
        cpu_usage: Tier::new(80.0, 95.0),
        failed_logins: Tier::new(20.0, 100.0),
        cooldown_secs: 0,
    }
}

fn cost_limits() -> AiCostLimits {
    AiCostLimits {
        daily: Tier::new(50.0, 100.0),
        monthly: Tier::new(1000.0, 2000.0),
        provider_daily: Tier::new(25.0, 50.0),
        cost_per_user_warning: 0.5,
    }
}

#[test]
fn duplicate_within_window_is_suppressed() {
    let mut engine = AlertEngine::new(AlertPolicy::default(), vec![]);
    let now = Utc::now();

    let first = engine.create(draft(AlertLevel::Warning, "High CPU Usage"), now);
    assert!(matches!(first, CreateOutcome::Created(_)));

    let second = engine.create(
        draft(AlertLevel::Warning, "High CPU Usage"),
        now + Duration::seconds(60),
    );
    assert!(matches!(second, CreateOutcome::Duplicate { .. }));
    assert!(second.id().starts_with("alert_"));
    assert_ne!(second.id(), first.id());
    assert_eq!(engine.len(), 1);
}

#[test]
fn duplicate_after_window_or_resolution_is_stored() {
    let mut engine = AlertEngine::new(AlertPolicy::default(), vec![]);
    let now = Utc::now();

    engine.create(draft(AlertLevel::Warning, "High CPU Usage"), now);
    let later = engine.create(
        draft(AlertLevel::Warning, "High CPU Usage"),
        now + Duration::seconds(301),
    );
    assert!(matches!(later, CreateOutcome::Created(_)));

    assert!(engine.resolve(later.id(), None, now + Duration::seconds(302)));
    // The first alert is outside the window and the second is resolved.
    let again = engine.create(
        draft(AlertLevel::Warning, "High CPU Usage"),
        now + Duration::seconds(610),
    );
    assert!(matches!(again, CreateOutcome::Created(_)));
    assert_eq!(engine.len(), 3);
}

#[test]
fn different_level_is_not_a_duplicate() {
    let mut engine = AlertEngine::new(AlertPolicy::default(), vec![]);
    let now = Utc::now();

    engine.create(draft(AlertLevel::Warning, "High CPU Usage"), now);
    let critical = engine.create(draft(AlertLevel::Critical, "High CPU Usage"), now);
    assert!(matches!(critical, CreateOutcome::Created(_)));
}

#[test]
fn suppression_can_be_disabled() {
    let policy = AlertPolicy {
        suppress_duplicates: false,
        ..Default::default()
    };
    let mut engine = AlertEngine::new(policy, vec![]);
    let now = Utc::now();

    engine.create(draft(AlertLevel::Info, "Deploy finished"), now);
    engine.create(draft(AlertLevel::Info, "Deploy finished"), now);
    assert_eq!(engine.len(), 2);
}

#[test]
fn hourly_rate_limit_drops_excess() {
    let policy = AlertPolicy {
        max_alerts_per_hour: 3,
        ..Default::default()
    };
    let mut engine = AlertEngine::new(policy, vec![]);
    let now = Utc::now();

    for i in 0..3 {
        let out = engine.create(draft(AlertLevel::Warning, &format!("alert {i}")), now);
        assert!(matches!(out, CreateOutcome::Created(_)));
    }
    let dropped = engine.create(draft(AlertLevel::Critical, "one too many"), now);
    assert!(matches!(dropped, CreateOutcome::RateLimited { .. }));
    assert!(dropped.alert().is_none());
    assert_eq!(engine.len(), 3);

    // Budget refills once the oldest admissions leave the hour.
    let next_hour = engine.create(
        draft(AlertLevel::Critical, "one too many"),
        now + Duration::seconds(3601),
    );
    assert!(matches!(next_hour, CreateOutcome::Created(_)));
}

#[test]
fn retained_alerts_are_capped_newest_first() {
    let policy = AlertPolicy {
        max_retained: 5,
        max_alerts_per_hour: 100,
        ..Default::default()
    };
    let mut engine = AlertEngine::new(policy, vec![]);
    let start = Utc::now();

    for i in 0..8 {
        engine.create(
            draft(AlertLevel::Info, &format!("alert {i}")),
            start + Duration::seconds(i),
        );
    }

    let alerts = engine.list(&AlertFilter::default());
    assert_eq!(alerts.len(), 5);
    assert_eq!(alerts[0].title, "alert 7");
    assert_eq!(alerts[4].title, "alert 3");
}

#[test]
fn resolve_keeps_first_resolution() {
    let mut engine = AlertEngine::new(AlertPolicy::default(), vec![]);
    let now = Utc::now();
    let id = engine
        .create(draft(AlertLevel::Error, "Cache down"), now)
        .id()
        .to_string();

    assert!(engine.resolve(&id, Some("restarted redis".into()), now));
    assert!(engine.resolve(&id, Some("second note".into()), now + Duration::seconds(5)));

    let alert = engine.get(&id).expect("alert stored");
    assert!(alert.resolved);
    let resolution = alert.metadata.resolution.as_ref().expect("resolution");
    assert_eq!(resolution.note.as_deref(), Some("restarted redis"));
    assert_eq!(resolution.resolved_at, now);

    assert!(!engine.resolve("alert_missing", None, now));
}

#[test]
fn list_applies_all_filters() {
    let mut engine = AlertEngine::new(AlertPolicy::default(), vec![]);
    let now = Utc::now();

    engine.create(draft(AlertLevel::Warning, "slow"), now);
    let err = engine.create(draft(AlertLevel::Error, "broken"), now + Duration::seconds(1));
    engine.create(
        AlertDraft::new(AlertLevel::Error, AlertCategory::Security, "intrusion", "x"),
        now + Duration::seconds(2),
    );
    engine.resolve(err.id(), None, now + Duration::seconds(3));

    let errors = engine.list(&AlertFilter {
        level: Some(AlertLevel::Error),
        ..Default::default()
    });
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].title, "intrusion");

    let open_perf = engine.list(&AlertFilter {
        category: Some(AlertCategory::Performance),
        resolved: Some(false),
        ..Default::default()
    });
    assert_eq!(open_perf.len(), 1);
    assert_eq!(open_perf[0].title, "slow");
}

#[test]
fn threshold_prefers_critical_over_warning() {
    let mut snapshot = MetricsSnapshot::default();
    snapshot.performance.response_time.avg = 250.0;

    let rules = thresholds().into_rules();
    let drafts: Vec<AlertDraft> = rules.iter().flat_map(|r| r.evaluate(&snapshot)).collect();

    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].level, AlertLevel::Critical);
    assert_eq!(drafts[0].title, "High Response Time");
    assert_eq!(
        drafts[0].context,
        Some(AlertContext::Threshold {
            metric: "performance.response_time.avg".into(),
            value: 250.0,
            threshold: 200.0,
        })
    );
}

#[test]
fn threshold_warning_and_quiet() {
    let mut snapshot = MetricsSnapshot::default();
    snapshot.performance.cpu_usage = 85.0;
    snapshot.security.failed_logins = 10;

    let drafts: Vec<AlertDraft> = thresholds()
        .into_rules()
        .iter()
        .flat_map(|r| r.evaluate(&snapshot))
        .collect();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].level, AlertLevel::Warning);
    assert_eq!(drafts[0].title, "High CPU Usage");
}

#[test]
fn ai_daily_critical_carries_actions() {
    let mut snapshot = MetricsSnapshot::default();
    snapshot.ai.total_daily_cost = 120.0;

    let drafts = AiCostRule::new(cost_limits()).evaluate(&snapshot);
    assert_eq!(drafts.len(), 1);
    let daily = &drafts[0];
    assert_eq!(daily.level, AlertLevel::Critical);
    assert_eq!(daily.title, "AI Daily Spend");
    let keys: Vec<&str> = daily.actions.iter().map(|a| a.action.as_str()).collect();
    assert_eq!(keys, vec!["review_usage", "switch_model", "enable_caching"]);
}

#[test]
fn ai_provider_and_per_user_warnings() {
    let mut snapshot = MetricsSnapshot::default();
    snapshot.ai.providers.insert(
        "openai".into(),
        ProviderMetrics {
            daily_cost: 30.0,
            ..Default::default()
        },
    );
    snapshot.ai.providers.insert(
        "anthropic".into(),
        ProviderMetrics {
            daily_cost: 5.0,
            ..Default::default()
        },
    );
    snapshot.ai.cost_per_user = 0.75;

    let drafts = AiCostRule::new(cost_limits()).evaluate(&snapshot);
    let titles: Vec<&str> = drafts.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["AI Provider Spend: openai", "AI Cost Per User"]);
    assert!(drafts.iter().all(|d| d.level == AlertLevel::Warning));
    assert!(drafts.iter().all(|d| d.actions.is_empty()));
}

#[test]
fn emergency_events_raise_critical_alerts() {
    let mut snapshot = MetricsSnapshot::default();
    snapshot.regional.active_events = vec![
        EmergencyEvent {
            id: "fl-001".into(),
            event_type: "hurricane".into(),
            severity: EmergencySeverity::Emergency,
            title: "Hurricane Milton".into(),
            counties: vec!["Pinellas".into(), "Hillsborough".into()],
        },
        EmergencyEvent {
            id: "fl-002".into(),
            event_type: "flood".into(),
            severity: EmergencySeverity::Watch,
            title: "Flood Watch".into(),
            counties: vec![],
        },
    ];
    snapshot.regional.emergency_traffic_percent = 45.0;

    let rule = RegionalEmergencyRule {
        traffic_warning_percent: 30.0,
    };
    let drafts = rule.evaluate(&snapshot);
    assert_eq!(drafts.len(), 2);
    assert_eq!(drafts[0].level, AlertLevel::Critical);
    assert_eq!(drafts[0].title, "Emergency: Hurricane Milton");
    assert!(drafts[0].message.contains("Pinellas, Hillsborough"));
    assert_eq!(drafts[1].title, "Emergency Traffic Surge");
    assert_eq!(drafts[1].level, AlertLevel::Warning);
}

#[test]
fn evaluate_filters_categories_and_applies_cooldown() {
    let rule = TwoTierThreshold {
        id: "memory".into(),
        name: "High Memory Usage".into(),
        metric: "performance.memory_usage".into(),
        unit: "%".into(),
        category: AlertCategory::Performance,
        tier: Tier::new(80.0, 90.0),
        cooldown_secs: 120,
        extract: |s| s.performance.memory_usage,
    };
    let mut engine = AlertEngine::new(
        AlertPolicy::default(),
        vec![
            Box::new(rule),
            Box::new(AiCostRule::new(cost_limits())),
        ],
    );

    let mut snapshot = MetricsSnapshot::default();
    snapshot.performance.memory_usage = 92.0;
    snapshot.ai.total_daily_cost = 500.0;
    let now = Utc::now();

    let perf_only = engine.evaluate(&snapshot, &[AlertCategory::Performance], now);
    assert_eq!(perf_only.len(), 1);
    assert_eq!(perf_only[0].title, "High Memory Usage");

    let cooling = engine.evaluate(
        &snapshot,
        &[AlertCategory::Performance],
        now + Duration::seconds(60),
    );
    assert!(cooling.is_empty());

    let after = engine.evaluate(
        &snapshot,
        &[AlertCategory::Performance],
        now + Duration::seconds(121),
    );
    assert_eq!(after.len(), 1);
    assert!(engine.get_rule("ai-costs").is_some());
}

#[test]
fn cooldown_entries_are_only_kept_while_cooling() {
    let mut snapshot = MetricsSnapshot::default();
    snapshot.performance.memory_usage = 92.0;
    snapshot.security.failed_logins = 150;
    let now = Utc::now();

    let mut uncooled = AlertEngine::new(AlertPolicy::default(), thresholds().into_rules());
    for step in 0..3 {
        let drafts = uncooled.evaluate(
            &snapshot,
            &[AlertCategory::Performance, AlertCategory::Security],
            now + Duration::seconds(step),
        );
        assert_eq!(drafts.len(), 2);
    }
    assert_eq!(uncooled.cooling_keys(), 0);

    let mut cooled = AlertEngine::new(
        AlertPolicy::default(),
        ThresholdSet {
            cooldown_secs: 60,
            ..thresholds()
        }
        .into_rules(),
    );
    let first = cooled.evaluate(&snapshot, &[AlertCategory::Performance], now);
    assert_eq!(first.len(), 1);
    assert_eq!(cooled.cooling_keys(), 1);

    let quiet = MetricsSnapshot::default();
    cooled.evaluate(&quiet, &[AlertCategory::Performance], now + Duration::seconds(61));
    assert_eq!(cooled.cooling_keys(), 0);
}
