mod common;

use async_trait::async_trait;
use claimmon_alert::rules::threshold::Tier;
use claimmon_collector::{Collector, SectionSample};
use claimmon_common::health::{CheckStatus, HealthStatus};
use claimmon_common::types::{
    AlertCategory, AlertContext, AlertDraft, AlertFilter, AlertLevel, EmergencyEvent,
    EmergencySeverity, MetricsSnapshot, SecurityMetrics,
};
use claimmon_server::config::MonitorConfig;
use claimmon_server::emergency::EmergencyReport;
use claimmon_server::health::{HealthProbe, ProbeOutcome};
use common::{
    context_from, test_builder, DownCache, FixedProbe, HangingProbe, StaticFeed, ThrowingFeed,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn breach() -> AlertDraft {
    AlertDraft::new(AlertLevel::Critical, AlertCategory::Security, "Breach", "x")
}

#[tokio::test]
async fn disabled_alerting_stores_but_never_dispatches() {
    let mut config = MonitorConfig::default();
    config.alerting.enabled = false;
    let (builder, sent) = test_builder(config);
    let ctx = context_from(builder.build(), sent);

    let id = ctx.monitor.create_alert(breach()).await;
    assert!(!id.is_empty());

    let alerts = ctx.monitor.get_alerts(&AlertFilter::default());
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, id);
    assert!(!alerts[0].resolved);
    assert!(ctx.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn enabled_alerting_dispatches_stored_alerts_only() {
    let (builder, sent) = test_builder(MonitorConfig::default());
    let ctx = context_from(builder.build(), sent);

    let first = ctx.monitor.create_alert(breach()).await;
    let second = ctx.monitor.create_alert(breach()).await;
    assert_ne!(first, second);

    let alerts = ctx.monitor.get_alerts(&AlertFilter::default());
    assert_eq!(alerts.len(), 1);
    assert!(alerts.iter().all(|a| a.id != second));

    let sent = ctx.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, first);
}

#[tokio::test]
async fn hourly_limit_caps_stored_alerts() {
    let mut config = MonitorConfig::default();
    config.alerting.max_alerts_per_hour = 3;
    let (builder, sent) = test_builder(config);
    let ctx = context_from(builder.build(), sent);

    for i in 0..4 {
        let title = format!("Condition {i}");
        let id = ctx
            .monitor
            .create_alert(AlertDraft::new(
                AlertLevel::Warning,
                AlertCategory::Business,
                &title,
                "x",
            ))
            .await;
        assert!(!id.is_empty());
    }
    assert_eq!(ctx.monitor.get_alerts(&AlertFilter::default()).len(), 3);
}

#[tokio::test]
async fn resolve_twice_keeps_first_resolution() {
    let (builder, sent) = test_builder(MonitorConfig::default());
    let ctx = context_from(builder.build(), sent);

    let id = ctx.monitor.create_alert(breach()).await;
    assert!(ctx.monitor.resolve_alert(&id, Some("rotated keys".into())));
    assert!(ctx.monitor.resolve_alert(&id, Some("second".into())));
    assert!(!ctx.monitor.resolve_alert("alert_unknown", None));

    let alert = &ctx.monitor.get_alerts(&AlertFilter::default())[0];
    assert!(alert.resolved);
    let resolution = alert.metadata.resolution.as_ref().unwrap();
    assert_eq!(resolution.note.as_deref(), Some("rotated keys"));

    // The same condition after resolution is a new record.
    let again = ctx.monitor.create_alert(breach()).await;
    assert_ne!(again, id);
    assert_eq!(ctx.monitor.get_alerts(&AlertFilter::default()).len(), 2);
}

#[tokio::test]
async fn check_alerts_raises_critical_response_time() {
    let mut config = MonitorConfig::default();
    config.thresholds.response_time = Tier::new(100.0, 200.0);
    let (builder, sent) = test_builder(config);
    let ctx = context_from(builder.build(), sent);

    let mut snapshot = MetricsSnapshot::default();
    snapshot.performance.response_time.avg = 250.0;
    ctx.monitor.metrics_store().replace(snapshot);

    let ids = ctx.monitor.check_alerts().await;
    assert!(!ids.is_empty());

    let alerts = ctx.monitor.get_alerts(&AlertFilter {
        level: Some(AlertLevel::Critical),
        category: Some(AlertCategory::Performance),
        resolved: None,
    });
    assert!(!alerts.is_empty());
    assert!(alerts.iter().all(|a| a.level == AlertLevel::Critical));
}

#[tokio::test]
async fn check_alerts_covers_security_counters() {
    let (builder, sent) = test_builder(MonitorConfig::default());
    let ctx = context_from(builder.build(), sent);

    ctx.monitor.metrics_store().update(|s| {
        s.security = SecurityMetrics {
            failed_logins: 150,
            ..Default::default()
        }
    });
    ctx.monitor.check_alerts().await;

    let alerts = ctx.monitor.get_alerts(&AlertFilter {
        category: Some(AlertCategory::Security),
        ..Default::default()
    });
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].level, AlertLevel::Critical);
}

#[tokio::test]
async fn failed_login_spike_survives_dashboard_poll_before_alert_check() {
    let (builder, sent) = test_builder(MonitorConfig::default());
    let ctx = context_from(builder.build(), sent);

    for _ in 0..150 {
        ctx.monitor.security().record_failed_login();
    }
    // A dashboard read and a metrics tick both land before the alert tick.
    assert_eq!(ctx.monitor.get_metrics().await.security.failed_logins, 150);
    ctx.monitor.metrics_store().collect().await;

    ctx.monitor.check_alerts().await;

    let alerts = ctx.monitor.get_alerts(&AlertFilter {
        category: Some(AlertCategory::Security),
        ..Default::default()
    });
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].level, AlertLevel::Critical);
}

#[tokio::test]
async fn duplicates_match_on_title_category_and_level_only() {
    let (builder, sent) = test_builder(MonitorConfig::default());
    let ctx = context_from(builder.build(), sent);

    let first = ctx.monitor.create_alert(breach()).await;
    ctx.monitor
        .create_alert(AlertDraft::new(
            AlertLevel::Critical,
            AlertCategory::Security,
            "Breach",
            "different wording",
        ))
        .await;
    assert_eq!(ctx.monitor.get_alerts(&AlertFilter::default()).len(), 1);

    ctx.monitor
        .create_alert(AlertDraft::new(
            AlertLevel::Warning,
            AlertCategory::Security,
            "Breach",
            "x",
        ))
        .await;
    let alerts = ctx.monitor.get_alerts(&AlertFilter::default());
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[1].id, first);
    assert_eq!(ctx.sent.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn ai_spend_scan_attaches_actions() {
    let (builder, sent) = test_builder(MonitorConfig::default());
    let ctx = context_from(builder.build(), sent);

    ctx.monitor.record_ai_usage("openai", 150.0, 800.0, true);
    ctx.monitor.get_metrics().await;
    let ids = ctx.monitor.monitor_ai_costs().await;
    assert!(!ids.is_empty());

    let alerts = ctx.monitor.get_alerts(&AlertFilter {
        level: Some(AlertLevel::Critical),
        category: Some(AlertCategory::Ai),
        resolved: None,
    });
    assert!(!alerts.is_empty());
    assert!(alerts.iter().all(|a| !a.actions.is_empty()));
}

#[tokio::test]
async fn health_reduction_and_critical_probe_alert() {
    let (builder, sent) = test_builder(MonitorConfig::default());
    let monitor = builder
        .with_probes(vec![
            HealthProbe::new(
                "database",
                true,
                Arc::new(FixedProbe(ProbeOutcome::fail("connection refused"))),
            ),
            HealthProbe::new("cache", false, Arc::new(FixedProbe(ProbeOutcome::pass()))),
        ])
        .build();
    let ctx = context_from(monitor, sent);

    let report = ctx.monitor.get_health_status().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert_eq!(report.checks.len(), 2);

    let alerts = ctx.monitor.get_alerts(&AlertFilter {
        category: Some(AlertCategory::System),
        ..Default::default()
    });
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].level, AlertLevel::Critical);
    assert_eq!(alerts[0].title, "Health Check Failed: database");
    assert!(matches!(
        &alerts[0].metadata.context,
        Some(AlertContext::Probe { probe, .. }) if probe == "database"
    ));
}

#[tokio::test]
async fn health_degraded_and_healthy() {
    let (builder, sent) = test_builder(MonitorConfig::default());
    let degraded = builder
        .with_probes(vec![
            HealthProbe::new("database", true, Arc::new(FixedProbe(ProbeOutcome::pass()))),
            HealthProbe::new(
                "ai_providers",
                false,
                Arc::new(FixedProbe(ProbeOutcome::warn("anthropic unreachable"))),
            ),
        ])
        .build();
    let ctx = context_from(degraded, sent);
    assert_eq!(
        ctx.monitor.get_health_status().await.status,
        HealthStatus::Degraded
    );
    assert!(ctx.monitor.get_alerts(&AlertFilter::default()).is_empty());

    let (builder, sent) = test_builder(MonitorConfig::default());
    let ctx = context_from(builder.build(), sent);
    let report = ctx.monitor.get_health_status().await;
    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(report.checks[0].status, CheckStatus::Pass);
}

#[tokio::test(start_paused = true)]
async fn induced_failures_never_reach_the_caller() {
    let (builder, sent) = test_builder(MonitorConfig::default());
    let monitor = builder
        .with_cache(Arc::new(DownCache))
        .with_emergency_feed(Arc::new(ThrowingFeed))
        .with_probes(vec![HealthProbe::new("slow", false, Arc::new(HangingProbe))
            .with_timeout(Duration::from_millis(50))])
        .build();
    let ctx = context_from(monitor, sent);

    let before = ctx.monitor.get_metrics().await;
    assert!(before.collected_at.is_some());

    ctx.monitor
        .record_metric("business", "claims", 1.0, BTreeMap::new())
        .await;
    assert!(ctx.monitor.metric_aggregate("business", "claims").await.is_none());

    let report = ctx.monitor.get_health_status().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert!(report.checks[0]
        .message
        .as_deref()
        .unwrap()
        .contains("timed out"));

    assert!(ctx.monitor.check_regional_emergency().await.is_empty());
    assert_eq!(ctx.monitor.snapshot().regional, before.regional);

    let id = ctx.monitor.create_alert(breach()).await;
    assert!(!id.is_empty());
}

#[tokio::test]
async fn regional_feed_updates_snapshot_and_raises() {
    let report = EmergencyReport {
        events: vec![EmergencyEvent {
            id: "fl-2024-milton".into(),
            event_type: "hurricane".into(),
            severity: EmergencySeverity::Emergency,
            title: "Hurricane Milton".into(),
            counties: vec!["Pinellas".into(), "Hillsborough".into()],
        }],
        emergency_traffic_percent: 45.0,
    };
    let (builder, sent) = test_builder(MonitorConfig::default());
    let monitor = builder
        .with_emergency_feed(Arc::new(StaticFeed(report)))
        .build();
    let ctx = context_from(monitor, sent);

    let ids = ctx.monitor.check_regional_emergency().await;
    assert_eq!(ids.len(), 2);

    let regional = ctx.monitor.snapshot().regional;
    assert_eq!(regional.active_events.len(), 1);
    assert_eq!(regional.affected_counties, vec!["Hillsborough", "Pinellas"]);
    assert!(regional.last_updated.is_some());

    let alerts = ctx.monitor.get_alerts(&AlertFilter {
        category: Some(AlertCategory::Regional),
        ..Default::default()
    });
    assert_eq!(alerts.len(), 2);
    assert!(alerts
        .iter()
        .any(|a| a.level == AlertLevel::Critical && a.title == "Emergency: Hurricane Milton"));
    assert!(alerts.iter().any(|a| a.level == AlertLevel::Warning));
}

struct CountingCollector(Arc<AtomicUsize>);

#[async_trait]
impl Collector for CountingCollector {
    fn name(&self) -> &str {
        "counting"
    }

    async fn collect(&self) -> anyhow::Result<SectionSample> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(SectionSample::Security(SecurityMetrics::default()))
    }
}

#[tokio::test(start_paused = true)]
async fn shutdown_is_idempotent_and_stops_ticks() {
    let mut config = MonitorConfig::default();
    config.intervals.metrics_collection = 1000;
    config.intervals.alert_check = 0;
    config.intervals.health_check = 0;
    config.intervals.business_metrics = 0;

    let ticks = Arc::new(AtomicUsize::new(0));
    let (builder, sent) = test_builder(config);
    let monitor = builder
        .with_collectors(vec![Box::new(CountingCollector(ticks.clone()))])
        .build();
    let ctx = context_from(monitor, sent);

    assert!(ctx.monitor.init());
    assert!(!ctx.monitor.init());
    assert!(ctx.monitor.is_running());

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 3);

    ctx.monitor.shutdown();
    ctx.monitor.shutdown();
    ctx.monitor.shutdown();
    assert!(!ctx.monitor.is_running());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 3);

    // A stopped monitor can be started again.
    assert!(ctx.monitor.init());
    ctx.monitor.shutdown();
}

#[tokio::test]
async fn shutdown_without_init_is_a_no_op() {
    let (builder, sent) = test_builder(MonitorConfig::default());
    let ctx = context_from(builder.build(), sent);
    ctx.monitor.shutdown();
    ctx.monitor.shutdown();
    assert!(!ctx.monitor.is_running());
}
