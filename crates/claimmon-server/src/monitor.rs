//! The monitoring façade owned by the host process.
//!
//! [`SystemMonitor`] wires the metrics store, the alert engine, the
//! notification manager and the health aggregator together and exposes the
//! public monitoring API. None of its methods return errors: every failure
//! is logged and replaced by a safe default.

use crate::config::MonitorConfig;
use crate::emergency::{EmergencyFeed, HttpEmergencyFeed};
use crate::health::{HealthAggregator, HealthProbe};
use crate::probes::default_probes;
use crate::rule_builder::{build_rules, SYSTEM_CATEGORIES};
use crate::scheduler::Timers;
use chrono::Utc;
use claimmon_alert::engine::{AlertEngine, CreateOutcome};
use claimmon_collector::ai::{AiCollector, AiUsageLedger};
use claimmon_collector::business::{BusinessCollector, BusinessCounters};
use claimmon_collector::cache::{MemoryCache, MetricCache};
use claimmon_collector::performance::{PerformanceCollector, RequestStats};
use claimmon_collector::security::{SecurityCollector, SecurityCounters};
use claimmon_collector::store::MetricsStore;
use claimmon_collector::Collector;
use claimmon_common::health::{reduce_status, CheckStatus, HealthCheckResult, HealthReport};
use claimmon_common::types::{
    Alert, AlertCategory, AlertContext, AlertDraft, AlertFilter, AlertLevel, MetricAggregate,
    MetricsSnapshot,
};
use claimmon_notify::manager::NotificationManager;
use claimmon_notify::plugin::ChannelRegistry;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub struct SystemMonitor {
    config: MonitorConfig,
    store: Arc<MetricsStore>,
    engine: Mutex<AlertEngine>,
    notifier: Arc<NotificationManager>,
    health: Arc<HealthAggregator>,
    emergency: Option<Arc<dyn EmergencyFeed>>,
    requests: Arc<RequestStats>,
    business: Arc<BusinessCounters>,
    security: Arc<SecurityCounters>,
    ai_ledger: Arc<AiUsageLedger>,
    started: Instant,
    timers: Mutex<Option<Timers>>,
}

/// Replaces the default collaborators of a [`SystemMonitor`].
pub struct MonitorBuilder {
    config: MonitorConfig,
    cache: Option<Arc<dyn MetricCache>>,
    probes: Option<Vec<HealthProbe>>,
    notifier: Option<NotificationManager>,
    emergency: Option<Arc<dyn EmergencyFeed>>,
    collectors: Option<Vec<Box<dyn Collector>>>,
}

impl MonitorBuilder {
    pub fn with_cache(mut self, cache: Arc<dyn MetricCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the built-in probes.
    pub fn with_probes(mut self, probes: Vec<HealthProbe>) -> Self {
        self.probes = Some(probes);
        self
    }

    /// Replace the channels configured under `alerting.channels`.
    pub fn with_notifier(mut self, notifier: NotificationManager) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_emergency_feed(mut self, feed: Arc<dyn EmergencyFeed>) -> Self {
        self.emergency = Some(feed);
        self
    }

    /// Replace the collectors fed by the built-in counters.
    pub fn with_collectors(mut self, collectors: Vec<Box<dyn Collector>>) -> Self {
        self.collectors = Some(collectors);
        self
    }

    pub fn build(self) -> SystemMonitor {
        let config = self.config;
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new()) as Arc<dyn MetricCache>);

        let requests = Arc::new(RequestStats::new());
        let business = Arc::new(BusinessCounters::default());
        let security = Arc::new(SecurityCounters::default());
        let ai_ledger = Arc::new(AiUsageLedger::new());

        let collectors = self.collectors.unwrap_or_else(|| {
            vec![
                Box::new(PerformanceCollector::new(requests.clone())) as Box<dyn Collector>,
                Box::new(BusinessCollector::new(business.clone())),
                Box::new(AiCollector::new(ai_ledger.clone())),
                Box::new(SecurityCollector::new(security.clone())),
            ]
        });
        let store = Arc::new(MetricsStore::new(collectors, cache.clone()));

        let engine = AlertEngine::new(config.alerting.policy(), build_rules(&config));

        let notifier = self.notifier.unwrap_or_else(|| {
            NotificationManager::from_settings(
                &ChannelRegistry::default(),
                &config.alerting.channels,
                &config.alerting.channel_settings,
                &config.alerting.min_level,
            )
        });

        let probes = self.probes.unwrap_or_else(|| {
            default_probes(&config.health, config.thresholds.memory_usage, cache.clone())
        });

        let emergency = self.emergency.or_else(|| {
            let url = config.emergency.feed_url.as_deref()?;
            match HttpEmergencyFeed::new(url, Duration::from_millis(config.emergency.timeout_ms)) {
                Ok(feed) => Some(Arc::new(feed) as Arc<dyn EmergencyFeed>),
                Err(e) => {
                    tracing::error!(url, error = %e, "Regional emergency feed disabled");
                    None
                }
            }
        });

        tracing::info!(
            probes = probes.len(),
            channels = notifier.channels().len(),
            alerting = config.alerting.enabled,
            emergency_feed = emergency.is_some(),
            "System monitor constructed"
        );

        SystemMonitor {
            store,
            engine: Mutex::new(engine),
            notifier: Arc::new(notifier),
            health: Arc::new(HealthAggregator::new(probes)),
            emergency,
            requests,
            business,
            security,
            ai_ledger,
            started: Instant::now(),
            timers: Mutex::new(None),
            config,
        }
    }
}

impl SystemMonitor {
    pub fn builder(config: MonitorConfig) -> MonitorBuilder {
        MonitorBuilder {
            config,
            cache: None,
            probes: None,
            notifier: None,
            emergency: None,
            collectors: None,
        }
    }

    pub fn new(config: MonitorConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn lock_engine(&self) -> MutexGuard<'_, AlertEngine> {
        self.engine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ---- Metrics ----

    /// Run a collection pass and return a copy of the refreshed snapshot.
    pub async fn get_metrics(&self) -> MetricsSnapshot {
        self.store.get_metrics().await
    }

    /// Copy of the current snapshot without collecting.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.store.snapshot()
    }

    pub fn metrics_store(&self) -> &Arc<MetricsStore> {
        &self.store
    }

    pub async fn record_metric(
        &self,
        category: &str,
        name: &str,
        value: f64,
        metadata: BTreeMap<String, String>,
    ) {
        self.store.record_metric(category, name, value, metadata).await;
    }

    pub async fn metric_aggregate(&self, category: &str, name: &str) -> Option<MetricAggregate> {
        self.store.aggregate(category, name).await
    }

    pub fn requests(&self) -> &Arc<RequestStats> {
        &self.requests
    }

    pub fn business(&self) -> &Arc<BusinessCounters> {
        &self.business
    }

    pub fn security(&self) -> &Arc<SecurityCounters> {
        &self.security
    }

    /// Record one AI provider call for spend tracking.
    pub fn record_ai_usage(&self, provider: &str, cost_usd: f64, latency_ms: f64, success: bool) {
        self.ai_ledger
            .record_usage(provider, cost_usd, latency_ms, success);
        self.business.record_ai_request();
    }

    // ---- Alerts ----

    /// Create an alert and dispatch it when alerting is enabled.
    ///
    /// The returned id is generated even when the alert is suppressed as a
    /// duplicate or dropped by the hourly limit; such ids never appear in
    /// [`get_alerts`](Self::get_alerts).
    pub async fn create_alert(&self, draft: AlertDraft) -> String {
        let outcome = self.lock_engine().create(draft, Utc::now());

        if let CreateOutcome::Created(alert) = &outcome {
            if self.config.alerting.enabled {
                let delivered = self.notifier.notify(alert).await;
                tracing::debug!(alert_id = %alert.id, delivered, "Alert dispatched");
            }
        }

        outcome.id().to_string()
    }

    /// Returns false only when no alert has this id.
    pub fn resolve_alert(&self, id: &str, resolution: Option<String>) -> bool {
        self.lock_engine().resolve(id, resolution, Utc::now())
    }

    /// Alerts matching `filter`, newest first.
    pub fn get_alerts(&self, filter: &AlertFilter) -> Vec<Alert> {
        self.lock_engine().list(filter)
    }

    /// Evaluate the performance and security rules against the current
    /// snapshot. Returns the ids of every alert requested.
    pub async fn check_alerts(&self) -> Vec<String> {
        self.raise_for(SYSTEM_CATEGORIES).await
    }

    /// Evaluate AI spend rules against the current snapshot.
    pub async fn monitor_ai_costs(&self) -> Vec<String> {
        self.raise_for(&[AlertCategory::Ai]).await
    }

    /// Refresh the regional section from the emergency feed and raise
    /// regional alerts. A failing fetch keeps the previous section and
    /// raises nothing.
    pub async fn check_regional_emergency(&self) -> Vec<String> {
        let Some(feed) = &self.emergency else {
            tracing::debug!("No regional emergency feed configured");
            return Vec::new();
        };

        let report = match feed.fetch().await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "Regional emergency fetch failed, keeping last known data");
                return Vec::new();
            }
        };

        let regional = report.into_regional(Utc::now());
        tracing::debug!(
            events = regional.active_events.len(),
            counties = regional.affected_counties.len(),
            "Regional emergency data refreshed"
        );
        self.store.update(|snapshot| snapshot.regional = regional);

        self.raise_for(&[AlertCategory::Regional]).await
    }

    async fn raise_for(&self, categories: &[AlertCategory]) -> Vec<String> {
        let snapshot = self.store.snapshot();
        let drafts = self
            .lock_engine()
            .evaluate(&snapshot, categories, Utc::now());

        let mut ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            ids.push(self.create_alert(draft).await);
        }
        ids
    }

    // ---- Health ----

    /// Run every probe now and reduce the results. A failing critical probe
    /// raises a critical system alert.
    pub async fn get_health_status(&self) -> HealthReport {
        let health = self.health.clone();
        let results = match tokio::spawn(async move { health.run_all().await }).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(error = %e, "Health aggregation failed");
                return HealthReport::internal_failure(
                    &format!("health aggregation failed: {e}"),
                    self.uptime_secs(),
                    &self.config.version,
                );
            }
        };

        self.raise_probe_alerts(&results).await;
        self.report(results)
    }

    /// Timer-driven health pass: only probes whose interval elapsed run.
    pub async fn run_health_checks(&self) -> HealthReport {
        let (fresh, all) = self.health.run_due().await;
        self.raise_probe_alerts(&fresh).await;
        self.report(all)
    }

    async fn raise_probe_alerts(&self, results: &[HealthCheckResult]) {
        for result in results
            .iter()
            .filter(|r| r.critical && r.status == CheckStatus::Fail)
        {
            let message = result.message.as_deref().unwrap_or("probe failed");
            let draft = AlertDraft::new(
                AlertLevel::Critical,
                AlertCategory::System,
                &format!("Health Check Failed: {}", result.name),
                &format!("Critical health check {} failed: {message}", result.name),
            )
            .with_context(AlertContext::Probe {
                probe: result.name.clone(),
                error: result.message.clone(),
            });
            self.create_alert(draft).await;
        }
    }

    fn report(&self, checks: Vec<HealthCheckResult>) -> HealthReport {
        HealthReport {
            status: reduce_status(checks.iter().map(|c| c.status)),
            checks,
            uptime_secs: self.uptime_secs(),
            version: self.config.version.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    // ---- Lifecycle ----

    /// Start the four interval timers. Returns false when they are already
    /// running.
    pub fn init(self: &Arc<Self>) -> bool {
        let mut timers = self
            .timers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if timers.is_some() {
            tracing::debug!("System monitor already running");
            return false;
        }
        *timers = Some(Timers::start(self, &self.config.intervals));
        tracing::info!("System monitor started");
        true
    }

    /// Stop every timer. Ticks already running finish; no new tick starts.
    /// Safe to call any number of times.
    pub fn shutdown(&self) {
        let stopped = self
            .timers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(timers) = stopped {
            timers.stop();
            tracing::info!("System monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }
}

impl Drop for SystemMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
