//! Health probes and their aggregation.
//!
//! Every probe runs in its own task raced against its timeout; an error,
//! timeout or panic counts as a `fail` for that probe and never reaches the
//! caller.

use async_trait::async_trait;
use chrono::Utc;
use claimmon_common::health::{CheckStatus, HealthCheckResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// What a probe observed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub status: CheckStatus,
    pub message: Option<String>,
}

impl ProbeOutcome {
    pub fn pass() -> Self {
        Self {
            status: CheckStatus::Pass,
            message: None,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Warn,
            message: Some(message.into()),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Fail,
            message: Some(message.into()),
        }
    }
}

#[async_trait]
pub trait Probe: Send + Sync {
    /// `Err` is reported as a failed check carrying the error text.
    async fn check(&self) -> anyhow::Result<ProbeOutcome>;
}

/// Adapts a boolean check (`true` = healthy) to [`Probe`].
pub struct BoolProbe<F> {
    check: F,
}

impl<F, Fut> BoolProbe<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    pub fn new(check: F) -> Self {
        Self { check }
    }
}

#[async_trait]
impl<F, Fut> Probe for BoolProbe<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        Ok(if (self.check)().await {
            ProbeOutcome::pass()
        } else {
            ProbeOutcome::fail("check returned false")
        })
    }
}

/// A named probe with its scheduling parameters.
#[derive(Clone)]
pub struct HealthProbe {
    pub name: String,
    /// A failing critical probe raises a critical alert.
    pub critical: bool,
    pub timeout: Duration,
    /// Minimum time between runs driven by the health timer.
    pub interval: Duration,
    pub probe: Arc<dyn Probe>,
}

impl HealthProbe {
    pub fn new(name: &str, critical: bool, probe: Arc<dyn Probe>) -> Self {
        Self {
            name: name.to_string(),
            critical,
            timeout: Duration::from_secs(5),
            interval: Duration::from_secs(30),
            probe,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    async fn run(&self) -> HealthCheckResult {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.timeout, self.probe.check()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => ProbeOutcome::fail(e.to_string()),
            Err(_) => ProbeOutcome::fail(format!(
                "{} timed out after {}ms",
                self.name,
                self.timeout.as_millis()
            )),
        };

        if outcome.status != CheckStatus::Pass {
            tracing::warn!(
                probe = %self.name,
                status = ?outcome.status,
                message = outcome.message.as_deref().unwrap_or(""),
                "Health probe not passing"
            );
        }

        HealthCheckResult {
            name: self.name.clone(),
            status: outcome.status,
            critical: self.critical,
            latency_ms: Some(started.elapsed().as_millis() as u64),
            message: outcome.message,
            checked_at: Utc::now(),
        }
    }

    fn panicked(&self) -> HealthCheckResult {
        HealthCheckResult {
            name: self.name.clone(),
            status: CheckStatus::Fail,
            critical: self.critical,
            latency_ms: None,
            message: Some(format!("{} probe panicked", self.name)),
            checked_at: Utc::now(),
        }
    }
}

struct LastRun {
    at: Instant,
    result: HealthCheckResult,
}

/// Runs the registered probes and remembers each probe's latest result.
pub struct HealthAggregator {
    probes: Vec<HealthProbe>,
    last: Mutex<HashMap<String, LastRun>>,
}

impl HealthAggregator {
    pub fn new(probes: Vec<HealthProbe>) -> Self {
        Self {
            probes,
            last: Mutex::new(HashMap::new()),
        }
    }

    pub fn probes(&self) -> &[HealthProbe] {
        &self.probes
    }

    /// Run every probe now. Results keep registration order.
    pub async fn run_all(&self) -> Vec<HealthCheckResult> {
        let started = Instant::now();
        let due: Vec<&HealthProbe> = self.probes.iter().collect();
        let fresh = Self::run_concurrently(&due).await;
        self.remember(started, &fresh);
        fresh
    }

    /// Run only probes whose interval has elapsed and return the fresh
    /// results alongside the cached results of the others.
    pub async fn run_due(&self) -> (Vec<HealthCheckResult>, Vec<HealthCheckResult>) {
        let now = Instant::now();
        let due: Vec<&HealthProbe> = {
            let last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            self.probes
                .iter()
                .filter(|p| {
                    last.get(&p.name)
                        .is_none_or(|run| now.duration_since(run.at) >= p.interval)
                })
                .collect()
        };

        let fresh = Self::run_concurrently(&due).await;
        self.remember(now, &fresh);

        let last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let all = self
            .probes
            .iter()
            .filter_map(|p| last.get(&p.name).map(|run| run.result.clone()))
            .collect();
        (fresh, all)
    }

    async fn run_concurrently(probes: &[&HealthProbe]) -> Vec<HealthCheckResult> {
        let handles: Vec<_> = probes
            .iter()
            .map(|probe| {
                let probe = (*probe).clone();
                tokio::spawn(async move { probe.run().await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (probe, handle) in probes.iter().zip(handles) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(probe = %probe.name, error = %e, "Health probe task failed");
                    results.push(probe.panicked());
                }
            }
        }
        results
    }

    /// `started` is when the pass began, so a probe's own latency never
    /// pushes its next run back.
    fn remember(&self, started: Instant, results: &[HealthCheckResult]) {
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for result in results {
            last.insert(
                result.name.clone(),
                LastRun {
                    at: started,
                    result: result.clone(),
                },
            );
        }
    }
}
