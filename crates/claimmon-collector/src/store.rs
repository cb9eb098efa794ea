use crate::cache::MetricCache;
use crate::Collector;
use chrono::Utc;
use claimmon_common::types::{MetricAggregate, MetricObservation, MetricsSnapshot};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;

/// Observations and aggregates expire after a day.
pub const METRIC_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub fn aggregate_key(category: &str, name: &str) -> String {
    format!("metrics:{category}:{name}:aggregate")
}

/// The snowflake suffix keeps observations recorded in the same
/// millisecond apart.
fn observation_key(category: &str, name: &str, timestamp_ms: i64) -> String {
    format!(
        "metrics:{category}:{name}:{timestamp_ms}:{}",
        claimmon_common::id::next_id()
    )
}

/// Owner of the single current [`MetricsSnapshot`].
///
/// The snapshot sits behind a lock so concurrent timer ticks and API reads
/// never observe a half-written section. Locks are never held across an
/// await point.
pub struct MetricsStore {
    snapshot: RwLock<MetricsSnapshot>,
    collectors: Vec<Arc<dyn Collector>>,
    cache: Arc<dyn MetricCache>,
    /// Serialises aggregate read-modify-write cycles.
    aggregate_lock: Mutex<()>,
}

impl MetricsStore {
    pub fn new(collectors: Vec<Box<dyn Collector>>, cache: Arc<dyn MetricCache>) -> Self {
        Self {
            snapshot: RwLock::new(MetricsSnapshot::default()),
            collectors: collectors.into_iter().map(Arc::from).collect(),
            cache,
            aggregate_lock: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &Arc<dyn MetricCache> {
        &self.cache
    }

    /// Run every collector in registration order and apply each section
    /// as it arrives. Returns the number of collectors that failed.
    ///
    /// Each collector runs in its own task so a panicking collector counts
    /// as a failure instead of unwinding into the caller.
    pub async fn collect(&self) -> usize {
        let mut failed = 0;
        for collector in &self.collectors {
            let task = {
                let collector = collector.clone();
                tokio::spawn(async move { collector.collect().await })
            };
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(anyhow::anyhow!("collector task failed: {e}")),
            };
            match outcome {
                Ok(sample) => {
                    let mut snapshot = self
                        .snapshot
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    sample.apply(&mut snapshot);
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        collector = collector.name(),
                        error = %e,
                        "Metric collection failed, keeping previous values"
                    );
                }
            }
        }

        let mut snapshot = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshot.collected_at = Some(Utc::now());
        tracing::debug!(failed, "Metrics collection pass finished");
        failed
    }

    /// Copy of the current snapshot without collecting.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Collect, then return a copy of the refreshed snapshot.
    pub async fn get_metrics(&self) -> MetricsSnapshot {
        self.collect().await;
        self.snapshot()
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut MetricsSnapshot),
    {
        let mut snapshot = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut snapshot);
    }

    pub fn replace(&self, snapshot: MetricsSnapshot) {
        self.update(|current| *current = snapshot);
    }

    /// Persist one observation and fold it into the running aggregate.
    ///
    /// Cache failures are logged and the observation is dropped; this never
    /// fails towards the caller.
    pub async fn record_metric(
        &self,
        category: &str,
        name: &str,
        value: f64,
        metadata: BTreeMap<String, String>,
    ) {
        let now = Utc::now();
        let observation = MetricObservation {
            category: category.to_string(),
            name: name.to_string(),
            value,
            timestamp: now,
            metadata,
        };

        let encoded = match serde_json::to_value(&observation) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(category, name, error = %e, "Failed to encode metric observation");
                return;
            }
        };
        if let Err(e) = self
            .cache
            .set(
                &observation_key(category, name, now.timestamp_millis()),
                encoded,
                METRIC_TTL,
            )
            .await
        {
            tracing::error!(category, name, error = %e, "Failed to store metric observation");
            return;
        }

        if let Err(e) = self.update_aggregate(category, name, value).await {
            tracing::error!(category, name, error = %e, "Failed to update metric aggregate");
        }
    }

    async fn update_aggregate(
        &self,
        category: &str,
        name: &str,
        value: f64,
    ) -> crate::error::Result<()> {
        let _guard = self.aggregate_lock.lock().await;
        let key = aggregate_key(category, name);
        let aggregate = match self.cache.get(&key).await? {
            Some(existing) => {
                let mut agg: MetricAggregate = serde_json::from_value(existing)?;
                agg.observe(value);
                agg
            }
            None => MetricAggregate::first(value),
        };
        self.cache
            .set(&key, serde_json::to_value(aggregate)?, METRIC_TTL)
            .await
    }

    /// Read the running aggregate for `category:name`; `None` when absent or
    /// when the cache is unavailable.
    pub async fn aggregate(&self, category: &str, name: &str) -> Option<MetricAggregate> {
        match self.cache.get(&aggregate_key(category, name)).await {
            Ok(Some(v)) => match serde_json::from_value(v) {
                Ok(agg) => Some(agg),
                Err(e) => {
                    tracing::warn!(category, name, error = %e, "Corrupt metric aggregate");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(category, name, error = %e, "Failed to read metric aggregate");
                None
            }
        }
    }
}
