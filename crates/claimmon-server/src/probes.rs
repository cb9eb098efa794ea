//! Built-in health probes.

use crate::config::HealthConfig;
use crate::health::{HealthProbe, Probe, ProbeOutcome};
use async_trait::async_trait;
use claimmon_alert::rules::threshold::Tier;
use claimmon_collector::cache::MetricCache;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::System;

/// GET against the hosted backend's health URL. Any non-2xx answer fails.
pub struct DatabaseProbe {
    client: reqwest::Client,
    url: String,
}

impl DatabaseProbe {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Probe for DatabaseProbe {
    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        Ok(if status.is_success() {
            ProbeOutcome::pass()
        } else {
            ProbeOutcome::fail(format!("backend answered HTTP {status}"))
        })
    }
}

const CACHE_PROBE_KEY: &str = "health:cache_probe";

/// Write then read back a marker through the metric cache.
pub struct CacheProbe {
    cache: Arc<dyn MetricCache>,
}

impl CacheProbe {
    pub fn new(cache: Arc<dyn MetricCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Probe for CacheProbe {
    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        let marker = serde_json::Value::from(chrono::Utc::now().timestamp_millis());
        self.cache
            .set(CACHE_PROBE_KEY, marker.clone(), Duration::from_secs(60))
            .await?;
        Ok(match self.cache.get(CACHE_PROBE_KEY).await? {
            Some(v) if v == marker => ProbeOutcome::pass(),
            Some(_) => ProbeOutcome::warn("cache returned a stale value"),
            None => ProbeOutcome::fail("cache lost a value that was just written"),
        })
    }
}

/// Reachability of each configured AI provider: warn when some are down,
/// fail when all are.
pub struct AiProvidersProbe {
    client: reqwest::Client,
    endpoints: BTreeMap<String, String>,
}

impl AiProvidersProbe {
    pub fn new(client: reqwest::Client, endpoints: BTreeMap<String, String>) -> Self {
        Self { client, endpoints }
    }

    /// Any HTTP answer below 500 counts as reachable; providers answer 401
    /// to unauthenticated requests.
    async fn reachable(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(resp) => !resp.status().is_server_error(),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "AI provider unreachable");
                false
            }
        }
    }
}

#[async_trait]
impl Probe for AiProvidersProbe {
    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        if self.endpoints.is_empty() {
            return Ok(ProbeOutcome::pass());
        }

        let mut down = Vec::new();
        for (name, url) in &self.endpoints {
            if !self.reachable(url).await {
                down.push(name.as_str());
            }
        }

        Ok(if down.is_empty() {
            ProbeOutcome::pass()
        } else if down.len() == self.endpoints.len() {
            ProbeOutcome::fail(format!("all AI providers unreachable: {}", down.join(", ")))
        } else {
            ProbeOutcome::warn(format!("AI providers unreachable: {}", down.join(", ")))
        })
    }
}

/// Host memory usage against the memory thresholds.
pub struct MemoryProbe {
    tier: Tier,
    system: Mutex<System>,
}

impl MemoryProbe {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            system: Mutex::new(System::new()),
        }
    }

    fn usage_percent(&self) -> f64 {
        let mut system = self.system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return 0.0;
        }
        system.used_memory() as f64 / total as f64 * 100.0
    }

    pub fn classify(&self, usage: f64) -> ProbeOutcome {
        if usage > self.tier.critical {
            ProbeOutcome::fail(format!("memory usage {usage:.1}%"))
        } else if usage > self.tier.warning {
            ProbeOutcome::warn(format!("memory usage {usage:.1}%"))
        } else {
            ProbeOutcome::pass()
        }
    }
}

#[async_trait]
impl Probe for MemoryProbe {
    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        Ok(self.classify(self.usage_percent()))
    }
}

/// The default probe set: `database` (critical, only when a URL is
/// configured), `cache`, `ai_providers` and `memory`.
pub fn default_probes(
    config: &HealthConfig,
    memory: Tier,
    cache: Arc<dyn MetricCache>,
) -> Vec<HealthProbe> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .unwrap_or_default();

    let mut probes = Vec::new();
    if let Some(url) = &config.database_url {
        probes.push(HealthProbe::new(
            "database",
            true,
            Arc::new(DatabaseProbe::new(client.clone(), url)),
        ));
    }
    probes.push(HealthProbe::new("cache", false, Arc::new(CacheProbe::new(cache))));
    probes.push(HealthProbe::new(
        "ai_providers",
        false,
        Arc::new(AiProvidersProbe::new(client, config.ai_endpoints.clone())),
    ));
    probes.push(HealthProbe::new("memory", false, Arc::new(MemoryProbe::new(memory))));

    probes
        .into_iter()
        .map(|p| p.with_timeout(config.timeout()).with_interval(config.interval()))
        .collect()
}
