use crate::{Collector, SectionSample};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use claimmon_common::types::{AiMetrics, ProviderMetrics};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Clone)]
struct ProviderLedger {
    requests: u64,
    failures: u64,
    total_latency_ms: f64,
    daily_cost: f64,
    monthly_cost: f64,
}

#[derive(Debug)]
struct LedgerState {
    day: NaiveDate,
    providers: HashMap<String, ProviderLedger>,
}

impl LedgerState {
    /// Reset daily figures on a new UTC day and monthly figures on a new month.
    fn roll_over(&mut self, today: NaiveDate) {
        if today == self.day {
            return;
        }
        let new_month = (today.year(), today.month()) != (self.day.year(), self.day.month());
        for p in self.providers.values_mut() {
            p.requests = 0;
            p.failures = 0;
            p.total_latency_ms = 0.0;
            p.daily_cost = 0.0;
            if new_month {
                p.monthly_cost = 0.0;
            }
        }
        self.day = today;
    }
}

/// Spend and reliability ledger for AI chat-completion providers.
///
/// Request counts, latency and daily spend cover the current UTC day;
/// monthly spend covers the current UTC month.
pub struct AiUsageLedger {
    state: Mutex<LedgerState>,
}

impl Default for AiUsageLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl AiUsageLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                day: Utc::now().date_naive(),
                providers: HashMap::new(),
            }),
        }
    }

    pub fn record_usage(&self, provider: &str, cost_usd: f64, latency_ms: f64, success: bool) {
        self.record_usage_at(Utc::now(), provider, cost_usd, latency_ms, success);
    }

    pub fn record_usage_at(
        &self,
        now: DateTime<Utc>,
        provider: &str,
        cost_usd: f64,
        latency_ms: f64,
        success: bool,
    ) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.roll_over(now.date_naive());
        let entry = state.providers.entry(provider.to_string()).or_default();
        entry.requests += 1;
        if !success {
            entry.failures += 1;
        }
        entry.total_latency_ms += latency_ms;
        entry.daily_cost += cost_usd;
        entry.monthly_cost += cost_usd;
    }

    /// Current per-provider figures and totals. `cost_per_user` is left at
    /// zero; the snapshot fills it in from the business section.
    pub fn metrics_at(&self, now: DateTime<Utc>) -> AiMetrics {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.roll_over(now.date_naive());

        let providers: HashMap<String, ProviderMetrics> = state
            .providers
            .iter()
            .map(|(name, p)| {
                let (avg_latency_ms, error_rate) = if p.requests > 0 {
                    (
                        p.total_latency_ms / p.requests as f64,
                        p.failures as f64 / p.requests as f64 * 100.0,
                    )
                } else {
                    (0.0, 0.0)
                };
                (
                    name.clone(),
                    ProviderMetrics {
                        requests: p.requests,
                        avg_latency_ms,
                        error_rate,
                        daily_cost: p.daily_cost,
                        monthly_cost: p.monthly_cost,
                    },
                )
            })
            .collect();

        AiMetrics {
            total_daily_cost: providers.values().map(|p| p.daily_cost).sum(),
            total_monthly_cost: providers.values().map(|p| p.monthly_cost).sum(),
            providers,
            cost_per_user: 0.0,
        }
    }
}

pub struct AiCollector {
    ledger: Arc<AiUsageLedger>,
}

impl AiCollector {
    pub fn new(ledger: Arc<AiUsageLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Collector for AiCollector {
    fn name(&self) -> &str {
        "ai"
    }

    async fn collect(&self) -> Result<SectionSample> {
        Ok(SectionSample::Ai(self.ledger.metrics_at(Utc::now())))
    }
}
