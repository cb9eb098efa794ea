use crate::{Collector, SectionSample};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use claimmon_common::types::{PerformanceMetrics, ResponseTime};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use sysinfo::System;

/// Samples older than this are ignored.
const WINDOW_SECS: i64 = 300;
/// Upper bound on retained samples.
const CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct RequestSample {
    at: DateTime<Utc>,
    latency_ms: f64,
    status: u16,
}

/// Latency/status samples of requests served by the host process.
///
/// The HTTP layer records every response here; the performance collector
/// derives response-time percentiles, throughput and error rate from it.
pub struct RequestStats {
    samples: Mutex<VecDeque<RequestSample>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSummary {
    pub response_time: ResponseTime,
    pub requests_per_minute: f64,
    pub error_rate: f64,
    pub count: u64,
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(CAPACITY)),
        }
    }

    pub fn record(&self, latency_ms: f64, status: u16) {
        self.record_at(Utc::now(), latency_ms, status);
    }

    pub fn record_at(&self, at: DateTime<Utc>, latency_ms: f64, status: u16) {
        let mut samples = self
            .samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if samples.len() == CAPACITY {
            samples.pop_front();
        }
        samples.push_back(RequestSample {
            at,
            latency_ms,
            status,
        });
    }

    pub fn summary(&self, now: DateTime<Utc>) -> RequestSummary {
        let cutoff = now - Duration::seconds(WINDOW_SECS);
        let mut samples = self
            .samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while samples.front().is_some_and(|s| s.at < cutoff) {
            samples.pop_front();
        }
        if samples.is_empty() {
            return RequestSummary::default();
        }

        let mut latencies: Vec<f64> = samples.iter().map(|s| s.latency_ms).collect();
        latencies.sort_by(f64::total_cmp);
        let count = latencies.len();
        let errors = samples.iter().filter(|s| s.status >= 500).count();
        let avg = latencies.iter().sum::<f64>() / count as f64;

        RequestSummary {
            response_time: ResponseTime {
                avg,
                p50: percentile(&latencies, 50.0),
                p95: percentile(&latencies, 95.0),
                p99: percentile(&latencies, 99.0),
            },
            requests_per_minute: count as f64 / (WINDOW_SECS as f64 / 60.0),
            error_rate: errors as f64 / count as f64 * 100.0,
            count: count as u64,
        }
    }
}

/// Nearest-rank percentile over an ascending slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

pub struct PerformanceCollector {
    requests: Arc<RequestStats>,
    system: Mutex<System>,
}

impl PerformanceCollector {
    pub fn new(requests: Arc<RequestStats>) -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        Self {
            requests,
            system: Mutex::new(system),
        }
    }
}

#[async_trait]
impl Collector for PerformanceCollector {
    fn name(&self) -> &str {
        "performance"
    }

    async fn collect(&self) -> Result<SectionSample> {
        let summary = self.requests.summary(Utc::now());

        let (memory_usage, cpu_usage) = {
            let mut system = self
                .system
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            system.refresh_memory();
            system.refresh_cpu_all();
            let total = system.total_memory();
            let memory = if total > 0 {
                system.used_memory() as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            (memory, system.global_cpu_usage() as f64)
        };

        Ok(SectionSample::Performance(PerformanceMetrics {
            response_time: summary.response_time,
            throughput: summary.requests_per_minute,
            error_rate: summary.error_rate,
            memory_usage,
            cpu_usage,
            sample_count: summary.count,
        }))
    }
}
