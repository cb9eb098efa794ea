//! Metric collection for the monitoring core.
//!
//! Each [`Collector`] produces one section of the [`MetricsSnapshot`]. The
//! [`store::MetricsStore`] runs them in a fixed order and applies each
//! section independently, so a failing collector only leaves its own
//! section stale.

pub mod ai;
pub mod business;
pub mod cache;
pub mod error;
pub mod events;
pub mod performance;
pub mod security;
pub mod store;


use anyhow::Result;
use async_trait::async_trait;
use claimmon_common::types::{
    AiMetrics, BusinessMetrics, MetricsSnapshot, PerformanceMetrics, SecurityMetrics,
};

/// A freshly collected snapshot section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionSample {
    Performance(PerformanceMetrics),
    Business(BusinessMetrics),
    Ai(AiMetrics),
    Security(SecurityMetrics),
}

impl SectionSample {
    /// Overwrite the matching section of `snapshot`.
    pub fn apply(self, snapshot: &mut MetricsSnapshot) {
        match self {
            SectionSample::Performance(p) => snapshot.performance = p,
            SectionSample::Business(b) => snapshot.business = b,
            SectionSample::Ai(mut ai) => {
                let users = snapshot.business.active_users;
                ai.cost_per_user = if users > 0 {
                    ai.total_daily_cost / users as f64
                } else {
                    0.0
                };
                snapshot.ai = ai;
            }
            SectionSample::Security(s) => snapshot.security = s,
        }
    }
}

/// Produces one snapshot section per collection pass.
///
/// Collectors are registered with the metrics store in the order they
/// should run (performance, business, ai, security).
#[async_trait]
pub trait Collector: Send + Sync {
    /// Section name used in logs, e.g. `"performance"`.
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Returns an error if the underlying source cannot be read. The store
    /// logs it and keeps the previous section values.
    async fn collect(&self) -> Result<SectionSample>;
}
