use crate::events::EventWindow;
use crate::{Collector, SectionSample};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use claimmon_common::types::SecurityMetrics;
use std::sync::Arc;

/// Security event counts over the trailing event window.
#[derive(Debug, Default)]
pub struct SecurityCounters {
    failed_logins: EventWindow,
    blocked_requests: EventWindow,
    suspicious_activity: EventWindow,
    rate_limit_hits: EventWindow,
}

impl SecurityCounters {
    pub fn record_failed_login(&self) {
        self.failed_logins.record();
    }

    pub fn record_blocked_request(&self) {
        self.blocked_requests.record();
    }

    pub fn record_suspicious_activity(&self) {
        self.suspicious_activity.record();
    }

    pub fn record_rate_limit_hit(&self) {
        self.rate_limit_hits.record();
    }

    pub fn current(&self, now: DateTime<Utc>) -> SecurityMetrics {
        SecurityMetrics {
            failed_logins: self.failed_logins.count(now),
            blocked_requests: self.blocked_requests.count(now),
            suspicious_activity: self.suspicious_activity.count(now),
            rate_limit_hits: self.rate_limit_hits.count(now),
        }
    }
}

pub struct SecurityCollector {
    counters: Arc<SecurityCounters>,
}

impl SecurityCollector {
    pub fn new(counters: Arc<SecurityCounters>) -> Self {
        Self { counters }
    }
}

#[async_trait]
impl Collector for SecurityCollector {
    fn name(&self) -> &str {
        "security"
    }

    async fn collect(&self) -> Result<SectionSample> {
        Ok(SectionSample::Security(self.counters.current(Utc::now())))
    }
}
