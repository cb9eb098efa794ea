use crate::events::EventWindow;
use crate::{Collector, SectionSample};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use claimmon_common::types::BusinessMetrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Business activity counters incremented by the host application.
///
/// Event counters report activity over the trailing event window and are
/// not reset by collection. `active_users` is a gauge.
#[derive(Debug, Default)]
pub struct BusinessCounters {
    active_users: AtomicU64,
    new_signups: EventWindow,
    claims_processed: EventWindow,
    documents_uploaded: EventWindow,
    ai_requests: EventWindow,
}

impl BusinessCounters {
    pub fn set_active_users(&self, count: u64) {
        self.active_users.store(count, Ordering::Relaxed);
    }

    pub fn record_signup(&self) {
        self.new_signups.record();
    }

    pub fn record_claim_processed(&self) {
        self.claims_processed.record();
    }

    pub fn record_document_upload(&self) {
        self.documents_uploaded.record();
    }

    pub fn record_ai_request(&self) {
        self.ai_requests.record();
    }

    pub fn current(&self, now: DateTime<Utc>) -> BusinessMetrics {
        BusinessMetrics {
            active_users: self.active_users.load(Ordering::Relaxed),
            new_signups: self.new_signups.count(now),
            claims_processed: self.claims_processed.count(now),
            documents_uploaded: self.documents_uploaded.count(now),
            ai_requests: self.ai_requests.count(now),
        }
    }
}

pub struct BusinessCollector {
    counters: Arc<BusinessCounters>,
}

impl BusinessCollector {
    pub fn new(counters: Arc<BusinessCounters>) -> Self {
        Self { counters }
    }
}

#[async_trait]
impl Collector for BusinessCollector {
    fn name(&self) -> &str {
        "business"
    }

    async fn collect(&self) -> Result<SectionSample> {
        Ok(SectionSample::Business(self.counters.current(Utc::now())))
    }
}
