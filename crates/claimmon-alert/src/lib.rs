//! Alert engine for the monitoring core.
//!
//! Rules inspect the current [`MetricsSnapshot`] and propose
//! [`AlertDraft`]s. The [`engine::AlertEngine`] turns drafts into alert
//! records, suppressing duplicates, enforcing an hourly budget and capping
//! the retained list. Built-in rules cover two-tier thresholds, AI spend
//! and regional emergencies.

pub mod engine;
pub mod rules;
pub mod window;

#[cfg(test)]
mod tests;

use claimmon_common::types::{AlertCategory, AlertDraft, MetricsSnapshot};

/// A statically configured alert condition over the metrics snapshot.
///
/// Rules are registered once when the [`engine::AlertEngine`] is built.
/// The engine applies the per-rule cooldown before a draft reaches
/// duplicate suppression.
pub trait AlertRule: Send + Sync {
    /// Unique identifier for this rule (e.g., `"response-time"`).
    fn id(&self) -> &str;

    /// Human-readable rule name.
    fn name(&self) -> &str;

    /// Category of every alert this rule produces.
    fn category(&self) -> AlertCategory;

    /// Minimum seconds between two drafts with the same title and level
    /// from this rule. Zero disables the cooldown.
    fn cooldown_secs(&self) -> u64 {
        0
    }

    /// Returns one draft per condition currently breached.
    fn evaluate(&self, snapshot: &MetricsSnapshot) -> Vec<AlertDraft>;
}
