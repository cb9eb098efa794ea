use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Trailing window used by the business and security counters.
pub const EVENT_WINDOW_SECS: i64 = 300;

/// Event counts over a trailing window, bucketed per second.
///
/// Reading never resets the count, so any number of collection passes can
/// observe the same burst until it ages out of the window.
#[derive(Debug)]
pub struct EventWindow {
    window_secs: i64,
    /// `(unix second, count)`, ascending by second.
    buckets: Mutex<VecDeque<(i64, u64)>>,
}

impl Default for EventWindow {
    fn default() -> Self {
        Self::new(EVENT_WINDOW_SECS)
    }
}

impl EventWindow {
    pub fn new(window_secs: i64) -> Self {
        Self {
            window_secs: window_secs.max(1),
            buckets: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(&self) {
        self.record_at(Utc::now());
    }

    pub fn record_at(&self, at: DateTime<Utc>) {
        let second = at.timestamp();
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let pos = buckets.partition_point(|b| b.0 < second);
        match buckets.get_mut(pos) {
            Some(bucket) if bucket.0 == second => bucket.1 += 1,
            _ => buckets.insert(pos, (second, 1)),
        }

        if let Some(&(newest, _)) = buckets.back() {
            let cutoff = newest - self.window_secs;
            while buckets.front().is_some_and(|b| b.0 <= cutoff) {
                buckets.pop_front();
            }
        }
    }

    /// Events recorded in the `window_secs` seconds up to `now`.
    pub fn count(&self, now: DateTime<Utc>) -> u64 {
        let now_secs = now.timestamp();
        let cutoff = now_secs - self.window_secs;
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while buckets.front().is_some_and(|b| b.0 <= cutoff) {
            buckets.pop_front();
        }
        buckets
            .iter()
            .filter(|b| b.0 <= now_secs)
            .map(|b| b.1)
            .sum()
    }
}
