use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Timestamps of events inside a trailing time window.
pub struct SlidingWindow {
    window_secs: i64,
    data: VecDeque<DateTime<Utc>>,
}

impl SlidingWindow {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window_secs: window_secs as i64,
            data: VecDeque::new(),
        }
    }

    pub fn push(&mut self, at: DateTime<Utc>) {
        self.data.push_back(at);
        self.evict(at);
    }

    pub fn evict(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::seconds(self.window_secs);
        while let Some(front) = self.data.front() {
            if *front <= cutoff {
                self.data.pop_front();
            } else {
                break;
            }
        }
    }

    /// Events still inside the window at `now`.
    pub fn count(&mut self, now: DateTime<Utc>) -> usize {
        self.evict(now);
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
