use claimmon_common::types::AlertLevel;

/// Sends alerts at or above `min_level` to the channel at `channel_index`.
pub struct ChannelRoute {
    pub min_level: AlertLevel,
    pub channel_index: usize,
}

impl ChannelRoute {
    pub fn should_send(&self, level: AlertLevel) -> bool {
        level >= self.min_level
    }
}
