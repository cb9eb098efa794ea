use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Key/value store used for recorded metric observations and aggregates.
///
/// Every call may fail independently of the rest of the monitor; callers
/// log and degrade rather than propagate.
#[async_trait]
pub trait MetricCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;
}

/// Expired entries are swept once the map grows past this many keys.
const SWEEP_THRESHOLD: usize = 10_000;

/// In-process TTL cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Value, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|(_, expires)| *expires > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MetricCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, expires)) if *expires > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if entries.len() >= SWEEP_THRESHOLD {
            entries.retain(|_, (_, expires)| *expires > now);
        }
        entries.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("k", json!(1), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(json!(1)));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn set_overwrites_existing_value() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("k", json!("a"), ttl).await.unwrap();
        cache.set("k", json!("b"), ttl).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(json!("b")));
        assert_eq!(cache.len().await, 1);
    }
}
