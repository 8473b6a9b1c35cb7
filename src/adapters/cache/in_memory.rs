//! In-memory session cache backed by a moka TTL cache.

use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

use crate::domain::ports::SessionCache;

/// Maximum number of cached results.
const SESSION_CACHE_MAX_CAPACITY: u64 = 1_000;

/// Session-scoped result cache. Entries live for the configured TTL.
#[derive(Clone)]
pub struct InMemorySessionCache {
    entries: Cache<String, String>,
}

impl InMemorySessionCache {
    /// Cache whose entries expire after `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(SESSION_CACHE_MAX_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { entries }
    }
}

impl std::fmt::Debug for InMemorySessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySessionCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).await
    }

    async fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value).await;
    }

    async fn expire(&self, key: &str) {
        self.entries.invalidate(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_expire() {
        let cache = InMemorySessionCache::with_ttl(Duration::from_secs(60));
        assert_eq!(cache.get("k").await, None);

        cache.set("k", "v".to_string()).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));

        cache.expire("k").await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = InMemorySessionCache::with_ttl(Duration::from_millis(20));
        cache.set("k", "v".to_string()).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get("k").await, None);
    }
}
