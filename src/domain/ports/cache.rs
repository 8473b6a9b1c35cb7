//! Session cache port - explicitly injected result cache.

use async_trait::async_trait;

/// Key/value cache whose entries expire after a TTL fixed by the implementation.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Value for `key`, unless absent or expired.
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: String);

    /// Drop `key` immediately.
    async fn expire(&self, key: &str);
}
