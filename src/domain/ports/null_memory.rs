//! Null memory store implementation.
//!
//! Used when lesson persistence is disabled but the healing loop still
//! needs a `MemoryStore`.

use async_trait::async_trait;

use super::MemoryStore;
use crate::domain::errors::DomainResult;
use crate::domain::models::LessonLearned;

/// A no-op memory store that keeps nothing.
#[derive(Debug, Clone, Default)]
pub struct NullMemoryStore;

impl NullMemoryStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MemoryStore for NullMemoryStore {
    async fn append(&self, _category: &str, _lesson: &LessonLearned) -> DomainResult<()> {
        Ok(())
    }

    async fn list(&self, _category: &str) -> DomainResult<Vec<LessonLearned>> {
        Ok(Vec::new())
    }
}
