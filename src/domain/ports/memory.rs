//! Memory port - append-only store for lessons learned.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::LessonLearned;

/// Append-only lesson store.
///
/// Callers treat failures as non-fatal: a lesson that cannot be persisted is
/// logged and dropped.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn append(&self, category: &str, lesson: &LessonLearned) -> DomainResult<()>;

    /// All lessons recorded under `category`, oldest first.
    async fn list(&self, category: &str) -> DomainResult<Vec<LessonLearned>>;
}
