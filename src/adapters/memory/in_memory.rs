//! In-memory lesson store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::LessonLearned;
use crate::domain::ports::MemoryStore;

/// Process-local lesson store.
#[derive(Debug, Default)]
pub struct InMemoryMemoryStore {
    entries: RwLock<HashMap<String, Vec<LessonLearned>>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn append(&self, category: &str, lesson: &LessonLearned) -> DomainResult<()> {
        self.entries
            .write()
            .await
            .entry(category.to_string())
            .or_default()
            .push(lesson.clone());
        Ok(())
    }

    async fn list(&self, category: &str) -> DomainResult<Vec<LessonLearned>> {
        Ok(self
            .entries
            .read()
            .await
            .get(category)
            .cloned()
            .unwrap_or_default())
    }
}
