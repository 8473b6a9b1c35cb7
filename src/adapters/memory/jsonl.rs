//! JSON-lines lesson store: one file per category, one lesson per line.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::LessonLearned;
use crate::domain::ports::MemoryStore;

/// Appends lessons to `<directory>/<category>.jsonl`.
#[derive(Debug)]
pub struct JsonlMemoryStore {
    directory: PathBuf,
    // Serializes appends so concurrent writers never interleave lines.
    write_lock: Mutex<()>,
}

impl JsonlMemoryStore {
    /// Store rooted at `directory`; created on first append.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn category_path(&self, category: &str) -> DomainResult<PathBuf> {
        let valid = !category.is_empty()
            && category
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(DomainError::Memory(format!("Invalid memory category: {category:?}")));
        }
        Ok(self.directory.join(format!("{}.jsonl", category.to_lowercase())))
    }
}

#[async_trait]
impl MemoryStore for JsonlMemoryStore {
    async fn append(&self, category: &str, lesson: &LessonLearned) -> DomainResult<()> {
        let path = self.category_path(category)?;
        let mut line = serde_json::to_string(lesson)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.directory).await?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %path.display(), lesson_id = %lesson.id, "Lesson appended");
        Ok(())
    }

    async fn list(&self, category: &str) -> DomainResult<Vec<LessonLearned>> {
        let path = self.category_path(category)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut lessons = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LessonLearned>(line) {
                Ok(lesson) => lessons.push(lesson),
                Err(e) => warn!(path = %path.display(), line = number + 1, error = %e, "Skipping malformed lesson"),
            }
        }
        Ok(lessons)
    }
}
