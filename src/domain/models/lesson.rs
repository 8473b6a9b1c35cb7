//! Lessons recorded after successful repair cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Memory category lessons are appended under.
pub const LESSONS_CATEGORY: &str = "lessons";

/// What one repair cycle taught us. Append-only once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonLearned {
    pub id: Uuid,
    /// Objective of the mission the lesson came from.
    pub objective: String,
    /// Summary of what failed.
    pub problem: String,
    /// Summary of the repair that worked.
    pub solution: String,
    /// Cycle in which the repair succeeded, starting at 1.
    pub repair_cycle: u32,
    pub created_at: DateTime<Utc>,
}

impl LessonLearned {
    pub fn new(
        objective: impl Into<String>,
        problem: impl Into<String>,
        solution: impl Into<String>,
        repair_cycle: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            objective: objective.into(),
            problem: problem.into(),
            solution: solution.into(),
            repair_cycle,
            created_at: Utc::now(),
        }
    }
}
