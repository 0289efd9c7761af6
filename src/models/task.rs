use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Status code the backend uses for completed tasks.
pub const STATUS_COMPLETED: &str = "5";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: String,
    pub responsible_id: String,
    pub creator_id: String,
    pub created_date: NaiveDateTime,
    pub closed_date: Option<NaiveDateTime>,
    pub deadline: Option<NaiveDateTime>,
}

/// Logged work against a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeEntry {
    pub task_id: String,
    pub user_id: String,
    pub seconds: i64,
    pub comment: String,
    pub created_date: NaiveDateTime,
}

impl TimeEntry {
    /// Duration in hours, rounded to two decimals.
    pub fn hours(&self) -> f64 {
        (self.seconds as f64 / 3600.0 * 100.0).round() / 100.0
    }
}

/// The four task lists the report shows.
///
/// A task may sit in several buckets at once (created and closed in the
/// same week, for instance); buckets are not deduplicated against each other.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskBuckets {
    pub created: Vec<Task>,
    pub assigned: Vec<Task>,
    pub closed: Vec<Task>,
    pub active: Vec<Task>,
}

impl TaskBuckets {
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.created
            .iter()
            .chain(&self.assigned)
            .chain(&self.closed)
            .chain(&self.active)
    }

    /// Distinct task ids across all buckets, in first-seen order
    /// (created, assigned, closed, active).
    pub fn unique_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.iter()
            .filter(|t| seen.insert(t.id.as_str()))
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}
