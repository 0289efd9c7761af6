use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{DialogSummary, GitActivity, Meeting, TaskBuckets, TimeEntry};
use crate::utils::dates::ReportWindow;

/// Everything collected for one report, handed to the renderer as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportSnapshot {
    pub user_id: String,
    pub user_name: String,
    pub window: ReportWindow,
    pub tasks: TaskBuckets,
    pub meetings: Vec<Meeting>,
    pub chat_summaries: Vec<DialogSummary>,
    pub time_entries: Vec<TimeEntry>,
    pub git_activity: Vec<GitActivity>,
}

impl ReportSnapshot {
    pub fn total_hours(&self) -> f64 {
        self.time_entries.iter().map(TimeEntry::hours).sum()
    }

    /// Hours per task, largest first. Ties keep first-logged order.
    pub fn hours_by_task(&self) -> Vec<(String, f64)> {
        let mut order: Vec<String> = Vec::new();
        let mut totals: HashMap<&str, f64> = HashMap::new();
        for entry in &self.time_entries {
            let slot = totals.entry(entry.task_id.as_str()).or_insert_with(|| {
                order.push(entry.task_id.clone());
                0.0
            });
            *slot += entry.hours();
        }
        let mut grouped: Vec<(String, f64)> = order
            .into_iter()
            .map(|id| {
                let hours = totals.get(id.as_str()).copied().unwrap_or(0.0);
                (id, hours)
            })
            .collect();
        grouped.sort_by(|a, b| b.1.total_cmp(&a.1));
        grouped
    }

    pub fn find_task_title(&self, task_id: &str) -> Option<&str> {
        self.tasks
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| t.title.as_str())
    }

    /// Attach chat summaries produced outside the core collection run.
    pub fn with_chat_summaries(mut self, summaries: Vec<DialogSummary>) -> Self {
        self.chat_summaries = summaries;
        self
    }

    pub fn stats(&self) -> ReportStats {
        ReportStats {
            tasks: TaskStats {
                created: self.tasks.created.len(),
                assigned: self.tasks.assigned.len(),
                closed: self.tasks.closed.len(),
                active: self.tasks.active.len(),
            },
            meetings: self.meetings.len(),
            chats: ChatStats {
                total: self.chat_summaries.len(),
                awaits_response: self.chat_summaries.iter().filter(|s| s.awaits_response).count(),
            },
            time_tracking: TimeStats {
                total_hours: self.total_hours(),
                entries_count: self.time_entries.len(),
            },
            git: GitStats {
                projects: self.git_activity.len(),
                total_commits: self.git_activity.iter().map(|a| a.commits.len()).sum(),
                total_files: self.git_activity.iter().map(|a| a.files_changed).sum(),
                total_insertions: self.git_activity.iter().map(|a| a.insertions).sum(),
                total_deletions: self.git_activity.iter().map(|a| a.deletions).sum(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportStats {
    pub tasks: TaskStats,
    pub meetings: usize,
    pub chats: ChatStats,
    pub time_tracking: TimeStats,
    pub git: GitStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStats {
    pub created: usize,
    pub assigned: usize,
    pub closed: usize,
    pub active: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatStats {
    pub total: usize,
    pub awaits_response: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeStats {
    pub total_hours: f64,
    pub entries_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitStats {
    pub projects: usize,
    pub total_commits: usize,
    pub total_files: u64,
    pub total_insertions: u64,
    pub total_deletions: u64,
}
