//! One report snapshot from all collectors.
//!
//! Tasks, meetings and git activity are collected concurrently. Time entries
//! depend on the task ids found, so they are fetched only after all three finish.

use std::path::Path;

use crate::error::GatewayError;
use crate::models::ReportSnapshot;
use crate::services::bitrix_client::BitrixTransport;
use crate::services::git_collector::GitActivityCollector;
use crate::services::meeting_collector::MeetingCollector;
use crate::services::task_collector::TaskCollector;
use crate::utils::dates::ReportWindow;

/// Whose report is being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: String,
    pub name: String,
}

pub struct ReportAggregator<'a> {
    client: &'a dyn BitrixTransport,
    git: &'a GitActivityCollector,
    projects_root: &'a Path,
    subject: &'a Subject,
}

impl<'a> ReportAggregator<'a> {
    pub fn new(
        client: &'a dyn BitrixTransport,
        git: &'a GitActivityCollector,
        projects_root: &'a Path,
        subject: &'a Subject,
    ) -> Self {
        Self {
            client,
            git,
            projects_root,
            subject,
        }
    }

    /// Collect everything except chat summaries, which callers attach separately.
    ///
    /// Collectors absorb their own transport failures, so an error here means
    /// the gateway was misused and no partial snapshot is returned.
    pub async fn collect_all(&self, window: &ReportWindow) -> Result<ReportSnapshot, GatewayError> {
        log::debug!(
            "[Aggregator] collecting {} .. {} for user {}",
            window.start,
            window.end,
            self.subject.id
        );
        let tasks = TaskCollector::new(self.client, &self.subject.id);
        let calendar = MeetingCollector::new(self.client, &self.subject.id);

        let (buckets, meetings, git_activity) = tokio::try_join!(
            tasks.collect_tasks(window),
            calendar.collect_meetings(window),
            async { Ok::<_, GatewayError>(self.git.analyze_period(self.projects_root, window).await) },
        )?;

        let task_ids = buckets.unique_ids();
        let time_entries = tasks.collect_time_entries(&task_ids, window).await?;

        log::debug!(
            "[Aggregator] {} tasks, {} meetings, {} time entries, {} git projects",
            task_ids.len(),
            meetings.len(),
            time_entries.len(),
            git_activity.len()
        );

        Ok(ReportSnapshot {
            user_id: self.subject.id.clone(),
            user_name: self.subject.name.clone(),
            window: *window,
            tasks: buckets,
            meetings,
            chat_summaries: Vec::new(),
            time_entries,
            git_activity,
        })
    }
}
