//! Task buckets and the time entries logged against them.

use serde_json::Value;

use crate::error::{GatewayError, BATCH_LIMIT};
use crate::models::{Task, TaskBuckets, TimeEntry, STATUS_COMPLETED};
use crate::services::batch_builder::BatchCommandBuilder;
use crate::services::bitrix_client::{BatchResults, BitrixTransport};
use crate::utils::dates::{format_filter_datetime, parse_backend_datetime, ReportWindow};
use crate::utils::value_as_string;

/// Most task ids one dependent time-entry fetch will look up.
pub const MAX_TIME_ENTRY_TASKS: usize = BATCH_LIMIT;

const KEY_CREATED: &str = "tasks_created";
const KEY_ASSIGNED: &str = "tasks_assigned";
const KEY_CLOSED: &str = "tasks_closed";
const KEY_ACTIVE: &str = "tasks_active";

/// Which timestamp must fall inside the window for a task to stay in a bucket.
#[derive(Debug, Clone, Copy)]
enum WindowGuard {
    Created,
    Closed,
    Unbounded,
}

pub struct TaskCollector<'a> {
    client: &'a dyn BitrixTransport,
    user_id: &'a str,
}

impl<'a> TaskCollector<'a> {
    pub fn new(client: &'a dyn BitrixTransport, user_id: &'a str) -> Self {
        Self { client, user_id }
    }

    /// Fetch all four buckets in one batch.
    pub async fn collect_tasks(&self, window: &ReportWindow) -> Result<TaskBuckets, GatewayError> {
        log::debug!(
            "[TaskCollector] collecting tasks for {} .. {}",
            window.start,
            window.end
        );
        let from = format_filter_datetime(window.start);
        let to = format_filter_datetime(window.end);
        let user = self.user_id.to_string();

        let mut builder = BatchCommandBuilder::new();
        builder
            .add_task_list(
                KEY_CREATED,
                &[
                    ("CREATED_BY", user.clone()),
                    (">=CREATED_DATE", from.clone()),
                    ("<=CREATED_DATE", to.clone()),
                ],
                None,
            )
            .add_task_list(
                KEY_ASSIGNED,
                &[
                    ("RESPONSIBLE_ID", user.clone()),
                    (">=CREATED_DATE", from.clone()),
                    ("<=CREATED_DATE", to.clone()),
                ],
                None,
            )
            .add_task_list(
                KEY_CLOSED,
                &[
                    ("RESPONSIBLE_ID", user.clone()),
                    (">=CLOSED_DATE", from),
                    ("<=CLOSED_DATE", to),
                ],
                None,
            )
            .add_task_list(
                KEY_ACTIVE,
                &[("RESPONSIBLE_ID", user), ("!STATUS", STATUS_COMPLETED.to_string())],
                None,
            );

        let results = self.client.batch(&builder.build()).await?;

        let buckets = TaskBuckets {
            created: parse_bucket(&results, KEY_CREATED, WindowGuard::Created, window),
            assigned: parse_bucket(&results, KEY_ASSIGNED, WindowGuard::Created, window),
            closed: parse_bucket(&results, KEY_CLOSED, WindowGuard::Closed, window),
            active: parse_bucket(&results, KEY_ACTIVE, WindowGuard::Unbounded, window),
        };
        log::debug!(
            "[TaskCollector] created={} assigned={} closed={} active={}",
            buckets.created.len(),
            buckets.assigned.len(),
            buckets.closed.len(),
            buckets.active.len()
        );
        Ok(buckets)
    }

    /// Time entries by the subject, in the window, for the first
    /// [`MAX_TIME_ENTRY_TASKS`] of `task_ids`. No request is made for an empty set.
    pub async fn collect_time_entries(
        &self,
        task_ids: &[String],
        window: &ReportWindow,
    ) -> Result<Vec<TimeEntry>, GatewayError> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        if task_ids.len() > MAX_TIME_ENTRY_TASKS {
            log::debug!(
                "[TaskCollector] {} task ids, looking up time for the first {}",
                task_ids.len(),
                MAX_TIME_ENTRY_TASKS
            );
        }
        let task_ids = &task_ids[..task_ids.len().min(MAX_TIME_ENTRY_TASKS)];

        let mut builder = BatchCommandBuilder::new();
        for id in task_ids {
            builder.add_time_entries(&time_key(id), id);
        }
        let results = self.client.batch(&builder.build()).await?;

        let mut entries = Vec::new();
        for id in task_ids {
            let Some(Value::Array(records)) = results.get(&time_key(id)) else {
                continue;
            };
            for raw in records {
                match parse_time_entry(raw) {
                    Ok(entry) if accepts_time_entry(&entry, window, self.user_id) => entries.push(entry),
                    Ok(_) => {}
                    Err(e) => log::warn!("[TaskCollector] skipping time entry on task {}: {}", id, e),
                }
            }
        }
        log::debug!("[TaskCollector] {} time entries collected", entries.len());
        Ok(entries)
    }
}

fn time_key(task_id: &str) -> String {
    format!("time_{}", task_id)
}

/// Keep only entries logged by `user_id` inside `window`.
pub fn filter_time_entries(entries: Vec<TimeEntry>, window: &ReportWindow, user_id: &str) -> Vec<TimeEntry> {
    entries
        .into_iter()
        .filter(|e| accepts_time_entry(e, window, user_id))
        .collect()
}

fn accepts_time_entry(entry: &TimeEntry, window: &ReportWindow, user_id: &str) -> bool {
    window.contains(entry.created_date) && entry.user_id == user_id
}

fn parse_bucket(results: &BatchResults, key: &str, guard: WindowGuard, window: &ReportWindow) -> Vec<Task> {
    let records = match results.get(key).and_then(|r| r.get("tasks")) {
        Some(Value::Array(records)) => records,
        _ => {
            log::debug!("[TaskCollector] no task list under {}", key);
            return Vec::new();
        }
    };

    records
        .iter()
        .filter_map(|raw| match parse_task(raw) {
            Ok(task) => Some(task),
            Err(e) => {
                log::warn!("[TaskCollector] skipping task in {}: {}", key, e);
                None
            }
        })
        .filter(|task| {
            let keep = match guard {
                WindowGuard::Created => window.contains(task.created_date),
                WindowGuard::Closed => task.closed_date.is_some_and(|d| window.contains(d)),
                WindowGuard::Unbounded => true,
            };
            if !keep {
                log::debug!("[TaskCollector] task {} outside window, dropped from {}", task.id, key);
            }
            keep
        })
        .collect()
}

fn optional_datetime(raw: &Value, field: &str) -> Option<chrono::NaiveDateTime> {
    raw.get(field).and_then(Value::as_str).and_then(parse_backend_datetime)
}

pub(crate) fn parse_task(raw: &Value) -> Result<Task, String> {
    let id = raw
        .get("id")
        .and_then(value_as_string)
        .ok_or_else(|| "missing id".to_string())?;
    let created_raw = raw.get("createdDate").and_then(Value::as_str).unwrap_or_default();
    let created_date = parse_backend_datetime(created_raw)
        .ok_or_else(|| format!("task {} has invalid createdDate {:?}", id, created_raw))?;
    let field = |name: &str| raw.get(name).and_then(value_as_string).unwrap_or_default();

    Ok(Task {
        title: raw
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled")
            .to_string(),
        status: raw.get("status").and_then(value_as_string).unwrap_or_else(|| "0".to_string()),
        responsible_id: field("responsibleId"),
        creator_id: field("createdBy"),
        created_date,
        closed_date: optional_datetime(raw, "closedDate"),
        deadline: optional_datetime(raw, "deadline"),
        id,
    })
}

pub(crate) fn parse_time_entry(raw: &Value) -> Result<TimeEntry, String> {
    let created_raw = raw.get("CREATED_DATE").and_then(Value::as_str).unwrap_or_default();
    let created_date = parse_backend_datetime(created_raw)
        .ok_or_else(|| format!("invalid CREATED_DATE {:?}", created_raw))?;
    let seconds = match raw.get("SECONDS") {
        None | Some(Value::Null) => 0,
        Some(v) => value_as_string(v)
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| format!("invalid SECONDS {}", v))?,
    };
    let field = |name: &str| raw.get(name).and_then(value_as_string).unwrap_or_default();

    Ok(TimeEntry {
        task_id: field("TASK_ID"),
        user_id: field("USER_ID"),
        seconds,
        comment: field("COMMENT_TEXT"),
        created_date,
    })
}
