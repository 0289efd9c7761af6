//! Encoding of batch sub-requests.
//!
//! Each sub-request is a `method?query` string. Task-list filters are written
//! as `filter[KEY]=value` in the order given, followed by one `select[]=FIELD`
//! per selected field.

use serde_json::{json, Value};
use url::form_urlencoded;

use crate::services::bitrix_client::BatchCommands;
use crate::utils::dates::{format_day, ReportWindow};

pub const TASK_LIST_METHOD: &str = "tasks.task.list";
pub const TIME_ENTRIES_METHOD: &str = "task.elapseditem.getlist";
pub const CALENDAR_METHOD: &str = "calendar.event.get";

pub const DEFAULT_TASK_SELECT: [&str; 8] = [
    "ID",
    "TITLE",
    "STATUS",
    "RESPONSIBLE_ID",
    "CREATOR_ID",
    "CREATED_DATE",
    "CLOSED_DATE",
    "DEADLINE",
];

#[derive(Debug, Default, Clone)]
pub struct BatchCommandBuilder {
    commands: BatchCommands,
}

impl BatchCommandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task-list query. `select` defaults to [`DEFAULT_TASK_SELECT`].
    pub fn add_task_list(
        &mut self,
        key: &str,
        filters: &[(&str, String)],
        select: Option<&[&str]>,
    ) -> &mut Self {
        let query = encode_task_list_query(filters, select.unwrap_or(&DEFAULT_TASK_SELECT));
        self.commands
            .insert(key.to_string(), format!("{}?{}", TASK_LIST_METHOD, query));
        self
    }

    pub fn add_time_entries(&mut self, key: &str, task_id: &str) -> &mut Self {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("TASKID", task_id)
            .finish();
        self.commands
            .insert(key.to_string(), format!("{}?{}", TIME_ENTRIES_METHOD, query));
        self
    }

    pub fn add_calendar_events(&mut self, key: &str, user_id: &str, window: &ReportWindow) -> &mut Self {
        self.commands.insert(
            key.to_string(),
            format!("{}?{}", CALENDAR_METHOD, encode_calendar_query(user_id, window)),
        );
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn build(&self) -> BatchCommands {
        self.commands.clone()
    }

    pub fn clear(&mut self) -> &mut Self {
        self.commands.clear();
        self
    }
}

fn encode_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

pub fn encode_task_list_query(filters: &[(&str, String)], select: &[&str]) -> String {
    filters
        .iter()
        .map(|(key, value)| format!("filter[{}]={}", key, encode_value(value)))
        .chain(select.iter().map(|field| format!("select[]={}", field)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Calendar query as a form-encoded string, for batch use.
pub fn encode_calendar_query(user_id: &str, window: &ReportWindow) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("type", "user")
        .append_pair("ownerId", user_id)
        .append_pair("from", &format_day(window.start))
        .append_pair("to", &format_day(window.end))
        .finish()
}

/// Calendar query as a JSON body, for a direct call.
pub fn calendar_event_params(user_id: &str, window: &ReportWindow) -> Value {
    json!({
        "type": "user",
        "ownerId": user_id,
        "from": format_day(window.start),
        "to": format_day(window.end),
    })
}
