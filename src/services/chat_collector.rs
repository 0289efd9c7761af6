//! Recent dialogs of the subject, trimmed to the window and summarized.
//!
//! Runs only when chat summaries are requested; the core collection never
//! calls into it.

use std::collections::HashSet;

use futures_util::stream::{self, StreamExt};
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::models::{ChatMessage, DialogSummary};
use crate::services::bitrix_client::BitrixTransport;
use crate::services::summarizer::DialogSummarizer;
use crate::utils::dates::{parse_backend_datetime, ReportWindow};
use crate::utils::value_as_string;

pub const DEFAULT_CHAT_LIMIT: usize = 200;
pub const DEFAULT_TOP_DIALOGS: usize = 15;

/// Upper bound on dialogs fetched or summarized at once.
pub const MAX_CONCURRENT_DIALOGS: usize = 8;

const MESSAGES_PAGE_SIZE: usize = 20;
const MAX_MESSAGE_PAGES: usize = 5;
const SKIPPED_CHAT_TYPES: [&str; 2] = ["announcement", "support24"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentDialog {
    pub id: String,
    pub name: String,
}

pub struct ChatCollector<'a> {
    client: &'a dyn BitrixTransport,
    summarizer: Option<&'a dyn DialogSummarizer>,
    subject_name: &'a str,
}

impl<'a> ChatCollector<'a> {
    pub fn new(
        client: &'a dyn BitrixTransport,
        summarizer: Option<&'a dyn DialogSummarizer>,
        subject_name: &'a str,
    ) -> Self {
        Self {
            client,
            summarizer,
            subject_name,
        }
    }

    /// Summaries of the busiest `top_dialogs` conversations in the window.
    pub async fn collect_and_summarize(
        &self,
        window: &ReportWindow,
        chat_limit: usize,
        top_dialogs: usize,
    ) -> Result<Vec<DialogSummary>, GatewayError> {
        let dialogs = self.recent_dialogs(chat_limit).await?;
        if dialogs.is_empty() {
            log::debug!("[ChatCollector] no recent dialogs");
            return Ok(Vec::new());
        }
        log::debug!("[ChatCollector] {} recent dialogs", dialogs.len());

        let fetched: Vec<Result<(RecentDialog, Vec<ChatMessage>), GatewayError>> = stream::iter(dialogs)
            .map(|dialog| async move {
                let messages = self.dialog_messages(&dialog.id, window).await?;
                Ok::<_, GatewayError>((dialog, messages))
            })
            .buffered(MAX_CONCURRENT_DIALOGS)
            .collect()
            .await;

        let mut active = Vec::new();
        for item in fetched {
            let (dialog, messages) = item?;
            if !messages.is_empty() {
                active.push((dialog, messages));
            }
        }
        log::debug!("[ChatCollector] {} dialogs with conversation in window", active.len());

        if self.summarizer.is_none() {
            log::warn!("[ChatCollector] no summarizer configured, chats are listed without summaries");
        }

        let mut summaries: Vec<DialogSummary> = stream::iter(active)
            .map(|(dialog, messages)| async move { self.summarize(&dialog, &messages).await })
            .buffered(MAX_CONCURRENT_DIALOGS)
            .collect()
            .await;

        summaries.sort_by(|a, b| b.message_count.cmp(&a.message_count));
        summaries.truncate(top_dialogs);
        Ok(summaries)
    }

    async fn summarize(&self, dialog: &RecentDialog, messages: &[ChatMessage]) -> DialogSummary {
        let summary = match self.summarizer {
            Some(summarizer) => {
                summarizer
                    .summarize(&dialog.id, &dialog.name, messages, self.subject_name)
                    .await
            }
            None => None,
        };
        summary.unwrap_or_else(|| DialogSummary::placeholder(&dialog.id, &dialog.name, messages.len()))
    }

    pub async fn recent_dialogs(&self, limit: usize) -> Result<Vec<RecentDialog>, GatewayError> {
        let params = json!({ "SKIP_OPENLINES": "Y", "LIMIT": limit });
        let items = match self.client.call("im.recent.list", params).await? {
            Some(Value::Object(mut result)) => match result.remove("items") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => return Ok(Vec::new()),
        };
        Ok(items.iter().filter_map(parse_recent_item).collect())
    }

    /// In-window messages of one dialog, newest pages first. Monologues come back empty.
    pub async fn dialog_messages(&self, dialog_id: &str, window: &ReportWindow) -> Result<Vec<ChatMessage>, GatewayError> {
        let mut collected = Vec::new();
        let mut last_id: Option<String> = None;

        for _ in 0..MAX_MESSAGE_PAGES {
            let mut params = json!({ "DIALOG_ID": dialog_id, "LIMIT": MESSAGES_PAGE_SIZE });
            if let Some(id) = &last_id {
                params["LAST_ID"] = json!(id);
            }
            let page = match self.client.call("im.dialog.messages.get", params).await? {
                Some(Value::Object(mut result)) => match result.remove("messages") {
                    Some(Value::Array(messages)) if !messages.is_empty() => messages,
                    _ => break,
                },
                _ => break,
            };

            for raw in &page {
                if let Some(message) = parse_message(raw, window) {
                    collected.push(message);
                }
            }
            last_id = page.last().and_then(|m| m.get("id")).and_then(value_as_string);
            if last_id.is_none() {
                break;
            }
        }

        if is_monologue(&collected) {
            log::debug!("[ChatCollector] dialog {} is a monologue, skipped", dialog_id);
            return Ok(Vec::new());
        }
        Ok(collected)
    }
}

fn parse_recent_item(item: &Value) -> Option<RecentDialog> {
    let chat_type = item.get("type").and_then(Value::as_str).unwrap_or_default();
    if SKIPPED_CHAT_TYPES.contains(&chat_type) {
        return None;
    }
    let id = item.get("id").and_then(value_as_string)?;
    let name = item
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .unwrap_or("Untitled")
        .to_string();
    Some(RecentDialog { id, name })
}

fn parse_message(raw: &Value, window: &ReportWindow) -> Option<ChatMessage> {
    let date = raw.get("date").and_then(Value::as_str)?;
    let at = parse_backend_datetime(date)?;
    if !window.contains(at) {
        return None;
    }
    Some(ChatMessage {
        author_name: raw
            .get("author_name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string(),
        text: raw.get("text").and_then(Value::as_str).unwrap_or_default().to_string(),
        date: date.to_string(),
    })
}

fn is_monologue(messages: &[ChatMessage]) -> bool {
    let authors: HashSet<&str> = messages.iter().map(|m| m.author_name.as_str()).collect();
    !messages.is_empty() && authors.len() < 2
}
