//! Chat summarization through the Anthropic messages API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::models::{ChatMessage, DialogSummary};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Turns a transcript into a structured summary. `None` means "could not summarize".
#[async_trait]
pub trait DialogSummarizer: Send + Sync {
    async fn summarize(
        &self,
        dialog_id: &str,
        dialog_name: &str,
        messages: &[ChatMessage],
        subject_name: &str,
    ) -> Option<DialogSummary>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Fields the model must return. All are required.
#[derive(Debug, Deserialize)]
struct SummaryPayload {
    topic: String,
    agreements: Vec<String>,
    decisions: Vec<String>,
    questions: Vec<String>,
    awaits_response: bool,
}

pub struct ClaudeSummarizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeSummarizer {
    pub fn new(api_key: &str, model: &str) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::SessionInit(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String, String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("summary API request failed: {}", e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!("summary API error {}: {}", status, text));
        }

        let parsed: MessagesResponse = serde_json::from_str(&text).map_err(|e| e.to_string())?;
        parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| "summary API returned empty content".to_string())
    }
}

#[async_trait]
impl DialogSummarizer for ClaudeSummarizer {
    async fn summarize(
        &self,
        dialog_id: &str,
        dialog_name: &str,
        messages: &[ChatMessage],
        subject_name: &str,
    ) -> Option<DialogSummary> {
        if messages.is_empty() {
            return None;
        }
        log::debug!(
            "[Summarizer] summarizing '{}' ({} messages)",
            dialog_name,
            messages.len()
        );

        let prompt = build_prompt(dialog_name, messages, subject_name);
        match self.complete(&prompt).await {
            Ok(text) => parse_summary(&text, dialog_id, dialog_name, messages.len()),
            Err(e) => {
                log::warn!("[Summarizer] '{}': {}", dialog_name, e);
                None
            }
        }
    }
}

pub fn build_prompt(dialog_name: &str, messages: &[ChatMessage], subject_name: &str) -> String {
    let transcript = messages
        .iter()
        .map(|m| format!("[{}] {}: {}", m.date, m.author_name, m.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Analyze this Bitrix24 chat and write a short digest.\n\n\
DIALOG: {dialog}\n\
USER: {user}\n\
MESSAGE COUNT: {count}\n\n\
MESSAGES:\n{transcript}\n\n\
TASK:\n\
1. topic: one sentence describing what the conversation was about\n\
2. agreements: concrete agreements reached, if any\n\
3. decisions: decisions that were made, if any\n\
4. questions: open questions still waiting for an answer, if any\n\
5. awaits_response: whether {user} personally needs to reply or act\n\n\
Return strict JSON only:\n\
{{\"topic\": \"...\", \"agreements\": [\"...\"], \"decisions\": [\"...\"], \"questions\": [\"...\"], \"awaits_response\": false}}\n\n\
Use [] for empty categories. Keep each item short. No text outside the JSON.",
        dialog = dialog_name,
        user = subject_name,
        count = messages.len(),
        transcript = transcript,
    )
}

/// Parse the model's reply. Anything other than a JSON object with all five
/// keys yields `None`.
pub fn parse_summary(text: &str, dialog_id: &str, dialog_name: &str, message_count: usize) -> Option<DialogSummary> {
    let clean = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if clean.is_empty() {
        return None;
    }

    match serde_json::from_str::<SummaryPayload>(clean) {
        Ok(payload) => Some(DialogSummary {
            dialog_id: dialog_id.to_string(),
            dialog_name: dialog_name.to_string(),
            message_count,
            topic: payload.topic,
            agreements: payload.agreements,
            decisions: payload.decisions,
            questions: payload.questions,
            awaits_response: payload.awaits_response,
        }),
        Err(e) => {
            let preview: String = clean.chars().take(200).collect();
            log::warn!("[Summarizer] unparsable reply for '{}': {} - {}", dialog_name, e, preview);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_json_reply_yields_no_summary() {
        assert!(parse_summary("Sure! Here is the summary you asked for.", "chat1", "Team", 4).is_none());
        assert!(parse_summary("   ", "chat1", "Team", 4).is_none());
    }

    #[test]
    fn missing_keys_are_rejected() {
        let reply = r#"{"topic": "Release", "agreements": [], "decisions": []}"#;
        assert!(parse_summary(reply, "chat1", "Team", 4).is_none());
    }

    #[test]
    fn fenced_json_reply_is_accepted() {
        let reply = "```json\n{\"topic\": \"Release date\", \"agreements\": [\"ship Friday\"], \
                     \"decisions\": [], \"questions\": [\"who tests?\"], \"awaits_response\": true}\n```";
        let summary = parse_summary(reply, "chat1", "Team", 6).unwrap();
        assert_eq!(summary.topic, "Release date");
        assert_eq!(summary.agreements, vec!["ship Friday"]);
        assert_eq!(summary.message_count, 6);
        assert!(summary.awaits_response);
        assert!(!summary.is_placeholder());
    }

    #[test]
    fn prompt_carries_transcript_and_subject() {
        let messages = vec![ChatMessage {
            author_name: "Bob".into(),
            text: "Can you review?".into(),
            date: "2026-02-03T10:00:00".into(),
        }];
        let prompt = build_prompt("Team", &messages, "Ann Smith");
        assert!(prompt.contains("DIALOG: Team"));
        assert!(prompt.contains("[2026-02-03T10:00:00] Bob: Can you review?"));
        assert!(prompt.contains("whether Ann Smith personally"));
        assert!(prompt.contains("MESSAGE COUNT: 1"));
    }
}
