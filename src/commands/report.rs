//! The `weekly-review` run: who, which window, collect, render.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{ReportError, ReportResult};
use crate::models::{ReportSnapshot, ReportStats};
use crate::services::aggregator::{ReportAggregator, Subject};
use crate::services::bitrix_client::{BitrixClient, BitrixTransport};
use crate::services::chat_collector::{ChatCollector, DEFAULT_CHAT_LIMIT, DEFAULT_TOP_DIALOGS};
use crate::services::git_collector::GitActivityCollector;
use crate::services::markdown::render_report;
use crate::services::summarizer::{ClaudeSummarizer, DialogSummarizer};
use crate::utils::config::Config;
use crate::utils::dates::{ReportWindow, Week};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub window: ReportWindow,
    pub include_chats: bool,
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    stats: ReportStats,
    report: &'a ReportSnapshot,
}

/// Explicit dates win over the named week. Both dates or neither.
pub fn resolve_window(
    week: Week,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> ReportResult<ReportWindow> {
    match (from, to) {
        (Some(from), Some(to)) => ReportWindow::from_dates(from, to).map_err(ReportError::InvalidWindow),
        (None, None) => Ok(ReportWindow::for_week(week, today)),
        _ => Err(ReportError::InvalidWindow(
            "--from and --to must be given together".to_string(),
        )),
    }
}

/// Subject from a `user.current` result; blank names fall back to "Unknown".
pub fn parse_profile(raw: &Value) -> Option<Subject> {
    let id = raw.get("ID").and_then(crate::utils::value_as_string)?;
    let part = |field: &str| raw.get(field).and_then(Value::as_str).unwrap_or_default().trim();
    let name = format!("{} {}", part("NAME"), part("LAST_NAME")).trim().to_string();
    Some(Subject {
        id,
        name: if name.is_empty() { "Unknown".to_string() } else { name },
    })
}

pub async fn fetch_subject(client: &dyn BitrixTransport) -> ReportResult<Subject> {
    match client.call("user.current", json!({})).await? {
        Some(raw) => parse_profile(&raw).ok_or(ReportError::Profile),
        None => Err(ReportError::Profile),
    }
}

/// Open a session, build the report, close the session.
pub async fn run_report(config: &Config, request: &ReportRequest) -> ReportResult<String> {
    let mut client = BitrixClient::new(&config.webhook_url);
    client.open()?;

    let summarizer = match (&config.api_key, request.include_chats) {
        (Some(key), true) => Some(ClaudeSummarizer::new(key, &config.model)?),
        _ => None,
    };
    let git = GitActivityCollector::new(config.projects_cache_file(), config.projects_cache_ttl_secs);

    let output = generate_report(
        &client,
        &git,
        config,
        request,
        summarizer.as_ref().map(|s| s as &dyn DialogSummarizer),
    )
    .await;
    client.close();
    output
}

pub async fn generate_report(
    client: &dyn BitrixTransport,
    git: &GitActivityCollector,
    config: &Config,
    request: &ReportRequest,
    summarizer: Option<&dyn DialogSummarizer>,
) -> ReportResult<String> {
    let subject = fetch_subject(client).await?;
    log::info!("[Report] building report for {} ({})", subject.name, subject.id);

    let mut snapshot = ReportAggregator::new(client, git, &config.projects_dir, &subject)
        .collect_all(&request.window)
        .await?;

    if request.include_chats {
        let summaries = ChatCollector::new(client, summarizer, &subject.name)
            .collect_and_summarize(&request.window, DEFAULT_CHAT_LIMIT, DEFAULT_TOP_DIALOGS)
            .await?;
        snapshot = snapshot.with_chat_summaries(summaries);
    }

    render(&snapshot, request.format)
}

pub fn render(snapshot: &ReportSnapshot, format: OutputFormat) -> ReportResult<String> {
    match format {
        OutputFormat::Markdown => Ok(render_report(snapshot)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonReport {
            stats: snapshot.stats(),
            report: snapshot,
        })?),
    }
}
