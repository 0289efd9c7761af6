mod common;

use chrono::NaiveDate;
use serde_json::{json, Value};
use tempfile::TempDir;

use common::ScriptedBackend;
use weekly_review::commands::report::{generate_report, OutputFormat, ReportRequest};
use weekly_review::error::GatewayError;
use weekly_review::services::aggregator::{ReportAggregator, Subject};
use weekly_review::services::bitrix_client::{BatchCommands, BitrixTransport};
use weekly_review::services::git_collector::GitActivityCollector;
use weekly_review::utils::config::Config;
use weekly_review::utils::dates::ReportWindow;

fn window() -> ReportWindow {
    ReportWindow::from_dates(
        NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
        NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(),
    )
    .unwrap()
}

fn task(id: u32, title: &str, created: &str, closed: Option<&str>) -> Value {
    json!({
        "id": id,
        "title": title,
        "status": if closed.is_some() { "5" } else { "3" },
        "responsibleId": 7,
        "createdBy": 7,
        "createdDate": created,
        "closedDate": closed,
    })
}

fn scenario_backend() -> ScriptedBackend {
    ScriptedBackend::new()
        .on_call("user.current", json!({ "ID": "7", "NAME": "Ann", "LAST_NAME": "Smith" }))
        .on_call(
            "calendar.event.get",
            json!([{
                "ID": "501",
                "NAME": "Sprint review",
                "DATE_FROM": "2026-02-06T15:00:00+03:00",
                "DATE_TO": "2026-02-06T16:00:00+03:00",
                "ATTENDEES": [{ "NAME": "Ann" }, { "NAME": "Bob" }],
                "LOCATION": "",
            }]),
        )
        .on_batch_key(
            "tasks_created",
            json!({ "tasks": [
                task(1, "Draft API", "2026-02-02T10:00:00+03:00", None),
                task(2, "Fix login", "2026-02-03T10:00:00+03:00", Some("2026-02-04T18:00:00+03:00")),
                task(3, "Write docs", "2026-02-05T10:00:00+03:00", None),
            ]}),
        )
        .on_batch_key(
            "tasks_closed",
            json!({ "tasks": [
                task(2, "Fix login", "2026-02-03T10:00:00+03:00", Some("2026-02-04T18:00:00+03:00")),
                task(8, "Old bug", "2026-01-12T10:00:00+03:00", Some("2026-02-06T11:00:00+03:00")),
            ]}),
        )
        .on_batch_key(
            "time_2",
            json!([
                { "TASK_ID": "2", "USER_ID": "7", "SECONDS": "5400", "COMMENT_TEXT": "", "CREATED_DATE": "2026-02-04T17:00:00+03:00" },
                { "TASK_ID": "2", "USER_ID": "9", "SECONDS": "3600", "COMMENT_TEXT": "", "CREATED_DATE": "2026-02-04T17:00:00+03:00" },
            ]),
        )
}

fn config(dir: &TempDir) -> Config {
    Config {
        webhook_url: "https://portal.example/rest/7/token".into(),
        projects_dir: dir.path().join("projects"),
        api_key: None,
        model: "unused".into(),
        cache_dir: dir.path().join("cache"),
        projects_cache_ttl_secs: 3600,
    }
}

#[tokio::test]
async fn weekly_snapshot_keeps_bucket_overlap_and_filters_time() {
    let dir = TempDir::new().unwrap();
    let backend = scenario_backend();
    let git = GitActivityCollector::new(dir.path().join("cache/projects.json"), 3600);
    let subject = Subject { id: "7".into(), name: "Ann Smith".into() };
    let root = dir.path().join("projects");

    let snapshot = ReportAggregator::new(&backend, &git, &root, &subject)
        .collect_all(&window())
        .await
        .unwrap();

    assert_eq!(snapshot.tasks.created.len(), 3);
    assert_eq!(snapshot.tasks.closed.len(), 2);
    assert_eq!(snapshot.meetings.len(), 1);
    assert_eq!(snapshot.time_entries.len(), 1);
    assert_eq!(snapshot.total_hours(), 1.5);

    let batches = backend.batches_seen.lock().unwrap().clone();
    assert_eq!(batches.len(), 2);
    let time_keys: Vec<&str> = batches[1].keys().map(String::as_str).collect();
    assert_eq!(time_keys, vec!["time_1", "time_2", "time_3", "time_8"]);
}

#[tokio::test]
async fn markdown_report_covers_every_populated_section() {
    let dir = TempDir::new().unwrap();
    let backend = scenario_backend();
    let git = GitActivityCollector::new(dir.path().join("cache/projects.json"), 3600);
    let request = ReportRequest {
        window: window(),
        include_chats: false,
        format: OutputFormat::Markdown,
    };

    let out = generate_report(&backend, &git, &config(&dir), &request, None).await.unwrap();

    assert!(out.starts_with("# Weekly review: 02.02.2026 — 08.02.2026"));
    assert!(out.contains("User: **Ann Smith**"));
    assert!(out.contains("**Created:** 3 | **Closed:** 2"));
    assert!(out.contains("### Closed tasks\n- [2] Fix login\n- [8] Old bug"));
    assert!(out.contains("## Meetings (1)"));
    assert!(out.contains("**Attendees:** Ann, Bob"));
    assert!(out.contains("- [2] Fix login: **1.5 h**"));
    assert!(!out.contains("## Key conversations"));
    assert!(!out.contains("## Projects"));
}

#[tokio::test]
async fn oversized_batch_is_refused_before_reaching_the_backend() {
    let backend = ScriptedBackend::new();
    let commands: BatchCommands = (0..51)
        .map(|i| (format!("time_{}", i), format!("task.elapseditem.getlist?TASKID={}", i)))
        .collect();

    let err = backend.batch(&commands).await.unwrap_err();

    assert_eq!(err, GatewayError::BatchTooLarge { limit: 50, given: 51 });
    assert_eq!(backend.batch_count(), 0);
}
