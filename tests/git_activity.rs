use std::fs;
use std::path::Path;
use std::process::Command;

use chrono::NaiveDate;
use tempfile::TempDir;

use weekly_review::services::git_collector::{scan_projects, GitActivityCollector};
use weekly_review::utils::dates::ReportWindow;

fn window() -> ReportWindow {
    ReportWindow::from_dates(
        NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
        NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(),
    )
    .unwrap()
}

fn git_available() -> bool {
    Command::new("git").arg("--version").output().map(|o| o.status.success()).unwrap_or(false)
}

fn git(repo: &Path, args: &[&str], date: &str) {
    let status = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com", "-c", "commit.gpgsign=false"])
        .args(args)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .output()
        .unwrap();
    assert!(status.status.success(), "git {:?} failed: {:?}", args, status);
}

fn commit_file(repo: &Path, name: &str, contents: &str, message: &str, date: &str) {
    fs::write(repo.join(name), contents).unwrap();
    git(repo, &["add", name], date);
    git(repo, &["commit", "-q", "-m", message], date);
}

fn make_dir_repo(root: &Path, name: &str) {
    fs::create_dir_all(root.join(name).join(".git")).unwrap();
}

#[tokio::test]
async fn scan_finds_only_direct_children_with_git() {
    let dir = TempDir::new().unwrap();
    make_dir_repo(dir.path(), "alpha");
    make_dir_repo(dir.path(), "beta");
    fs::create_dir_all(dir.path().join("notes")).unwrap();
    make_dir_repo(&dir.path().join("notes"), "nested");

    let projects = scan_projects(dir.path()).await.unwrap();
    let names: Vec<String> = projects
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["alpha", "beta"]);

    assert!(scan_projects(&dir.path().join("missing")).await.is_none());
}

#[tokio::test]
async fn fresh_cache_skips_the_scan_and_stale_cache_rescans() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("projects");
    make_dir_repo(&root, "alpha");
    let cache_file = dir.path().join("cache/projects.json");

    let cached = GitActivityCollector::new(&cache_file, 3600);
    assert_eq!(cached.discover_projects(&root).await.len(), 1);
    assert!(cache_file.exists());

    make_dir_repo(&root, "beta");
    assert_eq!(cached.discover_projects(&root).await.len(), 1);

    let expired = GitActivityCollector::new(&cache_file, 0);
    assert_eq!(expired.discover_projects(&root).await.len(), 2);
}

#[tokio::test]
async fn missing_root_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("projects");
    let cache_file = dir.path().join("projects.json");
    let collector = GitActivityCollector::new(&cache_file, 3600);

    assert!(collector.discover_projects(&root).await.is_empty());
    assert!(!cache_file.exists());

    make_dir_repo(&root, "alpha");
    assert_eq!(collector.discover_projects(&root).await.len(), 1);
    assert!(cache_file.exists());
}

#[tokio::test]
async fn changing_the_root_bypasses_a_fresh_cache() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("work");
    let second = dir.path().join("personal");
    make_dir_repo(&first, "alpha");
    make_dir_repo(&second, "beta");
    make_dir_repo(&second, "gamma");
    let collector = GitActivityCollector::new(dir.path().join("projects.json"), 3600);

    assert_eq!(collector.discover_projects(&first).await, vec![first.join("alpha")]);
    assert_eq!(
        collector.discover_projects(&second).await,
        vec![second.join("beta"), second.join("gamma")]
    );
    assert_eq!(collector.discover_projects(&first).await, vec![first.join("alpha")]);
}

#[tokio::test]
async fn corrupt_cache_falls_back_to_scanning() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("projects");
    make_dir_repo(&root, "alpha");
    let cache_file = dir.path().join("projects.json");
    fs::write(&cache_file, "not json at all").unwrap();

    let collector = GitActivityCollector::new(&cache_file, 3600);
    assert_eq!(collector.discover_projects(&root).await.len(), 1);
}

#[tokio::test]
async fn reports_only_projects_with_commits_in_window() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("projects");

    let foo = root.join("foo");
    fs::create_dir_all(&foo).unwrap();
    git(&foo, &["init", "-q"], "2026-02-03T10:00:00");
    commit_file(&foo, "a.txt", "one\ntwo\nthree\n", "Add a", "2026-02-03T10:00:00");
    commit_file(&foo, "b.txt", "x\n", "Add b", "2026-02-04T11:00:00");
    commit_file(&foo, "c.txt", "late\n", "After window", "2026-02-12T09:00:00");

    let quiet = root.join("quiet");
    fs::create_dir_all(&quiet).unwrap();
    git(&quiet, &["init", "-q"], "2025-11-01T10:00:00");
    commit_file(&quiet, "old.txt", "old\n", "Old work", "2025-11-01T10:00:00");

    let collector = GitActivityCollector::new(dir.path().join("cache.json"), 3600);
    let activity = collector.analyze_period(&root, &window()).await;

    assert_eq!(activity.len(), 1);
    let foo_activity = &activity[0];
    assert_eq!(foo_activity.project_name, "foo");
    assert_eq!(foo_activity.commits.len(), 2);
    assert_eq!(foo_activity.commits[0].message, "Add b");
    assert_eq!(foo_activity.commits[0].hash.len(), 7);
    assert_eq!(foo_activity.files_changed, 2);
    assert_eq!(foo_activity.insertions, 4);
    assert_eq!(foo_activity.deletions, 0);
}
