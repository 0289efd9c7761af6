//! Commit activity in local repositories.
//!
//! Projects are the immediate subdirectories of the projects root that hold a
//! `.git` entry. The list is cached on disk; each project is then inspected
//! with `git log`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use futures_util::stream::{self, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::models::{CommitRecord, DiffStat, GitActivity};
use crate::services::cache::TtlCache;
use crate::utils::dates::{format_filter_datetime, ReportWindow};

/// Upper bound on concurrent `git` processes.
pub const MAX_CONCURRENT_PROJECTS: usize = 8;

const HASH_PREFIX_LEN: usize = 7;

/// Cached scan result, valid only for the root it was taken from.
#[derive(Debug, Serialize, Deserialize)]
struct ProjectList {
    root: PathBuf,
    projects: Vec<PathBuf>,
}

pub struct GitActivityCollector {
    cache: TtlCache<ProjectList>,
}

impl GitActivityCollector {
    pub fn new(cache_file: impl Into<PathBuf>, ttl_secs: u64) -> Self {
        Self {
            cache: TtlCache::new(cache_file, ttl_secs),
        }
    }

    /// Activity of every discovered project, in discovery order.
    /// Projects without commits in the window, or where `git` fails, are left out.
    pub async fn analyze_period(&self, projects_root: &Path, window: &ReportWindow) -> Vec<GitActivity> {
        let projects = self.discover_projects(projects_root).await;
        if projects.is_empty() {
            log::debug!("[GitCollector] no projects under {}", projects_root.display());
            return Vec::new();
        }

        let activities: Vec<GitActivity> = stream::iter(projects)
            .map(|path| async move { analyze_project(&path, window).await })
            .buffered(MAX_CONCURRENT_PROJECTS)
            .filter_map(|activity| async move { activity })
            .collect()
            .await;

        log::debug!("[GitCollector] {} active projects", activities.len());
        activities
    }

    /// Cached project list, or a fresh scan that refreshes the cache.
    /// A root that cannot be read yields no projects and leaves the cache alone.
    pub async fn discover_projects(&self, projects_root: &Path) -> Vec<PathBuf> {
        match self.cache.get() {
            Some(cached) if cached.root == projects_root => return cached.projects,
            Some(cached) => log::debug!(
                "[GitCollector] cache is for {}, rescanning {}",
                cached.root.display(),
                projects_root.display()
            ),
            None => {}
        }

        let Some(projects) = scan_projects(projects_root).await else {
            return Vec::new();
        };
        let list = ProjectList {
            root: projects_root.to_path_buf(),
            projects,
        };
        self.cache.set(&list);
        log::debug!("[GitCollector] project cache refreshed: {} projects", list.projects.len());
        list.projects
    }
}

/// Immediate subdirectories of `root` containing `.git`, sorted by path.
/// `None` when `root` cannot be listed.
pub async fn scan_projects(root: &Path) -> Option<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("[GitCollector] cannot scan {}: {}", root.display(), e);
            return None;
        }
    };

    let mut projects = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if path.is_dir() && path.join(".git").exists() {
                    projects.push(path);
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::warn!("[GitCollector] error while scanning {}: {}", root.display(), e);
                break;
            }
        }
    }
    projects.sort();
    Some(projects)
}

/// Commits and change totals for one repository, `None` when there is nothing to report.
pub async fn analyze_project(path: &Path, window: &ReportWindow) -> Option<GitActivity> {
    let project_name = path.file_name()?.to_string_lossy().into_owned();
    let since = format!("--since={}", format_filter_datetime(window.start));
    let until = format!("--until={}", format_filter_datetime(window.end));

    let log_output = match run_git(path, &["log", &since, &until, "--no-merges", "--pretty=format:%H|%s|%ai"]).await {
        Ok(out) => out,
        Err(e) => {
            log::warn!("[GitCollector] {}: {}", project_name, e);
            return None;
        }
    };
    let commits = parse_log_output(&log_output);
    if commits.is_empty() {
        return None;
    }

    let stat_output = match run_git(path, &["log", &since, &until, "--no-merges", "--shortstat", "--format="]).await {
        Ok(out) => out,
        Err(e) => {
            log::warn!("[GitCollector] {}: {}", project_name, e);
            return None;
        }
    };
    let stat = parse_shortstat(&stat_output);

    Some(GitActivity {
        project_name,
        project_path: path.display().to_string(),
        commits,
        files_changed: stat.files_changed,
        insertions: stat.insertions,
        deletions: stat.deletions,
    })
}

async fn run_git(path: &Path, args: &[&str]) -> Result<String, String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(path)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| format!("failed to run git: {}", e))?;

    if !output.status.success() {
        return Err(format!(
            "git {} exited with {}: {}",
            args.first().copied().unwrap_or_default(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    String::from_utf8(output.stdout).map_err(|e| format!("git output is not UTF-8: {}", e))
}

/// Parse `%H|%s|%ai` lines. Subjects may contain `|`; the date is the last field.
pub fn parse_log_output(output: &str) -> Vec<CommitRecord> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let (hash, rest) = line.split_once('|')?;
            let (message, date) = rest.rsplit_once('|')?;
            Some(CommitRecord {
                hash: hash.chars().take(HASH_PREFIX_LEN).collect(),
                message: message.to_string(),
                date: date.trim().to_string(),
            })
        })
        .collect()
}

fn shortstat_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(\d+) (files? changed|insertions?\(\+\)|deletions?\(-\))").ok())
        .as_ref()
}

/// Sum every `--shortstat` summary line in `output`.
pub fn parse_shortstat(output: &str) -> DiffStat {
    let mut total = DiffStat::default();
    let Some(pattern) = shortstat_pattern() else {
        return total;
    };
    for caps in pattern.captures_iter(output) {
        let count: u64 = caps[1].parse().unwrap_or(0);
        total += match caps[2].chars().next() {
            Some('f') => DiffStat { files_changed: count, ..DiffStat::default() },
            Some('i') => DiffStat { insertions: count, ..DiffStat::default() },
            Some('d') => DiffStat { deletions: count, ..DiffStat::default() },
            _ => DiffStat::default(),
        };
    }
    total
}
