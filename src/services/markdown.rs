use crate::models::{DialogSummary, GitActivity, Meeting, ReportSnapshot, Task};
use crate::utils::dates::format_date_range;
use crate::utils::truncate_chars;

const LISTED_TASKS: usize = 10;
const LISTED_ATTENDEES: usize = 5;
const LISTED_TIME_TASKS: usize = 10;
const LISTED_COMMITS: usize = 5;
const COMMIT_MESSAGE_CHARS: usize = 100;

/// Render a snapshot as Markdown. Sections with no data are left out.
pub fn render_report(snapshot: &ReportSnapshot) -> String {
    let sections = [
        Some(render_header(snapshot)),
        render_tasks(snapshot),
        render_meetings(&snapshot.meetings),
        render_chats(&snapshot.chat_summaries),
        render_time_tracking(snapshot),
        render_git(&snapshot.git_activity),
    ];
    sections.into_iter().flatten().collect::<Vec<_>>().join("\n\n")
}

fn render_header(snapshot: &ReportSnapshot) -> String {
    format!(
        "# Weekly review: {}\n\nUser: **{}**",
        format_date_range(&snapshot.window),
        snapshot.user_name
    )
}

fn push_task_list(lines: &mut Vec<String>, heading: &str, tasks: &[Task]) {
    if tasks.is_empty() {
        return;
    }
    lines.push(format!("\n### {}", heading));
    for task in tasks.iter().take(LISTED_TASKS) {
        lines.push(format!("- [{}] {}", task.id, task.title));
    }
}

fn render_tasks(snapshot: &ReportSnapshot) -> Option<String> {
    let buckets = &snapshot.tasks;
    if buckets.is_empty() {
        return None;
    }

    let counts: Vec<String> = [
        ("Created", buckets.created.len()),
        ("Assigned", buckets.assigned.len()),
        ("Closed", buckets.closed.len()),
        ("Active", buckets.active.len()),
    ]
    .iter()
    .filter(|(_, n)| *n > 0)
    .map(|(label, n)| format!("**{}:** {}", label, n))
    .collect();

    let mut lines = vec!["## Tasks".to_string(), counts.join(" | ")];
    push_task_list(&mut lines, "Created tasks", &buckets.created);
    push_task_list(&mut lines, "Closed tasks", &buckets.closed);
    Some(lines.join("\n"))
}

fn render_meetings(meetings: &[Meeting]) -> Option<String> {
    if meetings.is_empty() {
        return None;
    }
    let mut lines = vec![format!("## Meetings ({})", meetings.len())];
    for meeting in meetings {
        lines.push(format!("\n### {}", meeting.name));
        lines.push(format!("**Date:** {}", meeting.date_from.format("%d.%m %H:%M")));
        if !meeting.attendees.is_empty() {
            let mut attendees = meeting
                .attendees
                .iter()
                .take(LISTED_ATTENDEES)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            if meeting.attendees.len() > LISTED_ATTENDEES {
                attendees.push_str(&format!(" and {} more", meeting.attendees.len() - LISTED_ATTENDEES));
            }
            lines.push(format!("**Attendees:** {}", attendees));
        }
        if !meeting.location.is_empty() {
            lines.push(format!("**Location:** {}", meeting.location));
        }
    }
    Some(lines.join("\n"))
}

fn render_chats(summaries: &[DialogSummary]) -> Option<String> {
    if summaries.is_empty() {
        return None;
    }
    let mut lines = vec![format!("## Key conversations ({})", summaries.len())];
    for summary in summaries {
        lines.push(format!("\n### {}", summary.dialog_name));
        lines.push(format!("**Messages:** {}", summary.message_count));
        lines.push(format!("**Topic:** {}", summary.topic));
        for (heading, items) in [
            ("Agreements", &summary.agreements),
            ("Decisions", &summary.decisions),
            ("Open questions", &summary.questions),
        ] {
            if items.is_empty() {
                continue;
            }
            lines.push(format!("\n**{}:**", heading));
            lines.extend(items.iter().map(|item| format!("- {}", item)));
        }
        if summary.awaits_response {
            lines.push("\n⚠️ **Awaiting your response**".to_string());
        }
    }
    Some(lines.join("\n"))
}

fn render_time_tracking(snapshot: &ReportSnapshot) -> Option<String> {
    if snapshot.time_entries.is_empty() {
        return None;
    }
    let mut lines = vec![
        "## Time tracking".to_string(),
        format!("**Total time logged:** {:.1} h", snapshot.total_hours()),
    ];
    let by_task = snapshot.hours_by_task();
    if !by_task.is_empty() {
        lines.push("\n### Top tasks by time".to_string());
        for (task_id, hours) in by_task.iter().take(LISTED_TIME_TASKS) {
            let title = snapshot.find_task_title(task_id).unwrap_or("Task not found");
            lines.push(format!("- [{}] {}: **{:.1} h**", task_id, title, hours));
        }
    }
    Some(lines.join("\n"))
}

fn render_git(activities: &[GitActivity]) -> Option<String> {
    if activities.is_empty() {
        return None;
    }
    let mut lines = vec![format!("## Projects (local development): {}", activities.len())];
    for activity in activities {
        lines.push(format!("\n### {}", activity.project_name));
        lines.push(format!(
            "**Commits:** {} | **Files:** {} | **+{}/-{}**",
            activity.commits.len(),
            activity.files_changed,
            activity.insertions,
            activity.deletions
        ));
        lines.push("\n**What was done:**".to_string());
        for commit in activity.commits.iter().take(LISTED_COMMITS) {
            lines.push(format!("- {}", truncate_chars(&commit.message, COMMIT_MESSAGE_CHARS)));
        }
        if activity.commits.len() > LISTED_COMMITS {
            lines.push(format!("- ... and {} more commits", activity.commits.len() - LISTED_COMMITS));
        }
    }
    Some(lines.join("\n"))
}
