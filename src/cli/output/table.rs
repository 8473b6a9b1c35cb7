//! Table output formatting for CLI commands
//!
//! Tables for plans, execution results and gate issues using comfy-table.
//! Colors are dropped when `NO_COLOR` is set or the terminal is dumb, and
//! status cells fall back to a text icon.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::collections::HashMap;
use std::env;

use crate::domain::models::{
    CheckerReport, ExecutionResult, Plan, Severity, TaskId, TaskOrigin, TaskStatus,
    ValidationIssue,
};

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
    max_width: Option<usize>,
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TableFormatter {
    /// Formatter that colours output when the terminal supports it.
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub fn with_config(use_colors: bool, max_width: Option<usize>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Plan tasks with their execution wave.
    pub fn format_plan(&self, plan: &Plan, waves: &[Vec<TaskId>]) -> String {
        let wave_of: HashMap<TaskId, usize> = waves
            .iter()
            .enumerate()
            .flat_map(|(depth, wave)| wave.iter().map(move |id| (*id, depth)))
            .collect();

        let mut table = self.create_base_table();
        table.set_header(header(&["ID", "Wave", "Role", "Depends On", "Description", "Status"]));

        let mut tasks: Vec<_> = plan.tasks.iter().collect();
        tasks.sort_by_key(|t| (wave_of.get(&t.id).copied().unwrap_or(usize::MAX), t.id));

        for task in tasks {
            let deps = if task.dependencies.is_empty() {
                "-".to_string()
            } else {
                task.dependencies
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let wave = wave_of
                .get(&task.id)
                .map_or_else(|| "-".to_string(), ToString::to_string);
            let mut description = truncate_text(&task.description, 50);
            if let TaskOrigin::Repair { repairs, .. } = &task.origin {
                description = format!("[repairs {repairs}] {description}");
            }

            table.add_row(vec![
                Cell::new(task.id),
                Cell::new(wave),
                Cell::new(task.agent_role),
                Cell::new(deps),
                Cell::new(description),
                self.status_cell(task.status),
            ]);
        }

        table.to_string()
    }

    /// Final execution results.
    pub fn format_results(&self, results: &[ExecutionResult]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Task", "Outcome", "Attempts", "Duration", "Repaired By", "Detail"]));

        for result in results {
            let outcome = if result.success {
                TaskStatus::Succeeded
            } else if result.was_blocked() {
                TaskStatus::Blocked
            } else {
                TaskStatus::Failed
            };
            let detail = match (&result.error, result.success) {
                (Some(err), false) => err.clone(),
                _ => result.output.clone(),
            };
            let repaired_by = result
                .repaired_by
                .map_or_else(|| "-".to_string(), |id| id.to_string());

            table.add_row(vec![
                Cell::new(result.task_id),
                self.status_cell(outcome),
                Cell::new(result.attempts),
                Cell::new(format!("{}ms", result.duration_ms)),
                Cell::new(repaired_by),
                Cell::new(truncate_text(&detail.replace('\n', " "), 60)),
            ]);
        }

        table.to_string()
    }

    /// Gate issues, most severe first.
    pub fn format_issues(&self, issues: &[ValidationIssue]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Severity", "Checker", "Message", "Evidence"]));

        let mut sorted: Vec<_> = issues.iter().collect();
        sorted.sort_by(|a, b| b.severity.cmp(&a.severity));

        for issue in sorted {
            let severity_cell = if self.use_colors {
                Cell::new(issue.severity).fg(severity_color(issue.severity))
            } else {
                Cell::new(format!("{} {}", severity_icon(issue.severity), issue.severity))
            };
            table.add_row(vec![
                severity_cell,
                Cell::new(&issue.checker_name),
                Cell::new(truncate_text(&issue.message, 70)),
                Cell::new(issue.evidence_ref.as_deref().unwrap_or("-")),
            ]);
        }

        table.to_string()
    }

    /// Per-checker score contributions.
    pub fn format_checker_reports(&self, reports: &[CheckerReport]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Checker", "Delta", "Issues", "Time"]));

        for report in reports {
            let mut name = Cell::new(&report.checker_name);
            if report.isolated && self.use_colors {
                name = name.fg(Color::Magenta);
            }
            let delta = Cell::new(report.score_delta);
            let delta = if self.use_colors && report.score_delta < 0 {
                delta.fg(Color::Red)
            } else {
                delta
            };
            table.add_row(vec![
                name,
                delta,
                Cell::new(report.issue_count),
                Cell::new(format!("{}ms", report.duration_ms)),
            ]);
        }

        table.to_string()
    }

    fn status_cell(&self, status: TaskStatus) -> Cell {
        if self.use_colors {
            Cell::new(status).fg(status_color(status))
        } else {
            Cell::new(format!("{} {}", status_icon(status), status))
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width.and_then(|w| u16::try_from(w).ok()) {
            table.set_width(width);
        }

        table
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

const fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Pending => Color::Grey,
        TaskStatus::Ready => Color::Cyan,
        TaskStatus::Running => Color::Yellow,
        TaskStatus::Succeeded => Color::Green,
        TaskStatus::Failed => Color::Red,
        TaskStatus::Blocked => Color::DarkYellow,
    }
}

const fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "○",
        TaskStatus::Ready => "◎",
        TaskStatus::Running => "⟳",
        TaskStatus::Succeeded => "✓",
        TaskStatus::Failed => "✗",
        TaskStatus::Blocked => "⊘",
    }
}

const fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Grey,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

const fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "ℹ",
        Severity::Warning => "⚠",
        Severity::Error => "✗",
    }
}

/// Check if terminal supports colors
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

/// Truncate on a char boundary, appending "..." when shortened.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AgentRole, Task};

    fn plain() -> TableFormatter {
        TableFormatter::with_config(false, None)
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("this is a long sentence", 10), "this is...");
        assert_eq!(truncate_text("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_plan_table_lists_waves_and_dependencies() {
        let plan = Plan::new("Ship").with_tasks([
            Task::new(1, AgentRole::Architect, "Design"),
            Task::new(2, AgentRole::Coder, "Build").with_dependencies([1]),
        ]);
        let output = plain().format_plan(&plan, &[vec![TaskId(1)], vec![TaskId(2)]]);

        assert!(output.contains("Design"));
        assert!(output.contains("#1"));
        assert!(output.contains("○ pending"));
    }

    #[test]
    fn test_results_table_marks_blocked() {
        let results = vec![
            ExecutionResult::failed(TaskId(1), "boom", vec![], 2),
            ExecutionResult::blocked(TaskId(2), TaskId(1)),
        ];
        let output = plain().format_results(&results);
        assert!(output.contains("✗ failed"));
        assert!(output.contains("⊘ blocked"));
    }

    #[test]
    fn test_issues_sorted_by_severity() {
        let issues = vec![
            ValidationIssue::new("grounding", Severity::Warning, "weak support"),
            ValidationIssue::new("fabrication", Severity::Error, "invented name"),
        ];
        let output = plain().format_issues(&issues);
        let error_at = output.find("invented name").unwrap();
        let warning_at = output.find("weak support").unwrap();
        assert!(error_at < warning_at);
    }

    #[test]
    fn test_no_color_env_disables_colors() {
        temp_env::with_var("NO_COLOR", Some("1"), || {
            assert!(!supports_color());
        });
    }
}
