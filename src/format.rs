//! Output formatting for query results, in markdown and JSON.

use crate::query::TaskGroup;
use crate::registry::StatusRegistry;
use crate::types::TaskRecord;
use anyhow::Result;
use serde_json::{Value, json};

/// Output format for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// Format a task as a single markdown list item.
pub fn format_task_short(task: &TaskRecord, statuses: &dyn StatusRegistry) -> String {
    let check = if statuses.is_completed_status(&task.status) {
        "x"
    } else {
        " "
    };

    let mut details = Vec::new();
    if !task.status.is_empty() {
        details.push(task.status.clone());
    }
    if !task.priority.is_empty() {
        details.push(format!("priority {}", task.priority));
    }
    if let Some(ref due) = task.due {
        details.push(format!("due {}", due));
    }
    if let Some(ref scheduled) = task.scheduled {
        details.push(format!("scheduled {}", scheduled));
    }
    if task.is_recurring() {
        details.push("recurring".to_string());
    }

    let tags = if task.tags.is_empty() {
        String::new()
    } else {
        format!(
            " {}",
            task.tags
                .iter()
                .map(|t| format!("#{}", t))
                .collect::<Vec<_>>()
                .join(" ")
        )
    };

    format!(
        "- [{}] {} `{}` ({}){}\n",
        check,
        task.title,
        task.path,
        details.join(", "),
        tags,
    )
}

/// Format grouped results as markdown, one section per bucket.
pub fn format_groups_markdown(groups: &[TaskGroup], statuses: &dyn StatusRegistry) -> String {
    let total: usize = groups.iter().map(|g| g.tasks.len()).sum();
    let mut md = String::new();

    md.push_str(&format!("# Tasks ({})\n\n", total));
    for group in groups {
        md.push_str(&format!("## {} ({})\n\n", group.name, group.tasks.len()));
        for task in &group.tasks {
            md.push_str(&format_task_short(task, statuses));
        }
        md.push('\n');
    }

    md
}

/// Format a flat list (agenda) as markdown.
pub fn format_tasks_markdown(
    heading: &str,
    tasks: &[TaskRecord],
    statuses: &dyn StatusRegistry,
) -> String {
    let mut md = String::new();
    md.push_str(&format!("# {} ({})\n\n", heading, tasks.len()));
    for task in tasks {
        md.push_str(&format_task_short(task, statuses));
    }
    md
}

pub fn groups_to_json(groups: &[TaskGroup]) -> Value {
    json!({
        "groups": groups
            .iter()
            .map(|g| json!({ "name": g.name, "count": g.tasks.len(), "tasks": g.tasks }))
            .collect::<Vec<_>>(),
    })
}

/// Render grouped results in the requested format.
pub fn render_groups(
    groups: &[TaskGroup],
    statuses: &dyn StatusRegistry,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&groups_to_json(groups))?),
        OutputFormat::Markdown => Ok(format_groups_markdown(groups, statuses)),
    }
}

/// Render a flat task list in the requested format.
pub fn render_tasks(
    heading: &str,
    tasks: &[TaskRecord],
    statuses: &dyn StatusRegistry,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(
            &json!({ "title": heading, "count": tasks.len(), "tasks": tasks }),
        )?),
        OutputFormat::Markdown => Ok(format_tasks_markdown(heading, tasks, statuses)),
    }
}

/// Render distinct values, one per line in markdown.
pub fn render_values(property: &str, values: &[String], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(
            &json!({ "property": property, "values": values }),
        )?),
        OutputFormat::Markdown => {
            let mut md = format!("# {} ({})\n\n", property, values.len());
            for value in values {
                md.push_str(&format!("- {}\n", value));
            }
            Ok(md)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::registry::ConfiguredStatuses;

    fn statuses() -> ConfiguredStatuses {
        ConfiguredStatuses::from_config(&Config::default())
    }

    fn sample() -> TaskRecord {
        let mut task = TaskRecord::new("work/report.md", "Write report");
        task.status = "open".to_string();
        task.priority = "high".to_string();
        task.due = Some("2025-03-10".to_string());
        task.tags = vec!["work".to_string()];
        task
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("md"), Some(OutputFormat::Markdown));
        assert_eq!(OutputFormat::parse("xml"), None);
    }

    #[test]
    fn test_task_line() {
        let line = format_task_short(&sample(), &statuses());
        assert_eq!(
            line,
            "- [ ] Write report `work/report.md` (open, priority high, due 2025-03-10) #work\n"
        );
    }

    #[test]
    fn test_checkbox_follows_completed_status() {
        let mut task = sample();
        task.status = "done".to_string();
        task.completed_date = None;
        let line = format_task_short(&task, &statuses());
        assert!(line.starts_with("- [x] Write report"));

        task.status = "in-progress".to_string();
        task.completed_date = Some("2025-03-09".to_string());
        let line = format_task_short(&task, &statuses());
        assert!(line.starts_with("- [ ] Write report"));
    }

    #[test]
    fn test_groups_markdown_and_json() {
        let groups = vec![TaskGroup {
            name: "Today".to_string(),
            tasks: vec![sample()],
        }];
        let md = format_groups_markdown(&groups, &statuses());
        assert!(md.starts_with("# Tasks (1)\n\n## Today (1)\n\n- [ ] Write report"));

        let value = groups_to_json(&groups);
        assert_eq!(value["groups"][0]["name"], "Today");
        assert_eq!(value["groups"][0]["count"], 1);
        assert_eq!(value["groups"][0]["tasks"][0]["path"], "work/report.md");
    }

    #[test]
    fn test_render_values() {
        let values = vec!["home".to_string(), "work".to_string()];
        let md = render_values("tags", &values, OutputFormat::Markdown).unwrap();
        assert_eq!(md, "# tags (2)\n\n- home\n- work\n");
        let json = render_values("tags", &values, OutputFormat::Json).unwrap();
        assert!(json.contains("\"property\": \"tags\""));
    }
}
