//! Report rendering
//!
//! Human-readable tables (colored when the terminal allows it), JSON and YAML.

use crate::ui;
use anyhow::{Context, Result};
use colored::Colorize;
use crossdiff::differ::display_value;
use crossdiff::{ChangeType, ComparisonReport, ResourceChange, Severity};
use serde_json::Value;
use std::fmt::Write as _;

const RULE: &str = "─────────────────────────────────────────────────────";
const MAX_INLINE: usize = 60;

/// How much of a report to show.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub min_severity: Severity,
    pub details: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            min_severity: Severity::Info,
            details: false,
        }
    }
}

/// Render the full report as pretty-printed JSON
pub fn render_json(report: &ComparisonReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

/// Render the full report as YAML, with the same fields as the JSON form
pub fn render_yaml(report: &ComparisonReport) -> Result<String> {
    serde_yaml::to_string(report).context("Failed to serialize report as YAML")
}

/// Render the report as a grouped table.
pub fn render_table(report: &ComparisonReport, options: &RenderOptions) -> String {
    let mut out = String::new();
    // fmt::Write for String never fails
    let _ = write_table(&mut out, report, options);
    out
}

fn write_table(
    out: &mut String,
    report: &ComparisonReport,
    options: &RenderOptions,
) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(
        out,
        "┌─ {} ──────────────────────────────────┐",
        "Account Comparison".bold()
    )?;
    writeln!(
        out,
        "│ {} {} ({})",
        "Account 1:".dimmed(),
        report.account1_id,
        report.region1
    )?;
    writeln!(
        out,
        "│ {} {} ({})",
        "Account 2:".dimmed(),
        report.account2_id,
        report.region2
    )?;
    writeln!(
        out,
        "│ {}  {}",
        "Services:".dimmed(),
        report.services_compared.join(", ")
    )?;
    writeln!(out, "│")?;

    let mut shown = 0;
    for result in &report.results {
        let mut service_header = false;

        for (resource_type, comparison) in &result.resource_comparisons {
            let changes: Vec<&ResourceChange> = comparison
                .all_changes()
                .filter(|c| c.severity >= options.min_severity)
                .collect();
            if changes.is_empty() {
                continue;
            }

            if !service_header {
                writeln!(out, "│ {}", result.service_name.bold())?;
                service_header = true;
            }
            writeln!(
                out,
                "│   {} {}",
                resource_type.cyan(),
                format!(
                    "({} vs {}, {} unchanged)",
                    comparison.account1_count,
                    comparison.account2_count,
                    comparison.unchanged_count
                )
                .dimmed()
            )?;

            for change in changes {
                write_change(out, change, options.details)?;
                shown += 1;
            }
        }

        for error in &result.errors {
            if !service_header {
                writeln!(out, "│ {}", result.service_name.bold())?;
                service_header = true;
            }
            writeln!(out, "│   {} {}", "!".yellow(), error)?;
        }

        if service_header {
            writeln!(out, "│")?;
        }
    }

    if shown == 0 {
        if report.summary.total_changes == 0 {
            writeln!(out, "│ {} No differences found", "✓".green())?;
        } else {
            writeln!(
                out,
                "│ {} No differences at or above {}",
                "✓".green(),
                options.min_severity
            )?;
        }
        writeln!(out, "│")?;
    }

    write_summary(out, report)?;
    writeln!(out, "└{RULE}┘")?;
    Ok(())
}

fn write_change(out: &mut String, change: &ResourceChange, details: bool) -> std::fmt::Result {
    let symbol = match change.change_type {
        ChangeType::Added => "+".green(),
        ChangeType::Removed => "-".red(),
        ChangeType::Modified => "~".yellow(),
    };

    let target = match &change.field_path {
        Some(path) => format!("{}  {}", change.resource_id, path.bold()),
        None => change.resource_id.clone(),
    };

    writeln!(
        out,
        "│     {} {:<8} {}  {}",
        symbol,
        ui::severity_label(change.severity),
        target,
        ui::truncate(&change.description, 100).dimmed()
    )?;

    if details && change.change_type == ChangeType::Modified {
        for line in value_diff(change.old_value.as_ref(), change.new_value.as_ref()) {
            writeln!(out, "│         {line}")?;
        }
    }
    Ok(())
}

fn write_summary(out: &mut String, report: &ComparisonReport) -> std::fmt::Result {
    let summary = &report.summary;

    writeln!(out, "├{RULE}┤")?;
    writeln!(
        out,
        "│ Summary: {} changes across {}/{} services ({:.2}s)",
        summary.total_changes.to_string().bold(),
        summary.total_services_with_changes,
        summary.total_services_compared,
        summary.execution_time_seconds
    )?;
    writeln!(
        out,
        "│ Resources: {} in account 1, {} in account 2",
        summary.total_resources_account1, summary.total_resources_account2
    )?;

    let tiers: Vec<String> = Severity::DESCENDING
        .into_iter()
        .map(|s| format!("{} {}", ui::severity_label(s), summary.count(s)))
        .collect();
    writeln!(out, "│ {}", tiers.join("  "))?;

    if !report.errors.is_empty() {
        writeln!(out, "│")?;
        writeln!(out, "│ {}", "Errors".red().bold())?;
        for error in &report.errors {
            writeln!(
                out,
                "│   {} {} ({}): {}",
                "✗".red(),
                error.service_name,
                error.error_type,
                error.error_message
            )?;
        }
    }
    Ok(())
}

/// Old and new values as display lines.
///
/// Short scalars render inline; structured or multi-line values render as a
/// line diff of their pretty-printed form.
fn value_diff(old: Option<&Value>, new: Option<&Value>) -> Vec<String> {
    let old_text = old.map(pretty).unwrap_or_default();
    let new_text = new.map(pretty).unwrap_or_default();

    let inline = !old_text.contains('\n')
        && !new_text.contains('\n')
        && old_text.len() + new_text.len() <= MAX_INLINE;
    if inline {
        return vec![format!(
            "{} {} {}",
            old_text.red(),
            "→".dimmed(),
            new_text.green()
        )];
    }

    let old_text = with_trailing_newline(old_text);
    let new_text = with_trailing_newline(new_text);
    let diff = similar::TextDiff::from_lines(&old_text, &new_text);

    diff.iter_all_changes()
        .filter_map(|change| {
            let line = change.value().trim_end_matches('\n');
            match change.tag() {
                similar::ChangeTag::Delete => Some(format!("- {line}").red().to_string()),
                similar::ChangeTag::Insert => Some(format!("+ {line}").green().to_string()),
                similar::ChangeTag::Equal => None,
            }
        })
        .collect()
}

fn pretty(value: &Value) -> String {
    match value {
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => display_value(other),
    }
}

fn with_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossdiff::{
        ReportSummary, ResourceTypeComparison, ServiceComparisonResult, ServiceError,
    };
    use serde_json::json;

    fn change(
        change_type: ChangeType,
        id: &str,
        path: Option<&str>,
        old: Option<Value>,
        new: Option<Value>,
        severity: Severity,
    ) -> ResourceChange {
        ResourceChange {
            change_type,
            resource_id: id.to_string(),
            resource_type: "queues".to_string(),
            field_path: path.map(str::to_string),
            old_value: old,
            new_value: new,
            severity,
            description: "changed".to_string(),
        }
    }

    fn report() -> ComparisonReport {
        let mut queues = ResourceTypeComparison::new("queues");
        queues.account1_count = 2;
        queues.account2_count = 2;
        queues.unchanged_count = 1;
        queues.added.push(change(
            ChangeType::Added,
            "new-queue",
            None,
            None,
            Some(json!({"queue_name": "new-queue"})),
            Severity::High,
        ));
        queues.modified.push(change(
            ChangeType::Modified,
            "orders",
            Some("visibility_timeout"),
            Some(json!(30)),
            Some(json!(60)),
            Severity::Medium,
        ));
        queues.modified.push(change(
            ChangeType::Modified,
            "orders",
            Some("tags.Team"),
            Some(json!("a")),
            Some(json!("b")),
            Severity::Info,
        ));

        let mut sqs = ServiceComparisonResult::new("sqs");
        sqs.resource_comparisons.insert("queues".to_string(), queues);

        let errors = vec![ServiceError::from_error(
            "s3",
            &crossdiff::Error::Fetch {
                service: "s3".to_string(),
                reason: "boom".to_string(),
            },
        )];
        let results = vec![sqs];
        let summary = ReportSummary::from_results(&results, &errors, 0.5);

        ComparisonReport {
            account1_id: "111111111111".to_string(),
            account2_id: "222222222222".to_string(),
            region: "us-east-1".to_string(),
            region1: "us-east-1".to_string(),
            region2: "us-east-1".to_string(),
            services_compared: vec!["s3".to_string(), "sqs".to_string()],
            timestamp: chrono::Utc::now(),
            results,
            summary,
            errors,
        }
    }

    #[test]
    fn test_render_table() {
        colored::control::set_override(false);
        let out = render_table(&report(), &RenderOptions::default());

        assert!(out.contains("Account Comparison"));
        assert!(out.contains("111111111111 (us-east-1)"));
        assert!(out.contains("queues (2 vs 2, 1 unchanged)"));
        assert!(out.contains("+ HIGH"));
        assert!(out.contains("orders  visibility_timeout"));
        assert!(out.contains("orders  tags.Team"));
        assert!(out.contains("Summary: 3 changes"));
        assert!(out.contains("CRITICAL 0"));
        assert!(out.contains("s3 (FetchError): failed to fetch s3: boom"));
    }

    #[test]
    fn test_render_table_min_severity() {
        colored::control::set_override(false);
        let options = RenderOptions {
            min_severity: Severity::Medium,
            details: false,
        };
        let out = render_table(&report(), &options);
        assert!(out.contains("visibility_timeout"));
        assert!(!out.contains("tags.Team"));
        // summary still counts everything
        assert!(out.contains("INFO 1"));

        let options = RenderOptions {
            min_severity: Severity::Critical,
            details: false,
        };
        let out = render_table(&report(), &options);
        assert!(out.contains("No differences at or above critical"));
    }

    #[test]
    fn test_render_table_details() {
        colored::control::set_override(false);
        let options = RenderOptions {
            min_severity: Severity::Info,
            details: true,
        };
        let out = render_table(&report(), &options);
        assert!(out.contains("30 → 60"));
    }

    #[test]
    fn test_value_diff_structured() {
        colored::control::set_override(false);
        let old = json!({"a": 1, "b": [1, 2]});
        let new = json!({"a": 2, "b": [1, 2]});
        let lines = value_diff(Some(&old), Some(&new));
        assert_eq!(lines, vec!["-   \"a\": 1,", "+   \"a\": 2,"]);
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&report()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["account1_id"], "111111111111");
        assert_eq!(value["summary"]["total_changes"], 3);
        assert_eq!(value["errors"][0]["error_type"], "FetchError");
    }

    #[test]
    fn test_render_yaml() {
        let yaml = render_yaml(&report()).unwrap();
        assert!(yaml.contains("resource_comparisons:"));

        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(value["account1_id"].as_str(), Some("111111111111"));
        assert_eq!(value["summary"]["total_changes"].as_u64(), Some(3));
        assert_eq!(value["errors"][0]["error_type"].as_str(), Some("FetchError"));
        assert_eq!(
            value["results"][0]["resource_comparisons"]["queues"]["modified"][0]["field_path"]
                .as_str(),
            Some("visibility_timeout")
        );
    }
}
