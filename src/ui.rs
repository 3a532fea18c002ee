use crate::cli::OutputFormat;
use colored::Colorize;
use declarative::{Diff, Report};
use serde_json::{Map, Value};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Reports
// ============================================================================

/// Print the result of a run
pub fn print_report(report: &Report, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", pretty(&report.to_json())),
        OutputFormat::Text => print_report_text(report),
    }
}

fn print_report_text(report: &Report) {
    if report.changed {
        success(&format!("{} {}", report.message, "(changed)".yellow()));
    } else {
        info(&report.message);
    }
    for warning in &report.warnings {
        warn(warning);
    }

    header(report.resource_key);
    match &report.resource {
        Value::Object(map) if map.is_empty() => dim("(empty)"),
        Value::Object(map) => {
            for (key, value) in map {
                kv(key, &scalar(value));
            }
        }
        other => {
            for line in pretty(other).lines() {
                dim(line);
            }
        }
    }

    if let Some(diff) = &report.diff {
        header("diff");
        print_diff(diff);
    }
}

/// Print a failed run
pub fn print_failure(message: &str, context: Map<String, Value>, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", pretty(&failure_json(message, context))),
        OutputFormat::Text => {
            error(message);
            for (key, value) in &context {
                kv(key, &scalar(value));
            }
        }
    }
}

/// `{failed: true, message, ..context}`
pub fn failure_json(message: &str, context: Map<String, Value>) -> Value {
    let mut payload = Map::new();
    payload.insert("failed".into(), Value::Bool(true));
    payload.insert("message".into(), Value::from(message));
    payload.extend(context);
    Value::Object(payload)
}

fn print_diff(diff: &Diff) {
    let lines = diff_lines(diff);
    if lines.is_empty() {
        dim("(no differences)");
        return;
    }
    for line in lines {
        match line.as_bytes().first() {
            Some(b'-') => println!("    {}", line.red()),
            _ => println!("    {}", line.green()),
        }
    }
}

/// Changed lines of the pretty-printed before/after records
pub fn diff_lines(diff: &Diff) -> Vec<String> {
    let before = pretty(&Value::Object(diff.before.clone()));
    let after = pretty(&Value::Object(diff.after.clone()));
    let text_diff = similar::TextDiff::from_lines(&before, &after);

    let mut lines = Vec::new();
    for change in text_diff.iter_all_changes() {
        let sign = match change.tag() {
            similar::ChangeTag::Delete => "-",
            similar::ChangeTag::Insert => "+",
            similar::ChangeTag::Equal => continue,
        };
        lines.push(format!("{sign} {}", change.value().trim_end()));
    }
    lines
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".dimmed().to_string(),
        other => other.to_string(),
    }
}
