// UI layer: terminal output helpers shared by every command.
// Status lines and spinners go to stdout/stderr with light colouring,
// tables are rendered with comfy-table, prompts use dialoguer.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;
use dialoguer::{Confirm, Password};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

pub const DEFAULT_TRUNCATE: usize = 50;

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Pretty-print a value as JSON.
pub fn json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run `f` behind a spinner on stderr. The spinner is cleared before
/// returning so output that follows starts on a clean line.
pub fn with_spinner<T>(message: &str, f: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    let out = f();
    spinner.finish_and_clear();
    out
}

/// Ask for confirmation unless `assume_yes` is set.
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

/// Hidden input, used for tokens.
pub fn secret(prompt: &str) -> Result<String> {
    Ok(Password::new().with_prompt(prompt).interact()?)
}

pub fn table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    for row in rows {
        table.add_row(row);
    }
    table
}

/// Shorten to at most `length` characters, ending in `...` when cut.
/// Absent or empty input renders as `-`.
pub fn truncate(text: Option<&str>, length: usize) -> String {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return "-".to_string();
    };
    if text.chars().count() <= length {
        return text.to_string();
    }
    let kept: String = text.chars().take(length.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// RFC 3339 timestamp in local time. Unparsable input is shown as given.
pub fn format_date(text: Option<&str>) -> String {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return "-".to_string();
    };
    match DateTime::parse_from_rfc3339(text) {
        Ok(date) => date.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => text.to_string(),
    }
}

/// Scalar JSON rendered for a table cell; `-` for null, missing or empty.
pub fn cell(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => "-".to_string(),
    }
}

/// String field at `path` inside nested objects.
pub fn text_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .and_then(Value::as_str)
}

/// Items of a list response; anything that is not an array is empty.
pub fn items(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or_default()
}
