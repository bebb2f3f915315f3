//! Markdown checklist line format.
//!
//! A reminder is a task list item with an optional `due:` token:
//!
//! ```text
//! - [ ] Buy milk due:2024-01-01
//! * [x] Call dentist due:2024-01-02T09:30
//! ```
//!
//! Link metadata, when present, trails the line and is ignored here.

use chrono::{NaiveDate, NaiveDateTime};

use crate::metadata;
use crate::model::Due;

const DUE_PREFIX: &str = "due:";

/// Syncable fields of one checklist line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistLine {
    pub title: String,
    pub due: Option<Due>,
    pub completed: bool,
}

/// Byte offset of the checkbox marker character (`' '`, `'x'` or `'X'`).
fn checkbox_position(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();
    if !matches!(trimmed.chars().next(), Some('-' | '*' | '+')) {
        return None;
    }
    let rest = &trimmed[1..];
    if rest.starts_with(" [ ]") || rest.starts_with(" [x]") || rest.starts_with(" [X]") {
        let after = &rest[4..];
        if after.is_empty() || after.starts_with(' ') {
            return Some(indent + 3);
        }
    }
    None
}

/// Parses a checklist line; returns `None` for anything that is not a reminder.
pub fn parse_line(line: &str) -> Option<ChecklistLine> {
    let line = metadata::strip(line);
    let marker = checkbox_position(line)?;
    let completed = matches!(line.as_bytes()[marker], b'x' | b'X');
    let body = &line[marker + 2..];

    let mut due = None;
    let mut words = Vec::new();
    for word in body.split_whitespace() {
        match word.strip_prefix(DUE_PREFIX).and_then(parse_due) {
            Some(parsed) if due.is_none() => due = Some(parsed),
            _ => words.push(word),
        }
    }

    let title = words.join(" ");
    if title.is_empty() {
        return None;
    }
    Some(ChecklistLine {
        title,
        due,
        completed,
    })
}

fn parse_due(value: &str) -> Option<Due> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(Due::Date(date));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(Due::DateTime)
}

/// Rewrites the checkbox of `line`; other text (including metadata) is untouched.
pub fn set_completed(line: &str, completed: bool) -> String {
    match checkbox_position(line) {
        Some(marker) => {
            let mark = if completed { "x" } else { " " };
            format!("{}{}{}", &line[..marker], mark, &line[marker + 1..])
        }
        None => line.to_string(),
    }
}
