//! Reminder, remote task and link types.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// When a reminder is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Due {
    /// All-day reminder.
    Date(NaiveDate),
    /// Reminder with a time of day (local, no offset).
    DateTime(NaiveDateTime),
}

impl Due {
    pub fn is_date_only(&self) -> bool {
        matches!(self, Due::Date(_))
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Due::Date(date) => *date,
            Due::DateTime(datetime) => datetime.date(),
        }
    }

    /// ISO-8601 form: `2024-01-01` or `2024-01-01T09:30:00`.
    pub fn to_iso(&self) -> String {
        match self {
            Due::Date(date) => date.format("%Y-%m-%d").to_string(),
            Due::DateTime(datetime) => datetime.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    /// RFC 3339 timestamp expected by the Tasks API.
    ///
    /// The API only keeps the date portion, so the time is pinned to UTC midnight.
    pub fn to_api_timestamp(&self) -> String {
        format!("{}T00:00:00.000Z", self.date().format("%Y-%m-%d"))
    }
}

/// Where a reminder lives: a document and a zero-based line index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemLocation {
    pub document: String,
    pub line: usize,
}

impl ItemLocation {
    pub fn new(document: impl Into<String>, line: usize) -> Self {
        Self {
            document: document.into(),
            line,
        }
    }
}

impl std::fmt::Display for ItemLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.document, self.line + 1)
    }
}

/// A reminder discovered in a local document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderItem {
    pub title: String,
    pub due: Option<Due>,
    pub completed: bool,
    pub location: ItemLocation,
}

/// Remote task status as reported by the Tasks API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    #[default]
    NeedsAction,
    Completed,
}

/// A task list on the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskList {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// A task as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTask {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub due: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl RemoteTask {
    /// Active tasks are neither completed, deleted nor hidden.
    pub fn is_active(&self) -> bool {
        self.status == TaskStatus::NeedsAction && !self.deleted && !self.hidden
    }
}

/// Body sent when creating or updating a remote task.
///
/// `due` is always serialized: updates are PATCHes, and an omitted field
/// would leave a stale date on the remote task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPayload {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub due: Option<String>,
    pub status: TaskStatus,
}

impl TaskPayload {
    pub fn from_item(item: &ReminderItem) -> Self {
        Self {
            title: item.title.trim().to_string(),
            notes: Some(format!("Synced from {}", item.location.document)),
            due: item.due.as_ref().map(Due::to_api_timestamp),
            status: if item.completed {
                TaskStatus::Completed
            } else {
                TaskStatus::NeedsAction
            },
        }
    }
}

/// Link between a local reminder and its remote task, stored in the reminder's line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMetadata {
    pub id: String,
    pub checksum: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(completed: bool, due: Option<Due>) -> ReminderItem {
        ReminderItem {
            title: "  Buy milk ".to_string(),
            due,
            completed,
            location: ItemLocation::new("inbox.md", 2),
        }
    }

    #[test]
    fn test_due_iso_formats() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(Due::Date(date).to_iso(), "2024-01-01");

        let datetime = date.and_hms_opt(9, 30, 0).unwrap();
        assert_eq!(Due::DateTime(datetime).to_iso(), "2024-01-01T09:30:00");
        assert!(!Due::DateTime(datetime).is_date_only());
    }

    #[test]
    fn test_api_timestamp_drops_time() {
        let datetime = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(18, 45, 0)
            .unwrap();
        assert_eq!(
            Due::DateTime(datetime).to_api_timestamp(),
            "2024-03-05T00:00:00.000Z"
        );
    }

    #[test]
    fn test_payload_from_item() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let payload = TaskPayload::from_item(&item(true, Some(Due::Date(date))));
        assert_eq!(payload.title, "Buy milk");
        assert_eq!(payload.status, TaskStatus::Completed);
        assert_eq!(payload.due.as_deref(), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(payload.notes.as_deref(), Some("Synced from inbox.md"));
    }

    #[test]
    fn test_payload_serializes_api_field_names() {
        let payload = TaskPayload::from_item(&item(false, None));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["status"], "needsAction");
        // A missing date is sent as null so a PATCH clears it
        assert_eq!(json.get("due"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_remote_task_defaults_and_activity() {
        let task: RemoteTask = serde_json::from_str(r#"{"id":"T1"}"#).unwrap();
        assert_eq!(task.status, TaskStatus::NeedsAction);
        assert!(task.is_active());

        let task: RemoteTask =
            serde_json::from_str(r#"{"id":"T2","status":"completed","hidden":true}"#).unwrap();
        assert!(!task.is_active());
    }

    #[test]
    fn test_location_display_is_one_based() {
        assert_eq!(ItemLocation::new("a.md", 0).to_string(), "a.md:1");
    }
}
