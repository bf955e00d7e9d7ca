use core::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(sqlx::Type, Debug, Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Default)]
#[sqlx(type_name = "fir_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    /// Parses the wire form used by query strings and form fields.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "critical" => Some(Priority::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        };
        write!(f, "{}", s)
    }
}

#[derive(sqlx::Type, Debug, Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Default)]
#[sqlx(type_name = "fir_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[default]
    Submitted,
    InProgress,
    Completed,
    Canceled,
}

impl IssueStatus {
    /// Submitted and in-progress issues still need attention.
    pub fn is_open(&self) -> bool {
        matches!(self, IssueStatus::Submitted | IssueStatus::InProgress)
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueStatus::Submitted => "Submitted",
            IssueStatus::InProgress => "In Progress",
            IssueStatus::Completed => "Completed",
            IssueStatus::Canceled => "Canceled",
        };
        write!(f, "{}", s)
    }
}

#[derive(sqlx::Type, Debug, Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Default)]
#[sqlx(type_name = "fir_department", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Department {
    #[default]
    Unassigned,
    Plumbing,
    Electrical,
    Housekeeping,
    Hvac,
    It,
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Department::Unassigned => "Unassigned",
            Department::Plumbing => "Plumbing",
            Department::Electrical => "Electrical",
            Department::Housekeeping => "Housekeeping",
            Department::Hvac => "HVAC",
            Department::It => "IT",
        };
        write!(f, "{}", s)
    }
}

/// A Facility Issue Report as persisted in the `firs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Issue {
    pub id: Uuid,
    pub display_id: String,
    pub room_number: String,
    pub issue_title: String,
    pub description: String,
    pub priority: Priority,
    pub status: IssueStatus,
    pub department: Department,
    pub image_url: Option<String>,
    pub submitted_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Issue {
    /// Case-insensitive substring match over the fields the management table
    /// searches: display id, room number, title, description.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [
            &self.display_id,
            &self.room_number,
            &self.issue_title,
            &self.description,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIssue {
    pub display_id: String,
    pub room_number: String,
    pub issue_title: String,
    pub description: String,
    pub priority: Priority,
    pub status: IssueStatus,
    pub department: Department,
    pub image_url: Option<String>,
    pub submitted_by: String,
}

/// Equality filters understood by the live feed and the list endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct IssueFilter {
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub department: Option<Department>,
}

impl IssueFilter {
    pub fn matches(&self, issue: &Issue) -> bool {
        self.priority.map_or(true, |p| issue.priority == p)
            && self.department.map_or(true, |d| issue.department == d)
    }
}

/// The only fields a triage edit may touch. Everything else on an issue is
/// immutable after submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldChange {
    Priority(Priority),
    Status(IssueStatus),
    Department(Department),
}

impl FieldChange {
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldChange::Priority(_) => "priority",
            FieldChange::Status(_) => "status",
            FieldChange::Department(_) => "department",
        }
    }

    pub fn apply(&self, issue: &mut Issue) {
        match *self {
            FieldChange::Priority(priority) => issue.priority = priority,
            FieldChange::Status(status) => issue.status = status,
            FieldChange::Department(department) => issue.department = department,
        }
    }
}
