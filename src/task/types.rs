// src/task/types.rs
// Task types and status handling

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::project::Project;
use crate::user::User;

pub const TASK_TITLE_MIN: usize = 3;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Delayed,
    NotCompleted,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        Self::Pending,
        Self::InProgress,
        Self::Completed,
        Self::Delayed,
        Self::NotCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Delayed => "delayed",
            Self::NotCompleted => "not_completed",
        }
    }

    /// Finished one way or the other; never reminded
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::NotCompleted)
    }

    /// Counted by the due-soon and overdue listings
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    /// SQL list literal such as `('pending', 'in_progress')` of the statuses matching `pred`
    pub(crate) fn sql_list(pred: impl Fn(&TaskStatus) -> bool) -> String {
        let quoted: Vec<String> = Self::ALL
            .iter()
            .filter(|s| pred(*s))
            .map(|s| format!("'{}'", s.as_str()))
            .collect();
        format!("({})", quoted.join(", "))
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| TrackerError::UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Stored UTC
    pub deadline: Option<NaiveDateTime>,
    pub status: TaskStatus,
    pub created_by: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub project_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<NaiveDateTime>,
    pub created_by: i64,
    /// Telegram ids; duplicates are ignored
    pub assignees: Vec<i64>,
}

impl NewTask {
    pub fn new(project_id: i64, title: impl Into<String>, created_by: i64) -> Self {
        Self {
            project_id,
            title: title.into(),
            description: None,
            deadline: None,
            created_by,
            assignees: Vec::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: NaiveDateTime) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_assignees(mut self, assignees: impl IntoIterator<Item = i64>) -> Self {
        self.assignees.extend(assignees);
        self
    }
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<NaiveDateTime>,
}

/// A task with the users assigned to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedTask {
    pub task: Task,
    pub assignees: Vec<User>,
}

/// A task with its project and assignees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetails {
    pub task: Task,
    pub project: Project,
    pub assignees: Vec<User>,
}

pub fn validate_task_title(title: &str) -> Result<()> {
    if title.chars().count() < TASK_TITLE_MIN {
        return Err(TrackerError::invalid_input(format!(
            "task title must be at least {TASK_TITLE_MIN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        let err = "done".parse::<TaskStatus>().unwrap_err();
        assert!(matches!(err, TrackerError::UnknownStatus(s) if s == "done"));
    }

    #[test]
    fn test_status_classes() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::NotCompleted.is_terminal());
        assert!(!TaskStatus::Delayed.is_terminal());
        assert!(!TaskStatus::Delayed.is_open());
        assert!(TaskStatus::InProgress.is_open());
    }

    #[test]
    fn test_sql_lists() {
        assert_eq!(TaskStatus::sql_list(TaskStatus::is_open), "('pending', 'in_progress')");
        assert_eq!(
            TaskStatus::sql_list(TaskStatus::is_terminal),
            "('completed', 'not_completed')"
        );
    }

    #[test]
    fn test_title_validation() {
        assert!(validate_task_title("ab").is_err());
        assert!(validate_task_title("Fix").is_ok());
    }
}
