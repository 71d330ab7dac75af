// src/project/types.rs

use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::role::MemberRole;
use crate::task::Task;
use crate::timezone::Timestamp;
use crate::user::User;

pub const PROJECT_NAME_MIN: usize = 3;
pub const PROJECT_NAME_MAX: usize = 255;

/// A valid wall-clock time of day in Moscow time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(u32, u32)", into = "(u32, u32)")]
pub struct ReminderTime {
    hour: u32,
    minute: u32,
}

impl ReminderTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 {
            return Err(TrackerError::invalid_input(format!(
                "reminder hour must be 0-23, got {hour}"
            )));
        }
        if minute > 59 {
            return Err(TrackerError::invalid_input(format!(
                "reminder minute must be 0-59, got {minute}"
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Exact hour and minute equality in Moscow time
    pub fn matches<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        let local = now.to_moscow();
        local.hour() == self.hour && local.minute() == self.minute
    }
}

impl TryFrom<(u32, u32)> for ReminderTime {
    type Error = TrackerError;

    fn try_from((hour, minute): (u32, u32)) -> Result<Self> {
        Self::new(hour, minute)
    }
}

impl From<ReminderTime> for (u32, u32) {
    fn from(time: ReminderTime) -> Self {
        (time.hour, time.minute)
    }
}

impl std::fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    pub enabled: bool,
    pub time: ReminderTime,
    pub days_before: u32,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            time: ReminderTime { hour: 9, minute: 0 },
            days_before: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    /// Telegram id of the owner
    pub created_by: i64,
    pub reminders: ReminderSettings,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub created_by: i64,
    pub reminders: ReminderSettings,
}

impl NewProject {
    pub fn new(name: impl Into<String>, created_by: i64) -> Self {
        Self {
            name: name.into(),
            description: None,
            created_by,
            reminders: ReminderSettings::default(),
        }
    }
}

/// A user's membership in a project with its resolved role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: i64,
    pub project_id: i64,
    pub user: User,
    pub role: MemberRole,
    pub joined_at: NaiveDateTime,
}

/// A project with its members and tasks loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub project: Project,
    pub members: Vec<ProjectMember>,
    pub tasks: Vec<Task>,
}

pub fn validate_project_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if len < PROJECT_NAME_MIN {
        return Err(TrackerError::invalid_input(format!(
            "project name must be at least {PROJECT_NAME_MIN} characters"
        )));
    }
    if len > PROJECT_NAME_MAX {
        return Err(TrackerError::invalid_input(format!(
            "project name must be at most {PROJECT_NAME_MAX} characters"
        )));
    }
    Ok(())
}
