// src/reminders/buckets.rs
// Schedule matching and per-user task selection

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone};

use crate::project::ReminderSettings;
use crate::task::{AssignedTask, Task};
use crate::user::User;

/// What one user is reminded about in one project
#[derive(Debug, Clone, PartialEq)]
pub struct UserReminders {
    pub user: User,
    /// Deadline before now, earliest first
    pub overdue: Vec<Task>,
    /// Deadline within the threshold, earliest first
    pub upcoming: Vec<Task>,
}

impl UserReminders {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty() && self.upcoming.is_empty()
    }
}

/// True only when reminders are on and `now` falls in the configured minute
pub fn is_due<Tz: TimeZone>(settings: &ReminderSettings, now: &DateTime<Tz>) -> bool {
    settings.enabled && settings.time.matches(now)
}

/// Split tasks into overdue and upcoming buckets per assignee.
///
/// Terminal and undated tasks are skipped, as are users left with nothing.
/// Output is ordered by Telegram id.
pub fn collect_reminders(
    tasks: &[AssignedTask],
    now: NaiveDateTime,
    days_before: u32,
) -> Vec<UserReminders> {
    let horizon = now + Duration::days(i64::from(days_before));
    let mut by_user: BTreeMap<i64, UserReminders> = BTreeMap::new();

    for assigned in tasks {
        let task = &assigned.task;
        if task.status.is_terminal() {
            continue;
        }
        let Some(deadline) = task.deadline else {
            continue;
        };

        let overdue = deadline < now;
        if !overdue && deadline > horizon {
            continue;
        }

        for user in &assigned.assignees {
            let entry = by_user
                .entry(user.telegram_id)
                .or_insert_with(|| UserReminders {
                    user: user.clone(),
                    overdue: Vec::new(),
                    upcoming: Vec::new(),
                });
            if overdue {
                entry.overdue.push(task.clone());
            } else {
                entry.upcoming.push(task.clone());
            }
        }
    }

    by_user
        .into_values()
        .map(|mut reminders| {
            reminders.overdue.sort_by_key(|t| t.deadline);
            reminders.upcoming.sort_by_key(|t| t.deadline);
            reminders
        })
        .filter(|reminders| !reminders.is_empty())
        .collect()
}
