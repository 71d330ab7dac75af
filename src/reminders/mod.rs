// src/reminders/mod.rs

//! Deadline reminders.
//!
//! Once a minute every active project is checked against its configured
//! reminder time. A matching project gets one message per assignee listing
//! their overdue and upcoming tasks. Failures stay local: a user who cannot
//! be reached does not stop the others, and a project that fails does not
//! stop the tick.

pub mod buckets;
pub mod message;
pub mod scheduler;

pub use buckets::{UserReminders, collect_reminders, is_due};
pub use message::{Urgency, compose_reminder};
pub use scheduler::ReminderScheduler;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::db::Database;
use crate::error::Result;
use crate::notify::Notifier;
use crate::timezone::now_local;

/// Counters for one pass over the active projects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub projects_checked: usize,
    pub projects_matched: usize,
    pub projects_failed: usize,
    pub messages_sent: usize,
}

pub struct ReminderEngine {
    db: Database,
    notifier: Arc<dyn Notifier>,
}

impl ReminderEngine {
    pub fn new(db: Database, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    pub async fn tick(&self) -> Result<TickReport> {
        self.tick_at(now_local()).await
    }

    /// Remind every active project whose schedule matches `now` to the minute
    pub async fn tick_at(&self, now: DateTime<FixedOffset>) -> Result<TickReport> {
        let projects = {
            let mut uow = self.db.begin().await?;
            uow.projects().list_active().await?
        };

        let mut report = TickReport {
            projects_checked: projects.len(),
            ..TickReport::default()
        };

        for project in projects.iter().filter(|p| is_due(&p.reminders, &now)) {
            report.projects_matched += 1;
            match self.send_project_reminders(project.id, now).await {
                Ok(sent) => report.messages_sent += sent,
                Err(e) => {
                    report.projects_failed += 1;
                    error!(project_id = project.id, error = %e, "reminder run failed");
                }
            }
        }

        if report.projects_matched > 0 {
            info!(
                checked = report.projects_checked,
                matched = report.projects_matched,
                failed = report.projects_failed,
                sent = report.messages_sent,
                "reminder tick complete"
            );
        }
        Ok(report)
    }

    /// Send this project's reminders now regardless of its configured time.
    ///
    /// Deactivated projects and projects with reminders switched off get
    /// nothing. Returns how many messages were delivered.
    pub async fn send_project_reminders(&self, project_id: i64, now: DateTime<FixedOffset>) -> Result<usize> {
        let (project, tasks) = {
            let mut uow = self.db.begin().await?;
            let Some(project) = uow.projects().get(project_id).await? else {
                warn!(project_id, "project not found for reminders");
                return Ok(0);
            };
            if !project.is_active || !project.reminders.enabled {
                info!(
                    project_id,
                    active = project.is_active,
                    enabled = project.reminders.enabled,
                    "reminders not sent for inactive project"
                );
                return Ok(0);
            }
            let tasks = uow.tasks().list_reminder_candidates(project_id).await?;
            (project, tasks)
        };

        let now = now.naive_utc();
        let recipients = collect_reminders(&tasks, now, project.reminders.days_before);
        debug!(project_id, recipients = recipients.len(), "composing reminders");

        let mut sent = 0;
        for reminders in &recipients {
            let text = compose_reminder(&project.name, reminders, now);
            match self.notifier.send(reminders.user.telegram_id, &text).await {
                Ok(()) => sent += 1,
                Err(e) => warn!(
                    project_id,
                    user_id = reminders.user.telegram_id,
                    error = %e,
                    "failed to deliver reminder"
                ),
            }
        }
        Ok(sent)
    }
}
