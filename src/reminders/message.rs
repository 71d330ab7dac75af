// src/reminders/message.rs
// Reminder message text (Telegram HTML)

use std::fmt::Write as _;

use chrono::{Duration, NaiveDateTime};
use html_escape::encode_text;

use super::buckets::UserReminders;
use crate::timezone::format_datetime;

/// How close a deadline is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Overdue,
    WithinHour,
    WithinDay,
    WithinTwoDays,
    Later,
}

impl Urgency {
    pub fn classify(deadline: NaiveDateTime, now: NaiveDateTime) -> Self {
        let left = deadline - now;
        if left < Duration::zero() {
            Self::Overdue
        } else if left < Duration::hours(1) {
            Self::WithinHour
        } else if left < Duration::days(1) {
            Self::WithinDay
        } else if left <= Duration::days(2) {
            Self::WithinTwoDays
        } else {
            Self::Later
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Self::Overdue => "⛔",
            Self::WithinHour => "🔥",
            Self::WithinDay => "🔴",
            Self::WithinTwoDays => "🟡",
            Self::Later => "🟢",
        }
    }
}

fn time_left(left: Duration) -> String {
    if left.num_days() >= 1 {
        format!("{} d", left.num_days())
    } else if left.num_hours() >= 1 {
        format!("{} h", left.num_hours())
    } else {
        format!("{} min", left.num_minutes().max(0))
    }
}

/// One message for one user: overdue tasks first, then upcoming ones
pub fn compose_reminder(project_name: &str, reminders: &UserReminders, now: NaiveDateTime) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "🔔 <b>Deadline reminder</b>");
    let _ = writeln!(text, "📁 Project: <b>{}</b>", encode_text(project_name));

    if !reminders.overdue.is_empty() {
        let _ = writeln!(text, "\n{} <b>Overdue:</b>", Urgency::Overdue.marker());
        for task in &reminders.overdue {
            let Some(deadline) = task.deadline else { continue };
            let days = (now - deadline).num_days();
            let late = if days == 0 {
                "since today".to_string()
            } else {
                format!("by {days} d")
            };
            let _ = writeln!(
                text,
                "• <b>{}</b>\n  deadline {}, overdue {late}",
                encode_text(&task.title),
                format_datetime(Some(deadline), false),
            );
        }
    }

    if !reminders.upcoming.is_empty() {
        let _ = writeln!(text, "\n📅 <b>Upcoming deadlines:</b>");
        for task in &reminders.upcoming {
            let Some(deadline) = task.deadline else { continue };
            let urgency = Urgency::classify(deadline, now);
            let _ = writeln!(
                text,
                "{} <b>{}</b>\n  deadline {} (in {})",
                urgency.marker(),
                encode_text(&task.title),
                format_datetime(Some(deadline), false),
                time_left(deadline - now),
            );
        }
    }

    text.trim_end().to_string()
}
