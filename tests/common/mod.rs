// tests/common/mod.rs
// Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use taskbot::db::Database;
use taskbot::error::{Result, TrackerError};
use taskbot::notify::Notifier;
use taskbot::project::{NewProject, Project, ReminderSettings, ReminderTime};
use taskbot::timezone::moscow;
use taskbot::user::{TelegramProfile, User};

/// Fresh in-memory database with migrations applied
pub async fn test_db() -> Database {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to create test pool");

    let db = Database::from_pool(pool);
    db.migrate().await.expect("Failed to run migrations");
    db
}

pub async fn seed_user(db: &Database, telegram_id: i64, username: &str) -> User {
    let mut uow = db.begin().await.unwrap();
    let (user, _) = uow
        .users()
        .get_or_create(&TelegramProfile::new(telegram_id, username).with_username(username))
        .await
        .unwrap();
    uow.commit().await.unwrap();
    user
}

/// Project reminding daily at 09:00 Moscow, three days ahead
pub async fn seed_project(db: &Database, owner: i64, name: &str) -> Project {
    let mut uow = db.begin().await.unwrap();
    let project = uow
        .projects()
        .create(&NewProject {
            name: name.to_string(),
            description: None,
            created_by: owner,
            reminders: ReminderSettings {
                enabled: true,
                time: ReminderTime::new(9, 0).unwrap(),
                days_before: 3,
            },
        })
        .await
        .unwrap();
    uow.commit().await.unwrap();
    project
}

/// A Moscow wall-clock instant
pub fn moscow_at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
    moscow().with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn utc(dt: DateTime<FixedOffset>) -> NaiveDateTime {
    dt.naive_utc()
}

/// Records every message; sends to users in `failing` return an error
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub failing: Mutex<HashSet<i64>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, user_id: i64) {
        self.failing.lock().unwrap().insert(user_id);
    }

    pub fn messages(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages_to(&self, user_id: i64) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, user_id: i64, text: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(&user_id) {
            return Err(TrackerError::Delivery(format!("chat {user_id} is unreachable")));
        }
        self.sent.lock().unwrap().push((user_id, text.to_string()));
        Ok(())
    }
}
