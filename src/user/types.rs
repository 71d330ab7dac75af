// src/user/types.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A registered Telegram user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }

    /// `@username` when the user has one, otherwise the full name
    pub fn mention(&self) -> String {
        match &self.username {
            Some(username) if !username.is_empty() => format!("@{username}"),
            _ => self.full_name(),
        }
    }
}

/// Identity fields as reported by Telegram on each contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramProfile {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl TelegramProfile {
    pub fn new(telegram_id: i64, first_name: impl Into<String>) -> Self {
        Self {
            telegram_id,
            username: None,
            first_name: first_name.into(),
            last_name: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}
