// src/user/store.rs
// Database operations for users

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use super::types::{TelegramProfile, User};
use crate::error::Result;

pub(crate) const USER_COLUMNS: &str =
    "id, telegram_id, username, first_name, last_name, is_admin, created_at, updated_at";

/// User queries bound to one unit of work
pub struct UserStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> UserStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_telegram_id(&mut self, telegram_id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?"
        ))
        .bind(telegram_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(|r| row_to_user(&r, "")).transpose()
    }

    /// Upsert keyed by Telegram id. Name fields are overwritten on every call.
    ///
    /// Returns the stored user and whether it was newly created.
    pub async fn get_or_create(&mut self, profile: &TelegramProfile) -> Result<(User, bool)> {
        let now = Utc::now().naive_utc();

        if let Some(mut user) = self.get_by_telegram_id(profile.telegram_id).await? {
            sqlx::query(
                "UPDATE users SET username = ?, first_name = ?, last_name = ?, updated_at = ?
                 WHERE telegram_id = ?",
            )
            .bind(&profile.username)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(now)
            .bind(profile.telegram_id)
            .execute(&mut *self.conn)
            .await?;

            user.username = profile.username.clone();
            user.first_name = profile.first_name.clone();
            user.last_name = profile.last_name.clone();
            user.updated_at = now;
            return Ok((user, false));
        }

        let id = sqlx::query(
            "INSERT INTO users (telegram_id, username, first_name, last_name, is_admin, created_at, updated_at)
             VALUES (?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(profile.telegram_id)
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(now)
        .bind(now)
        .execute(&mut *self.conn)
        .await?
        .last_insert_rowid();

        debug!(telegram_id = profile.telegram_id, id, "registered new user");

        let user = User {
            id,
            telegram_id: profile.telegram_id,
            username: profile.username.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        Ok((user, true))
    }

    /// Case-insensitive substring match on the username; `%` and `_` match literally
    pub async fn search_by_username(&mut self, query: &str) -> Result<Vec<User>> {
        let pattern = format!("%{}%", escape_like(&query.trim_start_matches('@').to_lowercase()));
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE username IS NOT NULL AND LOWER(username) LIKE ? ESCAPE '\\'
             ORDER BY username"
        ))
        .bind(pattern)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter().map(|r| row_to_user(r, "")).collect()
    }

    /// Exact, case-insensitive match; a leading `@` is ignored
    pub async fn find_by_username(&mut self, username: &str) -> Result<Option<User>> {
        let username = username.trim().trim_start_matches('@').to_lowercase();
        if username.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = ? LIMIT 1"
        ))
        .bind(username)
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(|r| row_to_user(&r, "")).transpose()
    }

    pub async fn list_all(&mut self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&mut *self.conn)
            .await?;

        rows.iter().map(|r| row_to_user(r, "")).collect()
    }

    pub async fn set_admin(&mut self, telegram_id: i64, is_admin: bool) -> Result<Option<User>> {
        let result = sqlx::query("UPDATE users SET is_admin = ?, updated_at = ? WHERE telegram_id = ?")
            .bind(is_admin)
            .bind(Utc::now().naive_utc())
            .bind(telegram_id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_telegram_id(telegram_id).await
    }
}

/// Map a user from a row whose columns may carry an alias prefix such as `u_`
pub(crate) fn row_to_user(row: &SqliteRow, prefix: &str) -> Result<User> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(User {
        id: row.try_get(col("id").as_str())?,
        telegram_id: row.try_get(col("telegram_id").as_str())?,
        username: row.try_get(col("username").as_str())?,
        first_name: row.try_get(col("first_name").as_str())?,
        last_name: row.try_get(col("last_name").as_str())?,
        is_admin: row.try_get(col("is_admin").as_str())?,
        created_at: row.try_get(col("created_at").as_str())?,
        updated_at: row.try_get(col("updated_at").as_str())?,
    })
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Column list for joining `users` under an alias, e.g. `u.id AS u_id, ...`
pub(crate) fn aliased_user_columns(alias: &str) -> String {
    USER_COLUMNS
        .split(", ")
        .map(|c| format!("{alias}.{c} AS {alias}_{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}
