// src/config/mod.rs
// Central configuration for taskbot, composed of per-concern sections

pub mod helpers;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::project::{ReminderSettings, ReminderTime};
use helpers::{EnvSource, ProcessEnv, env_or, env_parsed, require_env};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub reminders: ReminderDefaults,
    pub logging: LoggingConfig,
}

impl TrackerConfig {
    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(env: &impl EnvSource) -> Result<Self> {
        Ok(Self {
            telegram: TelegramConfig::from_source(env)?,
            database: DatabaseConfig::from_source(env)?,
            server: ServerConfig::from_source(env)?,
            reminders: ReminderDefaults::from_source(env)?,
            logging: LoggingConfig::from_source(env),
        })
    }
}

/// Telegram Bot API access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: String,
}

impl TelegramConfig {
    pub fn from_source(env: &impl EnvSource) -> Result<Self> {
        Ok(Self {
            bot_token: require_env(env, "BOT_TOKEN")?,
            api_base: env_or(env, "TELEGRAM_API_BASE", "https://api.telegram.org"),
        })
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_source(env: &impl EnvSource) -> Result<Self> {
        Ok(Self {
            url: env_or(env, "DATABASE_URL", "sqlite:./taskbot.db"),
            max_connections: env_parsed(env, "TASKBOT_DB_MAX_CONNECTIONS", 10)?,
        })
    }
}

/// Admin API listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_source(env: &impl EnvSource) -> Result<Self> {
        Ok(Self {
            host: env_or(env, "TASKBOT_HOST", "127.0.0.1"),
            port: env_parsed(env, "TASKBOT_PORT", 5000)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Reminder schedule given to newly created projects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderDefaults {
    pub hour: u32,
    pub minute: u32,
    pub days_before: u32,
}

impl ReminderDefaults {
    pub fn from_source(env: &impl EnvSource) -> Result<Self> {
        let defaults = Self {
            hour: env_parsed(env, "REMINDER_HOUR", 9)?,
            minute: env_parsed(env, "REMINDER_MINUTE", 0)?,
            days_before: env_parsed(env, "REMINDER_DAYS_BEFORE", 3)?,
        };
        // Reject out-of-range values at startup rather than on first project creation
        ReminderTime::new(defaults.hour, defaults.minute)
            .map_err(|e| TrackerError::config(e.to_string()))?;
        Ok(defaults)
    }

    pub fn settings(&self) -> Result<ReminderSettings> {
        Ok(ReminderSettings {
            enabled: true,
            time: ReminderTime::new(self.hour, self.minute)?,
            days_before: self.days_before,
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    pub fn from_source(env: &impl EnvSource) -> Self {
        Self {
            level: env_or(env, "TASKBOT_LOG_LEVEL", "info"),
        }
    }

    pub fn tracing_level(&self) -> tracing::Level {
        self.level.parse().unwrap_or(tracing::Level::INFO)
    }
}
