// src/error.rs
// Standardized error types for taskbot

use thiserror::Error;

/// Main error type for the taskbot library
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid date format: {0}")]
    InvalidDate(String),

    #[error("unknown task status: {0}")]
    UnknownStatus(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Result using TrackerError
pub type Result<T> = std::result::Result<T, TrackerError>;

impl TrackerError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for failures caused by the caller's input rather than storage or transport
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::InvalidDate(_) | Self::UnknownStatus(_) | Self::UnknownRole(_)
        )
    }
}

/// Business-rule conflicts on project membership.
///
/// These are expected outcomes, returned as the inner error of a successful
/// unit of work; they never cause a rollback by themselves.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MembershipConflict {
    #[error("user is already a member of the project")]
    AlreadyMember,

    #[error("role limit reached ({limit})")]
    RoleLimitReached { limit: u32 },

    #[error("member not found")]
    MemberNotFound,
}
