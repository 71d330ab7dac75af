// src/db/mod.rs

//! Connection pool and transactional scopes.
//!
//! `Database` is built once at startup and cloned into whatever needs it.
//! All reads and writes go through a [`UnitOfWork`].

mod unit_of_work;

pub use unit_of_work::UnitOfWork;

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::Result;

/// Shared handle to the SQLite pool
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the pool with foreign keys enforced and WAL journaling
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        info!(url = %config.url, max_connections = config.max_connections, "database connected");
        Ok(Self { pool })
    }

    /// Wrap an existing pool, e.g. an in-memory one in tests
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }

    /// Start a unit of work. Nothing persists until [`UnitOfWork::commit`].
    pub async fn begin(&self) -> Result<UnitOfWork> {
        Ok(UnitOfWork::new(self.pool.begin().await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }
}
