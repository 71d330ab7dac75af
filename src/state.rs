// src/state.rs
// Shared state handed to the admin API

use std::sync::Arc;

use crate::db::Database;
use crate::notify::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(db: Database, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }
}
