// src/lib.rs

//! Core of a Telegram project and task tracker: persistence, the role model,
//! Moscow-time date handling, scheduled deadline reminders and the admin API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod notify;
pub mod project;
pub mod reminders;
pub mod role;
pub mod state;
pub mod task;
pub mod timezone;
pub mod user;

pub use db::{Database, UnitOfWork};
pub use error::{MembershipConflict, Result, TrackerError};
