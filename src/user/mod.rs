// src/user/mod.rs
pub mod store;
pub mod types;

pub use store::UserStore;
pub use types::{TelegramProfile, User};
