// src/project/mod.rs
pub mod store;
pub mod types;

pub use store::{MembershipResult, ProjectStore};
pub use types::{
    NewProject, Project, ProjectDetails, ProjectMember, ReminderSettings, ReminderTime,
    validate_project_name,
};
