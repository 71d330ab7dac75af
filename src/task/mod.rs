// src/task/mod.rs
pub mod store;
pub mod types;

pub use store::TaskStore;
pub use types::{
    AssignedTask, NewTask, Task, TaskDetails, TaskStatus, TaskUpdate, validate_task_title,
};
