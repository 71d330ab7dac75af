// src/role/mod.rs

//! Role and permission model.
//!
//! Two role systems coexist: fixed tags with per-project occupancy caps, and
//! dynamic roles defined per project through the admin API. A member's
//! effective role is resolved once when the membership row is read.

pub mod store;
pub mod types;

pub use store::RoleStore;
pub use types::{
    Capabilities, Capability, FixedRole, MemberRole, NewRole, ProjectRole, default_role_set,
};
