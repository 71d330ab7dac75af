// src/role/types.rs
// Fixed (legacy) roles, project-scoped dynamic roles, and the resolved role of a member

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Something a member may be allowed to do inside a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageRoles,
    ManageTasks,
    ManageMembers,
    ManageSettings,
}

/// The four independent capability flags of a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    #[serde(rename = "can_manage_roles")]
    pub manage_roles: bool,
    #[serde(rename = "can_manage_tasks")]
    pub manage_tasks: bool,
    #[serde(rename = "can_manage_members")]
    pub manage_members: bool,
    #[serde(rename = "can_manage_settings")]
    pub manage_settings: bool,
}

impl Capabilities {
    pub const ALL: Self = Self {
        manage_roles: true,
        manage_tasks: true,
        manage_members: true,
        manage_settings: true,
    };

    pub const NONE: Self = Self {
        manage_roles: false,
        manage_tasks: false,
        manage_members: false,
        manage_settings: false,
    };

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::ManageRoles => self.manage_roles,
            Capability::ManageTasks => self.manage_tasks,
            Capability::ManageMembers => self.manage_members,
            Capability::ManageSettings => self.manage_settings,
        }
    }
}

impl Default for Capabilities {
    /// New dynamic roles may manage tasks and nothing else
    fn default() -> Self {
        Self {
            manage_tasks: true,
            ..Self::NONE
        }
    }
}

/// Project-independent role tag carried in `project_members.role`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedRole {
    Projectnik,
    MainOrganizer,
    SeniorTp,
    SeniorPr,
    SeniorContent,
    Member,
}

impl FixedRole {
    pub const ALL: [FixedRole; 6] = [
        Self::Projectnik,
        Self::MainOrganizer,
        Self::SeniorTp,
        Self::SeniorPr,
        Self::SeniorContent,
        Self::Member,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Projectnik => "projectnik",
            Self::MainOrganizer => "main_organizer",
            Self::SeniorTp => "senior_tp",
            Self::SeniorPr => "senior_pr",
            Self::SeniorContent => "senior_content",
            Self::Member => "member",
        }
    }

    /// Maximum concurrent holders within one project; `None` is uncapped
    pub fn limit(&self) -> Option<u32> {
        match self {
            Self::Projectnik | Self::MainOrganizer => Some(2),
            Self::SeniorTp | Self::SeniorPr | Self::SeniorContent => Some(1),
            Self::Member => None,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Projectnik | Self::MainOrganizer => Capabilities::ALL,
            _ => Capabilities::NONE,
        }
    }
}

impl std::fmt::Display for FixedRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FixedRole {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| TrackerError::UnknownRole(s.to_string()))
    }
}

/// A project-scoped, admin-defined role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRole {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Position in the hierarchy, 0 is the highest
    pub level: i64,
    pub capabilities: Capabilities,
    /// Roles shown as supervisors of this one. Not enforced anywhere.
    pub managed_by: Vec<i64>,
    pub created_at: NaiveDateTime,
}

/// Input for creating or fully replacing a dynamic role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub level: i64,
    #[serde(flatten)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub managed_by: Vec<i64>,
}

impl NewRole {
    pub fn new(name: impl Into<String>, level: i64, capabilities: Capabilities) -> Self {
        Self {
            name: name.into(),
            description: None,
            level,
            capabilities,
            managed_by: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Dedupe while keeping first-seen order. Self references and cycles are kept as given.
pub fn normalize_managed_by(ids: &[i64]) -> Vec<i64> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

/// The role a member effectively holds, resolved once when the row is read.
///
/// A `role_id` reference wins over the legacy tag when both are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemberRole {
    Custom(ProjectRole),
    Fixed { role: FixedRole },
    Unassigned,
}

impl MemberRole {
    pub fn resolve(custom: Option<ProjectRole>, legacy: Option<FixedRole>) -> Self {
        match (custom, legacy) {
            (Some(role), _) => Self::Custom(role),
            (None, Some(role)) => Self::Fixed { role },
            (None, None) => Self::Unassigned,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Custom(role) => role.capabilities,
            Self::Fixed { role } => role.capabilities(),
            Self::Unassigned => Capabilities::NONE,
        }
    }

    /// Only the role's own flag counts; `managed_by` plays no part
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().allows(capability)
    }

    pub fn fixed(&self) -> Option<FixedRole> {
        match self {
            Self::Fixed { role } => Some(*role),
            _ => None,
        }
    }
}

/// The starter hierarchy offered when a project is created from the CLI
pub fn default_role_set() -> Vec<NewRole> {
    vec![
        NewRole::new("🎯 Project lead", 0, Capabilities::ALL)
            .with_description("Leads the project"),
        NewRole::new(
            "⭐ Main organizer",
            1,
            Capabilities {
                manage_members: true,
                ..Capabilities::default()
            },
        )
        .with_description("Main organizer of the project"),
        NewRole::new("👤 Member", 2, Capabilities::default())
            .with_description("Regular project member"),
    ]
}
