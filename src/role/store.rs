// src/role/store.rs
// Database operations for project-scoped dynamic roles

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::{debug, info};

use super::types::{Capabilities, NewRole, ProjectRole, default_role_set, normalize_managed_by};
use crate::error::{Result, TrackerError};
use crate::project::ProjectMember;
use crate::project::store::fetch_member;
use crate::user::User;
use crate::user::store::{aliased_user_columns, row_to_user};

const ROLE_COLUMNS: &str = "id, project_id, name, description, level, can_manage_roles,
     can_manage_tasks, can_manage_members, can_manage_settings, managed_by_role_ids, created_at";

/// Dynamic role queries bound to one unit of work
pub struct RoleStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> RoleStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, project_id: i64, role: &NewRole) -> Result<ProjectRole> {
        let managed_by = normalize_managed_by(&role.managed_by);
        let now = Utc::now().naive_utc();

        let id = sqlx::query(
            "INSERT INTO project_roles
             (project_id, name, description, level, can_manage_roles, can_manage_tasks,
              can_manage_members, can_manage_settings, managed_by_role_ids, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.level)
        .bind(role.capabilities.manage_roles)
        .bind(role.capabilities.manage_tasks)
        .bind(role.capabilities.manage_members)
        .bind(role.capabilities.manage_settings)
        .bind(serde_json::to_string(&managed_by)?)
        .bind(now)
        .execute(&mut *self.conn)
        .await?
        .last_insert_rowid();

        debug!(role_id = id, project_id, name = %role.name, "created role");

        Ok(ProjectRole {
            id,
            project_id,
            name: role.name.clone(),
            description: role.description.clone(),
            level: role.level,
            capabilities: role.capabilities,
            managed_by,
            created_at: now,
        })
    }

    /// Roles of a project, highest level first
    pub async fn list_for_project(&mut self, project_id: i64) -> Result<Vec<ProjectRole>> {
        let rows = sqlx::query(&format!(
            "SELECT {ROLE_COLUMNS} FROM project_roles WHERE project_id = ? ORDER BY level, id"
        ))
        .bind(project_id)
        .fetch_all(&mut *self.conn)
        .await?;

        let roles = rows.iter().map(|r| role_from_row(r, "")).collect::<Result<Vec<_>>>()?;
        Ok(roles.into_iter().flatten().collect())
    }

    /// A role, only if it belongs to the given project
    pub async fn get(&mut self, project_id: i64, role_id: i64) -> Result<Option<ProjectRole>> {
        let row = sqlx::query(&format!(
            "SELECT {ROLE_COLUMNS} FROM project_roles WHERE id = ? AND project_id = ?"
        ))
        .bind(role_id)
        .bind(project_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        match row {
            Some(r) => role_from_row(&r, ""),
            None => Ok(None),
        }
    }

    /// Replace every field of a role
    pub async fn update(&mut self, project_id: i64, role_id: i64, role: &NewRole) -> Result<Option<ProjectRole>> {
        let managed_by = normalize_managed_by(&role.managed_by);

        let result = sqlx::query(
            "UPDATE project_roles
             SET name = ?, description = ?, level = ?, can_manage_roles = ?, can_manage_tasks = ?,
                 can_manage_members = ?, can_manage_settings = ?, managed_by_role_ids = ?
             WHERE id = ? AND project_id = ?",
        )
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.level)
        .bind(role.capabilities.manage_roles)
        .bind(role.capabilities.manage_tasks)
        .bind(role.capabilities.manage_members)
        .bind(role.capabilities.manage_settings)
        .bind(serde_json::to_string(&managed_by)?)
        .bind(role_id)
        .bind(project_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(project_id, role_id).await
    }

    /// Members holding the role keep their membership with `role_id` cleared
    pub async fn delete(&mut self, project_id: i64, role_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM project_roles WHERE id = ? AND project_id = ?")
            .bind(role_id)
            .bind(project_id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() > 0 {
            info!(project_id, role_id, "deleted role");
        }
        Ok(result.rows_affected() > 0)
    }

    pub async fn members_with_role(&mut self, role_id: i64) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM project_members m
             JOIN users u ON u.telegram_id = m.user_id
             WHERE m.role_id = ?
             ORDER BY m.joined_at, m.id",
            aliased_user_columns("u")
        ))
        .bind(role_id)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter().map(|r| row_to_user(r, "u_")).collect()
    }

    /// Roles named in `managed_by`, in listed order, limited to the role's own project
    pub async fn managers_of(&mut self, role: &ProjectRole) -> Result<Vec<ProjectRole>> {
        let mut managers = Vec::with_capacity(role.managed_by.len());
        for id in &role.managed_by {
            if let Some(manager) = self.get(role.project_id, *id).await? {
                managers.push(manager);
            }
        }
        Ok(managers)
    }

    /// Give a user a dynamic role, joining them to the project if needed
    pub async fn assign_to_user(&mut self, project_id: i64, role_id: i64, user_id: i64) -> Result<ProjectMember> {
        let updated = sqlx::query("UPDATE project_members SET role_id = ? WHERE project_id = ? AND user_id = ?")
            .bind(role_id)
            .bind(project_id)
            .bind(user_id)
            .execute(&mut *self.conn)
            .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO project_members (project_id, user_id, role, role_id, joined_at)
                 VALUES (?, ?, 'member', ?, ?)",
            )
            .bind(project_id)
            .bind(user_id)
            .bind(role_id)
            .bind(Utc::now().naive_utc())
            .execute(&mut *self.conn)
            .await?;
        }

        info!(project_id, role_id, user_id, joined = updated.rows_affected() == 0, "role assigned");

        fetch_member(&mut *self.conn, project_id, user_id)
            .await?
            .ok_or_else(|| TrackerError::invalid_input(format!("user {user_id} is not registered")))
    }

    /// Create the starter hierarchy: project lead, main organizer, member
    pub async fn create_default_set(&mut self, project_id: i64) -> Result<Vec<ProjectRole>> {
        let mut created = Vec::new();
        for role in default_role_set() {
            created.push(self.create(project_id, &role).await?);
        }
        Ok(created)
    }
}

/// Column list for joining `project_roles` under an alias
pub(crate) fn aliased_role_columns(alias: &str) -> String {
    ROLE_COLUMNS
        .split(',')
        .map(str::trim)
        .map(|c| format!("{alias}.{c} AS {alias}_{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map a role from a row, `None` when the (possibly left-joined) id is null
pub(crate) fn role_from_row(row: &SqliteRow, prefix: &str) -> Result<Option<ProjectRole>> {
    let col = |name: &str| format!("{prefix}{name}");
    let Some(id) = row.try_get::<Option<i64>, _>(col("id").as_str())? else {
        return Ok(None);
    };
    let managed_by: Option<String> = row.try_get(col("managed_by_role_ids").as_str())?;

    Ok(Some(ProjectRole {
        id,
        project_id: row.try_get(col("project_id").as_str())?,
        name: row.try_get(col("name").as_str())?,
        description: row.try_get(col("description").as_str())?,
        level: row.try_get(col("level").as_str())?,
        capabilities: Capabilities {
            manage_roles: row.try_get(col("can_manage_roles").as_str())?,
            manage_tasks: row.try_get(col("can_manage_tasks").as_str())?,
            manage_members: row.try_get(col("can_manage_members").as_str())?,
            manage_settings: row.try_get(col("can_manage_settings").as_str())?,
        },
        managed_by: decode_managed_by(managed_by.as_deref()),
        created_at: row.try_get(col("created_at").as_str())?,
    }))
}

/// Missing or unreadable lists decode as empty
fn decode_managed_by(raw: Option<&str>) -> Vec<i64> {
    raw.and_then(|s| serde_json::from_str::<Vec<i64>>(s).ok())
        .unwrap_or_default()
}
