// src/project/store.rs
// Database operations for projects and memberships

use chrono::{NaiveDateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::{debug, info, warn};

use super::types::{NewProject, Project, ProjectDetails, ProjectMember, ReminderSettings, ReminderTime};
use crate::error::{MembershipConflict, Result};
use crate::role::store::{aliased_role_columns, role_from_row};
use crate::role::{FixedRole, MemberRole};
use crate::task::store::fetch_project_tasks;
use crate::user::store::{aliased_user_columns, row_to_user};

const PROJECT_COLUMNS: &str = "id, name, description, is_active, created_by, created_at, updated_at,
     reminders_enabled, reminder_hour, reminder_minute, reminder_days_before";

/// Outcome of a membership change: a member, or the business rule that refused it
pub type MembershipResult = std::result::Result<ProjectMember, MembershipConflict>;

/// Project queries bound to one unit of work
pub struct ProjectStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProjectStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    // =========================================================================
    // Projects
    // =========================================================================

    /// Create a project; its creator joins as projectnik
    pub async fn create(&mut self, new: &NewProject) -> Result<Project> {
        let now = Utc::now().naive_utc();

        let id = sqlx::query(
            "INSERT INTO projects
             (name, description, is_active, created_by, created_at, updated_at,
              reminders_enabled, reminder_hour, reminder_minute, reminder_days_before)
             VALUES (?, ?, 1, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.created_by)
        .bind(now)
        .bind(now)
        .bind(new.reminders.enabled)
        .bind(new.reminders.time.hour())
        .bind(new.reminders.time.minute())
        .bind(new.reminders.days_before)
        .execute(&mut *self.conn)
        .await?
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO project_members (project_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(new.created_by)
        .bind(FixedRole::Projectnik.as_str())
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        info!(project_id = id, owner = new.created_by, name = %new.name, "created project");

        Ok(Project {
            id,
            name: new.name.clone(),
            description: new.description.clone(),
            is_active: true,
            created_by: new.created_by,
            reminders: new.reminders,
            created_at: now,
            updated_at: now,
        })
    }

    /// Plain project row, active or not
    pub async fn get(&mut self, project_id: i64) -> Result<Option<Project>> {
        fetch_project(&mut *self.conn, project_id).await
    }

    /// Project with members and tasks loaded, active or not
    pub async fn get_by_id(&mut self, project_id: i64) -> Result<Option<ProjectDetails>> {
        let Some(project) = fetch_project(&mut *self.conn, project_id).await? else {
            return Ok(None);
        };
        let members = self.list_members(project_id).await?;
        let tasks = fetch_project_tasks(&mut *self.conn, project_id).await?;

        Ok(Some(ProjectDetails {
            project,
            members,
            tasks,
        }))
    }

    /// Active projects, newest first
    pub async fn list_active(&mut self) -> Result<Vec<Project>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE is_active = 1 ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter().map(row_to_project).collect()
    }

    /// Active projects the user belongs to, newest first
    pub async fn list_for_user(&mut self, user_id: i64) -> Result<Vec<Project>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects
             WHERE is_active = 1
               AND id IN (SELECT project_id FROM project_members WHERE user_id = ?)
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter().map(row_to_project).collect()
    }

    /// Soft delete. Rows stay in storage; only active listings stop showing it.
    pub async fn deactivate(&mut self, project_id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE projects SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now().naive_utc())
            .bind(project_id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() > 0 {
            info!(project_id, "project deactivated");
        }
        Ok(result.rows_affected() > 0)
    }

    /// Partial update. An empty or missing name and a missing description leave the field as is.
    pub async fn update(
        &mut self,
        project_id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Project>> {
        let name = name.filter(|n| !n.is_empty());

        let result = sqlx::query(
            "UPDATE projects
             SET name = COALESCE(?, name), description = COALESCE(?, description), updated_at = ?
             WHERE id = ?",
        )
        .bind(name)
        .bind(description)
        .bind(Utc::now().naive_utc())
        .bind(project_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(project_id).await
    }

    // =========================================================================
    // Reminder settings
    // =========================================================================

    pub async fn set_reminders_enabled(&mut self, project_id: i64, enabled: bool) -> Result<Option<Project>> {
        let result = sqlx::query("UPDATE projects SET reminders_enabled = ?, updated_at = ? WHERE id = ?")
            .bind(enabled)
            .bind(Utc::now().naive_utc())
            .bind(project_id)
            .execute(&mut *self.conn)
            .await?;

        self.reload_reminders(project_id, result.rows_affected()).await
    }

    pub async fn toggle_reminders(&mut self, project_id: i64) -> Result<Option<Project>> {
        let result = sqlx::query(
            "UPDATE projects SET reminders_enabled = NOT reminders_enabled, updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now().naive_utc())
        .bind(project_id)
        .execute(&mut *self.conn)
        .await?;

        self.reload_reminders(project_id, result.rows_affected()).await
    }

    pub async fn set_reminder_time(&mut self, project_id: i64, time: ReminderTime) -> Result<Option<Project>> {
        let result = sqlx::query(
            "UPDATE projects SET reminder_hour = ?, reminder_minute = ?, updated_at = ? WHERE id = ?",
        )
        .bind(time.hour())
        .bind(time.minute())
        .bind(Utc::now().naive_utc())
        .bind(project_id)
        .execute(&mut *self.conn)
        .await?;

        self.reload_reminders(project_id, result.rows_affected()).await
    }

    pub async fn set_reminder_days_before(&mut self, project_id: i64, days: u32) -> Result<Option<Project>> {
        let result = sqlx::query("UPDATE projects SET reminder_days_before = ?, updated_at = ? WHERE id = ?")
            .bind(days)
            .bind(Utc::now().naive_utc())
            .bind(project_id)
            .execute(&mut *self.conn)
            .await?;

        self.reload_reminders(project_id, result.rows_affected()).await
    }

    async fn reload_reminders(&mut self, project_id: i64, rows_affected: u64) -> Result<Option<Project>> {
        if rows_affected == 0 {
            return Ok(None);
        }
        let project = self.get(project_id).await?;
        if let Some(p) = &project {
            debug!(
                project_id,
                enabled = p.reminders.enabled,
                time = %p.reminders.time,
                days_before = p.reminders.days_before,
                "reminder settings changed"
            );
        }
        Ok(project)
    }

    // =========================================================================
    // Members
    // =========================================================================

    /// Add a user with a fixed role.
    ///
    /// Refuses duplicates and full roles as an inner error. A concurrent insert
    /// that slips past these checks fails on the unique constraint instead.
    pub async fn add_member(
        &mut self,
        project_id: i64,
        user_id: i64,
        role: FixedRole,
    ) -> Result<MembershipResult> {
        if fetch_member(&mut *self.conn, project_id, user_id).await?.is_some() {
            return Ok(Err(MembershipConflict::AlreadyMember));
        }
        if let Some(conflict) = self.check_role_limit(project_id, role).await? {
            return Ok(Err(conflict));
        }

        sqlx::query(
            "INSERT INTO project_members (project_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(Utc::now().naive_utc())
        .execute(&mut *self.conn)
        .await?;

        debug!(project_id, user_id, role = %role, "member added");
        self.require_member(project_id, user_id).await
    }

    pub async fn remove_member(&mut self, project_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM project_members WHERE project_id = ? AND user_id = ?")
            .bind(project_id)
            .bind(user_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Move a member to another fixed role, subject to the same limit as adding
    pub async fn change_member_role(
        &mut self,
        project_id: i64,
        user_id: i64,
        role: FixedRole,
    ) -> Result<MembershipResult> {
        let Some(member) = fetch_member(&mut *self.conn, project_id, user_id).await? else {
            return Ok(Err(MembershipConflict::MemberNotFound));
        };
        if member.role.fixed() == Some(role) {
            return Ok(Ok(member));
        }
        if let Some(conflict) = self.check_role_limit(project_id, role).await? {
            return Ok(Err(conflict));
        }

        sqlx::query("UPDATE project_members SET role = ? WHERE project_id = ? AND user_id = ?")
            .bind(role.as_str())
            .bind(project_id)
            .bind(user_id)
            .execute(&mut *self.conn)
            .await?;

        debug!(project_id, user_id, role = %role, "member role changed");
        self.require_member(project_id, user_id).await
    }

    /// Members with users and resolved roles, in join order
    pub async fn list_members(&mut self, project_id: i64) -> Result<Vec<ProjectMember>> {
        let rows = sqlx::query(&format!("{} WHERE m.project_id = ? ORDER BY m.joined_at, m.id", member_select()))
            .bind(project_id)
            .fetch_all(&mut *self.conn)
            .await?;

        rows.iter().map(row_to_member).collect()
    }

    pub async fn get_member(&mut self, project_id: i64, user_id: i64) -> Result<Option<ProjectMember>> {
        fetch_member(&mut *self.conn, project_id, user_id).await
    }

    async fn check_role_limit(&mut self, project_id: i64, role: FixedRole) -> Result<Option<MembershipConflict>> {
        let Some(limit) = role.limit() else {
            return Ok(None);
        };

        let holders: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM project_members WHERE project_id = ? AND role = ?")
                .bind(project_id)
                .bind(role.as_str())
                .fetch_one(&mut *self.conn)
                .await?;

        if holders >= i64::from(limit) {
            debug!(project_id, role = %role, holders, limit, "role limit reached");
            return Ok(Some(MembershipConflict::RoleLimitReached { limit }));
        }
        Ok(None)
    }

    async fn require_member(&mut self, project_id: i64, user_id: i64) -> Result<MembershipResult> {
        Ok(fetch_member(&mut *self.conn, project_id, user_id)
            .await?
            .ok_or(MembershipConflict::MemberNotFound))
    }
}

pub(crate) async fn fetch_project(conn: &mut SqliteConnection, project_id: i64) -> Result<Option<Project>> {
    let row = sqlx::query(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"))
        .bind(project_id)
        .fetch_optional(conn)
        .await?;

    row.map(|r| row_to_project(&r)).transpose()
}

pub(crate) async fn fetch_member(
    conn: &mut SqliteConnection,
    project_id: i64,
    user_id: i64,
) -> Result<Option<ProjectMember>> {
    let row = sqlx::query(&format!("{} WHERE m.project_id = ? AND m.user_id = ?", member_select()))
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(row_to_member).transpose()
}

/// Members joined with their user and, when set, their dynamic role
fn member_select() -> String {
    format!(
        "SELECT m.id, m.project_id, m.role, m.joined_at, {}, {}
         FROM project_members m
         JOIN users u ON u.telegram_id = m.user_id
         LEFT JOIN project_roles r ON r.id = m.role_id",
        aliased_user_columns("u"),
        aliased_role_columns("r"),
    )
}

fn row_to_member(row: &SqliteRow) -> Result<ProjectMember> {
    let legacy: Option<String> = row.try_get("role")?;
    let legacy = legacy.and_then(|tag| match tag.parse::<FixedRole>() {
        Ok(role) => Some(role),
        Err(_) => {
            warn!(tag = %tag, "ignoring unknown legacy role tag");
            None
        }
    });

    Ok(ProjectMember {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        user: row_to_user(row, "u_")?,
        role: MemberRole::resolve(role_from_row(row, "r_")?, legacy),
        joined_at: row.try_get::<NaiveDateTime, _>("joined_at")?,
    })
}

fn row_to_project(row: &SqliteRow) -> Result<Project> {
    let time = ReminderTime::new(row.try_get("reminder_hour")?, row.try_get("reminder_minute")?)?;
    Ok(Project {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        is_active: row.try_get("is_active")?,
        created_by: row.try_get("created_by")?,
        reminders: ReminderSettings {
            enabled: row.try_get("reminders_enabled")?,
            time,
            days_before: row.try_get("reminder_days_before")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
