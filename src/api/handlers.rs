// src/api/handlers.rs
// Admin API handlers: projects, dynamic roles, role assignment

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use html_escape::encode_text;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::error::{ApiResult, IntoApiErrorOption};
use crate::project::Project;
use crate::role::{NewRole, ProjectRole};
use crate::state::AppState;

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

pub async fn list_projects(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<ProjectSummary>>> {
    let mut uow = state.db.begin().await?;
    let projects = uow.projects().list_active().await?;

    Ok(Json(
        projects
            .into_iter()
            .map(|p| ProjectSummary {
                id: p.id,
                name: p.name,
                description: p.description,
            })
            .collect(),
    ))
}

#[derive(Debug, Serialize)]
pub struct RoleMember {
    pub id: i64,
    pub name: String,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RoleView {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub level: i64,
    pub can_manage_roles: bool,
    pub can_manage_tasks: bool,
    pub can_manage_members: bool,
    pub can_manage_settings: bool,
    pub managed_by: Vec<i64>,
    pub members: Vec<RoleMember>,
}

pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<Vec<RoleView>>> {
    let mut uow = state.db.begin().await?;
    let roles = uow.roles().list_for_project(project_id).await?;

    let mut views = Vec::with_capacity(roles.len());
    for role in roles {
        let members = uow
            .roles()
            .members_with_role(role.id)
            .await?
            .into_iter()
            .map(|u| RoleMember {
                id: u.telegram_id,
                name: u.full_name(),
                username: u.username,
            })
            .collect();

        views.push(RoleView {
            id: role.id,
            name: role.name,
            description: role.description,
            level: role.level,
            can_manage_roles: role.capabilities.manage_roles,
            can_manage_tasks: role.capabilities.manage_tasks,
            can_manage_members: role.capabilities.manage_members,
            can_manage_settings: role.capabilities.manage_settings,
            managed_by: role.managed_by,
            members,
        });
    }
    Ok(Json(views))
}

pub async fn create_role(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<i64>,
    Json(body): Json<NewRole>,
) -> ApiResult<Json<Value>> {
    let mut uow = state.db.begin().await?;
    uow.projects()
        .get(project_id)
        .await?
        .ok_or_not_found("Project not found")?;

    let role = uow.roles().create(project_id, &body).await?;
    uow.commit().await?;

    Ok(Json(json!({ "id": role.id, "success": true })))
}

pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Path((project_id, role_id)): Path<(i64, i64)>,
    Json(body): Json<NewRole>,
) -> ApiResult<Json<Value>> {
    let mut uow = state.db.begin().await?;
    uow.roles()
        .update(project_id, role_id, &body)
        .await?
        .ok_or_not_found("Role not found")?;
    uow.commit().await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path((project_id, role_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    let mut uow = state.db.begin().await?;
    if !uow.roles().delete(project_id, role_id).await? {
        return Err(super::ApiError::not_found("Role not found"));
    }
    uow.commit().await?;

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub role_id: i64,
    pub username: String,
}

/// Put a user on a role, then tell them about it. Delivery is best effort.
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<i64>,
    Json(body): Json<AddMemberRequest>,
) -> ApiResult<Json<Value>> {
    let username = body.username.trim().trim_start_matches('@').to_lowercase();

    let mut uow = state.db.begin().await?;
    let user = uow
        .users()
        .find_by_username(&username)
        .await?
        .ok_or_not_found(&format!(
            "User @{username} not found. They need to send /start to the bot first"
        ))?;
    let project = uow
        .projects()
        .get(project_id)
        .await?
        .ok_or_not_found("Project not found")?;
    let role = uow
        .roles()
        .get(project_id, body.role_id)
        .await?
        .ok_or_not_found("Role not found")?;

    uow.roles()
        .assign_to_user(project_id, role.id, user.telegram_id)
        .await?;
    let supervisors = if role.level > 0 {
        uow.roles().managers_of(&role).await?
    } else {
        Vec::new()
    };
    uow.commit().await?;

    info!(project_id, role_id = role.id, user_id = user.telegram_id, "member assigned to role");

    let text = role_assignment_message(&project, &role, &supervisors);
    if let Err(e) = state.notifier.send(user.telegram_id, &text).await {
        warn!(user_id = user.telegram_id, error = %e, "failed to send role notification");
    }

    Ok(Json(json!({ "success": true })))
}

fn role_assignment_message(project: &Project, role: &ProjectRole, supervisors: &[ProjectRole]) -> String {
    let mut text = String::from("🎯 <b>You have been given a project role!</b>\n\n");
    text.push_str(&format!("📁 <b>Project:</b> {}\n", encode_text(&project.name)));
    text.push_str(&format!("👤 <b>Your role:</b> {}\n", encode_text(&role.name)));

    if let Some(description) = role.description.as_deref().filter(|d| !d.is_empty()) {
        text.push_str(&format!("📝 {}\n", encode_text(description)));
    }

    if !supervisors.is_empty() {
        let names: Vec<String> = supervisors.iter().map(|r| encode_text(&r.name).into_owned()).collect();
        text.push_str(&format!("\n👔 <b>Reports to:</b> {}", names.join(", ")));
    }

    text.push_str("\n\n✅ You can now work with the project's tasks through the bot!");
    text
}
