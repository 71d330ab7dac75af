// src/task/store.rs
// Database operations for tasks and their assignees

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tracing::debug;

use super::types::{AssignedTask, NewTask, Task, TaskDetails, TaskStatus, TaskUpdate};
use crate::error::Result;
use crate::project::store::fetch_project;
use crate::user::User;
use crate::user::store::{aliased_user_columns, row_to_user};

const TASK_COLUMNS: &str = "t.id, t.project_id, t.title, t.description, t.deadline, t.status,
     t.created_by, t.created_at, t.updated_at, t.completed_at";

/// Deadline ascending with undated tasks last, newest first among equals
const TASK_ORDER: &str = " ORDER BY t.deadline IS NULL, t.deadline ASC, t.created_at DESC, t.id DESC";


/// Task queries bound to one unit of work
pub struct TaskStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> TaskStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    // =========================================================================
    // Task CRUD
    // =========================================================================

    /// Create a task and its initial assignees
    pub async fn create(&mut self, new: &NewTask) -> Result<Task> {
        let now = Utc::now().naive_utc();

        let id = sqlx::query(
            "INSERT INTO tasks
             (project_id, title, description, deadline, status, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new.project_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.deadline)
        .bind(TaskStatus::Pending.as_str())
        .bind(new.created_by)
        .bind(now)
        .bind(now)
        .execute(&mut *self.conn)
        .await?
        .last_insert_rowid();

        for user_id in &new.assignees {
            insert_assignee(&mut *self.conn, id, *user_id, now).await?;
        }

        debug!(task_id = id, project_id = new.project_id, assignees = new.assignees.len(), "created task");

        Ok(Task {
            id,
            project_id: new.project_id,
            title: new.title.clone(),
            description: new.description.clone(),
            deadline: new.deadline,
            status: TaskStatus::Pending,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    pub async fn get(&mut self, task_id: i64) -> Result<Option<Task>> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?"))
            .bind(task_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        row.map(|r| row_to_task(&r)).transpose()
    }

    /// Task with its project and assignees
    pub async fn get_by_id(&mut self, task_id: i64) -> Result<Option<TaskDetails>> {
        let Some(task) = self.get(task_id).await? else {
            return Ok(None);
        };
        let Some(project) = fetch_project(&mut *self.conn, task.project_id).await? else {
            return Ok(None);
        };
        let mut assignees = fetch_assignees(&mut *self.conn, &[task.id]).await?;

        Ok(Some(TaskDetails {
            assignees: assignees.remove(&task.id).unwrap_or_default(),
            task,
            project,
        }))
    }

    /// Partial update; empty titles are ignored like missing ones
    pub async fn update(&mut self, task_id: i64, update: &TaskUpdate) -> Result<Option<Task>> {
        let title = update.title.as_deref().filter(|t| !t.is_empty());

        let result = sqlx::query(
            "UPDATE tasks
             SET title = COALESCE(?, title),
                 description = COALESCE(?, description),
                 deadline = COALESCE(?, deadline),
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(title)
        .bind(&update.description)
        .bind(update.deadline)
        .bind(Utc::now().naive_utc())
        .bind(task_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(task_id).await
    }

    /// Set the status; `completed_at` is stamped for completed and cleared otherwise
    pub async fn update_status(&mut self, task_id: i64, status: TaskStatus) -> Result<Option<Task>> {
        let now = Utc::now().naive_utc();
        let completed_at = (status == TaskStatus::Completed).then_some(now);

        let result = sqlx::query(
            "UPDATE tasks SET status = ?, completed_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(completed_at)
        .bind(now)
        .bind(task_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        debug!(task_id, status = %status, "task status changed");
        self.get(task_id).await
    }

    /// Delete a task; assignees go with it
    pub async fn delete(&mut self, task_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Assignees
    // =========================================================================

    /// Returns false when the pair already exists
    pub async fn add_assignee(&mut self, task_id: i64, user_id: i64) -> Result<bool> {
        insert_assignee(&mut *self.conn, task_id, user_id, Utc::now().naive_utc()).await
    }

    /// Returns false when the pair did not exist
    pub async fn remove_assignee(&mut self, task_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM task_assignees WHERE task_id = ? AND user_id = ?")
            .bind(task_id)
            .bind(user_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Listings
    // =========================================================================

    pub async fn list_by_project(&mut self, project_id: i64) -> Result<Vec<AssignedTask>> {
        let mut qb = select_tasks();
        qb.push(" WHERE t.project_id = ").push_bind(project_id);
        qb.push(TASK_ORDER);
        self.fetch_assigned(qb).await
    }

    pub async fn list_by_project_with_status(
        &mut self,
        project_id: i64,
        status: TaskStatus,
    ) -> Result<Vec<AssignedTask>> {
        let mut qb = select_tasks();
        qb.push(" WHERE t.project_id = ").push_bind(project_id);
        qb.push(" AND t.status = ").push_bind(status.as_str());
        qb.push(TASK_ORDER);
        self.fetch_assigned(qb).await
    }

    /// Tasks assigned to a user, optionally narrowed by status and project
    pub async fn list_for_user(
        &mut self,
        user_id: i64,
        status: Option<TaskStatus>,
        project_id: Option<i64>,
    ) -> Result<Vec<AssignedTask>> {
        let mut qb = select_tasks();
        qb.push(" JOIN task_assignees ta ON ta.task_id = t.id WHERE ta.user_id = ")
            .push_bind(user_id);
        if let Some(status) = status {
            qb.push(" AND t.status = ").push_bind(status.as_str());
        }
        if let Some(project_id) = project_id {
            qb.push(" AND t.project_id = ").push_bind(project_id);
        }
        qb.push(TASK_ORDER);
        self.fetch_assigned(qb).await
    }

    /// Open tasks with a deadline in `[now, now + days]`
    pub async fn list_due_within(&mut self, days: u32, now: NaiveDateTime) -> Result<Vec<AssignedTask>> {
        let until = now + Duration::days(i64::from(days));
        let mut qb = select_tasks();
        qb.push(format!(" WHERE t.status IN {} AND t.deadline IS NOT NULL", open_statuses()));
        qb.push(" AND t.deadline >= ").push_bind(now);
        qb.push(" AND t.deadline <= ").push_bind(until);
        qb.push(TASK_ORDER);
        self.fetch_assigned(qb).await
    }

    /// Open tasks whose deadline has passed
    pub async fn list_overdue(&mut self, now: NaiveDateTime) -> Result<Vec<AssignedTask>> {
        let mut qb = select_tasks();
        qb.push(format!(" WHERE t.status IN {} AND t.deadline IS NOT NULL", open_statuses()));
        qb.push(" AND t.deadline < ").push_bind(now);
        qb.push(TASK_ORDER);
        self.fetch_assigned(qb).await
    }

    /// A user's open tasks due within `days`, overdue ones included
    pub async fn get_tasks_for_user_reminder(
        &mut self,
        user_id: i64,
        days: u32,
        now: NaiveDateTime,
    ) -> Result<Vec<AssignedTask>> {
        let until = now + Duration::days(i64::from(days));
        let mut qb = select_tasks();
        qb.push(" JOIN task_assignees ta ON ta.task_id = t.id WHERE ta.user_id = ")
            .push_bind(user_id);
        qb.push(format!(" AND t.status IN {} AND t.deadline IS NOT NULL", open_statuses()));
        qb.push(" AND t.deadline <= ").push_bind(until);
        qb.push(TASK_ORDER);
        self.fetch_assigned(qb).await
    }

    /// Every dated, unfinished task of a project; bucketing happens in the reminder engine
    pub async fn list_reminder_candidates(&mut self, project_id: i64) -> Result<Vec<AssignedTask>> {
        let mut qb = select_tasks();
        qb.push(" WHERE t.project_id = ").push_bind(project_id);
        qb.push(format!(
            " AND t.status NOT IN {} AND t.deadline IS NOT NULL",
            TaskStatus::sql_list(TaskStatus::is_terminal)
        ));
        qb.push(TASK_ORDER);
        self.fetch_assigned(qb).await
    }

    async fn fetch_assigned(&mut self, mut qb: QueryBuilder<'_, Sqlite>) -> Result<Vec<AssignedTask>> {
        let rows = qb.build().fetch_all(&mut *self.conn).await?;
        let tasks = rows.iter().map(row_to_task).collect::<Result<Vec<_>>>()?;

        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        let mut assignees = fetch_assignees(&mut *self.conn, &ids).await?;

        Ok(tasks
            .into_iter()
            .map(|task| AssignedTask {
                assignees: assignees.remove(&task.id).unwrap_or_default(),
                task,
            })
            .collect())
    }
}

fn open_statuses() -> String {
    TaskStatus::sql_list(TaskStatus::is_open)
}

fn select_tasks<'a>() -> QueryBuilder<'a, Sqlite> {
    QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks t"))
}

async fn insert_assignee(
    conn: &mut SqliteConnection,
    task_id: i64,
    user_id: i64,
    now: NaiveDateTime,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO task_assignees (task_id, user_id, assigned_at) VALUES (?, ?, ?)",
    )
    .bind(task_id)
    .bind(user_id)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Assignees of several tasks in one query, keyed by task id
async fn fetch_assignees(
    conn: &mut SqliteConnection,
    task_ids: &[i64],
) -> Result<HashMap<i64, Vec<User>>> {
    let mut by_task: HashMap<i64, Vec<User>> = HashMap::new();
    if task_ids.is_empty() {
        return Ok(by_task);
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT ta.task_id, {} FROM task_assignees ta
         JOIN users u ON u.telegram_id = ta.user_id
         WHERE ta.task_id IN (",
        aliased_user_columns("u")
    ));
    let mut ids = qb.separated(", ");
    for id in task_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY ta.assigned_at, ta.id");

    for row in qb.build().fetch_all(conn).await? {
        let task_id: i64 = row.try_get("task_id")?;
        by_task.entry(task_id).or_default().push(row_to_user(&row, "u_")?);
    }
    Ok(by_task)
}

/// Tasks of a project in display order, without assignees
pub(crate) async fn fetch_project_tasks(
    conn: &mut SqliteConnection,
    project_id: i64,
) -> Result<Vec<Task>> {
    let rows = sqlx::query(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.project_id = ?{TASK_ORDER}"
    ))
    .bind(project_id)
    .fetch_all(conn)
    .await?;

    rows.iter().map(row_to_task).collect()
}

fn row_to_task(row: &SqliteRow) -> Result<Task> {
    let status: String = row.try_get("status")?;
    Ok(Task {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        deadline: row.try_get("deadline")?,
        status: status.parse()?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}
