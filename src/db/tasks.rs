//! Task CRUD and assignee management.

use super::{Database, now_ms};
use crate::error::ApiError;
use crate::types::{
    DEFAULT_STATUS, NewTask, Task, TaskDetail, TaskFilter, TaskId, TaskUpdate, UserId, UserSummary,
};
use anyhow::Result;
use rusqlite::{Connection, Row, params};

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        task_id: row.get("task_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        status: row.get("status")?,
        priority: row.get("priority")?,
        creator_id: row.get("creator_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        due_date: row.get("due_date")?,
        completed_at: row.get("completed_at")?,
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
pub(crate) fn get_task_internal(conn: &Connection, task_id: TaskId) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE task_id = ?1")?;

    let result = stmt.query_row(params![task_id], parse_task_row);

    match result {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Resolve creator and assignees for a task row.
pub(crate) fn load_task_detail(conn: &Connection, task: Task) -> Result<TaskDetail> {
    let creator = match conn.query_row(
        "SELECT user_id, username FROM users WHERE user_id = ?1",
        params![task.creator_id],
        |row| {
            Ok(UserSummary {
                user_id: row.get(0)?,
                username: row.get(1)?,
            })
        },
    ) {
        Ok(summary) => Some(summary),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.into()),
    };

    let mut stmt = conn.prepare(
        "SELECT u.user_id, u.username FROM task_assignees a
         INNER JOIN users u ON u.user_id = a.user_id
         WHERE a.task_id = ?1
         ORDER BY u.user_id",
    )?;
    let assignees = stmt
        .query_map(params![task.task_id], |row| {
            Ok(UserSummary {
                user_id: row.get(0)?,
                username: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(TaskDetail {
        task,
        creator,
        assignees,
    })
}

/// Internal helper to load a full task projection on an existing connection.
pub(crate) fn get_task_detail_internal(
    conn: &Connection,
    task_id: TaskId,
) -> Result<Option<TaskDetail>> {
    match get_task_internal(conn, task_id)? {
        Some(task) => Ok(Some(load_task_detail(conn, task)?)),
        None => Ok(None),
    }
}

/// Replace the assignee set of a task. Ids that match no user are skipped.
fn sync_assignees(conn: &Connection, task_id: TaskId, user_ids: &[UserId]) -> Result<()> {
    conn.execute(
        "DELETE FROM task_assignees WHERE task_id = ?1",
        params![task_id],
    )?;
    for user_id in user_ids {
        conn.execute(
            "INSERT OR IGNORE INTO task_assignees (task_id, user_id)
             SELECT ?1, user_id FROM users WHERE user_id = ?2",
            params![task_id, user_id],
        )?;
    }
    Ok(())
}

impl Database {
    /// Create a task owned by `creator_id`.
    pub fn create_task(&self, creator_id: UserId, input: NewTask) -> Result<TaskDetail> {
        if input.title.trim().is_empty() {
            return Err(ApiError::missing_field("title").into());
        }
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let creator_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ?1)",
                params![creator_id],
                |row| row.get(0),
            )?;
            if !creator_exists {
                return Err(ApiError::user_not_found(creator_id).into());
            }

            tx.execute(
                "INSERT INTO tasks (title, content, status, priority, creator_id, created_at, updated_at, due_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7)",
                params![
                    input.title,
                    input.content,
                    input.status.as_deref().unwrap_or(DEFAULT_STATUS),
                    input.priority,
                    creator_id,
                    now,
                    input.due_date,
                ],
            )?;
            let task_id = tx.last_insert_rowid();

            sync_assignees(&tx, task_id, &input.assignee_ids)?;

            let detail = get_task_detail_internal(&tx, task_id)?
                .ok_or_else(|| ApiError::task_not_found(task_id))?;
            tx.commit()?;
            Ok(detail)
        })
    }

    /// Get a task with its creator and assignees.
    pub fn get_task_detail(&self, task_id: TaskId) -> Result<Option<TaskDetail>> {
        self.with_conn(|conn| get_task_detail_internal(conn, task_id))
    }

    /// List tasks, newest first.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskDetail>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.* FROM tasks t
                 WHERE (?1 IS NULL OR t.status = ?1)
                 AND (?2 IS NULL OR t.creator_id = ?2)
                 AND (?3 IS NULL OR EXISTS (
                     SELECT 1 FROM task_assignees a
                     WHERE a.task_id = t.task_id AND a.user_id = ?3
                 ))
                 ORDER BY t.created_at DESC, t.task_id DESC",
            )?;

            let tasks = stmt
                .query_map(
                    params![filter.status, filter.creator_id, filter.assignee_id],
                    parse_task_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            tasks
                .into_iter()
                .map(|task| load_task_detail(conn, task))
                .collect()
        })
    }

    /// Apply a partial update.
    pub fn update_task(&self, task_id: TaskId, update: TaskUpdate) -> Result<TaskDetail> {
        if matches!(update.title.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err(ApiError::invalid_value("title", "title must not be empty").into());
        }
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let task = get_task_internal(&tx, task_id)?
                .ok_or_else(|| ApiError::task_not_found(task_id))?;

            tx.execute(
                "UPDATE tasks SET title = ?1, content = ?2, status = ?3, priority = ?4,
                 due_date = ?5, completed_at = ?6, updated_at = ?7
                 WHERE task_id = ?8",
                params![
                    update.title.unwrap_or(task.title),
                    update.content.or(task.content),
                    update.status.unwrap_or(task.status),
                    update.priority.or(task.priority),
                    update.due_date.or(task.due_date),
                    update.completed_at.or(task.completed_at),
                    now,
                    task_id,
                ],
            )?;

            if let Some(ref assignee_ids) = update.assignee_ids {
                sync_assignees(&tx, task_id, assignee_ids)?;
            }

            let detail = get_task_detail_internal(&tx, task_id)?
                .ok_or_else(|| ApiError::task_not_found(task_id))?;
            tx.commit()?;
            Ok(detail)
        })
    }

    /// Delete a task. Assignments and relationship edges go with it.
    /// Returns false when the task did not exist.
    pub fn delete_task(&self, task_id: TaskId) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM tasks WHERE task_id = ?1", params![task_id])?;
            Ok(deleted > 0)
        })
    }
}
