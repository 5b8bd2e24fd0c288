//! Core types for the task tracker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TaskId = i64;
pub type UserId = i64;
pub type RelationshipId = i64;

/// Relationship type that carries parent/child tree semantics.
pub const SUBTASK: &str = "Subtask";

/// Status given to tasks created without one.
pub const DEFAULT_STATUS: &str = "ToDo";

/// Title shown for an edge endpoint that no longer resolves to a task.
pub const MISSING_TITLE: &str = "N/A";

/// User role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    /// Opaque hash produced by the credential collaborator. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub email: Option<String>,
    pub real_name: Option<String>,
    pub role: Role,
    pub is_first_user: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Minimal user projection embedded in task views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: UserId,
    pub username: String,
}

/// Input for registering a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub real_name: Option<String>,
    /// Ignored for the first account, which is always an admin.
    pub role: Option<Role>,
}

/// Partial user update. Blank strings count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub real_name: Option<String>,
    pub password_hash: Option<String>,
    /// Only administrators may change roles.
    pub role: Option<Role>,
}

/// A task row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub title: String,
    pub content: Option<String>,
    pub status: String,
    pub priority: Option<String>,
    pub creator_id: UserId,
    pub created_at: i64,
    pub updated_at: i64,
    pub due_date: Option<i64>,
    pub completed_at: Option<i64>,
}

/// A task with its creator and assignees resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub creator: Option<UserSummary>,
    pub assignees: Vec<UserSummary>,
}

impl TaskDetail {
    pub fn task_id(&self) -> TaskId {
        self.task.task_id
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub content: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<i64>,
    #[serde(default)]
    pub assignee_ids: Vec<UserId>,
}

/// Partial task update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<i64>,
    pub completed_at: Option<i64>,
    /// Replaces the assignee set when present.
    pub assignee_ids: Option<Vec<UserId>>,
}

/// Filters for listing tasks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: Option<String>,
    pub assignee_id: Option<UserId>,
    pub creator_id: Option<UserId>,
}

/// A directed, typed edge between two tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub relationship_id: RelationshipId,
    pub parent_task_id: TaskId,
    pub child_task_id: TaskId,
    pub relationship_type: String,
}

impl Relationship {
    /// True when the task is either endpoint of this edge.
    pub fn involves(&self, task_id: TaskId) -> bool {
        self.parent_task_id == task_id || self.child_task_id == task_id
    }
}

/// Relationship annotated with endpoint titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipView {
    pub relationship_id: RelationshipId,
    pub parent_task_id: TaskId,
    pub parent_task_title: String,
    pub child_task_id: TaskId,
    pub child_task_title: String,
    pub relationship_type: String,
}

/// An edge together with the task at its far end, if that task still exists.
#[derive(Debug, Clone)]
pub struct LinkedTask {
    pub relationship: Relationship,
    pub task: Option<TaskDetail>,
}

/// A task with its subtask tree expanded in both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTree {
    #[serde(flatten)]
    pub task: TaskDetail,
    pub children: Vec<TaskTree>,
    pub parents: Vec<TaskTree>,
}

impl TaskTree {
    pub fn leaf(task: TaskDetail) -> Self {
        Self {
            task,
            children: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task.task_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn user_serialization_hides_password_hash() {
        let user = User {
            user_id: 1,
            username: "ada".to_string(),
            password_hash: "$2b$secret".to_string(),
            email: None,
            real_name: None,
            role: Role::Admin,
            is_first_user: true,
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"role\":\"Admin\""));
    }

    #[test]
    fn relationship_involves_either_endpoint() {
        let rel = Relationship {
            relationship_id: 7,
            parent_task_id: 1,
            child_task_id: 2,
            relationship_type: SUBTASK.to_string(),
        };
        assert!(rel.involves(1));
        assert!(rel.involves(2));
        assert!(!rel.involves(3));
    }
}
