//! User records.
//!
//! Credential checks and token issuing live outside this crate; users here
//! carry an opaque password hash and a role.

use super::{Database, is_foreign_key_violation, is_unique_violation, now_ms};
use crate::error::ApiError;
use crate::types::{NewUser, Role, User, UserId, UserUpdate};
use anyhow::Result;
use rusqlite::{Connection, Row, params};
use tracing::info;

fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get("role")?;
    Ok(User {
        user_id: row.get("user_id")?,
        username: row.get("username")?,
        password_hash: row.get("password_hash")?,
        email: row.get("email")?,
        real_name: row.get("real_name")?,
        role: role.parse().unwrap_or_default(),
        is_first_user: row.get("is_first_user")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn get_user_internal(conn: &Connection, user_id: UserId) -> Result<Option<User>> {
    let mut stmt = conn.prepare("SELECT * FROM users WHERE user_id = ?1")?;

    match stmt.query_row(params![user_id], parse_user_row) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Map a UNIQUE failure on the users table to the field that collided.
fn unique_conflict(err: &rusqlite::Error, username: &str, email: Option<&str>) -> ApiError {
    let message = match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message.as_str(),
        _ => "",
    };
    match email {
        Some(email) if message.contains("email") => ApiError::already_exists("email", email),
        _ => ApiError::already_exists("username", username),
    }
}

fn email_taken(conn: &Connection, email: &str, except: Option<UserId>) -> Result<bool> {
    let taken = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND (?2 IS NULL OR user_id <> ?2))",
        params![email, except],
        |row| row.get(0),
    )?;
    Ok(taken)
}

/// Trim and drop blank optional strings.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Database {
    /// Register a user.
    ///
    /// An empty store accepts anyone and the account becomes the protected
    /// administrator, whatever role was requested. Afterwards `acting` must be
    /// an administrator. Both are decided in the transaction that inserts.
    pub fn create_user(&self, acting: Option<&User>, input: NewUser) -> Result<User> {
        if input.username.trim().is_empty() {
            return Err(ApiError::missing_field("username").into());
        }
        if input.password_hash.is_empty() {
            return Err(ApiError::missing_field("password_hash").into());
        }
        let email = non_blank(input.email);
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing: i64 = tx.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            let is_first_user = existing == 0;
            if !is_first_user {
                match acting {
                    None => return Err(ApiError::unauthenticated().into()),
                    Some(user) if !user.is_admin() => {
                        return Err(ApiError::forbidden("Administrator role required").into());
                    }
                    Some(_) => {}
                }
            }
            let role = if is_first_user {
                Role::Admin
            } else {
                input.role.unwrap_or_default()
            };

            let username_taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                params![input.username],
                |row| row.get(0),
            )?;
            if username_taken {
                return Err(ApiError::already_exists("username", &input.username).into());
            }

            if let Some(ref email) = email {
                if email_taken(&tx, email, None)? {
                    return Err(ApiError::already_exists("email", email).into());
                }
            }

            let inserted = tx.execute(
                "INSERT INTO users (username, password_hash, email, real_name, role, is_first_user, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    input.username,
                    input.password_hash,
                    email,
                    input.real_name,
                    role.as_str(),
                    is_first_user,
                    now,
                ],
            );
            match inserted {
                Ok(_) => {}
                // Another process registered the same name or email
                Err(e) if is_unique_violation(&e) => {
                    return Err(unique_conflict(&e, &input.username, email.as_deref()).into());
                }
                Err(e) => return Err(e.into()),
            }

            let user_id = tx.last_insert_rowid();
            let user = get_user_internal(&tx, user_id)?
                .ok_or_else(|| ApiError::user_not_found(user_id))?;
            tx.commit()?;

            info!(user_id, username = %user.username, role = %user.role, "User registered");
            Ok(user)
        })
    }

    /// Get a user by id.
    pub fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_internal(conn, user_id))
    }

    /// List all users by id.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM users ORDER BY user_id")?;
            let users = stmt
                .query_map([], parse_user_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
    }

    /// Number of registered users.
    pub fn user_count(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count)
        })
    }

    /// Apply a partial update on behalf of `acting`.
    ///
    /// Users may edit themselves; administrators may edit anyone. Only
    /// administrators may change a role.
    pub fn update_user(&self, acting: &User, user_id: UserId, update: UserUpdate) -> Result<User> {
        if !acting.is_admin() && acting.user_id != user_id {
            return Err(ApiError::forbidden("Users may only update their own account").into());
        }
        let email = non_blank(update.email);
        let real_name = non_blank(update.real_name);
        let password_hash = update.password_hash.filter(|h| !h.is_empty());
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let user =
                get_user_internal(&tx, user_id)?.ok_or_else(|| ApiError::user_not_found(user_id))?;

            let role = match update.role {
                Some(role) if role != user.role => {
                    if !acting.is_admin() {
                        return Err(
                            ApiError::forbidden("Only administrators can change user roles").into(),
                        );
                    }
                    role
                }
                _ => user.role,
            };

            if let Some(ref email) = email {
                if email_taken(&tx, email, Some(user_id))? {
                    return Err(ApiError::already_exists("email", email).into());
                }
            }

            let updated = tx.execute(
                "UPDATE users SET email = ?1, real_name = ?2, password_hash = ?3, role = ?4, updated_at = ?5
                 WHERE user_id = ?6",
                params![
                    email.as_ref().or(user.email.as_ref()),
                    real_name.or(user.real_name),
                    password_hash.unwrap_or(user.password_hash),
                    role.as_str(),
                    now,
                    user_id,
                ],
            );
            match updated {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    return Err(unique_conflict(&e, &user.username, email.as_deref()).into());
                }
                Err(e) => return Err(e.into()),
            }

            let user =
                get_user_internal(&tx, user_id)?.ok_or_else(|| ApiError::user_not_found(user_id))?;
            tx.commit()?;

            info!(user_id, acting_user_id = acting.user_id, "User updated");
            Ok(user)
        })
    }

    /// Delete a user. The first account is protected, and users who still
    /// own tasks cannot be removed.
    pub fn delete_user(&self, user_id: UserId) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let user =
                get_user_internal(&tx, user_id)?.ok_or_else(|| ApiError::user_not_found(user_id))?;

            if user.is_first_user {
                return Err(ApiError::invalid_state(
                    "Cannot delete the initial administrator account",
                )
                .into());
            }

            let owns_tasks: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM tasks WHERE creator_id = ?1)",
                params![user_id],
                |row| row.get(0),
            )?;
            if owns_tasks {
                return Err(owned_tasks_error().into());
            }

            match tx.execute("DELETE FROM users WHERE user_id = ?1", params![user_id]) {
                Ok(_) => {}
                // A task was created for this user by another process
                Err(e) if is_foreign_key_violation(&e) => {
                    return Err(owned_tasks_error().with_details(e.to_string()).into());
                }
                Err(e) => return Err(e.into()),
            }
            tx.commit()?;

            info!(user_id, "User deleted");
            Ok(())
        })
    }
}

fn owned_tasks_error() -> ApiError {
    ApiError::invalid_state("Could not delete user; their tasks must be reassigned or deleted first")
        .with_details("user is the creator of one or more tasks")
}
