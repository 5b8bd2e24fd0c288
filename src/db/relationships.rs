//! Relationship edge storage.

use super::tasks::get_task_detail_internal;
use super::{Database, is_unique_violation};
use crate::graph::{EntityStore, GraphError};
use crate::types::{LinkedTask, Relationship, RelationshipId, TaskDetail, TaskId};
use anyhow::Result;
use rusqlite::{Connection, Row, params, params_from_iter};
use std::collections::HashMap;

fn parse_relationship_row(row: &Row) -> rusqlite::Result<Relationship> {
    Ok(Relationship {
        relationship_id: row.get("relationship_id")?,
        parent_task_id: row.get("parent_task_id")?,
        child_task_id: row.get("child_task_id")?,
        relationship_type: row.get("relationship_type")?,
    })
}

fn get_relationship_internal(
    conn: &Connection,
    relationship_id: RelationshipId,
) -> Result<Option<Relationship>> {
    let mut stmt = conn.prepare("SELECT * FROM task_relationships WHERE relationship_id = ?1")?;

    match stmt.query_row(params![relationship_id], parse_relationship_row) {
        Ok(rel) => Ok(Some(rel)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Load edges matching `sql` and the task at `far_end` of each.
fn load_linked(
    conn: &Connection,
    sql: &str,
    task_id: TaskId,
    relationship_type: &str,
    far_end: fn(&Relationship) -> TaskId,
) -> Result<Vec<LinkedTask>> {
    let mut stmt = conn.prepare(sql)?;
    let relationships = stmt
        .query_map(params![task_id, relationship_type], parse_relationship_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    relationships
        .into_iter()
        .map(|relationship| {
            let task = get_task_detail_internal(conn, far_end(&relationship))?;
            Ok(LinkedTask { relationship, task })
        })
        .collect()
}

impl EntityStore for Database {
    fn get_task(&self, task_id: TaskId) -> Result<Option<TaskDetail>> {
        self.get_task_detail(task_id)
    }

    fn task_titles(&self, task_ids: &[TaskId]) -> Result<HashMap<TaskId, String>> {
        if task_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.with_conn(|conn| {
            let placeholders = vec!["?"; task_ids.len()].join(", ");
            let sql = format!(
                "SELECT task_id, title FROM tasks WHERE task_id IN ({})",
                placeholders
            );
            let mut stmt = conn.prepare(&sql)?;
            let titles = stmt
                .query_map(params_from_iter(task_ids.iter()), |row| {
                    Ok((row.get::<_, TaskId>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<rusqlite::Result<HashMap<_, _>>>()?;
            Ok(titles)
        })
    }

    fn create_relationship(
        &self,
        parent_task_id: TaskId,
        child_task_id: TaskId,
        relationship_type: &str,
    ) -> Result<Relationship> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO task_relationships (parent_task_id, child_task_id, relationship_type)
                 VALUES (?1, ?2, ?3)",
                params![parent_task_id, child_task_id, relationship_type],
            );

            match inserted {
                Ok(_) => Ok(Relationship {
                    relationship_id: conn.last_insert_rowid(),
                    parent_task_id,
                    child_task_id,
                    relationship_type: relationship_type.to_string(),
                }),
                // A concurrent writer got there first
                Err(e) if is_unique_violation(&e) => Err(GraphError::Duplicate {
                    parent_task_id,
                    child_task_id,
                }
                .into()),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn find_conflicting_relationship(
        &self,
        parent_task_id: TaskId,
        child_task_id: TaskId,
        relationship_type: &str,
    ) -> Result<Option<Relationship>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM task_relationships
                 WHERE (parent_task_id = ?1 AND child_task_id = ?2 AND relationship_type = ?3)
                 OR (?3 = 'Subtask' AND relationship_type = 'Subtask'
                     AND ((parent_task_id = ?1 AND child_task_id = ?2)
                          OR (parent_task_id = ?2 AND child_task_id = ?1)))
                 ORDER BY relationship_id
                 LIMIT 1",
            )?;

            match stmt.query_row(
                params![parent_task_id, child_task_id, relationship_type],
                parse_relationship_row,
            ) {
                Ok(rel) => Ok(Some(rel)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn list_relationships_for_task(&self, task_id: TaskId) -> Result<Vec<Relationship>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM task_relationships
                 WHERE parent_task_id = ?1 OR child_task_id = ?1
                 ORDER BY relationship_id",
            )?;
            let relationships = stmt
                .query_map(params![task_id], parse_relationship_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(relationships)
        })
    }

    fn get_relationship(&self, relationship_id: RelationshipId) -> Result<Option<Relationship>> {
        self.with_conn(|conn| get_relationship_internal(conn, relationship_id))
    }

    fn delete_relationship(&self, relationship_id: RelationshipId) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM task_relationships WHERE relationship_id = ?1",
                params![relationship_id],
            )?;
            Ok(deleted > 0)
        })
    }

    fn list_child_relationships(
        &self,
        parent_task_id: TaskId,
        relationship_type: &str,
    ) -> Result<Vec<LinkedTask>> {
        self.with_conn(|conn| {
            load_linked(
                conn,
                "SELECT * FROM task_relationships
                 WHERE parent_task_id = ?1 AND relationship_type = ?2
                 ORDER BY relationship_id",
                parent_task_id,
                relationship_type,
                |r| r.child_task_id,
            )
        })
    }

    fn list_parent_relationships(
        &self,
        child_task_id: TaskId,
        relationship_type: &str,
    ) -> Result<Vec<LinkedTask>> {
        self.with_conn(|conn| {
            load_linked(
                conn,
                "SELECT * FROM task_relationships
                 WHERE child_task_id = ?1 AND relationship_type = ?2
                 ORDER BY relationship_id",
                child_task_id,
                relationship_type,
                |r| r.parent_task_id,
            )
        })
    }
}
