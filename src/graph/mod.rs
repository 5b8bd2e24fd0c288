//! Relationship graph engine.
//!
//! Maintains directed, typed edges between tasks. `"Subtask"` edges carry
//! parent/child semantics and feed the tree builder in [`tree`]; every other
//! type is a positional "related" tag.
//!
//! Nothing is cached between calls: each operation re-reads the edge set
//! through an [`EntityStore`].

pub mod tree;

use crate::types::{
    LinkedTask, MISSING_TITLE, Relationship, RelationshipId, RelationshipView, SUBTASK,
    TaskDetail, TaskId, TaskTree,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

pub use tree::{DEFAULT_MAX_DEPTH, Direction, TreeBuilder};

/// Persistence operations the graph engine relies on.
///
/// Every call is expected to be atomic on its own; the engine issues no
/// multi-statement transactions of its own.
pub trait EntityStore {
    /// Load a task with its creator and assignees.
    fn get_task(&self, task_id: TaskId) -> anyhow::Result<Option<TaskDetail>>;

    /// Titles for the given task ids. Missing tasks are absent from the map.
    fn task_titles(&self, task_ids: &[TaskId]) -> anyhow::Result<HashMap<TaskId, String>>;

    /// Insert an edge. A uniqueness violation surfaces as [`GraphError::Duplicate`].
    fn create_relationship(
        &self,
        parent_task_id: TaskId,
        child_task_id: TaskId,
        relationship_type: &str,
    ) -> anyhow::Result<Relationship>;

    /// Find an edge that would duplicate the given one: any `"Subtask"` edge on
    /// the unordered pair when the type is `"Subtask"`, or an identical edge.
    fn find_conflicting_relationship(
        &self,
        parent_task_id: TaskId,
        child_task_id: TaskId,
        relationship_type: &str,
    ) -> anyhow::Result<Option<Relationship>>;

    /// Edges where the task is either endpoint.
    fn list_relationships_for_task(&self, task_id: TaskId) -> anyhow::Result<Vec<Relationship>>;

    fn get_relationship(
        &self,
        relationship_id: RelationshipId,
    ) -> anyhow::Result<Option<Relationship>>;

    /// Returns false when no such edge existed.
    fn delete_relationship(&self, relationship_id: RelationshipId) -> anyhow::Result<bool>;

    /// Edges of the given type where the task is the parent, with each child loaded.
    fn list_child_relationships(
        &self,
        parent_task_id: TaskId,
        relationship_type: &str,
    ) -> anyhow::Result<Vec<LinkedTask>>;

    /// Edges of the given type where the task is the child, with each parent loaded.
    fn list_parent_relationships(
        &self,
        child_task_id: TaskId,
        relationship_type: &str,
    ) -> anyhow::Result<Vec<LinkedTask>>;
}

/// Errors raised by graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Cannot relate task {0} to itself")]
    SelfReference(TaskId),

    #[error("Relationship type must not be empty")]
    InvalidType,

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(RelationshipId),

    #[error("Relationship {relationship_id} does not involve task {task_id}")]
    NotAnEndpoint {
        task_id: TaskId,
        relationship_id: RelationshipId,
    },

    #[error("Relationship already exists between tasks {parent_task_id} and {child_task_id}")]
    Duplicate {
        parent_task_id: TaskId,
        child_task_id: TaskId,
    },

    #[error(transparent)]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for GraphError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<GraphError>() {
            Ok(graph_err) => graph_err,
            Err(err) => GraphError::Store(err),
        }
    }
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// A requested edge after resolving the `"parent"` / `"child"` shorthands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEdge {
    pub parent_task_id: TaskId,
    pub child_task_id: TaskId,
    pub relationship_type: String,
}

/// Resolve a request made from `task_id`'s point of view.
///
/// `"parent"` makes `related_task_id` the parent of `task_id`, `"child"` makes
/// it the child; both are stored as `"Subtask"`. Any other tag is kept verbatim
/// with `task_id` in the parent slot.
pub fn resolve_edge(task_id: TaskId, related_task_id: TaskId, requested: &str) -> ResolvedEdge {
    let requested = requested.trim();
    if requested.eq_ignore_ascii_case("parent") {
        ResolvedEdge {
            parent_task_id: related_task_id,
            child_task_id: task_id,
            relationship_type: SUBTASK.to_string(),
        }
    } else if requested.eq_ignore_ascii_case("child") {
        ResolvedEdge {
            parent_task_id: task_id,
            child_task_id: related_task_id,
            relationship_type: SUBTASK.to_string(),
        }
    } else {
        ResolvedEdge {
            parent_task_id: task_id,
            child_task_id: related_task_id,
            relationship_type: requested.to_string(),
        }
    }
}

/// Graph operations over an [`EntityStore`].
pub struct RelationshipGraph<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    max_depth: usize,
}

impl<'a, S: EntityStore + ?Sized> RelationshipGraph<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how deep tree views are expanded.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Link `task_id` to `related_task_id`.
    pub fn create_edge(
        &self,
        task_id: TaskId,
        related_task_id: TaskId,
        requested_type: &str,
    ) -> GraphResult<RelationshipView> {
        if task_id == related_task_id {
            return Err(GraphError::SelfReference(task_id));
        }
        if requested_type.trim().is_empty() {
            return Err(GraphError::InvalidType);
        }

        for id in [task_id, related_task_id] {
            if self.store.get_task(id)?.is_none() {
                return Err(GraphError::TaskNotFound(id));
            }
        }

        let edge = resolve_edge(task_id, related_task_id, requested_type);

        if let Some(existing) = self.store.find_conflicting_relationship(
            edge.parent_task_id,
            edge.child_task_id,
            &edge.relationship_type,
        )? {
            debug!(
                relationship_id = existing.relationship_id,
                "Rejecting duplicate relationship"
            );
            return Err(GraphError::Duplicate {
                parent_task_id: edge.parent_task_id,
                child_task_id: edge.child_task_id,
            });
        }

        let relationship = self.store.create_relationship(
            edge.parent_task_id,
            edge.child_task_id,
            &edge.relationship_type,
        )?;

        info!(
            relationship_id = relationship.relationship_id,
            parent = relationship.parent_task_id,
            child = relationship.child_task_id,
            kind = %relationship.relationship_type,
            "Relationship created"
        );

        Ok(self.annotate(vec![relationship])?.remove(0))
    }

    /// Every edge touching `task_id`, with endpoint titles.
    pub fn list_edges(&self, task_id: TaskId) -> GraphResult<Vec<RelationshipView>> {
        if self.store.get_task(task_id)?.is_none() {
            return Err(GraphError::TaskNotFound(task_id));
        }
        let relationships = self.store.list_relationships_for_task(task_id)?;
        self.annotate(relationships)
    }

    /// A single edge, addressed through one of its endpoints.
    pub fn get_edge(
        &self,
        task_id: TaskId,
        relationship_id: RelationshipId,
    ) -> GraphResult<RelationshipView> {
        let relationship = self
            .store
            .get_relationship(relationship_id)?
            .filter(|r| r.involves(task_id))
            .ok_or(GraphError::RelationshipNotFound(relationship_id))?;
        Ok(self.annotate(vec![relationship])?.remove(0))
    }

    /// Delete an edge, addressed through one of its endpoints.
    pub fn delete_edge(&self, task_id: TaskId, relationship_id: RelationshipId) -> GraphResult<()> {
        let relationship = self
            .store
            .get_relationship(relationship_id)?
            .ok_or(GraphError::RelationshipNotFound(relationship_id))?;

        if !relationship.involves(task_id) {
            return Err(GraphError::NotAnEndpoint {
                task_id,
                relationship_id,
            });
        }

        // Lost a race with another delete.
        if !self.store.delete_relationship(relationship_id)? {
            return Err(GraphError::RelationshipNotFound(relationship_id));
        }

        info!(relationship_id, task_id, "Relationship deleted");
        Ok(())
    }

    fn tree_builder(&self) -> TreeBuilder<'a, S> {
        TreeBuilder::new(self.store).with_max_depth(self.max_depth)
    }

    /// Descendants of `task_id` along subtask edges.
    pub fn descendant_tree(&self, task_id: TaskId) -> GraphResult<TaskTree> {
        self.tree_builder().descendants(task_id)
    }

    /// Ancestors of `task_id` along subtask edges.
    pub fn ancestor_chain(&self, task_id: TaskId) -> GraphResult<TaskTree> {
        self.tree_builder().ancestors(task_id)
    }

    /// The tree view: descendants under `children`, ancestors under `parents`.
    pub fn task_tree(&self, task_id: TaskId) -> GraphResult<TaskTree> {
        self.tree_builder().both(task_id)
    }

    fn annotate(&self, relationships: Vec<Relationship>) -> GraphResult<Vec<RelationshipView>> {
        let mut ids: Vec<TaskId> = relationships
            .iter()
            .flat_map(|r| [r.parent_task_id, r.child_task_id])
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let titles = self.store.task_titles(&ids)?;
        let title = |id: TaskId| {
            titles
                .get(&id)
                .cloned()
                .unwrap_or_else(|| MISSING_TITLE.to_string())
        };

        Ok(relationships
            .into_iter()
            .map(|r| RelationshipView {
                relationship_id: r.relationship_id,
                parent_task_title: title(r.parent_task_id),
                parent_task_id: r.parent_task_id,
                child_task_title: title(r.child_task_id),
                child_task_id: r.child_task_id,
                relationship_type: r.relationship_type,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_tag_makes_related_task_the_parent() {
        let edge = resolve_edge(1, 2, "parent");
        assert_eq!(edge.parent_task_id, 2);
        assert_eq!(edge.child_task_id, 1);
        assert_eq!(edge.relationship_type, SUBTASK);
    }

    #[test]
    fn child_tag_is_case_insensitive() {
        let edge = resolve_edge(1, 2, "Child");
        assert_eq!(edge.parent_task_id, 1);
        assert_eq!(edge.child_task_id, 2);
        assert_eq!(edge.relationship_type, SUBTASK);
    }

    #[test]
    fn other_tags_are_positional() {
        let edge = resolve_edge(5, 3, "Related");
        assert_eq!(edge.parent_task_id, 5);
        assert_eq!(edge.child_task_id, 3);
        assert_eq!(edge.relationship_type, "Related");
    }

    #[test]
    fn graph_error_survives_anyhow_round_trip() {
        let err: anyhow::Error = GraphError::Duplicate {
            parent_task_id: 1,
            child_task_id: 2,
        }
        .into();
        assert!(matches!(
            GraphError::from(err),
            GraphError::Duplicate {
                parent_task_id: 1,
                child_task_id: 2
            }
        ));
    }

    #[test]
    fn foreign_anyhow_errors_become_store_errors() {
        let err = anyhow::anyhow!("disk I/O error");
        assert!(matches!(GraphError::from(err), GraphError::Store(_)));
    }
}
