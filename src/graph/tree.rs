//! Cycle-safe tree reconstruction over subtask edges.
//!
//! Traversal is iterative: nodes are appended to an arena as they are
//! discovered and an explicit stack drives expansion, so deep graphs never
//! recurse. Each arena slot remembers the slot it was reached from, which makes
//! the root-to-node path available for the cycle check without cloning a
//! visited set per branch. A task may therefore appear under several branches
//! (diamonds) while a single path never revisits itself.

use super::{EntityStore, GraphError, GraphResult};
use crate::types::{LinkedTask, SUBTASK, TaskDetail, TaskId, TaskTree};
use tracing::{debug, warn};

/// Default expansion limit for tree views.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Which way along subtask edges to expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow edges where the node is the parent.
    Descendants,
    /// Follow edges where the node is the child.
    Ancestors,
}

/// A discovered node. `from` is `None` for nodes linked directly to the root.
struct Slot {
    task: TaskDetail,
    from: Option<usize>,
    links: Vec<usize>,
}

/// Nodes discovered from one root, in discovery order.
struct Expansion {
    root: TaskDetail,
    root_links: Vec<usize>,
    slots: Vec<Slot>,
}

impl Expansion {
    fn new(root: TaskDetail) -> Self {
        Self {
            root,
            root_links: Vec::new(),
            slots: Vec::new(),
        }
    }

    /// True when `task_id` is on the path from the root to `at` (inclusive).
    fn on_path(&self, at: Option<usize>, task_id: TaskId) -> bool {
        let mut cursor = at;
        while let Some(index) = cursor {
            let slot = &self.slots[index];
            if slot.task.task_id() == task_id {
                return true;
            }
            cursor = slot.from;
        }
        self.root.task_id() == task_id
    }

    fn attach(&mut self, from: Option<usize>, task: TaskDetail) -> usize {
        let index = self.slots.len();
        self.slots.push(Slot {
            task,
            from,
            links: Vec::new(),
        });
        match from {
            Some(parent) => self.slots[parent].links.push(index),
            None => self.root_links.push(index),
        }
        index
    }

    /// Fold the arena into nested trees. Slots only link to later slots, so
    /// walking backwards always finds a node's links already built.
    fn assemble(self, direction: Direction) -> TaskTree {
        let Expansion {
            root,
            root_links,
            mut slots,
        } = self;

        let mut built: Vec<Option<TaskTree>> = Vec::with_capacity(slots.len());
        built.resize_with(slots.len(), || None);

        while let Some(slot) = slots.pop() {
            let index = slots.len();
            let linked = take_linked(&mut built, &slot.links);
            built[index] = Some(shape(slot.task, linked, direction));
        }

        let linked = take_linked(&mut built, &root_links);
        shape(root, linked, direction)
    }
}

fn take_linked(built: &mut [Option<TaskTree>], links: &[usize]) -> Vec<TaskTree> {
    links.iter().filter_map(|&index| built[index].take()).collect()
}

fn shape(task: TaskDetail, linked: Vec<TaskTree>, direction: Direction) -> TaskTree {
    let mut node = TaskTree::leaf(task);
    match direction {
        Direction::Descendants => node.children = linked,
        Direction::Ancestors => node.parents = linked,
    }
    node
}

/// Builds tree views from an [`EntityStore`].
pub struct TreeBuilder<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    max_depth: usize,
}

impl<'a, S: EntityStore + ?Sized> TreeBuilder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Descendant tree rooted at `task_id`. Every node has empty `parents`.
    pub fn descendants(&self, task_id: TaskId) -> GraphResult<TaskTree> {
        let root = self.load_root(task_id)?;
        self.expand(root, Direction::Descendants)
    }

    /// Ancestor chain of `task_id`. Every node has empty `children`.
    pub fn ancestors(&self, task_id: TaskId) -> GraphResult<TaskTree> {
        let root = self.load_root(task_id)?;
        self.expand(root, Direction::Ancestors)
    }

    /// Root with descendants under `children` and ancestors under `parents`.
    /// The two directions are expanded independently.
    pub fn both(&self, task_id: TaskId) -> GraphResult<TaskTree> {
        let root = self.load_root(task_id)?;
        let descendants = self.expand(root.clone(), Direction::Descendants)?;
        let ancestors = self.expand(root, Direction::Ancestors)?;
        Ok(TaskTree {
            task: descendants.task,
            children: descendants.children,
            parents: ancestors.parents,
        })
    }

    fn load_root(&self, task_id: TaskId) -> GraphResult<TaskDetail> {
        self.store
            .get_task(task_id)?
            .ok_or(GraphError::TaskNotFound(task_id))
    }

    fn neighbours(&self, task_id: TaskId, direction: Direction) -> GraphResult<Vec<LinkedTask>> {
        let linked = match direction {
            Direction::Descendants => self.store.list_child_relationships(task_id, SUBTASK)?,
            Direction::Ancestors => self.store.list_parent_relationships(task_id, SUBTASK)?,
        };
        Ok(linked)
    }

    fn expand(&self, root: TaskDetail, direction: Direction) -> GraphResult<TaskTree> {
        let mut expansion = Expansion::new(root);
        // (slot, depth); `None` stands for the root.
        let mut stack: Vec<(Option<usize>, usize)> = vec![(None, 0)];

        while let Some((at, depth)) = stack.pop() {
            let task_id = match at {
                Some(index) => expansion.slots[index].task.task_id(),
                None => expansion.root.task_id(),
            };

            let neighbours = self.neighbours(task_id, direction)?;
            if depth >= self.max_depth {
                if !neighbours.is_empty() {
                    warn!(
                        task_id,
                        max_depth = self.max_depth,
                        ?direction,
                        "Tree depth limit reached; not expanding further"
                    );
                }
                continue;
            }

            for link in neighbours {
                let Some(task) = link.task else {
                    debug!(
                        relationship_id = link.relationship.relationship_id,
                        "Skipping relationship with a missing endpoint"
                    );
                    continue;
                };

                let next_id = task.task_id();
                if expansion.on_path(at, next_id) {
                    warn!(
                        task_id,
                        revisited = next_id,
                        relationship_id = link.relationship.relationship_id,
                        "Cycle in subtask relationships; pruning branch"
                    );
                    continue;
                }

                let index = expansion.attach(at, task);
                stack.push((Some(index), depth + 1));
            }
        }

        debug!(
            root = expansion.root.task_id(),
            nodes = expansion.slots.len(),
            ?direction,
            "Tree expanded"
        );
        Ok(expansion.assemble(direction))
    }
}
