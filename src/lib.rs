//! tasklink: a multi-user task tracker built around a task relationship graph.
//!
//! Tasks link to each other through typed, directed edges. `Subtask` edges
//! form a parent/child hierarchy that [`graph::TreeBuilder`] expands into
//! nested trees without looping on cycles.

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod logging;
pub mod types;
