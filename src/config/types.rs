//! Configuration types and structures.

use crate::graph::DEFAULT_MAX_DEPTH;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Default port for the HTTP API.
pub const DEFAULT_PORT: u16 = 31995;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl Config {
    /// Load configuration from a single YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the HTTP API binds to (default: 127.0.0.1).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port the HTTP API listens on (default: 31995).
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".tasklink/tasks.db")
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Relationship graph settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Deepest level a tree view expands to. Nodes at the limit are returned
    /// without their own links.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_tree_depth: default_max_tree_depth(),
        }
    }
}

fn default_max_tree_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

/// Lookup tables offered to clients. Tasks may still carry other values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_task_statuses")]
    pub task_statuses: Vec<String>,

    #[serde(default = "default_task_priorities")]
    pub task_priorities: Vec<String>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            task_statuses: default_task_statuses(),
            task_priorities: default_task_priorities(),
        }
    }
}

fn default_task_statuses() -> Vec<String> {
    ["ToDo", "InProgress", "Done", "Cancelled"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_task_priorities() -> Vec<String> {
    ["High", "Medium", "Low"]
        .into_iter()
        .map(String::from)
        .collect()
}
