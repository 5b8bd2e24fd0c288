//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_FILE: &str = "config.yaml";

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // User dir: TASKLINK_USER_DIR or ~/.tasklink
        let user_dir = std::env::var("TASKLINK_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".tasklink")));

        // Project dir: TASKLINK_PROJECT_DIR or $CWD/tasklink
        let project_dir = std::env::var("TASKLINK_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("tasklink")));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    /// Loaded configuration
    config: Config,
    /// Path to the highest-priority config file that was read (if any)
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        // Explicit config path overrides every file tier
        if let Ok(explicit_path) = std::env::var("TASKLINK_CONFIG_PATH") {
            let path = PathBuf::from(&explicit_path);
            let mut config = Config::load(&path)
                .with_context(|| format!("failed to load config file {}", path.display()))?;
            Self::apply_env_overrides(&mut config);
            return Ok(Self {
                paths,
                config,
                config_path: Some(path),
            });
        }

        let mut configs: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut config_path = None;

        for dir in [paths.project_dir.as_deref(), paths.user_dir.as_deref()]
            .into_iter()
            .flatten()
        {
            let file = dir.join(CONFIG_FILE);
            if let Some(value) = read_yaml(&file) {
                debug!(path = %file.display(), "Loaded config tier");
                configs.push(value);
                config_path = Some(file);
            }
        }

        let merged = deep_merge_all(configs);
        let mut config: Config = serde_json::from_value(merged)?;

        Self::apply_env_overrides(&mut config);

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config) {
        if let Ok(db_path) = std::env::var("TASKLINK_DB_PATH") {
            config.server.db_path = PathBuf::from(db_path);
        }

        if let Ok(host) = std::env::var("TASKLINK_HOST") {
            match host.parse() {
                Ok(host) => config.server.host = host,
                Err(_) => warn!(value = %host, "Ignoring invalid TASKLINK_HOST"),
            }
        }

        if let Ok(port) = std::env::var("TASKLINK_PORT") {
            match port.parse() {
                Ok(port) => config.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid TASKLINK_PORT"),
            }
        }

        if let Ok(depth) = std::env::var("TASKLINK_MAX_TREE_DEPTH") {
            match depth.parse() {
                Ok(depth) => config.graph.max_tree_depth = depth,
                Err(_) => warn!(value = %depth, "Ignoring invalid TASKLINK_MAX_TREE_DEPTH"),
            }
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Get the config file path that was used.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

/// Read a YAML file as a JSON value. Unreadable or malformed files are skipped.
fn read_yaml(path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read config file");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_defaults_only() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(
            Some(temp.path().join("project")),
            Some(temp.path().join("user")),
        );

        let loader = ConfigLoader::load_with_paths(paths).unwrap();

        assert_eq!(loader.config().graph.max_tree_depth, 64);
        assert!(loader.config_path().is_none());
    }

    #[test]
    fn project_config_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("tasklink");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(
            project_dir.join("config.yaml"),
            "graph:\n  max_tree_depth: 12\n",
        )
        .unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), Some(temp.path().join("user")));
        let loader = ConfigLoader::load_with_paths(paths).unwrap();

        assert_eq!(loader.config().graph.max_tree_depth, 12);
        assert_eq!(loader.config().server.port, 31995);
    }

    #[test]
    fn user_config_overrides_project() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("tasklink");
        let user_dir = temp.path().join("user");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::create_dir_all(&user_dir).unwrap();

        std::fs::write(
            project_dir.join("config.yaml"),
            "server:\n  port: 9000\nmetadata:\n  task_priorities: [P0, P1]\n",
        )
        .unwrap();
        std::fs::write(user_dir.join("config.yaml"), "server:\n  port: 9100\n").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), Some(user_dir.clone()));
        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        let config = loader.config();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.metadata.task_priorities, vec!["P0", "P1"]);
        assert_eq!(loader.config_path(), Some(user_dir.join("config.yaml").as_path()));
    }

    #[test]
    fn malformed_tier_is_skipped() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("tasklink");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("config.yaml"), "server: [unclosed").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), None);
        let loader = ConfigLoader::load_with_paths(paths).unwrap();

        assert_eq!(loader.config().server.port, 31995);
    }
}
