//! tasklink
//!
//! HTTP API for a multi-user task tracker whose tasks link into a
//! relationship graph.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tasklink::api::{self, AppState};
use tasklink::cli::{Cli, Command};
use tasklink::config::{Config, ConfigLoader};
use tasklink::db::Database;
use tasklink::graph::RelationshipGraph;
use tasklink::logging;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log, cli.verbose)?;

    // SAFETY: This is safe at program startup before any other threads are spawned
    if let Some(config_path) = &cli.config {
        unsafe {
            std::env::set_var("TASKLINK_CONFIG_PATH", config_path);
        }
    }
    let mut loader = ConfigLoader::load()?;
    if let Some(path) = loader.config_path() {
        debug!(path = %path.display(), "Using config file");
    }

    let config = loader.config_mut();
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(host) = &cli.host {
        config.server.host = host
            .parse()
            .with_context(|| format!("invalid --host value: {}", host))?;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let config = loader.into_config();

    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path)?;

    match cli.command {
        Some(Command::Tree {
            task_id,
            descendants,
            ancestors,
        }) => {
            let graph = RelationshipGraph::new(&db).with_max_depth(config.graph.max_tree_depth);
            let tree = if descendants {
                graph.descendant_tree(task_id)?
            } else if ancestors {
                graph.ancestor_chain(task_id)?
            } else {
                graph.task_tree(task_id)?
            };
            print_json(&tree)?;
        }
        Some(Command::Links { task_id }) => {
            let graph = RelationshipGraph::new(&db);
            print_json(&graph.list_edges(task_id)?)?;
        }
        Some(Command::Serve) | None => {
            run_server(db, config).await?;
        }
    }

    Ok(())
}

async fn run_server(db: Database, config: Config) -> Result<()> {
    let addr = config.server.listen_addr();
    info!(
        db = %config.server.db_path.display(),
        max_tree_depth = config.graph.max_tree_depth,
        "Starting tasklink"
    );
    let state = AppState::new(Arc::new(db), Arc::new(config));
    api::serve(state, addr).await
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
