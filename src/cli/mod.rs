//! CLI command definitions for tasklink.

use clap::{Parser, Subcommand};

/// Multi-user task tracker with a task relationship graph
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Address to bind the HTTP API to (overrides config)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port for the HTTP API (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API (default if no subcommand given)
    Serve,

    /// Print the subtask tree around a task as JSON
    Tree {
        /// Task to start from
        task_id: i64,

        /// Only expand children
        #[arg(long, conflicts_with = "ancestors")]
        descendants: bool,

        /// Only expand parents
        #[arg(long)]
        ancestors: bool,
    },

    /// Print every relationship touching a task as JSON
    Links {
        /// Task whose relationships to list
        task_id: i64,
    },
}
