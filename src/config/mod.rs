//! Layered configuration.
//!
//! Configuration is merged field-by-field from four tiers:
//! 1. **Defaults** - compiled in
//! 2. **Project** - `$CWD/tasklink/config.yaml`
//! 3. **User** - `~/.tasklink/config.yaml`
//! 4. **Environment** - variables below
//!
//! ## Environment Variables
//! - `TASKLINK_CONFIG_PATH` - Explicit config file (overrides all tiers)
//! - `TASKLINK_DB_PATH` - Database path
//! - `TASKLINK_HOST` - Listen address
//! - `TASKLINK_PORT` - Listen port
//! - `TASKLINK_MAX_TREE_DEPTH` - Tree expansion limit
//! - `TASKLINK_USER_DIR` - User config dir (default: `~/.tasklink`)
//! - `TASKLINK_PROJECT_DIR` - Project config dir (default: `./tasklink`)

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths};
pub use merge::deep_merge;
pub use types::*;
