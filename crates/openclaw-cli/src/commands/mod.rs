//! CLI command implementations.

pub mod auto_enable;
pub mod record;
pub mod resolve;
pub mod sessions;
pub mod validate;

pub use auto_enable::run_auto_enable;
pub use record::run_record;
pub use resolve::run_resolve;
pub use sessions::run_sessions;
pub use validate::run_validate;

use anyhow::{Context, Result};
use openclaw_core::{AgentId, Config};
use std::path::{Path, PathBuf};

/// Config file path, falling back to the default location.
pub fn config_path(path: Option<&Path>) -> PathBuf {
    path.map_or_else(Config::default_path, Path::to_path_buf)
}

/// Load the config, treating a missing file as an empty config.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = config_path(path);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(Config::default());
    }
    Config::load(&path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Session store path for an agent, honouring a command-line override.
pub fn store_path(config: &Config, agent: &AgentId, store: Option<&Path>) -> PathBuf {
    store.map_or_else(|| config.session_store_path(agent), Path::to_path_buf)
}
