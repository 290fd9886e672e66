//! Sessions command - list stored session records.

use crate::ui;
use anyhow::Result;
use openclaw_core::{AgentId, SessionStore};
use std::path::PathBuf;

/// Sessions command arguments.
#[derive(Debug, Clone, Default)]
pub struct SessionsArgs {
    /// Config file override.
    pub config_path: Option<PathBuf>,
    /// Agent owning the store.
    pub agent: String,
    /// Session store override.
    pub store: Option<PathBuf>,
}

/// Run the sessions command.
pub fn run_sessions(args: &SessionsArgs) -> Result<()> {
    let config = super::load_config(args.config_path.as_deref())?;
    let path = super::store_path(&config, &AgentId::new(&args.agent), args.store.as_deref());
    let store = SessionStore::new(path);
    let map = store.load()?;

    ui::header(&format!("Sessions ({})", store.path().display()));
    if map.is_empty() {
        ui::info("No sessions recorded");
        return Ok(());
    }

    ui::table_row(&[("KEY", 32), ("CHANNEL", 12), ("TO", 28), ("ACCOUNT", 12)]);
    for key in map.keys() {
        let Some(record) = map.record(key) else {
            ui::warning(&format!("{key}: malformed record"));
            continue;
        };
        ui::table_row(&[
            (key, 32),
            (record.last_channel.as_deref().unwrap_or("-"), 12),
            (record.last_to.as_deref().unwrap_or("-"), 28),
            (record.last_account_id.as_deref().unwrap_or("-"), 12),
        ]);
    }

    Ok(())
}
