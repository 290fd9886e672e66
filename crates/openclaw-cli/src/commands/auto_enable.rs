//! Auto-enable command - switch on configured channels and plugins.

use crate::ui;
use anyhow::{Context, Result};
use openclaw_core::{Config, Env};
use openclaw_plugins::apply_plugin_auto_enable;
use std::path::PathBuf;

/// Auto-enable command arguments.
#[derive(Debug, Clone, Default)]
pub struct AutoEnableArgs {
    /// Config file override.
    pub config_path: Option<PathBuf>,
    /// Save the resolved configuration.
    pub write: bool,
}

/// Run the auto-enable command.
pub fn run_auto_enable(args: &AutoEnableArgs) -> Result<()> {
    let path = super::config_path(args.config_path.as_deref());
    let (config, diagnostics) = if path.exists() {
        Config::load_with_diagnostics(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        (Config::default(), Vec::new())
    };
    for diagnostic in &diagnostics {
        ui::warning(diagnostic);
    }
    if args.write && !diagnostics.is_empty() {
        ui::error("Not saving: the ignored parts above would be erased from the file");
        anyhow::bail!(
            "{} has {} malformed part(s); fix them before using --write",
            path.display(),
            diagnostics.len()
        );
    }

    let result = apply_plugin_auto_enable(&config, &Env::from_process());

    ui::header("Channel & plugin auto-enable");
    for change in &result.changes {
        ui::success(change);
    }
    for skipped in &result.skipped {
        ui::warning(skipped);
    }

    if result.changes.is_empty() {
        ui::info("Nothing to enable");
        return Ok(());
    }

    if args.write {
        result
            .config
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        ui::success(&format!("Saved {}", path.display()));
    } else {
        ui::info("Run with --write to save these changes");
    }

    Ok(())
}
