//! Validate command - check the configuration file.

use crate::ui;
use anyhow::{Context, Result};
use openclaw_core::Config;
use std::path::Path;

/// Run the validate command.
pub fn run_validate(config_path: Option<&Path>) -> Result<()> {
    let path = super::config_path(config_path);
    if !path.exists() {
        ui::error(&format!("Config file not found: {}", path.display()));
        anyhow::bail!("no configuration to validate");
    }

    let content = std::fs::read_to_string(&path)?;
    let value: serde_json::Value =
        json5::from_str(&content).with_context(|| format!("Invalid JSON5 in {}", path.display()))?;

    let (config, diagnostics) = Config::from_value_lenient(&value);
    for diagnostic in &diagnostics {
        ui::warning(diagnostic);
    }

    match config.validate() {
        Ok(()) if diagnostics.is_empty() => {
            ui::success("Configuration is valid");
            Ok(())
        }
        Ok(()) => {
            ui::warning(&format!("{} section(s) will be ignored", diagnostics.len()));
            Ok(())
        }
        Err(e) => {
            ui::error(&e.to_string());
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("openclaw.json");
        std::fs::write(
            &path,
            r#"{ bindings: [{ agentId: "ops", match: { channel: "slack", accountId: "w1" } }] }"#,
        )
        .unwrap();
        assert!(run_validate(Some(&path)).is_ok());
    }

    #[test]
    fn test_missing_config() {
        let temp = tempfile::tempdir().unwrap();
        assert!(run_validate(Some(&temp.path().join("nope.json"))).is_err());
    }
}
