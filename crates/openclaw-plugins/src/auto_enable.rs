//! Plugin and channel auto-enable.
//!
//! Channels and provider-auth plugins that are configured but carry no
//! explicit switch get switched on. Explicit user decisions always win:
//! anything already enabled, disabled or denied is left as it is.

use std::collections::BTreeSet;

use serde::Serialize;

use openclaw_core::{Config, Env, normalize_id};

use crate::catalog::{BUILT_IN_CHANNELS, PREFER_OVER, auth_plugin, built_in_channel, channel_label};

/// Result of an auto-enable pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoEnableResult {
    /// Configuration with auto-enabled integrations switched on.
    pub config: Config,
    /// One line per integration that was switched on.
    pub changes: Vec<String>,
    /// One line per configured integration deliberately left off.
    pub skipped: Vec<String>,
}

impl AutoEnableResult {
    fn unchanged(config: &Config) -> Self {
        Self {
            config: config.clone(),
            changes: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Why a configured integration is not switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hold {
    AlreadyEnabled,
    Disabled,
    Denied,
    Preferred(&'static str),
}

impl Hold {
    fn describe(self, label: &str) -> Option<String> {
        let reason = match self {
            Self::AlreadyEnabled => return None,
            Self::Disabled => "explicitly disabled".to_string(),
            Self::Denied => "denied by plugins.deny".to_string(),
            Self::Preferred(preferred) => format!("{preferred} preferred"),
        };
        Some(format!("{label} configured, skipped ({reason})."))
    }
}

/// Switch on configured but unswitched channels and auth plugins.
///
/// Never fails. Running it on its own output produces no further changes.
#[must_use]
pub fn apply_plugin_auto_enable(config: &Config, env: &Env) -> AutoEnableResult {
    if config.plugins.globally_disabled() {
        tracing::debug!("Plugins globally disabled; skipping auto-enable");
        return AutoEnableResult::unchanged(config);
    }

    let configured = configured_channels(config, env);
    let suppressed = suppressed_channels(config, &configured);
    let mut result = AutoEnableResult::unchanged(config);

    for id in &configured {
        let label = channel_label(id);
        let hold = channel_hold(config, id).or_else(|| {
            PREFER_OVER
                .iter()
                .find(|rule| rule.suppressed == id.as_str() && suppressed.contains(id.as_str()))
                .map(|rule| Hold::Preferred(rule.preferred))
        });

        if let Some(hold) = hold {
            tracing::debug!(channel = %id, ?hold, "Channel not auto-enabled");
            result.skipped.extend(hold.describe(label));
            continue;
        }

        if built_in_channel(id).is_some() {
            result.config.channels.entry_mut(id).enabled = Some(true);
        } else {
            enable_plugin_entry(&mut result.config, id);
        }
        allow_plugin(&mut result.config, id);
        tracing::debug!(channel = %id, "Channel auto-enabled");
        result
            .changes
            .push(format!("{label} configured, enabled automatically."));
    }

    for (provider, plugin_id) in configured_auth_plugins(config) {
        let label = format!("{provider} auth");
        if let Some(hold) = plugin_hold(config, plugin_id) {
            tracing::debug!(plugin = plugin_id, ?hold, "Auth plugin not auto-enabled");
            result.skipped.extend(hold.describe(&label));
            continue;
        }

        enable_plugin_entry(&mut result.config, plugin_id);
        allow_plugin(&mut result.config, plugin_id);
        tracing::debug!(plugin = plugin_id, "Auth plugin auto-enabled");
        result
            .changes
            .push(format!("{label} configured, enabled automatically."));
    }

    result
}

/// Configured channel ids: built-in channels in catalog order, then
/// plugin channels in name order.
fn configured_channels(config: &Config, env: &Env) -> Vec<String> {
    let has_block = |id: &str| config.channels.get(id).is_some_and(|entry| entry.has_settings());

    let built_in = BUILT_IN_CHANNELS
        .iter()
        .filter(|channel| has_block(channel.id) || channel.configured_by_env(env))
        .map(|channel| channel.id.to_string());

    let plugins = config
        .channels
        .names()
        .filter(|name| built_in_channel(name).is_none() && has_block(*name))
        .map(str::to_string);

    built_in.chain(plugins).collect()
}

/// Channels held back by a configured, active preferred integration.
fn suppressed_channels(config: &Config, configured: &[String]) -> BTreeSet<&'static str> {
    PREFER_OVER
        .iter()
        .filter(|rule| {
            configured.iter().any(|id| id.as_str() == rule.preferred)
                && !is_disabled(config, rule.preferred)
                && !config.plugins.is_denied(rule.preferred)
        })
        .map(|rule| rule.suppressed)
        .collect()
}

fn configured_auth_plugins(config: &Config) -> Vec<(String, &'static str)> {
    let mut seen = BTreeSet::new();
    config
        .auth
        .profiles
        .values()
        .filter_map(|profile| {
            let plugin = auth_plugin(&profile.provider)?;
            seen.insert(plugin.plugin_id)
                .then(|| (normalize_id(&profile.provider), plugin.plugin_id))
        })
        .collect()
}

fn is_disabled(config: &Config, id: &str) -> bool {
    config.channels.get(id).and_then(|entry| entry.enabled) == Some(false)
        || config.plugins.entry_enabled(id) == Some(false)
}

fn channel_hold(config: &Config, id: &str) -> Option<Hold> {
    let already_enabled = if built_in_channel(id).is_some() {
        config.channels.get(id).and_then(|entry| entry.enabled) == Some(true)
    } else {
        config.plugins.entry_enabled(id) == Some(true)
    };

    if already_enabled {
        Some(Hold::AlreadyEnabled)
    } else if is_disabled(config, id) {
        Some(Hold::Disabled)
    } else if config.plugins.is_denied(id) {
        Some(Hold::Denied)
    } else {
        None
    }
}

fn plugin_hold(config: &Config, plugin_id: &str) -> Option<Hold> {
    match config.plugins.entry_enabled(plugin_id) {
        Some(true) => Some(Hold::AlreadyEnabled),
        Some(false) => Some(Hold::Disabled),
        None if config.plugins.is_denied(plugin_id) => Some(Hold::Denied),
        None => None,
    }
}

fn enable_plugin_entry(config: &mut Config, id: &str) {
    config
        .plugins
        .entries
        .entry(id.to_string())
        .or_default()
        .enabled = Some(true);
}

/// Append to `plugins.allow` when an allowlist exists.
fn allow_plugin(config: &mut Config, id: &str) {
    if let Some(allow) = config.plugins.allow.as_mut() {
        let normalized = normalize_id(id);
        if !allow.iter().any(|entry| normalize_id(entry) == normalized) {
            allow.push(id.to_string());
        }
    }
}
