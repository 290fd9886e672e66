//! Configuration loading and validation.
//!
//! Supports JSON5 format for compatibility with existing `OpenClaw` config.
//! Config location: `~/.openclaw/openclaw.json`
//!
//! Only the sections the routing core reads are typed (`channels`,
//! `plugins`, `auth`, `bindings`, `session`). Everything else, including
//! channel-specific fields, is carried through untouched so a resolved
//! config can be written back without losing data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::{AgentId, SessionKey};
use crate::validation::{normalize_id, validate_identifier};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Channel blocks by channel name.
    #[serde(default, skip_serializing_if = "ChannelsConfig::is_empty")]
    pub channels: ChannelsConfig,

    /// Plugin switches.
    #[serde(default, skip_serializing_if = "PluginsConfig::is_empty")]
    pub plugins: PluginsConfig,

    /// Credential profiles.
    #[serde(default, skip_serializing_if = "AuthConfig::is_empty")]
    pub auth: AuthConfig,

    /// Agent to (channel, account) bindings, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Binding>,

    /// Session store settings.
    #[serde(default, skip_serializing_if = "SessionConfig::is_empty")]
    pub session: SessionConfig,

    /// Sections the routing core does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns error if config cannot be loaded or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    ///
    /// Malformed sections are dropped with a warning rather than failing
    /// the load; only unreadable or syntactically invalid files error.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let (config, diagnostics) = Self::load_with_diagnostics(path)?;
        for diagnostic in &diagnostics {
            tracing::warn!(path = %path.display(), "{diagnostic}");
        }
        Ok(config)
    }

    /// Load configuration and report every part that was dropped.
    ///
    /// A config with diagnostics no longer round-trips: saving it would
    /// erase the dropped parts from disk.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load_with_diagnostics(path: &Path) -> Result<(Self, Vec<String>), ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let raw: Value = json5::from_str(&content)?;
        Ok(Self::from_value_lenient(&raw))
    }

    /// Save configuration to a path.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Build a config from an untyped value without ever failing.
    ///
    /// Each section is validated independently; a section (or channel
    /// block, auth profile, binding) that does not match its schema is
    /// treated as absent and described in the returned diagnostics.
    #[must_use]
    pub fn from_value_lenient(value: &Value) -> (Self, Vec<String>) {
        let mut diagnostics = Vec::new();
        let Some(root) = value.as_object() else {
            diagnostics.push("config root is not an object; using defaults".to_string());
            return (Self::default(), diagnostics);
        };

        let mut config = Self::default();
        for (key, section) in root {
            match key.as_str() {
                "channels" => config.channels = ChannelsConfig::lenient(section, &mut diagnostics),
                "plugins" => config.plugins = PluginsConfig::lenient(section, &mut diagnostics),
                "auth" => config.auth = AuthConfig::lenient(section, &mut diagnostics),
                "bindings" => config.bindings = lenient_bindings(section, &mut diagnostics),
                "session" => {
                    config.session = parse_section(key, section, &mut diagnostics).unwrap_or_default();
                }
                _ => {
                    config.extra.insert(key.clone(), section.clone());
                }
            }
        }

        (config, diagnostics)
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("openclaw.json")
    }

    /// Get the `OpenClaw` state directory.
    ///
    /// Uses `OPENCLAW_STATE_DIR` env var if set, otherwise `~/.openclaw`.
    #[must_use]
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("OPENCLAW_STATE_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".openclaw")
        } else {
            PathBuf::from(".openclaw")
        }
    }

    /// Get the agents directory.
    #[must_use]
    pub fn agents_dir() -> PathBuf {
        Self::state_dir().join("agents")
    }

    /// Path of the session store for an agent.
    ///
    /// `session.store` may contain an `{agentId}` placeholder.
    #[must_use]
    pub fn session_store_path(&self, agent_id: &AgentId) -> PathBuf {
        let agent = agent_id.normalized();
        match &self.session.store {
            Some(template) => PathBuf::from(template.replace("{agentId}", &agent)),
            None => Self::agents_dir()
                .join(agent)
                .join("sessions")
                .join("sessions.json"),
        }
    }

    /// Canonical main session key for an agent.
    #[must_use]
    pub fn main_session_key(&self, agent_id: &AgentId) -> SessionKey {
        match &self.session.main_key {
            Some(main_key) => SessionKey::main_session_with(agent_id, main_key),
            None => SessionKey::main_session(agent_id),
        }
    }

    /// Strict validation of identifiers used by the routing core.
    ///
    /// Loading never calls this; it backs the `validate` CLI command.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in self.channels.names() {
            validate_identifier(name)
                .map_err(|e| ConfigError::Validation(format!("channels.{name}: {e}")))?;
        }

        for (index, binding) in self.bindings.iter().enumerate() {
            if normalize_id(&binding.agent_id).is_empty() {
                return Err(ConfigError::Validation(format!(
                    "bindings[{index}] has empty agentId"
                )));
            }
            validate_identifier(&binding.matcher.channel)
                .map_err(|e| ConfigError::Validation(format!("bindings[{index}].match.channel: {e}")))?;
        }

        let listed = self
            .plugins
            .allow
            .iter()
            .flatten()
            .chain(self.plugins.deny.iter().flatten());
        for name in listed {
            validate_identifier(name)
                .map_err(|e| ConfigError::Validation(format!("plugins allow/deny entry '{name}': {e}")))?;
        }

        Ok(())
    }
}

fn parse_section<T: serde::de::DeserializeOwned>(
    key: &str,
    section: &Value,
    diagnostics: &mut Vec<String>,
) -> Option<T> {
    match serde_json::from_value(section.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            diagnostics.push(format!("ignoring malformed `{key}` section: {e}"));
            None
        }
    }
}

fn lenient_bindings(section: &Value, diagnostics: &mut Vec<String>) -> Vec<Binding> {
    let Some(items) = section.as_array() else {
        diagnostics.push("ignoring `bindings`: expected an array".to_string());
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            parse_section::<Binding>(&format!("bindings[{index}]"), item, diagnostics)
        })
        .collect()
}

/// Channel blocks keyed by channel name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelsConfig(pub BTreeMap<String, ChannelEntry>);

impl ChannelsConfig {
    /// Reserved key holding defaults shared by all channels.
    pub const DEFAULTS_KEY: &'static str = "defaults";

    fn lenient(section: &Value, diagnostics: &mut Vec<String>) -> Self {
        let Some(blocks) = section.as_object() else {
            diagnostics.push("ignoring `channels`: expected an object".to_string());
            return Self::default();
        };

        let mut channels = BTreeMap::new();
        for (name, block) in blocks {
            if let Some(entry) = parse_section(&format!("channels.{name}"), block, diagnostics) {
                channels.insert(name.clone(), entry);
            }
        }
        Self(channels)
    }

    /// Whether no channel blocks exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a channel block (the `defaults` block is never returned).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ChannelEntry> {
        if name == Self::DEFAULTS_KEY {
            return None;
        }
        self.0.get(name)
    }

    /// Mutable access to a channel block, creating an empty one if missing.
    pub fn entry_mut(&mut self, name: &str) -> &mut ChannelEntry {
        self.0.entry(name.to_string()).or_default()
    }

    /// Channel names, excluding the reserved `defaults` key.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|name| *name != Self::DEFAULTS_KEY)
    }
}

/// A single channel block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelEntry {
    /// Explicit on/off switch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Channel-specific settings (tokens, hosts, paths).
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl ChannelEntry {
    /// Whether the block carries any setting besides `enabled`.
    #[must_use]
    pub fn has_settings(&self) -> bool {
        !self.settings.is_empty()
    }
}

/// Plugin switches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginsConfig {
    /// Global switch; `false` disables all plugin auto-configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Plugins allowed to load. Absent means no restriction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<Vec<String>>,

    /// Plugins that must never load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny: Option<Vec<String>>,

    /// Per-plugin switches.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub entries: BTreeMap<String, PluginEntry>,

    /// Other plugin settings.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PluginsConfig {
    /// Field-by-field parse, so a bad `allow` never costs the global switch.
    fn lenient(section: &Value, diagnostics: &mut Vec<String>) -> Self {
        let Some(object) = section.as_object() else {
            diagnostics.push("ignoring `plugins`: expected an object".to_string());
            return Self::default();
        };

        let mut plugins = Self::default();
        for (key, value) in object {
            let field = format!("plugins.{key}");
            match key.as_str() {
                "enabled" => plugins.enabled = parse_section(&field, value, diagnostics),
                "allow" => plugins.allow = parse_section(&field, value, diagnostics),
                "deny" => plugins.deny = parse_section(&field, value, diagnostics),
                "entries" => {
                    let Some(entries) = value.as_object() else {
                        diagnostics.push("ignoring `plugins.entries`: expected an object".to_string());
                        continue;
                    };
                    for (name, entry) in entries {
                        if let Some(parsed) =
                            parse_section(&format!("plugins.entries.{name}"), entry, diagnostics)
                        {
                            plugins.entries.insert(name.clone(), parsed);
                        }
                    }
                }
                _ => {
                    plugins.extra.insert(key.clone(), value.clone());
                }
            }
        }
        plugins
    }

    /// Whether nothing is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.allow.is_none()
            && self.deny.is_none()
            && self.entries.is_empty()
            && self.extra.is_empty()
    }

    /// Whether the plugin system is globally switched off.
    #[must_use]
    pub fn globally_disabled(&self) -> bool {
        self.enabled == Some(false)
    }

    /// Whether `name` appears in the deny list.
    #[must_use]
    pub fn is_denied(&self, name: &str) -> bool {
        let name = normalize_id(name);
        self.deny
            .iter()
            .flatten()
            .any(|denied| normalize_id(denied) == name)
    }

    /// Explicit switch for a plugin entry, if any.
    #[must_use]
    pub fn entry_enabled(&self, name: &str) -> Option<bool> {
        self.entries.get(name).and_then(|entry| entry.enabled)
    }
}

/// Per-plugin switch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginEntry {
    /// Explicit on/off switch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Plugin-specific settings.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Credential profiles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Profiles keyed by profile id (e.g. `google-antigravity:default`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, AuthProfileConfig>,

    /// Other auth settings.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthConfig {
    fn lenient(section: &Value, diagnostics: &mut Vec<String>) -> Self {
        let Some(object) = section.as_object() else {
            diagnostics.push("ignoring `auth`: expected an object".to_string());
            return Self::default();
        };

        let mut auth = Self::default();
        for (key, value) in object {
            if key != "profiles" {
                auth.extra.insert(key.clone(), value.clone());
                continue;
            }
            let Some(profiles) = value.as_object() else {
                diagnostics.push("ignoring `auth.profiles`: expected an object".to_string());
                continue;
            };
            for (id, profile) in profiles {
                if let Some(parsed) = parse_section(&format!("auth.profiles.{id}"), profile, diagnostics) {
                    auth.profiles.insert(id.clone(), parsed);
                }
            }
        }
        auth
    }

    /// Whether nothing is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty() && self.extra.is_empty()
    }
}

/// A credential profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthProfileConfig {
    /// Provider this profile authenticates against.
    pub provider: String,

    /// Credential mode (`oauth`, `api_key`, `token`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Other profile fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Static rule granting an agent a (channel, account) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// Agent the binding applies to.
    pub agent_id: String,

    /// What the binding matches.
    #[serde(rename = "match")]
    pub matcher: BindingMatch,
}

impl Binding {
    /// Create a binding for an agent on a channel/account.
    #[must_use]
    pub fn new(
        agent_id: impl Into<String>,
        channel: impl Into<String>,
        account_id: Option<&str>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            matcher: BindingMatch {
                channel: channel.into(),
                account_id: account_id.map(str::to_string),
                extra: Map::new(),
            },
        }
    }
}

/// Match clause of a binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingMatch {
    /// Channel name.
    pub channel: String,

    /// Account on that channel; `*` matches any account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    /// Other match criteria (peer, guild, team) used by inbound routing.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Session store settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Main key segment of `agent:<id>:<mainKey>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_key: Option<String>,

    /// Store path override; may contain `{agentId}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,

    /// Other session settings.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionConfig {
    /// Whether nothing is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.main_key.is_none() && self.store.is_none() && self.extra.is_empty()
    }
}

/// Read-only snapshot of environment variables.
///
/// Resolvers take an `Env` instead of reading the process environment so
/// they stay deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env(HashMap<String, String>);

impl Env {
    /// Snapshot of the current process environment.
    #[must_use]
    pub fn from_process() -> Self {
        Self(std::env::vars().collect())
    }

    /// Non-empty value of a variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Whether every listed variable is set to a non-empty value.
    #[must_use]
    pub fn has_all(&self, keys: &[&str]) -> bool {
        !keys.is_empty() && keys.iter().all(|key| self.get(key).is_some())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Env {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
