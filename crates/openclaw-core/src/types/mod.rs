//! Core types used throughout the routing core.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validation::normalize_id;

/// Unique identifier for an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Create a new agent ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Normalized form used for comparisons (trimmed, lowercase).
    #[must_use]
    pub fn normalized(&self) -> String {
        normalize_id(&self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unique identifier for a messaging channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    /// Create a new channel ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Telegram channel.
    #[must_use]
    pub fn telegram() -> Self {
        Self("telegram".to_string())
    }

    /// Discord channel.
    #[must_use]
    pub fn discord() -> Self {
        Self("discord".to_string())
    }

    /// Slack channel.
    #[must_use]
    pub fn slack() -> Self {
        Self("slack".to_string())
    }

    /// Whether two channel ids name the same channel, ignoring case and padding.
    #[must_use]
    pub fn same_as(&self, other: &str) -> bool {
        normalize_id(&self.0) == normalize_id(other)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ChannelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Session key uniquely identifies a conversation session.
///
/// Main sessions use the format `agent:<agent_id>:<main_key>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(pub String);

impl SessionKey {
    /// Default main key segment.
    pub const DEFAULT_MAIN_KEY: &'static str = "main";

    /// Create a new session key.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the main session key for an agent.
    #[must_use]
    pub fn main_session(agent_id: &AgentId) -> Self {
        Self::main_session_with(agent_id, Self::DEFAULT_MAIN_KEY)
    }

    /// Get the main session key for an agent with a custom main key segment.
    #[must_use]
    pub fn main_session_with(agent_id: &AgentId, main_key: &str) -> Self {
        let main_key = match normalize_id(main_key) {
            k if k.is_empty() => Self::DEFAULT_MAIN_KEY.to_string(),
            k => k,
        };
        Self(format!("agent:{}:{main_key}", agent_id.normalized()))
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Thread (topic) identifier within a delivery address.
///
/// Telegram forum topics are numeric; other platforms use opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThreadId {
    /// Numeric thread id.
    Numeric(i64),
    /// Opaque thread id.
    Text(String),
}

impl ThreadId {
    /// Parse a raw thread id, preferring the numeric form.
    ///
    /// Returns `None` for blank input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(
            raw.parse::<i64>()
                .map_or_else(|_| Self::Text(raw.to_string()), Self::Numeric),
        )
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for ThreadId {
    fn from(value: i64) -> Self {
        Self::Numeric(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_session_key() {
        let key = SessionKey::main_session(&AgentId::new("Agent-B"));
        assert_eq!(key.0, "agent:agent-b:main");

        let key = SessionKey::main_session_with(&AgentId::new("ops"), "  ");
        assert_eq!(key.0, "agent:ops:main");

        let key = SessionKey::main_session_with(&AgentId::new("ops"), "Primary");
        assert_eq!(key.0, "agent:ops:primary");
    }

    #[test]
    fn test_channel_ids() {
        assert_eq!(ChannelId::telegram().0, "telegram");
        assert!(ChannelId::discord().same_as(" Discord "));
        assert!(!ChannelId::slack().same_as("telegram"));
    }

    #[test]
    fn test_thread_id_parse() {
        assert_eq!(ThreadId::parse("123"), Some(ThreadId::Numeric(123)));
        assert_eq!(
            ThreadId::parse("1712.0001"),
            Some(ThreadId::Text("1712.0001".to_string()))
        );
        assert_eq!(ThreadId::parse(" "), None);
    }

    #[test]
    fn test_thread_id_serde_untagged() {
        let n: ThreadId = serde_json::from_str("999").unwrap();
        assert_eq!(n, ThreadId::Numeric(999));
        let s: ThreadId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(s, ThreadId::Text("abc".to_string()));
        assert_eq!(serde_json::to_string(&ThreadId::Numeric(7)).unwrap(), "7");
    }
}
