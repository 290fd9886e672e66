//! Static catalog of channels and provider-auth plugins.

use openclaw_core::{Env, normalize_id};

/// A channel shipped with the gateway (configured under `channels.<id>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltInChannel {
    /// Channel id.
    pub id: &'static str,
    /// Human-readable name used in change lines.
    pub label: &'static str,
    /// Environment variables that, all set, mark the channel configured.
    /// Empty when the channel cannot be configured from the environment.
    pub env: &'static [&'static str],
}

impl BuiltInChannel {
    /// Whether the environment alone configures this channel.
    #[must_use]
    pub fn configured_by_env(&self, env: &Env) -> bool {
        env.has_all(self.env)
    }
}

/// Built-in channels in evaluation order.
pub const BUILT_IN_CHANNELS: &[BuiltInChannel] = &[
    BuiltInChannel {
        id: "telegram",
        label: "Telegram",
        env: &["TELEGRAM_BOT_TOKEN"],
    },
    BuiltInChannel {
        id: "whatsapp",
        label: "WhatsApp",
        env: &[],
    },
    BuiltInChannel {
        id: "discord",
        label: "Discord",
        env: &["DISCORD_BOT_TOKEN"],
    },
    BuiltInChannel {
        id: "irc",
        label: "IRC",
        env: &["IRC_HOST", "IRC_NICK"],
    },
    BuiltInChannel {
        id: "googlechat",
        label: "Google Chat",
        env: &[],
    },
    BuiltInChannel {
        id: "slack",
        label: "Slack",
        env: &["SLACK_BOT_TOKEN", "SLACK_APP_TOKEN"],
    },
    BuiltInChannel {
        id: "signal",
        label: "Signal",
        env: &["SIGNAL_ACCOUNT"],
    },
    BuiltInChannel {
        id: "imessage",
        label: "iMessage",
        env: &[],
    },
];

/// Look up a built-in channel.
#[must_use]
pub fn built_in_channel(id: &str) -> Option<&'static BuiltInChannel> {
    let id = normalize_id(id);
    BUILT_IN_CHANNELS.iter().find(|channel| channel.id == id)
}

/// Label for any channel id; plugin channels are labelled by their id.
#[must_use]
pub fn channel_label(id: &str) -> &str {
    built_in_channel(id).map_or(id, |channel| channel.label)
}

/// Two integrations competing for the same transport.
///
/// When `preferred` is configured and active, `suppressed` is not
/// auto-enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferOver {
    /// Integration that wins.
    pub preferred: &'static str,
    /// Integration left alone.
    pub suppressed: &'static str,
}

/// Known transport conflicts.
pub const PREFER_OVER: &[PreferOver] = &[PreferOver {
    preferred: "bluebubbles",
    suppressed: "imessage",
}];

/// Plugin enabled by a credential profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthPlugin {
    /// Provider named by `auth.profiles.*.provider`.
    pub provider: &'static str,
    /// Plugin id under `plugins.entries`.
    pub plugin_id: &'static str,
}

/// Providers whose credentials need a companion plugin.
pub const PROVIDER_AUTH_PLUGINS: &[AuthPlugin] = &[
    AuthPlugin {
        provider: "google-antigravity",
        plugin_id: "google-antigravity-auth",
    },
    AuthPlugin {
        provider: "google-gemini-cli",
        plugin_id: "google-gemini-cli-auth",
    },
    AuthPlugin {
        provider: "qwen-portal",
        plugin_id: "qwen-portal-auth",
    },
    AuthPlugin {
        provider: "copilot-proxy",
        plugin_id: "copilot-proxy",
    },
    AuthPlugin {
        provider: "minimax-portal",
        plugin_id: "minimax-portal-auth",
    },
];

/// Auth plugin for a provider.
#[must_use]
pub fn auth_plugin(provider: &str) -> Option<&'static AuthPlugin> {
    let provider = normalize_id(provider);
    PROVIDER_AUTH_PLUGINS
        .iter()
        .find(|plugin| plugin.provider == provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(channel_label("imessage"), "iMessage");
        assert_eq!(channel_label("googlechat"), "Google Chat");
        assert_eq!(channel_label("bluebubbles"), "bluebubbles");
    }

    #[test]
    fn test_env_detection_requires_all_variables() {
        let slack = built_in_channel("slack").unwrap();
        let partial: Env = [("SLACK_BOT_TOKEN", "xoxb")].into_iter().collect();
        assert!(!slack.configured_by_env(&partial));

        let full: Env = [("SLACK_BOT_TOKEN", "xoxb"), ("SLACK_APP_TOKEN", "xapp")]
            .into_iter()
            .collect();
        assert!(slack.configured_by_env(&full));

        let blank: Env = [("TELEGRAM_BOT_TOKEN", "  ")].into_iter().collect();
        assert!(!built_in_channel("telegram").unwrap().configured_by_env(&blank));
    }

    #[test]
    fn test_channels_without_env_never_detected() {
        let env: Env = [("WHATSAPP", "1")].into_iter().collect();
        assert!(!built_in_channel("whatsapp").unwrap().configured_by_env(&env));
    }

    #[test]
    fn test_auth_plugin_ids() {
        assert_eq!(
            auth_plugin("google-antigravity").unwrap().plugin_id,
            "google-antigravity-auth"
        );
        assert_eq!(auth_plugin("copilot-proxy").unwrap().plugin_id, "copilot-proxy");
        assert!(auth_plugin("openai").is_none());
    }
}
