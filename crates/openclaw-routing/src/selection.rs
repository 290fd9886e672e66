//! Channel selection collaborator.
//!
//! When a delivery request does not pin a channel, the resolver asks a
//! [`ChannelSelector`] for one.

use async_trait::async_trait;
use thiserror::Error;

use openclaw_core::{AgentId, ChannelId, Config};

/// Channel selection errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// No channel is configured at all.
    #[error("No channels configured")]
    NoChannelsConfigured,

    /// More than one channel could serve the request.
    #[error("Channel is required when multiple channels are configured: {}", .0.join(", "))]
    Ambiguous(Vec<String>),

    /// The selector failed for another reason.
    #[error("Channel selection failed: {0}")]
    Failed(String),
}

/// Inputs available to a selector.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    /// Resolved configuration.
    pub config: &'a Config,
    /// Agent the reply belongs to.
    pub agent_id: &'a AgentId,
    /// Target address, when the caller supplied one.
    pub to: Option<&'a str>,
}

/// Proposes a channel for a delivery that has none.
#[async_trait]
pub trait ChannelSelector: Send + Sync {
    /// Pick a channel.
    async fn select_channel(&self, ctx: &SelectionContext<'_>) -> Result<ChannelId, SelectionError>;
}

/// Picks the only active channel in the configuration.
///
/// A channel is active when its block is explicitly enabled, or carries
/// settings and is not explicitly disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredChannelSelector;

impl ConfiguredChannelSelector {
    /// Active channels in name order.
    #[must_use]
    pub fn active_channels(config: &Config) -> Vec<String> {
        config
            .channels
            .names()
            .filter(|name| {
                config.channels.get(name).is_some_and(|entry| match entry.enabled {
                    Some(enabled) => enabled,
                    None => entry.has_settings(),
                })
            })
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl ChannelSelector for ConfiguredChannelSelector {
    async fn select_channel(&self, ctx: &SelectionContext<'_>) -> Result<ChannelId, SelectionError> {
        let mut active = Self::active_channels(ctx.config);
        match active.len() {
            0 => Err(SelectionError::NoChannelsConfigured),
            1 => Ok(ChannelId::new(active.remove(0))),
            _ => Err(SelectionError::Ambiguous(active)),
        }
    }
}

/// Always proposes the same channel.
#[derive(Debug, Clone)]
pub struct FixedChannelSelector(pub ChannelId);

#[async_trait]
impl ChannelSelector for FixedChannelSelector {
    async fn select_channel(&self, _ctx: &SelectionContext<'_>) -> Result<ChannelId, SelectionError> {
        Ok(self.0.clone())
    }
}
