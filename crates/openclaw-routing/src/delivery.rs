//! Delivery target resolution.
//!
//! Turns a delivery hint (possibly missing its channel or address) into
//! the definitive channel, address, account and thread for an agent reply.
//!
//! Account precedence:
//! 1. The main session's `lastAccountId`, when the session last used the
//!    same channel
//! 2. The first binding for (agent, channel) naming an account
//! 3. None (default account)

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use openclaw_core::{
    AgentId, ChannelId, Config, PersistenceError, SessionRecord, ThreadId, load_session_store,
};

use crate::address::AddressParsers;
use crate::bindings::BindingTable;
use crate::selection::{ChannelSelector, ConfiguredChannelSelector, SelectionContext, SelectionError};

/// Channel value meaning "whatever channel the session last used".
pub const LAST_CHANNEL: &str = "last";

/// Default bound on the channel selection step.
pub const DEFAULT_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolution errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// No channel was supplied and none could be selected.
    #[error("No delivery channel: {0}")]
    NoChannel(#[from] SelectionError),

    /// Channel selection did not finish in time.
    #[error("Channel selection timed out after {0:?}")]
    SelectionTimeout(Duration),

    /// No address was supplied and the session has none for the channel.
    #[error("No delivery target for channel {channel}")]
    MissingTarget {
        /// Resolved channel.
        channel: String,
    },
}

/// Caller-supplied delivery request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryHint {
    /// Channel, `"last"`, or absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Address on the channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Explicit thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
}

impl DeliveryHint {
    /// Hint pinning both channel and address.
    #[must_use]
    pub fn to(channel: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            channel: Some(channel.into()),
            to: Some(to.into()),
            thread_id: None,
        }
    }
}

/// Final delivery instruction handed to a channel sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryTarget {
    /// Channel to send through.
    pub channel: ChannelId,
    /// Address, exactly as supplied (thread suffix included).
    pub to: String,
    /// Account to send as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Thread within `to`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
}

/// Resolves delivery targets from config, session state and a hint.
///
/// Holds no mutable state; one resolver can serve concurrent requests.
pub struct DeliveryTargetResolver {
    selector: Arc<dyn ChannelSelector>,
    parsers: AddressParsers,
    selection_timeout: Duration,
}

impl DeliveryTargetResolver {
    /// Resolver using `selector` for unpinned channels.
    #[must_use]
    pub fn new(selector: Arc<dyn ChannelSelector>) -> Self {
        Self {
            selector,
            parsers: AddressParsers::default(),
            selection_timeout: DEFAULT_SELECTION_TIMEOUT,
        }
    }

    /// Replace the address parser registry.
    #[must_use]
    pub fn with_parsers(mut self, parsers: AddressParsers) -> Self {
        self.parsers = parsers;
        self
    }

    /// Bound the channel selection step.
    #[must_use]
    pub const fn with_selection_timeout(mut self, timeout: Duration) -> Self {
        self.selection_timeout = timeout;
        self
    }

    /// Resolve the delivery target for `agent_id`.
    ///
    /// Reads the agent's main session record; never writes.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError` when no channel can be determined or no
    /// address is known for the resolved channel.
    pub async fn resolve(
        &self,
        config: &Config,
        agent_id: &AgentId,
        hint: &DeliveryHint,
    ) -> Result<DeliveryTarget, ResolutionError> {
        let session = load_main_session(config, agent_id).await;
        let session = session.as_ref();

        let channel = match non_empty(hint.channel.as_deref()) {
            Some(channel) if channel.eq_ignore_ascii_case(LAST_CHANNEL) => {
                match session.and_then(|s| non_empty(s.last_channel.as_deref())) {
                    Some(last) => ChannelId::new(last),
                    None => self.select_channel(config, agent_id, hint).await?,
                }
            }
            Some(channel) => ChannelId::new(channel),
            None => self.select_channel(config, agent_id, hint).await?,
        };

        // Session state only applies when it refers to the same channel.
        let same_channel_session = session.filter(|s| s.last_channel_is(channel.as_ref()));

        let account_id = same_channel_session
            .and_then(|s| non_empty(s.last_account_id.as_deref()))
            .or_else(|| BindingTable::new(&config.bindings).account_for(agent_id, channel.as_ref()))
            .map(str::to_string);

        let to = match hint.to.as_deref().filter(|to| !to.trim().is_empty()) {
            Some(to) => to.to_string(),
            None => same_channel_session
                .and_then(|s| non_empty(s.last_to.as_deref()))
                .map(str::to_string)
                .ok_or_else(|| ResolutionError::MissingTarget {
                    channel: channel.to_string(),
                })?,
        };

        let thread_id = self
            .parsers
            .for_channel(channel.as_ref())
            .parse(&to)
            .thread_id
            .or_else(|| hint.thread_id.clone())
            .or_else(|| {
                same_channel_session
                    .filter(|s| s.last_to.as_deref() == Some(to.as_str()))
                    .and_then(|s| s.last_thread_id.clone())
            });

        tracing::debug!(
            agent_id = %agent_id,
            channel = %channel,
            to = %to,
            account_id = ?account_id,
            thread_id = ?thread_id,
            "Resolved delivery target"
        );

        Ok(DeliveryTarget {
            channel,
            to,
            account_id,
            thread_id,
        })
    }

    async fn select_channel(
        &self,
        config: &Config,
        agent_id: &AgentId,
        hint: &DeliveryHint,
    ) -> Result<ChannelId, ResolutionError> {
        let ctx = SelectionContext {
            config,
            agent_id,
            to: hint.to.as_deref(),
        };

        match tokio::time::timeout(self.selection_timeout, self.selector.select_channel(&ctx)).await {
            Ok(Ok(channel)) => Ok(channel),
            Ok(Err(e)) => Err(ResolutionError::NoChannel(e)),
            Err(_) => Err(ResolutionError::SelectionTimeout(self.selection_timeout)),
        }
    }
}

impl Default for DeliveryTargetResolver {
    fn default() -> Self {
        Self::new(Arc::new(ConfiguredChannelSelector))
    }
}

impl std::fmt::Debug for DeliveryTargetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryTargetResolver")
            .field("parsers", &self.parsers)
            .field("selection_timeout", &self.selection_timeout)
            .finish_non_exhaustive()
    }
}

/// Resolve with the default resolver.
///
/// # Errors
///
/// See [`DeliveryTargetResolver::resolve`].
pub async fn resolve_delivery_target(
    config: &Config,
    agent_id: &AgentId,
    hint: &DeliveryHint,
) -> Result<DeliveryTarget, ResolutionError> {
    DeliveryTargetResolver::default()
        .resolve(config, agent_id, hint)
        .await
}

/// Main session record for an agent; unreadable stores count as empty.
async fn load_main_session(config: &Config, agent_id: &AgentId) -> Option<SessionRecord> {
    let path = config.session_store_path(agent_id);
    let key = config.main_session_key(agent_id);
    let read_path = path.clone();
    let loaded = tokio::task::spawn_blocking(move || load_session_store(&read_path))
        .await
        .map_err(PersistenceError::from)
        .and_then(|result| result);
    match loaded {
        Ok(map) => map.record(key.as_ref()),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Session store unavailable; resolving without session");
            None
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
