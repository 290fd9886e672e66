//! # OpenClaw Core
//!
//! Core types, configuration, and session storage for the OpenClaw
//! routing core.
//!
//! This crate provides:
//! - Configuration loading and boundary validation (JSON5 format)
//! - Typed config sections: channels, plugins, auth, bindings, session
//! - The session store holding each conversation's last delivery route
//! - Identifier normalization and message preview sanitization

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod sessions;
pub mod types;
pub mod validation;

pub use config::{
    AuthConfig, AuthProfileConfig, Binding, BindingMatch, ChannelEntry, ChannelsConfig, Config,
    ConfigError, Env, PluginEntry, PluginsConfig, SessionConfig,
};
pub use sessions::{
    DeliveryContext, PersistenceError, SessionMap, SessionOrigin, SessionRecord, SessionStore,
    load_session_store, save_session_store,
};
pub use types::{AgentId, ChannelId, SessionKey, ThreadId};
pub use validation::{ValidationError, normalize_id, sanitize_preview};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, Env};
    pub use crate::sessions::{DeliveryContext, SessionRecord, SessionStore};
    pub use crate::types::*;
}
