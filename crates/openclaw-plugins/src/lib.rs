//! # OpenClaw Plugins
//!
//! Channel and plugin enablement.
//!
//! Knows which channels ship with the gateway, how each one is detected
//! from configuration or the environment, which integrations compete for
//! the same transport, and which credential profiles need a companion
//! plugin. [`apply_plugin_auto_enable`] turns that into a configuration
//! with every configured integration switched on.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Automatic enablement of configured integrations.
pub mod auto_enable;
/// Built-in channels, transport conflicts and auth plugins.
pub mod catalog;

pub use auto_enable::{AutoEnableResult, apply_plugin_auto_enable};
pub use catalog::{
    AuthPlugin, BUILT_IN_CHANNELS, BuiltInChannel, PREFER_OVER, PROVIDER_AUTH_PLUGINS, PreferOver,
    auth_plugin, built_in_channel, channel_label,
};
