//! # OpenClaw Routing
//!
//! Decides where agent replies go.
//!
//! - [`record_inbound_session`] keeps each session's last delivery route,
//!   letting only external channels move it
//! - [`DeliveryTargetResolver`] turns a delivery hint into a channel,
//!   address, account and thread using session state and bindings
//! - [`AddressParsers`] splits composite addresses such as Telegram
//!   `"<chat>:topic:<id>"` per channel

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod bindings;
pub mod delivery;
pub mod recorder;
pub mod selection;
pub mod surface;

pub use address::{
    AddressParser, AddressParsers, OpaqueAddressParser, ParsedAddress, TopicAddressParser,
};
pub use bindings::BindingTable;
pub use delivery::{
    DeliveryHint, DeliveryTarget, DeliveryTargetResolver, ResolutionError, resolve_delivery_target,
};
pub use recorder::{InboundContext, LastRouteUpdate, RecordOutcome, record_inbound_session};
pub use selection::{
    ChannelSelector, ConfiguredChannelSelector, FixedChannelSelector, SelectionContext,
    SelectionError,
};
pub use surface::{SurfaceClass, classify_surface};
