//! Composite delivery addresses.
//!
//! Some channels encode a sub-thread inside the address string, e.g. a
//! Telegram forum topic as `"<chat>:topic:<threadId>"`. Parsing is chosen
//! per channel; channels without a registered parser treat addresses as
//! opaque.

use std::collections::HashMap;
use std::sync::Arc;

use openclaw_core::{ThreadId, normalize_id};

/// Result of parsing a delivery address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress<'a> {
    /// Parent address (the whole input when no thread is encoded).
    pub address: &'a str,
    /// Thread encoded in the address.
    pub thread_id: Option<ThreadId>,
}

/// Channel-specific address syntax.
pub trait AddressParser: Send + Sync {
    /// Split `to` into parent address and thread.
    fn parse<'a>(&self, to: &'a str) -> ParsedAddress<'a>;

    /// Inverse of [`AddressParser::parse`].
    fn compose(&self, address: &str, thread_id: Option<&ThreadId>) -> String;
}

/// Addresses without sub-routing.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueAddressParser;

impl AddressParser for OpaqueAddressParser {
    fn parse<'a>(&self, to: &'a str) -> ParsedAddress<'a> {
        ParsedAddress {
            address: to,
            thread_id: None,
        }
    }

    fn compose(&self, address: &str, _thread_id: Option<&ThreadId>) -> String {
        address.to_string()
    }
}

/// `"<address>:topic:<threadId>"` addresses (Telegram forum topics).
#[derive(Debug, Clone, Copy, Default)]
pub struct TopicAddressParser;

impl TopicAddressParser {
    /// Marker separating the parent address from the thread id.
    pub const MARKER: &'static str = ":topic:";
}

impl AddressParser for TopicAddressParser {
    fn parse<'a>(&self, to: &'a str) -> ParsedAddress<'a> {
        let split = to
            .rfind(Self::MARKER)
            .map(|idx| (&to[..idx], &to[idx + Self::MARKER.len()..]));

        match split {
            Some((address, raw_thread)) if !address.is_empty() => match ThreadId::parse(raw_thread) {
                Some(thread_id) => ParsedAddress {
                    address,
                    thread_id: Some(thread_id),
                },
                None => OpaqueAddressParser.parse(to),
            },
            _ => OpaqueAddressParser.parse(to),
        }
    }

    fn compose(&self, address: &str, thread_id: Option<&ThreadId>) -> String {
        match thread_id {
            Some(thread_id) => format!("{address}{}{thread_id}", Self::MARKER),
            None => address.to_string(),
        }
    }
}

/// Address parsers keyed by channel.
#[derive(Clone)]
pub struct AddressParsers {
    parsers: HashMap<String, Arc<dyn AddressParser>>,
    fallback: Arc<dyn AddressParser>,
}

impl AddressParsers {
    /// Registry where every channel uses opaque addresses.
    #[must_use]
    pub fn opaque() -> Self {
        Self {
            parsers: HashMap::new(),
            fallback: Arc::new(OpaqueAddressParser),
        }
    }

    /// Register (or replace) the parser for a channel.
    pub fn register(&mut self, channel: &str, parser: Arc<dyn AddressParser>) {
        self.parsers.insert(normalize_id(channel), parser);
    }

    /// Parser for a channel.
    #[must_use]
    pub fn for_channel(&self, channel: &str) -> &dyn AddressParser {
        let parser = self
            .parsers
            .get(&normalize_id(channel))
            .unwrap_or(&self.fallback);
        &**parser
    }
}

impl Default for AddressParsers {
    fn default() -> Self {
        let mut parsers = Self::opaque();
        parsers.register("telegram", Arc::new(TopicAddressParser));
        parsers
    }
}

impl std::fmt::Debug for AddressParsers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut channels: Vec<_> = self.parsers.keys().collect();
        channels.sort();
        f.debug_struct("AddressParsers")
            .field("channels", &channels)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_parse_and_compose() {
        let parser = TopicAddressParser;
        let parsed = parser.parse("-1001234567890:topic:123");
        assert_eq!(parsed.address, "-1001234567890");
        assert_eq!(parsed.thread_id, Some(ThreadId::Numeric(123)));
        assert_eq!(
            parser.compose(parsed.address, parsed.thread_id.as_ref()),
            "-1001234567890:topic:123"
        );
    }

    #[test]
    fn test_topic_parse_prefixed_address() {
        let parsed = TopicAddressParser.parse("telegram:-100555:topic:42");
        assert_eq!(parsed.address, "telegram:-100555");
        assert_eq!(parsed.thread_id, Some(ThreadId::Numeric(42)));
    }

    #[test]
    fn test_topic_parse_without_marker() {
        let parsed = TopicAddressParser.parse("123456");
        assert_eq!(parsed.address, "123456");
        assert_eq!(parsed.thread_id, None);
    }

    #[test]
    fn test_topic_parse_degenerate_inputs() {
        assert_eq!(TopicAddressParser.parse(":topic:5").thread_id, None);
        assert_eq!(TopicAddressParser.parse("-100:topic:").thread_id, None);
        assert_eq!(TopicAddressParser.parse("-100:topic:").address, "-100:topic:");
    }

    #[test]
    fn test_registry_defaults() {
        let parsers = AddressParsers::default();
        assert_eq!(
            parsers.for_channel("Telegram").parse("1:topic:2").thread_id,
            Some(ThreadId::Numeric(2))
        );
        assert_eq!(parsers.for_channel("discord").parse("1:topic:2").thread_id, None);
    }

    #[test]
    fn test_registry_custom_parser() {
        let mut parsers = AddressParsers::opaque();
        parsers.register("matrix", Arc::new(TopicAddressParser));
        assert!(parsers.for_channel("matrix").parse("!room:topic:abc").thread_id.is_some());
        assert!(parsers.for_channel("telegram").parse("1:topic:2").thread_id.is_none());
    }
}
