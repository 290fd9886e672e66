//! Inbound session recording.
//!
//! Every inbound message updates its session record's metadata. Only
//! messages from external surfaces may move the session's delivery
//! context; a message typed into an internal surface leaves replies
//! flowing to the channel that owns the session.

use serde::{Deserialize, Serialize};

use openclaw_core::sessions::now_ms;
use openclaw_core::validation::limits::MAX_BODY_PREVIEW_CHARS;
use openclaw_core::{
    DeliveryContext, PersistenceError, SessionKey, SessionOrigin, SessionRecord, SessionStore,
    ThreadId, sanitize_preview,
};

use crate::surface::{SurfaceClass, classify_surface};

/// Inbound message context as handed over by a channel adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InboundContext {
    /// Provider that received the message.
    pub provider: Option<String>,
    /// Surface the message was typed into.
    pub surface: Option<String>,
    /// Channel the message originated from.
    pub originating_channel: Option<String>,
    /// Address on the originating channel.
    pub originating_to: Option<String>,
    /// `direct`, `group`, `channel`.
    pub chat_type: Option<String>,
    /// Message text.
    pub body: Option<String>,
    /// Session key chosen by the adapter.
    pub session_key: Option<String>,
    /// Receiving account.
    pub account_id: Option<String>,
    /// Thread the message arrived in.
    pub message_thread_id: Option<ThreadId>,
    /// Sender address.
    pub from: Option<String>,
}

impl InboundContext {
    /// Name the surface is classified by: the first non-empty of the
    /// originating channel, surface and provider.
    #[must_use]
    pub fn surface_name(&self) -> Option<&str> {
        [&self.originating_channel, &self.surface, &self.provider]
            .into_iter()
            .filter_map(|value| value.as_deref().map(str::trim))
            .find(|value| !value.is_empty())
    }

    /// Classification of the originating surface.
    ///
    /// A context naming no surface at all is treated as internal.
    #[must_use]
    pub fn surface_class(&self) -> SurfaceClass {
        self.surface_name()
            .map_or(SurfaceClass::Internal, classify_surface)
    }

    fn origin(&self, received_at: i64) -> SessionOrigin {
        SessionOrigin {
            provider: self.provider.clone(),
            surface: self.surface.clone(),
            channel: self.surface_name().map(str::to_string),
            chat_type: self.chat_type.clone(),
            account_id: self.account_id.clone(),
            thread_id: self.message_thread_id.clone(),
            from: self.from.clone(),
            to: self
                .originating_to
                .as_deref()
                .map(str::trim)
                .filter(|to| !to.is_empty())
                .map(str::to_string),
            body_preview: self
                .body
                .as_deref()
                .and_then(|body| sanitize_preview(body, MAX_BODY_PREVIEW_CHARS)),
            received_at,
        }
    }
}

/// Proposed new "last route" for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRouteUpdate {
    /// Session whose route is updated.
    pub session_key: SessionKey,
    /// Channel replies should go to.
    pub channel: String,
    /// Address on that channel.
    pub to: String,
    /// Account that received the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Thread within `to`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
}

impl LastRouteUpdate {
    /// Whether this route may become a delivery context.
    #[must_use]
    pub fn is_deliverable(&self) -> bool {
        !self.to.trim().is_empty()
            && !self.channel.trim().is_empty()
            && classify_surface(&self.channel).is_deliverable()
    }

    fn apply(&self, record: &mut SessionRecord) {
        let channel = self.channel.trim().to_string();
        record.last_channel = Some(channel.clone());
        record.last_to = Some(self.to.clone());
        record.last_account_id.clone_from(&self.account_id);
        record.last_thread_id.clone_from(&self.thread_id);
        record.delivery_context = Some(DeliveryContext {
            channel,
            to: self.to.clone(),
            account_id: self.account_id.clone(),
            thread_id: self.thread_id.clone(),
        });
    }
}

/// What [`record_inbound_session`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    /// Classification of the originating surface.
    pub surface: SurfaceClass,
    /// Whether the last route / delivery context was overwritten.
    pub route_updated: bool,
    /// Whether every write reached the store.
    pub persisted: bool,
}

/// Record an inbound message against its session.
///
/// Writes `origin` metadata and bumps `updatedAt` on `session_key`. When
/// the message came from an external surface and `update_last_route`
/// names a deliverable route, that route's session also gets its last
/// route and delivery context overwritten.
///
/// Persistence failures go to `on_record_error` and never fail the call.
pub async fn record_inbound_session<E>(
    store: &SessionStore,
    session_key: &SessionKey,
    ctx: &InboundContext,
    update_last_route: Option<&LastRouteUpdate>,
    mut on_record_error: E,
) -> RecordOutcome
where
    E: FnMut(PersistenceError),
{
    let surface = ctx.surface_class();
    let route = update_last_route.filter(|route| surface.is_deliverable() && route.is_deliverable());
    let now = now_ms();
    let origin = ctx.origin(now);

    if let Some(skipped) = update_last_route.filter(|_| route.is_none()) {
        tracing::debug!(
            session_key = %session_key,
            surface = ?ctx.surface_name(),
            route_channel = %skipped.channel,
            "Keeping existing delivery context"
        );
    }

    let same_key_route = route.filter(|route| route.session_key == *session_key).cloned();
    let updates_same_key = same_key_route.is_some();
    let mut persisted = true;

    let result = store
        .update(session_key, move |existing| {
            let mut record = existing.unwrap_or_default();
            record.touch(now);
            record.origin = Some(origin);
            if let Some(route) = same_key_route {
                route.apply(&mut record);
            }
            record
        })
        .await;
    if let Err(e) = result {
        tracing::warn!(session_key = %session_key, error = %e, "Failed to record inbound session");
        persisted = false;
        on_record_error(e);
    }

    let mut route_updated = updates_same_key && persisted;

    if let Some(route) = route.filter(|route| route.session_key != *session_key) {
        let other = route.clone();
        let result = store
            .update(&route.session_key, move |existing| {
                let mut record = existing.unwrap_or_default();
                record.touch(now);
                other.apply(&mut record);
                record
            })
            .await;
        match result {
            Ok(_) => route_updated = true,
            Err(e) => {
                tracing::warn!(session_key = %route.session_key, error = %e, "Failed to update last route");
                persisted = false;
                on_record_error(e);
            }
        }
    }

    if route_updated {
        tracing::debug!(
            session_key = %session_key,
            channel = ?route.map(|r| r.channel.as_str()),
            "Delivery context updated"
        );
    }

    RecordOutcome {
        surface,
        route_updated,
        persisted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    const MAIN_KEY: &str = "agent:main:main";

    fn seed(path: &std::path::Path, value: &serde_json::Value) {
        std::fs::write(path, serde_json::to_string(value).unwrap()).unwrap();
    }

    fn ctx(value: serde_json::Value) -> InboundContext {
        serde_json::from_value(value).unwrap()
    }

    fn telegram_owned() -> serde_json::Value {
        json!({
            MAIN_KEY: {
                "sessionId": "sess-1",
                "updatedAt": 1000,
                "lastChannel": "telegram",
                "lastTo": "telegram:123",
                "lastAccountId": "default",
                "deliveryContext": { "channel": "telegram", "to": "telegram:123", "accountId": "default" }
            }
        })
    }

    #[tokio::test]
    async fn test_internal_surface_keeps_delivery_context() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sessions.json");
        seed(&path, &telegram_owned());
        let store = SessionStore::new(&path);
        let key = SessionKey::new(MAIN_KEY);

        let inbound = ctx(json!({
            "Body": "hello from webchat",
            "SessionKey": MAIN_KEY,
            "Provider": "webchat",
            "Surface": "webchat",
            "OriginatingChannel": "webchat",
            "ChatType": "direct"
        }));
        let route = LastRouteUpdate {
            session_key: key.clone(),
            channel: "webchat".to_string(),
            to: String::new(),
            account_id: None,
            thread_id: None,
        };

        let outcome = record_inbound_session(&store, &key, &inbound, Some(&route), |e| {
            panic!("unexpected error: {e}")
        })
        .await;
        assert_eq!(
            outcome,
            RecordOutcome {
                surface: SurfaceClass::Internal,
                route_updated: false,
                persisted: true,
            }
        );

        let record = store.get(&key).unwrap().unwrap();
        assert_eq!(record.last_channel.as_deref(), Some("telegram"));
        assert_eq!(record.last_account_id.as_deref(), Some("default"));
        let delivery = record.delivery_context.unwrap();
        assert_eq!(delivery.channel, "telegram");
        assert_eq!(delivery.to, "telegram:123");

        let origin = record.origin.unwrap();
        assert_eq!(origin.channel.as_deref(), Some("webchat"));
        assert_eq!(origin.to, None);
        assert_eq!(origin.body_preview.as_deref(), Some("hello from webchat"));
        assert!(record.updated_at > 1000);
    }

    #[tokio::test]
    async fn test_internal_surface_ignores_external_route() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sessions.json");
        seed(&path, &telegram_owned());
        let store = SessionStore::new(&path);
        let key = SessionKey::new(MAIN_KEY);

        let inbound = ctx(json!({ "Surface": "webchat", "Provider": "webchat" }));
        let route = LastRouteUpdate {
            session_key: key.clone(),
            channel: "discord".to_string(),
            to: "channel:1".to_string(),
            account_id: None,
            thread_id: None,
        };

        let outcome = record_inbound_session(&store, &key, &inbound, Some(&route), |_| {}).await;
        assert!(!outcome.route_updated);
        assert_eq!(
            store.get(&key).unwrap().unwrap().last_channel.as_deref(),
            Some("telegram")
        );
    }

    #[tokio::test]
    async fn test_external_surface_overwrites_route() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sessions.json");
        seed(&path, &telegram_owned());
        let store = SessionStore::new(&path);
        let key = SessionKey::new(MAIN_KEY);

        let inbound = ctx(json!({
            "Body": "hello from discord",
            "SessionKey": MAIN_KEY,
            "Provider": "discord",
            "Surface": "discord",
            "OriginatingChannel": "discord",
            "OriginatingTo": "channel:discord-456",
            "ChatType": "group"
        }));
        let route = LastRouteUpdate {
            session_key: key.clone(),
            channel: "discord".to_string(),
            to: "channel:discord-456".to_string(),
            account_id: Some("bot-1".to_string()),
            thread_id: None,
        };

        let outcome = record_inbound_session(&store, &key, &inbound, Some(&route), |_| {}).await;
        assert!(outcome.route_updated);
        assert_eq!(outcome.surface, SurfaceClass::External);

        let record = store.get(&key).unwrap().unwrap();
        assert_eq!(record.session_id, "sess-1");
        assert_eq!(record.last_channel.as_deref(), Some("discord"));
        assert_eq!(record.last_account_id.as_deref(), Some("bot-1"));
        assert_eq!(
            record.origin.as_ref().and_then(|o| o.to.as_deref()),
            Some("channel:discord-456")
        );
        assert_eq!(
            record.delivery_context,
            Some(DeliveryContext {
                channel: "discord".to_string(),
                to: "channel:discord-456".to_string(),
                account_id: Some("bot-1".to_string()),
                thread_id: None,
            })
        );
    }

    #[tokio::test]
    async fn test_creates_missing_record() {
        let temp = tempdir().unwrap();
        let store = SessionStore::new(temp.path().join("sessions.json"));
        let key = SessionKey::new(MAIN_KEY);

        let inbound = ctx(json!({ "Provider": "telegram", "MessageThreadId": 42 }));
        let route = LastRouteUpdate {
            session_key: key.clone(),
            channel: "telegram".to_string(),
            to: "-100123:topic:42".to_string(),
            account_id: None,
            thread_id: Some(ThreadId::Numeric(42)),
        };

        record_inbound_session(&store, &key, &inbound, Some(&route), |_| {}).await;

        let record = store.get(&key).unwrap().unwrap();
        assert!(!record.session_id.is_empty());
        assert_eq!(record.last_thread_id, Some(ThreadId::Numeric(42)));
        assert_eq!(record.origin.unwrap().thread_id, Some(ThreadId::Numeric(42)));
    }

    #[tokio::test]
    async fn test_route_for_other_session_key() {
        let temp = tempdir().unwrap();
        let store = SessionStore::new(temp.path().join("sessions.json"));
        let key = SessionKey::new("agent:main:telegram:group:-100");
        let main = SessionKey::new(MAIN_KEY);

        let inbound = ctx(json!({ "OriginatingChannel": "telegram" }));
        let route = LastRouteUpdate {
            session_key: main.clone(),
            channel: "telegram".to_string(),
            to: "-100".to_string(),
            account_id: None,
            thread_id: None,
        };

        let outcome = record_inbound_session(&store, &key, &inbound, Some(&route), |_| {}).await;
        assert!(outcome.route_updated);

        let record = store.get(&key).unwrap().unwrap();
        assert!(record.origin.is_some());
        assert_eq!(record.delivery_context, None);

        let main_record = store.get(&main).unwrap().unwrap();
        assert_eq!(main_record.last_to.as_deref(), Some("-100"));
        assert_eq!(main_record.origin, None);
    }

    #[tokio::test]
    async fn test_persistence_failure_goes_to_callback() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let store = SessionStore::new(blocker.join("sessions.json"));
        let key = SessionKey::new(MAIN_KEY);

        let mut errors = Vec::new();
        let outcome = record_inbound_session(
            &store,
            &key,
            &ctx(json!({ "Provider": "discord" })),
            None,
            |e| errors.push(e.to_string()),
        )
        .await;

        assert_eq!(errors.len(), 1);
        assert!(!outcome.persisted);
        assert!(!outcome.route_updated);
    }

    #[tokio::test]
    async fn test_corrupt_store_is_reported_not_overwritten() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sessions.json");
        let truncated = r#"{ "agent:ops:main": { "sessionId": "ops-1", "lastChannel": "slack""#;
        std::fs::write(&path, truncated).unwrap();
        let store = SessionStore::new(&path);
        let key = SessionKey::new(MAIN_KEY);
        let route = LastRouteUpdate {
            session_key: key.clone(),
            channel: "discord".to_string(),
            to: "channel:1".to_string(),
            account_id: None,
            thread_id: None,
        };

        let mut errors = Vec::new();
        let outcome = record_inbound_session(
            &store,
            &key,
            &ctx(json!({ "Provider": "discord" })),
            Some(&route),
            |e| errors.push(e),
        )
        .await;

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], PersistenceError::Corrupt { .. }));
        assert!(!outcome.persisted);
        assert!(!outcome.route_updated);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), truncated);
    }

    #[test]
    fn test_surface_name_precedence() {
        let inbound = ctx(json!({ "Provider": "telegram", "Surface": " ", "OriginatingChannel": "" }));
        assert_eq!(inbound.surface_name(), Some("telegram"));
        assert_eq!(InboundContext::default().surface_class(), SurfaceClass::Internal);
    }
}
