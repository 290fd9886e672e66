//! Record command - record an inbound message against a session.

use crate::ui;
use anyhow::Result;
use openclaw_core::{AgentId, SessionKey, SessionStore, ThreadId};
use openclaw_routing::{InboundContext, LastRouteUpdate, record_inbound_session};
use std::path::PathBuf;

/// Record command arguments.
#[derive(Debug, Clone, Default)]
pub struct RecordArgs {
    /// Config file override.
    pub config_path: Option<PathBuf>,
    /// Session key.
    pub session_key: String,
    /// Originating channel.
    pub channel: String,
    /// Surface, when different from the channel.
    pub surface: Option<String>,
    /// Reply address.
    pub to: Option<String>,
    /// Receiving account.
    pub account: Option<String>,
    /// Thread within the address.
    pub thread: Option<String>,
    /// Message text.
    pub body: Option<String>,
    /// Agent owning the store.
    pub agent: String,
    /// Session store override.
    pub store: Option<PathBuf>,
}

impl RecordArgs {
    fn context(&self) -> InboundContext {
        let surface = self.surface.clone().unwrap_or_else(|| self.channel.clone());
        InboundContext {
            provider: Some(self.channel.clone()),
            surface: Some(surface.clone()),
            originating_channel: Some(surface),
            originating_to: self.to.clone(),
            body: self.body.clone(),
            session_key: Some(self.session_key.clone()),
            account_id: self.account.clone(),
            message_thread_id: self.thread_id(),
            ..InboundContext::default()
        }
    }

    fn route(&self) -> Option<LastRouteUpdate> {
        self.to.as_ref().map(|to| LastRouteUpdate {
            session_key: SessionKey::new(&self.session_key),
            channel: self.channel.clone(),
            to: to.clone(),
            account_id: self.account.clone(),
            thread_id: self.thread_id(),
        })
    }

    fn thread_id(&self) -> Option<ThreadId> {
        self.thread.as_deref().and_then(ThreadId::parse)
    }
}

/// Run the record command.
pub async fn run_record(args: &RecordArgs) -> Result<()> {
    let config = super::load_config(args.config_path.as_deref())?;
    let path = super::store_path(&config, &AgentId::new(&args.agent), args.store.as_deref());
    let store = SessionStore::new(path);
    let key = SessionKey::new(&args.session_key);
    let route = args.route();

    let mut failure = None;
    let outcome = record_inbound_session(&store, &key, &args.context(), route.as_ref(), |e| {
        failure.get_or_insert(e);
    })
    .await;

    if let Some(e) = failure {
        anyhow::bail!("Failed to record session {key}: {e}");
    }

    if outcome.route_updated {
        ui::success(&format!("Recorded {key}; delivery context updated"));
    } else {
        ui::success(&format!("Recorded {key}"));
        if route.is_some() {
            ui::info("Delivery context unchanged (internal surface or empty address)");
        }
    }
    ui::kv("Store", &store.path().display().to_string());

    Ok(())
}
