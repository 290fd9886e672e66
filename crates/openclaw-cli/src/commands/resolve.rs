//! Resolve command - print the delivery target for an agent reply.

use anyhow::Result;
use openclaw_core::{AgentId, ThreadId};
use openclaw_routing::{DeliveryHint, DeliveryTargetResolver};
use std::path::PathBuf;

/// Resolve command arguments.
#[derive(Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Config file override.
    pub config_path: Option<PathBuf>,
    /// Agent id.
    pub agent: String,
    /// Channel hint.
    pub channel: Option<String>,
    /// Address hint.
    pub to: Option<String>,
    /// Thread hint.
    pub thread: Option<String>,
    /// Session store override.
    pub store: Option<PathBuf>,
}

impl ResolveArgs {
    fn hint(&self) -> DeliveryHint {
        DeliveryHint {
            channel: self.channel.clone(),
            to: self.to.clone(),
            thread_id: self.thread.as_deref().and_then(ThreadId::parse),
        }
    }
}

/// Run the resolve command.
pub async fn run_resolve(args: &ResolveArgs) -> Result<()> {
    let mut config = super::load_config(args.config_path.as_deref())?;
    if let Some(store) = &args.store {
        config.session.store = Some(store.display().to_string());
    }

    let agent = AgentId::new(&args.agent);
    let target = DeliveryTargetResolver::default()
        .resolve(&config, &agent, &args.hint())
        .await?;

    println!("{}", serde_json::to_string_pretty(&target)?);
    Ok(())
}
