//! Binding table lookups.

use openclaw_core::{AgentId, Binding, normalize_id};

/// Account value that grants a channel without naming an account.
pub const WILDCARD_ACCOUNT: &str = "*";

/// Read-only view over the configured bindings.
///
/// Bindings are consulted in declaration order.
#[derive(Debug, Clone, Copy)]
pub struct BindingTable<'a> {
    bindings: &'a [Binding],
}

impl<'a> BindingTable<'a> {
    /// Wrap the configured bindings.
    #[must_use]
    pub const fn new(bindings: &'a [Binding]) -> Self {
        Self { bindings }
    }

    /// Bindings for `agent_id` on `channel`, in declaration order.
    pub fn matching(
        &self,
        agent_id: &AgentId,
        channel: &str,
    ) -> impl Iterator<Item = &'a Binding> + use<'a> {
        let agent = agent_id.normalized();
        let channel = normalize_id(channel);
        let bindings: &'a [Binding] = self.bindings;
        bindings.iter().filter(move |binding| {
            normalize_id(&binding.agent_id) == agent && normalize_id(&binding.matcher.channel) == channel
        })
    }

    /// Account bound to `agent_id` on `channel`.
    ///
    /// The first binding naming a concrete account wins. Further matches
    /// are ignored with a warning.
    #[must_use]
    pub fn account_for(&self, agent_id: &AgentId, channel: &str) -> Option<&'a str> {
        let mut accounts = self
            .matching(agent_id, channel)
            .filter_map(|binding| concrete_account(binding.matcher.account_id.as_deref()));

        let first = accounts.next()?;
        let ignored: Vec<&str> = accounts.collect();
        if !ignored.is_empty() {
            tracing::warn!(
                agent_id = %agent_id,
                channel,
                selected = first,
                ?ignored,
                "Multiple bindings match; using the first declared"
            );
        }
        Some(first)
    }
}

fn concrete_account(account_id: Option<&str>) -> Option<&str> {
    account_id
        .map(str::trim)
        .filter(|account| !account.is_empty() && *account != WILDCARD_ACCOUNT)
}
