//! Selector arena records.

use std::net::SocketAddr;

use crate::domain::{CategoryScope, IpFamily, ServerCategory, ServerEndpoint, ServiceFlags, Timestamp};

/// Index of a server in the selector arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerId(pub(super) usize);

/// One known access-point server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub addr: SocketAddr,
    pub category: ServerCategory,
    pub family: IpFamily,
    /// Intents currently assigned to this server
    pub pending: ServiceFlags,
    pub ever_succeeded: bool,
    /// Current cooldown; zero when healthy
    pub backoff_ms: u64,
    pub next_eligible_at: Timestamp,
    pub last_used_at: Timestamp,
}

impl ServerEntry {
    pub(super) fn new(endpoint: ServerEndpoint, category: ServerCategory) -> Self {
        Self {
            addr: endpoint.addr,
            category,
            family: endpoint.family,
            pending: ServiceFlags::EMPTY,
            ever_succeeded: false,
            backoff_ms: 0,
            next_eligible_at: Timestamp::ZERO,
            last_used_at: Timestamp::ZERO,
        }
    }

    pub fn matches(&self, family: IpFamily, scope: CategoryScope) -> bool {
        self.family == family && scope.matches(self.category)
    }

    pub fn is_eligible(&self, now: Timestamp) -> bool {
        self.next_eligible_at <= now
    }
}

/// Selector statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectorStats {
    pub total: usize,
    pub avail: usize,
    pub inuse: usize,
    /// Avail servers still cooling down
    pub backing_off: usize,
    /// Servers that answered successfully at least once
    pub proven: usize,
}
