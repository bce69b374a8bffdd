//! ServerSelector implementation.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::Duration;

use tracing::{debug, warn};

use super::config::SelectorConfig;
use super::entry::{SelectorStats, ServerEntry, ServerId};
use crate::domain::{
    CategoryScope, ErrorCode, IpFamily, ServerCategory, ServerEndpoint, ServiceFlags, Timestamp,
};

/// Candidate pool with availability and backoff bookkeeping.
///
/// Every known server lives in one arena slot and is referenced by exactly
/// one of `avail` or `inuse`.
#[derive(Debug, Clone, Default)]
pub struct ServerSelector {
    entries: Vec<ServerEntry>,
    index: HashMap<SocketAddr, ServerId>,
    /// Idle servers, front = preferred
    avail: VecDeque<ServerId>,
    /// Servers with outstanding intents, in assignment order
    inuse: Vec<ServerId>,
    config: SelectorConfig,
}

impl ServerSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Add servers of `category`. Addresses already known are ignored.
    ///
    /// Returns the number of servers added.
    pub fn update(&mut self, servers: &[ServerEndpoint], category: ServerCategory) -> usize {
        let mut added = 0;
        for endpoint in servers {
            if self.index.contains_key(&endpoint.addr) {
                continue;
            }
            let id = ServerId(self.entries.len());
            self.entries.push(ServerEntry::new(*endpoint, category));
            self.index.insert(endpoint.addr, id);
            self.avail.push_back(id);
            added += 1;
        }
        if added > 0 {
            debug!(%category, added, total = self.entries.len(), "selector updated");
        }
        added
    }

    /// Pick a server for `flags`.
    ///
    /// An in-use server of the right category and family whose pending
    /// intents do not overlap `flags` is reused first. Otherwise the first
    /// eligible idle server is assigned. Returns `None` without touching any
    /// state when nothing qualifies.
    pub fn select(
        &mut self,
        family: IpFamily,
        flags: ServiceFlags,
        category: ServerCategory,
        now: Timestamp,
    ) -> Option<SocketAddr> {
        if flags.is_empty() {
            return None;
        }
        let scope = CategoryScope::Only(category);

        let reusable = self.inuse.iter().copied().find(|id| {
            let entry = &self.entries[id.0];
            entry.matches(family, scope) && !entry.pending.intersects(flags)
        });
        if let Some(id) = reusable {
            let entry = &mut self.entries[id.0];
            entry.pending |= flags;
            debug!(server = %entry.addr, %flags, pending = %entry.pending, "reusing in-use server");
            return Some(entry.addr);
        }

        let position = self.avail.iter().position(|id| {
            let entry = &self.entries[id.0];
            entry.matches(family, scope) && entry.is_eligible(now)
        })?;
        let id = self.avail.remove(position)?;
        self.inuse.push(id);

        let entry = &mut self.entries[id.0];
        entry.pending = flags;
        entry.last_used_at = now;
        debug!(server = %entry.addr, %flags, %category, "server selected");
        Some(entry.addr)
    }

    /// Clear `flags` from an in-use server after a failure.
    ///
    /// Once nothing is pending the server backs off and goes to the back of
    /// the idle queue. Returns `false` if `addr` is not in use.
    pub fn report_failure(
        &mut self,
        addr: SocketAddr,
        flags: ServiceFlags,
        reason: ErrorCode,
        now: Timestamp,
    ) -> bool {
        let Some(position) = self.inuse_position(addr) else {
            return false;
        };
        let id = self.inuse[position];
        let entry = &mut self.entries[id.0];
        entry.pending.remove(flags);
        if !entry.pending.is_empty() {
            debug!(server = %addr, %flags, %reason, "partial failure, server still in use");
            return true;
        }

        entry.backoff_ms = self.config.next_backoff(entry.backoff_ms);
        entry.next_eligible_at = now.add_millis(entry.backoff_ms);
        warn!(
            server = %addr,
            %reason,
            backoff_ms = entry.backoff_ms,
            ever_succeeded = entry.ever_succeeded,
            "server failed, backing off"
        );
        self.inuse.remove(position);
        self.avail.push_back(id);
        true
    }

    /// Clear `flags` from an in-use server after a success.
    ///
    /// Once nothing is pending the cooldown is reset and the server goes to
    /// the front of the idle queue. Returns `false` if `addr` is not in use.
    pub fn report_success(&mut self, addr: SocketAddr, flags: ServiceFlags) -> bool {
        let Some(position) = self.inuse_position(addr) else {
            return false;
        };
        let id = self.inuse[position];
        let entry = &mut self.entries[id.0];
        entry.pending.remove(flags);
        entry.ever_succeeded = true;
        if !entry.pending.is_empty() {
            return true;
        }

        entry.backoff_ms = 0;
        entry.next_eligible_at = Timestamp::ZERO;
        debug!(server = %addr, "server released after success");
        self.inuse.remove(position);
        self.avail.push_front(id);
        true
    }

    /// Withdraw `flags` from an in-use server without judging its health,
    /// e.g. when the request was answered elsewhere or cancelled.
    ///
    /// Once nothing is pending the server goes to the back of the idle queue
    /// with its cooldown unchanged.
    pub fn release(&mut self, addr: SocketAddr, flags: ServiceFlags) -> bool {
        let Some(position) = self.inuse_position(addr) else {
            return false;
        };
        let id = self.inuse[position];
        let entry = &mut self.entries[id.0];
        entry.pending.remove(flags);
        if entry.pending.is_empty() {
            self.inuse.remove(position);
            self.avail.push_back(id);
        }
        true
    }

    /// Fail every in-use server whose last assignment is older than `timeout`.
    ///
    /// Returns the affected addresses; none of them remain in use.
    pub fn check_timeout(&mut self, timeout: Duration, now: Timestamp) -> Vec<SocketAddr> {
        let expired: Vec<(SocketAddr, ServiceFlags)> = self
            .inuse
            .iter()
            .map(|id| &self.entries[id.0])
            .filter(|entry| now.saturating_since(entry.last_used_at) > timeout)
            .map(|entry| (entry.addr, entry.pending))
            .collect();

        for (addr, pending) in &expired {
            self.report_failure(*addr, *pending, ErrorCode::ResponseTimeout, now);
        }
        if !expired.is_empty() {
            debug!(expired = expired.len(), "timeout sweep");
        }
        expired.into_iter().map(|(addr, _)| addr).collect()
    }

    /// Return every in-use server to the idle queue with nothing pending.
    /// Cooldowns are left untouched.
    pub fn recycle_all(&mut self) {
        for id in self.inuse.drain(..) {
            self.entries[id.0].pending = ServiceFlags::EMPTY;
            self.avail.push_back(id);
        }
    }

    /// Forget every server.
    pub fn reinitialize(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.avail.clear();
        self.inuse.clear();
    }

    /// Forget every server of `category`, keeping the order of the rest.
    pub fn clear_category(&mut self, category: ServerCategory) {
        let old_entries = std::mem::take(&mut self.entries);
        let mut remap: HashMap<ServerId, ServerId> = HashMap::new();
        self.index.clear();
        for (old, entry) in old_entries.into_iter().enumerate() {
            if entry.category == category {
                continue;
            }
            let id = ServerId(self.entries.len());
            remap.insert(ServerId(old), id);
            self.index.insert(entry.addr, id);
            self.entries.push(entry);
        }
        self.avail = self.avail.iter().filter_map(|id| remap.get(id).copied()).collect();
        self.inuse = self.inuse.iter().filter_map(|id| remap.get(id).copied()).collect();
    }

    /// In-use servers of `family` within `scope` waiting on any of `flags`.
    /// Empty `flags` counts every matching in-use server.
    pub fn inuse_size(&self, flags: ServiceFlags, family: IpFamily, scope: CategoryScope) -> usize {
        self.inuse
            .iter()
            .map(|id| &self.entries[id.0])
            .filter(|entry| entry.matches(family, scope))
            .filter(|entry| flags.is_empty() || entry.pending.intersects(flags))
            .count()
    }

    /// Idle servers of `family` within `scope`, eligible or not.
    pub fn avail_size(&self, family: IpFamily, scope: CategoryScope) -> usize {
        self.avail
            .iter()
            .filter(|id| self.entries[id.0].matches(family, scope))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.index.contains_key(addr)
    }

    pub fn is_inuse(&self, addr: &SocketAddr) -> bool {
        self.inuse_position(*addr).is_some()
    }

    pub fn entry(&self, addr: &SocketAddr) -> Option<&ServerEntry> {
        self.index.get(addr).map(|id| &self.entries[id.0])
    }

    /// Idle servers front to back.
    pub fn avail_order(&self) -> Vec<SocketAddr> {
        self.avail.iter().map(|id| self.entries[id.0].addr).collect()
    }

    /// In-use servers in assignment order.
    pub fn inuse_servers(&self) -> Vec<SocketAddr> {
        self.inuse.iter().map(|id| self.entries[id.0].addr).collect()
    }

    pub fn has_inuse(&self) -> bool {
        !self.inuse.is_empty()
    }

    pub fn stats(&self, now: Timestamp) -> SelectorStats {
        SelectorStats {
            total: self.entries.len(),
            avail: self.avail.len(),
            inuse: self.inuse.len(),
            backing_off: self
                .avail
                .iter()
                .filter(|id| !self.entries[id.0].is_eligible(now))
                .count(),
            proven: self.entries.iter().filter(|entry| entry.ever_succeeded).count(),
        }
    }

    fn inuse_position(&self, addr: SocketAddr) -> Option<usize> {
        let id = self.index.get(&addr)?;
        self.inuse.iter().position(|candidate| candidate == id)
    }
}
