//! Pending request state.

use std::net::SocketAddr;
use std::time::Duration;

use super::kinds::{DiscoveryRequest, RequestKey, RequestKind};
use crate::domain::{ConnectionId, RequestId, ServiceFlags, Timestamp};

/// Request lifecycle. `Complete` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    Idle,
    Working,
    Complete,
    Aborted,
}

/// Progress of one (server, connection) attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneState {
    Connecting,
    Sent,
    Succeeded,
    Failed,
}

impl LaneState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Sent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    pub server: SocketAddr,
    pub connection: ConnectionId,
    /// Intents asked for when the lane was opened
    pub flags: ServiceFlags,
    pub state: LaneState,
    pub opened_at: Timestamp,
}

/// A submitted request and its in-flight lanes.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub id: RequestId,
    pub request: DiscoveryRequest,
    /// Outstanding intents, cleared bit by bit on success
    pub flags: ServiceFlags,
    /// Per-submission seed sent as the wire opid
    pub opid: u64,
    pub issued_at: Timestamp,
    pub try_count: u32,
    pub success_count: u32,
    pub state: RequestState,
    pub lanes: Vec<Lane>,
}

impl PendingRequest {
    pub fn new(id: RequestId, request: DiscoveryRequest, opid: u64, now: Timestamp) -> Self {
        Self {
            id,
            flags: request.initial_flags(),
            request,
            opid,
            issued_at: now,
            try_count: 0,
            success_count: 0,
            state: RequestState::Idle,
            lanes: Vec::new(),
        }
    }

    pub fn key(&self) -> RequestKey {
        self.request.key()
    }

    pub fn kind(&self) -> RequestKind {
        self.request.kind()
    }

    pub fn start(&mut self) {
        if self.state == RequestState::Idle {
            self.state = RequestState::Working;
        }
    }

    /// Fold a resubmission into this request: intents are ORed, the context
    /// and seed replaced and the retry count reset.
    pub fn merge(&mut self, request: DiscoveryRequest, opid: u64) {
        self.flags |= request.initial_flags();
        self.request = request;
        self.opid = opid;
        self.try_count = 0;
        self.state = RequestState::Working;
    }

    /// Clear answered intents. Returns the bits that were actually
    /// outstanding; empty means the answer was a late duplicate.
    pub fn complete_flags(&mut self, answered: ServiceFlags) -> ServiceFlags {
        let cleared = self.flags & answered;
        if cleared.is_empty() {
            return cleared;
        }
        self.flags.remove(cleared);
        self.success_count += 1;
        if self.flags.is_empty() {
            self.state = RequestState::Complete;
        }
        cleared
    }

    pub fn abort(&mut self) {
        self.state = RequestState::Aborted;
    }

    pub fn is_working(&self) -> bool {
        self.state == RequestState::Working
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, RequestState::Complete | RequestState::Aborted)
    }

    pub fn elapsed(&self, now: Timestamp) -> Duration {
        now.saturating_since(self.issued_at)
    }

    pub fn open_lane(&mut self, server: SocketAddr, connection: ConnectionId, now: Timestamp) {
        self.lanes.push(Lane {
            server,
            connection,
            flags: self.flags,
            state: LaneState::Connecting,
            opened_at: now,
        });
    }

    /// Whether an active lane uses `connection`.
    pub fn waits_on(&self, connection: ConnectionId) -> bool {
        self.lanes
            .iter()
            .any(|lane| lane.connection == connection && lane.state.is_active())
    }

    pub fn mark_sent(&mut self, connection: ConnectionId) {
        for lane in &mut self.lanes {
            if lane.connection == connection && lane.state == LaneState::Connecting {
                lane.state = LaneState::Sent;
            }
        }
    }

    /// Move every active lane towards `server` to `state`.
    /// Returns the number of lanes touched.
    pub fn finish_server(&mut self, server: SocketAddr, state: LaneState) -> usize {
        let mut touched = 0;
        for lane in &mut self.lanes {
            if lane.server == server && lane.state.is_active() {
                lane.state = state;
                touched += 1;
            }
        }
        touched
    }

    /// Move every active lane on `connection` to `state`.
    pub fn finish_connection(&mut self, connection: ConnectionId, state: LaneState) -> usize {
        let mut touched = 0;
        for lane in &mut self.lanes {
            if lane.connection == connection && lane.state.is_active() {
                lane.state = state;
                touched += 1;
            }
        }
        touched
    }

    pub fn has_active_lane_to(&self, server: SocketAddr) -> bool {
        self.lanes
            .iter()
            .any(|lane| lane.server == server && lane.state.is_active())
    }

    /// Union of the intents asked of `server` on still-active lanes.
    pub fn active_flags_to(&self, server: SocketAddr) -> ServiceFlags {
        self.lanes
            .iter()
            .filter(|lane| lane.server == server && lane.state.is_active())
            .fold(ServiceFlags::EMPTY, |acc, lane| acc | lane.flags)
    }

    /// Mark lanes towards `server` succeeded once none of their intents is
    /// still outstanding.
    pub fn settle_answered(&mut self, server: SocketAddr) -> usize {
        let outstanding = self.flags;
        let mut touched = 0;
        for lane in &mut self.lanes {
            if lane.server == server && lane.state.is_active() && !lane.flags.intersects(outstanding) {
                lane.state = LaneState::Succeeded;
                touched += 1;
            }
        }
        touched
    }

    /// Servers whose active lanes asked for every outstanding intent.
    /// Lanes opened before a merge added intents do not count.
    pub fn covering_servers(&self) -> Vec<SocketAddr> {
        let mut servers: Vec<SocketAddr> = Vec::new();
        for lane in &self.lanes {
            if lane.state.is_active() && lane.flags.contains(self.flags) && !servers.contains(&lane.server) {
                servers.push(lane.server);
            }
        }
        servers
    }

    /// Distinct servers with at least one active lane.
    pub fn active_servers(&self) -> Vec<SocketAddr> {
        let mut servers: Vec<SocketAddr> = Vec::new();
        for lane in self.lanes.iter().filter(|lane| lane.state.is_active()) {
            if !servers.contains(&lane.server) {
                servers.push(lane.server);
            }
        }
        servers
    }

    /// Connections referenced by any lane.
    pub fn connections(&self) -> Vec<ConnectionId> {
        let mut connections: Vec<ConnectionId> = self.lanes.iter().map(|lane| lane.connection).collect();
        connections.sort();
        connections.dedup();
        connections
    }

    /// Drop finished lanes before a new selection round.
    pub fn prune_lanes(&mut self) {
        self.lanes.retain(|lane| lane.state.is_active());
    }
}

/// Which pending request(s) a cancellation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelCriteria {
    Id(RequestId),
    /// Channel-join request for this channel
    Channel(String),
    Kind(RequestKind),
}

impl CancelCriteria {
    pub fn matches(&self, pending: &PendingRequest) -> bool {
        match self {
            Self::Id(id) => pending.id == *id,
            Self::Channel(channel) => pending.key() == RequestKey::Channel(channel.clone()),
            Self::Kind(kind) => pending.kind() == *kind,
        }
    }
}
