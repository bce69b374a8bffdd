//! Transport pool adapters for hosts without a pool and for tests.

use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;

use ap_wire::Packet;
use bytes::Bytes;

use crate::domain::{ConnectionId, ServerCategory, TransportKind};
use crate::ports::{TransportError, TransportPool};

// ============================================================================
// NoOpTransport - Accepts everything, delivers nothing
// ============================================================================

/// Transport that hands out connection ids and drops every packet.
#[derive(Debug, Default)]
pub struct NoOpTransport {
    next_id: u64,
}

impl NoOpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransportPool for NoOpTransport {
    fn connect(
        &mut self,
        _server: SocketAddr,
        _category: ServerCategory,
        _kind: TransportKind,
    ) -> Result<ConnectionId, TransportError> {
        self.next_id += 1;
        Ok(ConnectionId(self.next_id))
    }

    fn is_connected(&self, _connection: ConnectionId) -> bool {
        true
    }

    fn send(&mut self, _connection: ConnectionId, _packet: Bytes) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self, _connection: ConnectionId) {}
}

// ============================================================================
// RecordingTransport - Inspectable in-memory pool
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedConnection {
    pub id: ConnectionId,
    pub server: SocketAddr,
    pub category: ServerCategory,
    pub kind: TransportKind,
    pub connected: bool,
    pub closed: bool,
}

/// In-memory pool recording connects, sends and closes.
///
/// UDP connections are connected immediately unless configured otherwise;
/// stream connections wait for [`RecordingTransport::complete`].
#[derive(Debug, Default)]
pub struct RecordingTransport {
    connections: Vec<RecordedConnection>,
    sent: VecDeque<(ConnectionId, Bytes)>,
    unreachable: HashSet<SocketAddr>,
    failing_sends: HashSet<ConnectionId>,
    udp_needs_connect: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make UDP connections wait for `complete` like stream ones.
    #[must_use]
    pub fn with_deferred_udp(mut self) -> Self {
        self.udp_needs_connect = true;
        self
    }

    /// Refuse connects to `server`.
    pub fn set_unreachable(&mut self, server: SocketAddr) {
        self.unreachable.insert(server);
    }

    /// Fail every send on `connection`.
    pub fn fail_sends_on(&mut self, connection: ConnectionId) {
        self.failing_sends.insert(connection);
    }

    /// Mark a connection connected; the caller then reports `on_connected`.
    pub fn complete(&mut self, connection: ConnectionId) {
        if let Some(recorded) = self.find_mut(connection) {
            recorded.connected = true;
        }
    }

    pub fn connections(&self) -> &[RecordedConnection] {
        &self.connections
    }

    pub fn open_connections(&self) -> Vec<&RecordedConnection> {
        self.connections.iter().filter(|c| !c.closed).collect()
    }

    pub fn connection_to(&self, server: SocketAddr, kind: TransportKind) -> Option<ConnectionId> {
        self.connections
            .iter()
            .rev()
            .find(|c| c.server == server && c.kind == kind && !c.closed)
            .map(|c| c.id)
    }

    pub fn server_of(&self, connection: ConnectionId) -> Option<SocketAddr> {
        self.connections
            .iter()
            .find(|c| c.id == connection)
            .map(|c| c.server)
    }

    /// Packets sent so far, oldest first.
    pub fn sent(&self) -> impl Iterator<Item = &(ConnectionId, Bytes)> {
        self.sent.iter()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.len()
    }

    pub fn take_sent(&mut self) -> Vec<(ConnectionId, Bytes)> {
        self.sent.drain(..).collect()
    }

    /// Sent packets that parse, oldest first.
    pub fn sent_packets(&self) -> Vec<(ConnectionId, Packet)> {
        self.sent
            .iter()
            .filter_map(|(id, bytes)| Packet::parse(bytes).ok().map(|packet| (*id, packet)))
            .collect()
    }

    fn find_mut(&mut self, connection: ConnectionId) -> Option<&mut RecordedConnection> {
        self.connections.iter_mut().find(|c| c.id == connection)
    }
}

impl TransportPool for RecordingTransport {
    fn connect(
        &mut self,
        server: SocketAddr,
        category: ServerCategory,
        kind: TransportKind,
    ) -> Result<ConnectionId, TransportError> {
        if self.unreachable.contains(&server) {
            return Err(TransportError::ConnectFailed(server));
        }
        let id = ConnectionId(self.connections.len() as u64 + 1);
        self.connections.push(RecordedConnection {
            id,
            server,
            category,
            kind,
            connected: kind.is_udp() && !self.udp_needs_connect,
            closed: false,
        });
        Ok(id)
    }

    fn is_connected(&self, connection: ConnectionId) -> bool {
        self.connections
            .iter()
            .any(|c| c.id == connection && c.connected && !c.closed)
    }

    fn send(&mut self, connection: ConnectionId, packet: Bytes) -> Result<(), TransportError> {
        if self.failing_sends.contains(&connection) {
            return Err(TransportError::SendFailed(connection));
        }
        match self.connections.iter().find(|c| c.id == connection) {
            Some(c) if !c.closed => {
                self.sent.push_back((connection, packet));
                Ok(())
            }
            _ => Err(TransportError::UnknownConnection(connection)),
        }
    }

    fn close(&mut self, connection: ConnectionId) {
        if let Some(recorded) = self.find_mut(connection) {
            recorded.closed = true;
            recorded.connected = false;
        }
    }
}
