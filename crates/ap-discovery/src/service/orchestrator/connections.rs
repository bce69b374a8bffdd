//! Connection callbacks and the send path.

use std::net::SocketAddr;

use tracing::{debug, warn};

use super::core::RequestOrchestrator;
use crate::domain::{
    ConnectionId, ErrorCode, LaneState, PendingRequest, RequestKey, ServiceFlags, Timestamp,
};
use crate::ports::{DiscoveryEventSink, TransportError, TransportEvents, TransportPool};

impl<T: TransportPool, S: DiscoveryEventSink> TransportEvents for RequestOrchestrator<T, S> {
    /// Flush requests queued on a connection that just completed.
    ///
    /// Stops at the first send failure: the connection is closed and its
    /// server reported failed. Requests still queued stay pending.
    fn on_connected(&mut self, connection: ConnectionId) {
        self.affinity.check();
        let queue = match self.connections.get_mut(&connection) {
            Some(owned) => {
                owned.connected = true;
                std::mem::take(&mut owned.queue)
            }
            None => {
                debug!(%connection, "connect completion for unknown connection");
                return;
            }
        };
        for id in queue {
            let Some(key) = self.key_of(id) else {
                continue;
            };
            if let Err(error) = self.send_request(connection, &key) {
                warn!(%connection, %error, "send after connect failed");
                let now = self.now();
                self.fail_connection(connection, now);
                break;
            }
        }
    }

    /// Transport-reported loss of a connection.
    fn on_disconnected(&mut self, connection: ConnectionId) {
        self.affinity.check();
        if !self.connections.contains_key(&connection) {
            return;
        }
        debug!(%connection, "connection lost");
        let now = self.now();
        self.fail_connection(connection, now);
    }

    fn on_response_packet(
        &mut self,
        category: u16,
        operation: u16,
        source: SocketAddr,
        is_udp: bool,
        body: &[u8],
    ) {
        self.affinity.check();
        self.dispatch_packet(category, operation, source, is_udp, body);
    }
}

impl<T: TransportPool, S: DiscoveryEventSink> RequestOrchestrator<T, S> {
    /// Serialize the request from its current intents and send it.
    pub(crate) fn send_request(
        &mut self,
        connection: ConnectionId,
        key: &RequestKey,
    ) -> Result<(), TransportError> {
        let Some(pending) = self.pending.get_mut(key) else {
            return Ok(());
        };
        if !pending.waits_on(connection) {
            return Ok(());
        }
        let packet = pending.request.encode(pending.opid, pending.flags);
        self.transport.send(connection, packet.to_bytes())?;
        pending.mark_sent(connection);
        debug!(%connection, kind = %pending.kind(), flags = %pending.flags, "request sent");
        Ok(())
    }

    /// Close a connection, fail its lanes and report the server failed for
    /// requests left without any lane to it.
    pub(crate) fn fail_connection(&mut self, connection: ConnectionId, now: Timestamp) {
        if let Some((server, failed)) = self.drop_connection(connection) {
            if !failed.is_empty() {
                self.selector
                    .report_failure(server, failed, ErrorCode::ConnectionFailed, now);
            }
        }
    }

    /// Close a connection and fail its lanes.
    ///
    /// Returns the server and the intents of requests that lost their last
    /// lane to it.
    pub(crate) fn drop_connection(
        &mut self,
        connection: ConnectionId,
    ) -> Option<(SocketAddr, ServiceFlags)> {
        let owned = self.connections.remove(&connection)?;
        self.transport.close(connection);

        let mut orphaned = ServiceFlags::EMPTY;
        for pending in self.pending.values_mut() {
            let touched = pending.finish_connection(connection, LaneState::Failed);
            if touched > 0 && !pending.has_active_lane_to(owned.server) {
                orphaned |= pending.flags;
            }
        }
        Some((owned.server, orphaned))
    }

    /// Close every connection no remaining lane waits on.
    pub(crate) fn release_idle_connections(&mut self) {
        let idle: Vec<ConnectionId> = self
            .connections
            .keys()
            .copied()
            .filter(|id| !self.pending.values().any(|pending| pending.waits_on(*id)))
            .collect();
        for id in idle {
            self.connections.remove(&id);
            self.transport.close(id);
            debug!(connection = %id, "idle connection closed");
        }
    }

    /// Withdraw a finished request's intents from servers still holding
    /// them, without judging those servers.
    pub(crate) fn release_lanes(&mut self, pending: &PendingRequest) {
        for lane in pending.lanes.iter().filter(|lane| lane.state.is_active()) {
            self.selector.release(lane.server, lane.flags);
        }
    }
}
