//! # Driving Ports (Inbound API)
//!
//! Entry points the host calls on the worker that owns the components.

use std::net::SocketAddr;

use crate::domain::{
    CancelCriteria, ConnectionId, DiscoveryError, DiscoveryRequest, RequestId, ServerSetUpdate,
    Timestamp,
};

/// Request submission and cancellation.
pub trait DiscoveryApi {
    /// Submit or merge a request and start selection immediately.
    ///
    /// # Errors
    ///
    /// - `Aborted` if the policy gate vetoes it (nothing is stored)
    /// - `NoAvailableCandidate` if no lane could be opened yet; the request
    ///   stays pending and is retried by the timer
    fn submit(&mut self, request: DiscoveryRequest) -> Result<RequestId, DiscoveryError>;

    /// Remove matching pending requests.
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing matched.
    fn cancel(&mut self, criteria: CancelCriteria) -> Result<(), DiscoveryError>;

    /// Drop every pending request and owned connection.
    fn stop_all(&mut self);
}

/// Callbacks from the transport pool.
pub trait TransportEvents {
    fn on_connected(&mut self, connection: ConnectionId);

    fn on_disconnected(&mut self, connection: ConnectionId);

    /// One received packet, header included in `category` and `operation`.
    fn on_response_packet(
        &mut self,
        category: u16,
        operation: u16,
        source: SocketAddr,
        is_udp: bool,
        body: &[u8],
    );
}

/// Components driven by a periodic timer.
pub trait TimerDriven {
    fn on_tick(&mut self);

    /// When `on_tick` should next run; `None` while the timer is disarmed.
    fn next_deadline(&self) -> Option<Timestamp>;
}

/// Consumers of access-point server lists.
pub trait ServerSetListener {
    fn on_server_set(&mut self, update: &ServerSetUpdate);
}
