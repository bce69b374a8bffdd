//! # Driven Ports (Outbound SPI)
//!
//! Interfaces the host must implement. Every component runs on one worker,
//! so none of these traits require `Send` or `Sync`.

use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use thiserror::Error;

use crate::domain::{
    ConnectionId, DiscoveryEvent, DnsQueryId, OrchestratorConfig, ProxyConfig, ReportConfig,
    RequestKind, ServerCategory, ServerSetConfig, Timestamp, TransportKind,
};

/// Connection pool owned by the host.
///
/// `connect` only starts a connection; completion is reported back through
/// [`crate::ports::TransportEvents::on_connected`]. Datagram transports may
/// be connected immediately, which [`TransportPool::is_connected`] exposes.
pub trait TransportPool {
    fn connect(
        &mut self,
        server: SocketAddr,
        category: ServerCategory,
        kind: TransportKind,
    ) -> Result<ConnectionId, TransportError>;

    fn is_connected(&self, connection: ConnectionId) -> bool;

    /// Send one framed packet.
    fn send(&mut self, connection: ConnectionId, packet: Bytes) -> Result<(), TransportError>;

    fn close(&mut self, connection: ConnectionId);
}

/// Errors from transport operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("cannot connect to {0}")]
    ConnectFailed(SocketAddr),

    #[error("send failed on {0}")]
    SendFailed(ConnectionId),

    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
}

/// Record type of a DNS query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Aaaa,
}

/// Asynchronous resolver. Results are delivered to
/// `ServerSetManager::on_dns_resolved` with the returned query id.
pub trait DnsResolver {
    fn resolve(&mut self, domain: &str, record: RecordType) -> Result<DnsQueryId, DnsError>;

    fn cancel(&mut self, query: DnsQueryId);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsError {
    #[error("no records for {0}")]
    NoRecords(String),

    #[error("resolution of {domain} failed: {reason}")]
    Failed { domain: String, reason: String },
}

/// Resolution result as delivered back to the manager.
pub type DnsResult = Result<Vec<IpAddr>, DnsError>;

/// Clock of the owning worker.
pub trait TimeSource {
    fn now(&self) -> Timestamp;
}

/// Receives every discovery event synchronously, on the worker.
pub trait DiscoveryEventSink {
    fn on_event(&mut self, event: &DiscoveryEvent);
}

/// Host policy consulted before a request is submitted or retried.
pub trait RequestGate {
    /// `false` vetoes the request.
    fn permit(&self, kind: RequestKind) -> bool;
}

/// Programmatic configuration source.
pub trait ConfigProvider {
    fn orchestrator_config(&self) -> OrchestratorConfig;

    fn server_set_config(&self) -> ServerSetConfig;

    fn proxy_config(&self) -> ProxyConfig;

    fn report_config(&self) -> ReportConfig;
}
