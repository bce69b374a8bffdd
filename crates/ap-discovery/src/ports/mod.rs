//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** APIs the discovery components expose
//! - **Driven Ports (Outbound):** SPIs the host provides (transport, DNS,
//!   clock, event sink, policy gate, configuration)

pub mod inbound;
pub mod outbound;

pub use inbound::{DiscoveryApi, ServerSetListener, TimerDriven, TransportEvents};
pub use outbound::{
    ConfigProvider, DiscoveryEventSink, DnsError, DnsResolver, DnsResult, RecordType, RequestGate,
    TimeSource, TransportError, TransportPool,
};
