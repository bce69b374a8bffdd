//! # Access-Point Discovery & Load-Balancing Client
//!
//! Finds, ranks and fails over between access-point servers, then runs
//! discovery requests (channel join, configuration, proxy, worker,
//! lastmile, account, unified and report lookups) against them.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** Server selector with backoff, selection planning,
//!   request state, status mapping, events
//! - **Ports Layer:** Traits the host implements (transport pool, DNS, clock,
//!   event sink, policy gate) and the APIs the components expose
//! - **Service Layer:** `ServerSetManager`, `RequestOrchestrator`,
//!   `ProxyServerSelector`, `ReportServerClient`
//! - **Adapters Layer:** In-memory adapters, plus the tokio worker and
//!   tracing setup behind the `runtime` feature
//!
//! ## Threading
//!
//! Every component is owned by one worker and takes `&mut self`. Nothing is
//! `Send`; hosts marshal calls onto the owning thread (the `runtime`
//! feature's `WorkerHandle` does exactly that).
//!
//! ## Example
//!
//! ```rust
//! use ap_discovery::adapters::{RecordingEventSink, RecordingTransport, SystemTimeSource};
//! use ap_discovery::{
//!     ChannelJoinRequest, DiscoveryApi, DiscoveryRequest, OrchestratorConfig,
//!     RequestOrchestrator, ServerCategory, ServerEndpoint, ServerSetListener, ServerSetUpdate,
//! };
//!
//! let mut orchestrator = RequestOrchestrator::new(
//!     OrchestratorConfig::default(),
//!     RecordingTransport::new(),
//!     RecordingEventSink::new(),
//!     Box::new(SystemTimeSource::new()),
//! )
//! .unwrap();
//!
//! orchestrator.on_server_set(&ServerSetUpdate::Servers {
//!     category: ServerCategory::Default,
//!     servers: vec![ServerEndpoint::from_addr("192.0.2.1:8000".parse().unwrap())],
//! });
//!
//! let join = ChannelJoinRequest {
//!     key: "app-key".into(),
//!     channel: "room".into(),
//!     ..Default::default()
//! };
//! orchestrator.submit(DiscoveryRequest::ChannelJoin(join)).unwrap();
//!
//! // UDP goes out at once, TCP waits for its connect.
//! assert_eq!(orchestrator.transport().sent_count(), 1);
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Test utilities (ManualTimeSource, packet delivery)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// RE-EXPORTS
// =============================================================================

// Domain
pub use domain::{
    CancelCriteria, CategoryScope, ChannelJoinRequest, ConfigError, ConfigurationRequest,
    ConnectionId, DiscoveryError, DiscoveryEvent, DiscoveryRequest, EncryptionPolicy, ErrorCode,
    EventOutcome, EventPayload, EventSource, IpFamily, IpStackMode, NetworkState,
    OrchestratorConfig, ProxyAddressRequest, ProxyConfig, ReportConfig, RequestId, RequestKey,
    RequestKind, ResolvedAddress, SelectorConfig, ServerCategory, ServerEndpoint, ServerSelector,
    ServerSetConfig, ServerSetUpdate, ServiceFlags, Timestamp, TransportKind, TransportPolicy,
    UnifiedLookupRequest, UnifiedService,
};

// Ports
pub use ports::{
    ConfigProvider, DiscoveryApi, DiscoveryEventSink, DnsResolver, RequestGate, ServerSetListener,
    TimeSource, TimerDriven, TransportEvents, TransportPool,
};

// Services
pub use service::{
    ProxyChoice, ProxyServerSelector, ReportLookup, ReportServerClient, RequestOrchestrator,
    ServerSetManager,
};

pub use ap_wire;
