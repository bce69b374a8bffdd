//! # Adapters
//!
//! Concrete implementations of the driven ports.
//!
//! - `config`, `dns`, `events`, `time`, `transport`: in-memory adapters for
//!   hosts that configure everything in code, and for tests
//! - `telemetry`, `runtime`: tracing setup and the tokio worker.
//!   Requires feature: `runtime`

pub mod config;
pub mod dns;
pub mod events;
pub mod time;
pub mod transport;

#[cfg(feature = "runtime")]
pub mod runtime;
#[cfg(feature = "runtime")]
pub mod telemetry;

pub use config::StaticConfigProvider;
pub use dns::{DnsQuery, StaticDnsResolver};
pub use events::{RecordingEventSink, TracingEventSink};
pub use time::SystemTimeSource;
pub use transport::{NoOpTransport, RecordedConnection, RecordingTransport};

#[cfg(feature = "runtime")]
pub use runtime::{
    ChannelEventSink, DiscoveryWorker, TokioDnsResolver, TokioTimeSource, WorkerCommand,
    WorkerError, WorkerHandle,
};
#[cfg(feature = "runtime")]
pub use telemetry::{init_tracing, init_tracing_with, TelemetryConfig, TelemetryError};
