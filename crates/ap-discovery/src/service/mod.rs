//! Service Layer - Components wiring the domain to the ports
//!
//! - [`ServerSetManager`] resolves server lists and pushes them to listeners
//! - [`RequestOrchestrator`] runs discovery requests over pooled connections
//! - [`ProxyServerSelector`] rotates static and discovered proxies
//! - [`ReportServerClient`] keeps the report server list fresh

mod affinity;
mod timer;

pub mod orchestrator;
pub mod proxy;
pub mod report;
pub mod server_set;

pub use affinity::WorkerAffinity;
pub use orchestrator::{OwnedConnection, RequestOrchestrator};
pub use proxy::{ProxyChoice, ProxyServerSelector};
pub use report::{ReportLookup, ReportServerClient};
pub use server_set::ServerSetManager;
pub use timer::RetryTimer;
