//! # Discovery Requests
//!
//! Request contexts submitted by callers, and the pending state the
//! orchestrator keeps for each of them while lanes are in flight.
//!
//! A request is serialized lazily from its current outstanding flags, so a
//! retry only asks for the intents that have not been answered yet.

mod kinds;
mod pending;

pub use kinds::{
    AccountRegistrationRequest, ChannelJoinRequest, ConfigurationRequest, DiscoveryRequest,
    LastmileTestRequest, ProxyAddressRequest, ProxyKind, RequestKey, RequestKind,
    UnifiedLookupRequest, UnifiedService, WorkerAllocationRequest,
};
pub use pending::{CancelCriteria, Lane, LaneState, PendingRequest, RequestState};
