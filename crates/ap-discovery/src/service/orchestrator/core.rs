//! RequestOrchestrator state and construction.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::SocketAddr;

use ap_wire::PacketKind;

use super::dispatch::{default_handlers, ResponseHandler};
use crate::domain::{
    ConfigError, ConnectionId, DiscoveryEvent, IpStackMode, OrchestratorConfig, PendingRequest,
    RequestId, RequestKey, RequestKind, ServerCategory, ServerSelector, Timestamp, TransportKind,
    TransportPolicy,
};
use crate::ports::{DiscoveryEventSink, RequestGate, TimeSource, TransportPool};
use crate::service::{RetryTimer, WorkerAffinity};

/// A transport connection opened on behalf of pending requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedConnection {
    pub id: ConnectionId,
    pub server: SocketAddr,
    pub category: ServerCategory,
    pub kind: TransportKind,
    pub connected: bool,
    /// Requests waiting for the connect to complete, oldest first
    pub queue: VecDeque<RequestId>,
}

/// Owns pending requests and multiplexes them over pooled connections.
///
/// All methods take `&mut self` and must be called on the owning worker.
///
/// # Example
///
/// ```rust,ignore
/// let mut orchestrator = RequestOrchestrator::new(
///     OrchestratorConfig::default(),
///     transport,
///     sink,
///     Box::new(SystemTimeSource::new()),
/// )?;
/// orchestrator.on_server_set(&update);
/// let id = orchestrator.submit(DiscoveryRequest::ChannelJoin(join))?;
/// ```
pub struct RequestOrchestrator<T: TransportPool, S: DiscoveryEventSink> {
    pub(crate) config: OrchestratorConfig,
    pub(crate) selector: ServerSelector,
    pub(crate) transport: T,
    pub(crate) sink: S,
    pub(crate) time_source: Box<dyn TimeSource>,
    pub(crate) gate: Option<Box<dyn RequestGate>>,
    pub(crate) pending: BTreeMap<RequestKey, PendingRequest>,
    pub(crate) connections: HashMap<ConnectionId, OwnedConnection>,
    pub(crate) handlers: HashMap<PacketKind, ResponseHandler<T, S>>,
    pub(crate) timer: RetryTimer,
    pub(crate) next_request_id: u64,
    pub(crate) affinity: WorkerAffinity,
}

impl<T: TransportPool, S: DiscoveryEventSink> RequestOrchestrator<T, S> {
    /// Create an orchestrator owned by the calling thread.
    pub fn new(
        config: OrchestratorConfig,
        transport: T,
        sink: S,
        time_source: Box<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            selector: ServerSelector::new(config.selector.clone()),
            timer: RetryTimer::new(config.tick_interval),
            config,
            transport,
            sink,
            time_source,
            gate: None,
            pending: BTreeMap::new(),
            connections: HashMap::new(),
            handlers: default_handlers(),
            next_request_id: 1,
            affinity: WorkerAffinity::current(),
        })
    }

    /// Install the policy gate consulted on submit and on every retry.
    #[must_use]
    pub fn with_gate(mut self, gate: Box<dyn RequestGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn selector(&self) -> &ServerSelector {
        &self.selector
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_request(&self, id: RequestId) -> Option<&PendingRequest> {
        self.pending.values().find(|pending| pending.id == id)
    }

    pub fn pending_for(&self, key: &RequestKey) -> Option<&PendingRequest> {
        self.pending.get(key)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&OwnedConnection> {
        self.connections.get(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    /// Change encryption or forced-TCP behaviour for future selections.
    pub fn set_transport_policy(&mut self, policy: TransportPolicy) {
        self.affinity.check();
        self.config.transport_policy = policy;
    }

    pub fn set_ip_stack_mode(&mut self, stack: IpStackMode) {
        self.affinity.check();
        self.config.ip_stack = stack;
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.time_source.now()
    }

    pub(crate) fn permits(&self, kind: RequestKind) -> bool {
        self.gate.as_ref().map_or(true, |gate| gate.permit(kind))
    }

    pub(crate) fn allocate_id(&mut self) -> RequestId {
        let id = RequestId(self.next_request_id);
        self.next_request_id += 1;
        id
    }

    pub(crate) fn emit(&mut self, event: DiscoveryEvent) {
        self.sink.on_event(&event);
    }

    pub(crate) fn key_of(&self, id: RequestId) -> Option<RequestKey> {
        self.pending
            .iter()
            .find(|(_, pending)| pending.id == id)
            .map(|(key, _)| key.clone())
    }
}
