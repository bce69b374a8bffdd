//! # Tokio Discovery Worker
//!
//! Owns the server-set manager and the request orchestrator on one task and
//! drives them from three sources:
//!
//! ```text
//!   WorkerHandle ──WorkerCommand──┐
//!   lookup_host tasks ──results───┼──▶ DiscoveryWorker::run ──▶ event stream
//!   sleep_until(next deadline) ───┘
//! ```
//!
//! The components are `!Send`, so the worker must be built and run on the
//! same thread inside a [`tokio::task::LocalSet`]. [`WorkerHandle`] is the
//! only cross-thread entry point; the host's transport pool reports
//! completions and inbound packets through it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::rc::Rc;
use std::time::Duration;

use ap_wire::WireMessage;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{
    CancelCriteria, ConfigError, ConnectionId, DiscoveryError, DiscoveryEvent, DiscoveryRequest,
    DnsQueryId, EncryptionPolicy, NetworkState, RequestId, Timestamp, TransportPolicy,
};
use crate::ports::{
    ConfigProvider, DiscoveryApi, DiscoveryEventSink, DnsError, DnsResolver, DnsResult,
    RecordType, TimeSource, TimerDriven, TransportEvents, TransportPool,
};
use crate::service::{RequestOrchestrator, ServerSetManager};

// ============================================================================
// Commands and handle
// ============================================================================

/// Everything the worker can be asked to do.
#[derive(Debug)]
pub enum WorkerCommand {
    Submit {
        request: DiscoveryRequest,
        reply: oneshot::Sender<Result<RequestId, DiscoveryError>>,
    },
    Cancel {
        criteria: CancelCriteria,
        reply: oneshot::Sender<Result<(), DiscoveryError>>,
    },
    StopAll,
    NetworkChanged(NetworkState),
    Dns64Prefix(Option<Ipv6Addr>),
    SetEncryption(EncryptionPolicy),
    SetForceTcp(bool),
    Connected(ConnectionId),
    Disconnected(ConnectionId),
    Packet {
        category: u16,
        operation: u16,
        source: SocketAddr,
        is_udp: bool,
        body: Bytes,
    },
    Shutdown,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("discovery worker stopped")]
    Stopped,

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Cloneable, `Send` entry point into a running worker.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    commands: mpsc::UnboundedSender<WorkerCommand>,
}

impl WorkerHandle {
    pub async fn submit(&self, request: DiscoveryRequest) -> Result<RequestId, WorkerError> {
        let (reply, response) = oneshot::channel();
        self.send(WorkerCommand::Submit { request, reply })?;
        Ok(response.await.map_err(|_| WorkerError::Stopped)??)
    }

    pub async fn cancel(&self, criteria: CancelCriteria) -> Result<(), WorkerError> {
        let (reply, response) = oneshot::channel();
        self.send(WorkerCommand::Cancel { criteria, reply })?;
        Ok(response.await.map_err(|_| WorkerError::Stopped)??)
    }

    /// Queue a command without waiting for it to run.
    pub fn send(&self, command: WorkerCommand) -> Result<(), WorkerError> {
        self.commands.send(command).map_err(|_| WorkerError::Stopped)
    }

    /// Forward a packet received by the host's transport.
    pub fn packet(&self, source: SocketAddr, is_udp: bool, packet: &[u8]) -> Result<(), WorkerError> {
        match ap_wire::Packet::parse(packet) {
            Ok(parsed) => self.send(WorkerCommand::Packet {
                category: parsed.kind.category,
                operation: parsed.kind.operation,
                source,
                is_udp,
                body: parsed.body,
            }),
            Err(error) => {
                debug!(%source, %error, "unparseable packet dropped");
                Ok(())
            }
        }
    }

    /// Encode `message` and forward it as if received from `source`.
    pub fn deliver<M: WireMessage>(&self, source: SocketAddr, message: &M) -> Result<(), WorkerError> {
        self.packet(source, true, &ap_wire::Packet::from_message(message).to_bytes())
    }

    pub fn shutdown(&self) -> Result<(), WorkerError> {
        self.send(WorkerCommand::Shutdown)
    }
}

// ============================================================================
// Adapters bound to the tokio runtime
// ============================================================================

/// Milliseconds since the worker was created, on tokio's clock.
#[derive(Debug, Clone, Copy)]
pub struct TokioTimeSource {
    origin: Instant,
}

impl TokioTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    fn instant_of(&self, at: Timestamp) -> Instant {
        self.origin + Duration::from_millis(at.as_millis())
    }
}

impl Default for TokioTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for TokioTimeSource {
    fn now(&self) -> Timestamp {
        let elapsed = self.origin.elapsed().as_millis();
        Timestamp::from_millis(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }
}

/// Event sink feeding an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    events: mpsc::UnboundedSender<DiscoveryEvent>,
}

impl ChannelEventSink {
    pub fn new(events: mpsc::UnboundedSender<DiscoveryEvent>) -> Self {
        Self { events }
    }
}

impl DiscoveryEventSink for ChannelEventSink {
    fn on_event(&mut self, event: &DiscoveryEvent) {
        if self.events.send(event.clone()).is_err() {
            debug!(source = ?event.source, "event receiver gone, event dropped");
        }
    }
}

/// Resolver running each query as a local `lookup_host` task.
pub struct TokioDnsResolver {
    next_id: u64,
    tasks: HashMap<DnsQueryId, JoinHandle<()>>,
    results: mpsc::UnboundedSender<(DnsQueryId, DnsResult)>,
}

impl TokioDnsResolver {
    pub fn new(results: mpsc::UnboundedSender<(DnsQueryId, DnsResult)>) -> Self {
        Self {
            next_id: 0,
            tasks: HashMap::new(),
            results,
        }
    }

    /// Forget a query whose result has been delivered.
    pub fn finish(&mut self, query: DnsQueryId) {
        self.tasks.remove(&query);
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }
}

impl DnsResolver for TokioDnsResolver {
    fn resolve(&mut self, domain: &str, record: RecordType) -> Result<DnsQueryId, DnsError> {
        self.next_id += 1;
        let query = DnsQueryId(self.next_id);
        let results = self.results.clone();
        let domain = domain.to_owned();
        let task = tokio::task::spawn_local(async move {
            let result = lookup(&domain, record).await;
            // The worker may have shut down meanwhile.
            let _ = results.send((query, result));
        });
        self.tasks.insert(query, task);
        Ok(query)
    }

    fn cancel(&mut self, query: DnsQueryId) {
        if let Some(task) = self.tasks.remove(&query) {
            task.abort();
        }
    }
}

async fn lookup(domain: &str, record: RecordType) -> DnsResult {
    let resolved = tokio::net::lookup_host((domain, 0))
        .await
        .map_err(|e| DnsError::Failed {
            domain: domain.to_owned(),
            reason: e.to_string(),
        })?;
    let mut ips: Vec<IpAddr> = Vec::new();
    for addr in resolved {
        let ip = addr.ip();
        let wanted = match record {
            RecordType::A => ip.is_ipv4(),
            RecordType::Aaaa => ip.is_ipv6(),
        };
        if wanted && !ips.contains(&ip) {
            ips.push(ip);
        }
    }
    if ips.is_empty() {
        return Err(DnsError::NoRecords(domain.to_owned()));
    }
    Ok(ips)
}

// ============================================================================
// DiscoveryWorker
// ============================================================================

type Orchestrator<T> = RequestOrchestrator<T, ChannelEventSink>;

/// Task owning every discovery component of one host session.
pub struct DiscoveryWorker<T: TransportPool + 'static> {
    servers: ServerSetManager<TokioDnsResolver>,
    orchestrator: Rc<RefCell<Orchestrator<T>>>,
    clock: TokioTimeSource,
    commands: mpsc::UnboundedReceiver<WorkerCommand>,
    dns_results: mpsc::UnboundedReceiver<(DnsQueryId, DnsResult)>,
    policy: TransportPolicy,
}

impl<T: TransportPool + 'static> DiscoveryWorker<T> {
    /// Build the worker, its handle and the receiving end of its events.
    ///
    /// Must be called on the thread that will run [`DiscoveryWorker::run`].
    pub fn new(
        provider: &impl ConfigProvider,
        transport: T,
    ) -> Result<(Self, WorkerHandle, mpsc::UnboundedReceiver<DiscoveryEvent>), ConfigError> {
        let clock = TokioTimeSource::new();
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        let (dns_tx, dns_results) = mpsc::unbounded_channel();

        let server_config = provider.server_set_config();
        let mut orchestrator_config = provider.orchestrator_config();
        orchestrator_config.transport_policy.encryption = server_config.encryption;
        let policy = orchestrator_config.transport_policy;

        let orchestrator = Rc::new(RefCell::new(RequestOrchestrator::new(
            orchestrator_config,
            transport,
            ChannelEventSink::new(event_tx),
            Box::new(clock),
        )?));
        let mut servers = ServerSetManager::new(
            server_config,
            TokioDnsResolver::new(dns_tx),
            Box::new(clock),
        )?;
        servers.register(&orchestrator);

        let worker = Self {
            servers,
            orchestrator,
            clock,
            commands,
            dns_results,
            policy,
        };
        Ok((worker, WorkerHandle { commands: command_tx }, events))
    }

    /// Run until [`WorkerCommand::Shutdown`] or until every handle is gone.
    pub async fn run(mut self) {
        info!("discovery worker started");
        self.servers.bootstrap();
        loop {
            let deadline = self.next_deadline();
            let wake_at = deadline.map_or_else(Instant::now, |at| self.clock.instant_of(at));
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(WorkerCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some((query, result)) = self.dns_results.recv() => {
                    self.servers.resolver_mut().finish(query);
                    self.servers.on_dns_resolved(query, result);
                }
                _ = tokio::time::sleep_until(wake_at), if deadline.is_some() => self.tick(),
            }
        }
        self.orchestrator.borrow_mut().stop_all();
        info!("discovery worker stopped");
    }

    fn next_deadline(&self) -> Option<Timestamp> {
        let servers = self.servers.next_deadline();
        let requests = self.orchestrator.borrow().next_deadline();
        match (servers, requests) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn tick(&mut self) {
        self.servers.on_tick();
        self.orchestrator.borrow_mut().on_tick();
    }

    fn handle(&mut self, command: WorkerCommand) {
        match command {
            WorkerCommand::Submit { request, reply } => {
                let result = self.orchestrator.borrow_mut().submit(request);
                if reply.send(result).is_err() {
                    debug!("submit caller went away");
                }
            }
            WorkerCommand::Cancel { criteria, reply } => {
                let result = self.orchestrator.borrow_mut().cancel(criteria);
                if reply.send(result).is_err() {
                    debug!("cancel caller went away");
                }
            }
            WorkerCommand::StopAll => self.orchestrator.borrow_mut().stop_all(),
            WorkerCommand::NetworkChanged(network) => {
                self.orchestrator
                    .borrow_mut()
                    .set_ip_stack_mode(network.stack_mode());
                self.servers.on_network_changed(network);
            }
            WorkerCommand::Dns64Prefix(prefix) => self.servers.on_dns64_prefix(prefix),
            WorkerCommand::SetEncryption(encryption) => {
                self.policy.encryption = encryption;
                self.orchestrator.borrow_mut().set_transport_policy(self.policy);
                self.servers.set_encryption_policy(encryption);
            }
            WorkerCommand::SetForceTcp(force_tcp) => {
                self.policy.force_tcp = force_tcp;
                self.orchestrator.borrow_mut().set_transport_policy(self.policy);
            }
            WorkerCommand::Connected(connection) => {
                self.orchestrator.borrow_mut().on_connected(connection);
            }
            WorkerCommand::Disconnected(connection) => {
                self.orchestrator.borrow_mut().on_disconnected(connection);
            }
            WorkerCommand::Packet {
                category,
                operation,
                source,
                is_udp,
                body,
            } => {
                self.orchestrator
                    .borrow_mut()
                    .on_response_packet(category, operation, source, is_udp, &body);
            }
            WorkerCommand::Shutdown => {
                warn!("shutdown reached the command handler");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use ap_wire::messages::JoinChannelResponse;
    use tokio::task::LocalSet;

    use super::*;
    use crate::adapters::{NoOpTransport, StaticConfigProvider};
    use crate::domain::{
        ChannelJoinRequest, EventOutcome, ServerSetConfig,
    };

    fn provider() -> StaticConfigProvider {
        StaticConfigProvider::for_testing().with_server_set(
            ServerSetConfig::for_testing()
                .with_static_ips(vec!["192.0.2.1".parse().unwrap()])
                .with_static_ports(vec![8000, 8001]),
        )
    }

    fn join(channel: &str) -> DiscoveryRequest {
        DiscoveryRequest::ChannelJoin(ChannelJoinRequest {
            key: "app".into(),
            channel: channel.into(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_worker_round_trip() {
        LocalSet::new()
            .run_until(async {
                let (worker, handle, mut events) =
                    DiscoveryWorker::new(&provider(), NoOpTransport::new()).unwrap();
                let task = tokio::task::spawn_local(worker.run());

                let id = handle.submit(join("room")).await.unwrap();
                assert_eq!(id, RequestId(1));

                let server: SocketAddr = "192.0.2.1:8000".parse().unwrap();
                handle
                    .deliver(
                        server,
                        &JoinChannelResponse {
                            channel: "room".into(),
                            ..Default::default()
                        },
                    )
                    .unwrap();

                let event = events.recv().await.unwrap();
                assert_eq!(event.outcome, EventOutcome::Succeeded);
                assert_eq!(event.request_id, Some(id));

                handle.shutdown().unwrap();
                task.await.unwrap();
                assert!(matches!(
                    handle.submit(join("late")).await,
                    Err(WorkerError::Stopped)
                ));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_server_times_out() {
        LocalSet::new()
            .run_until(async {
                let (worker, handle, mut events) =
                    DiscoveryWorker::new(&provider(), NoOpTransport::new()).unwrap();
                let task = tokio::task::spawn_local(worker.run());

                handle.submit(join("room")).await.unwrap();
                let event = events.recv().await.unwrap();
                assert_eq!(event.outcome, EventOutcome::TimedOut);
                assert_eq!(event.server, Some("192.0.2.1:8000".parse().unwrap()));

                handle.shutdown().unwrap();
                task.await.unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_cancel_unknown_reports_not_found() {
        LocalSet::new()
            .run_until(async {
                let (worker, handle, _events) =
                    DiscoveryWorker::new(&provider(), NoOpTransport::new()).unwrap();
                let task = tokio::task::spawn_local(worker.run());

                let result = handle.cancel(CancelCriteria::Channel("nope".into())).await;
                assert!(matches!(
                    result,
                    Err(WorkerError::Discovery(DiscoveryError::NotFound))
                ));

                drop(handle);
                task.await.unwrap();
            })
            .await;
    }
}
