//! ReportServerClient: periodic report-server lookups.

use std::collections::HashMap;
use std::net::SocketAddr;

use ap_wire::messages::{ReportRequest, ReportResponse};
use ap_wire::packet::decode_body;
use ap_wire::{DetailMap, Packet, PacketKind, WireMessage};
use tracing::{debug, info, warn};

use crate::domain::{
    map_server_status, normalize_addresses, transport_kinds, ConfigError,
    ConnectionId, DiscoveryEvent, ErrorCode, EventOutcome, EventSource, IpFamily, ReportConfig,
    ResolvedAddress, ServerCategory, ServerSelector, ServerSetUpdate, ServiceFlags, Timestamp,
    TransportPolicy,
};
use crate::ports::{
    DiscoveryEventSink, ServerSetListener, TimeSource, TimerDriven, TransportEvents, TransportPool,
};
use crate::service::{RetryTimer, WorkerAffinity};

/// Identity sent with every report-address lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportLookup {
    pub key: String,
    pub sid: String,
    pub detail: DetailMap,
}

#[derive(Debug, Clone, Copy)]
struct ReportLane {
    server: SocketAddr,
    sent: bool,
}

const FAMILIES: [IpFamily; 3] = [IpFamily::V4, IpFamily::V6Nat64, IpFamily::V6Pure];

/// Periodic report-address lookups with their own server selector.
pub struct ReportServerClient<T: TransportPool, S: DiscoveryEventSink> {
    config: ReportConfig,
    selector: ServerSelector,
    transport: T,
    sink: S,
    time_source: Box<dyn TimeSource>,
    lookup: ReportLookup,
    policy: TransportPolicy,
    lanes: HashMap<ConnectionId, ReportLane>,
    opid: u64,
    lookup_started_at: Timestamp,
    report_servers: Vec<ResolvedAddress>,
    timer: RetryTimer,
    affinity: WorkerAffinity,
}

impl<T: TransportPool, S: DiscoveryEventSink> ReportServerClient<T, S> {
    pub fn new(
        config: ReportConfig,
        lookup: ReportLookup,
        transport: T,
        sink: S,
        time_source: Box<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            selector: ServerSelector::new(config.selector.clone()),
            timer: RetryTimer::new(config.interval),
            config,
            transport,
            sink,
            time_source,
            lookup,
            policy: TransportPolicy::default(),
            lanes: HashMap::new(),
            opid: 0,
            lookup_started_at: Timestamp::ZERO,
            report_servers: Vec::new(),
            affinity: WorkerAffinity::current(),
        })
    }

    /// Look up now and then once per interval.
    pub fn start(&mut self) {
        self.affinity.check();
        let now = self.time_source.now();
        self.timer.arm(now);
        self.run_lookup(now);
    }

    /// Close every lane and stop the cadence. Known report servers are kept.
    pub fn stop(&mut self) {
        self.affinity.check();
        for (connection, _) in self.lanes.drain() {
            self.transport.close(connection);
        }
        self.selector.recycle_all();
        self.timer.disarm();
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_armed()
    }

    /// Report servers from the latest successful lookup.
    pub fn report_servers(&self) -> &[ResolvedAddress] {
        &self.report_servers
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

    pub fn set_transport_policy(&mut self, policy: TransportPolicy) {
        self.policy = policy;
    }

    pub fn set_lookup(&mut self, lookup: ReportLookup) {
        self.lookup = lookup;
    }

    fn in_flight(&self) -> bool {
        !self.lanes.is_empty()
    }

    /// Send one lookup to up to `candidates_per_round` servers.
    fn run_lookup(&mut self, now: Timestamp) {
        if self.in_flight() {
            debug!("report lookup still in flight");
            return;
        }
        self.opid = rand::random::<u64>();
        self.lookup_started_at = now;

        let mut sent = 0;
        while sent < self.config.candidates_per_round {
            let Some((server, category)) = self.pick(now) else {
                break;
            };
            if self.open_lane(server, category) {
                sent += 1;
            } else {
                self.selector
                    .report_failure(server, ServiceFlags::REPORT, ErrorCode::ConnectionFailed, now);
            }
        }
        if sent == 0 {
            debug!("no report server candidate");
        }
    }

    fn pick(&mut self, now: Timestamp) -> Option<(SocketAddr, ServerCategory)> {
        for category in self.policy.active_categories() {
            for family in FAMILIES {
                if let Some(server) = self.selector.select(family, ServiceFlags::REPORT, *category, now) {
                    return Some((server, *category));
                }
            }
        }
        None
    }

    fn open_lane(&mut self, server: SocketAddr, category: ServerCategory) -> bool {
        let Some(kind) = transport_kinds(category, &self.policy).first().copied() else {
            return false;
        };
        let connection = match self.transport.connect(server, category, kind) {
            Ok(connection) => connection,
            Err(error) => {
                warn!(%server, %error, "report connect failed");
                return false;
            }
        };
        self.lanes.insert(
            connection,
            ReportLane {
                server,
                sent: false,
            },
        );
        if self.transport.is_connected(connection) {
            return self.send_lookup(connection);
        }
        true
    }

    fn send_lookup(&mut self, connection: ConnectionId) -> bool {
        let packet = Packet::from_message(&ReportRequest {
            opid: self.opid,
            flags: ServiceFlags::REPORT.bits(),
            key: self.lookup.key.clone(),
            sid: self.lookup.sid.clone(),
            detail: self.lookup.detail.clone(),
        });
        match self.transport.send(connection, packet.to_bytes()) {
            Ok(()) => {
                if let Some(lane) = self.lanes.get_mut(&connection) {
                    lane.sent = true;
                }
                debug!(%connection, opid = self.opid, "report lookup sent");
                true
            }
            Err(error) => {
                warn!(%connection, %error, "report lookup send failed");
                self.lanes.remove(&connection);
                self.transport.close(connection);
                false
            }
        }
    }

    fn close_lanes_to(&mut self, server: SocketAddr) {
        let closing: Vec<ConnectionId> = self
            .lanes
            .iter()
            .filter(|(_, lane)| lane.server == server)
            .map(|(connection, _)| *connection)
            .collect();
        for connection in closing {
            self.lanes.remove(&connection);
            self.transport.close(connection);
        }
    }

    fn handle_response(&mut self, source: SocketAddr, response: ReportResponse) {
        let now = self.time_source.now();
        if response.opid != self.opid || !self.lanes.values().any(|lane| lane.server == source) {
            debug!(%source, opid = response.opid, "stale report response dropped");
            return;
        }
        self.close_lanes_to(source);

        match map_server_status(response.code) {
            None => {
                self.selector.report_success(source, ServiceFlags::REPORT);
                self.report_servers = normalize_addresses(&response.addresses);
                info!(%source, servers = self.report_servers.len(), "report servers updated");
                let mut event = DiscoveryEvent::new(
                    EventSource::ReportClient,
                    EventOutcome::Succeeded,
                    ServiceFlags::REPORT,
                )
                .with_server(source)
                .with_status(response.code)
                .with_addresses(self.report_servers.clone())
                .with_detail(response.detail);
                event.elapsed = now.saturating_since(self.lookup_started_at);
                self.sink.on_event(&event);
                // One answer is enough for this round.
                for (connection, lane) in self.lanes.drain() {
                    self.selector.release(lane.server, ServiceFlags::REPORT);
                    self.transport.close(connection);
                }
            }
            Some(code) => {
                debug!(%source, %code, "report lookup rejected");
                self.selector
                    .report_failure(source, ServiceFlags::REPORT, code, now);
            }
        }
    }
}

impl<T: TransportPool, S: DiscoveryEventSink> TransportEvents for ReportServerClient<T, S> {
    fn on_connected(&mut self, connection: ConnectionId) {
        self.affinity.check();
        let Some(lane) = self.lanes.get(&connection).copied() else {
            return;
        };
        if !lane.sent && !self.send_lookup(connection) {
            let now = self.time_source.now();
            self.selector
                .report_failure(lane.server, ServiceFlags::REPORT, ErrorCode::ConnectionFailed, now);
        }
    }

    fn on_disconnected(&mut self, connection: ConnectionId) {
        self.affinity.check();
        let Some(lane) = self.lanes.remove(&connection) else {
            return;
        };
        self.transport.close(connection);
        let now = self.time_source.now();
        self.selector
            .report_failure(lane.server, ServiceFlags::REPORT, ErrorCode::ConnectionFailed, now);
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
        if PacketKind::new(category, operation) != ReportResponse::kind() {
            debug!(category, operation, %source, "not a report response");
            return;
        }
        match decode_body::<ReportResponse>(body) {
            Ok(response) => self.handle_response(source, response),
            Err(error) => debug!(%source, is_udp, %error, "malformed report response dropped"),
        }
    }
}

impl<T: TransportPool, S: DiscoveryEventSink> TimerDriven for ReportServerClient<T, S> {
    /// Fail silent servers, then start the next lookup.
    fn on_tick(&mut self) {
        self.affinity.check();
        let now = self.time_source.now();
        if !self.timer.is_due(now) {
            return;
        }
        self.timer.reschedule(now);

        for server in self.selector.check_timeout(self.config.response_timeout, now) {
            debug!(%server, "report lookup timed out");
            self.close_lanes_to(server);
        }
        self.run_lookup(now);
    }

    fn next_deadline(&self) -> Option<Timestamp> {
        self.timer.deadline()
    }
}

impl<T: TransportPool, S: DiscoveryEventSink> ServerSetListener for ReportServerClient<T, S> {
    fn on_server_set(&mut self, update: &ServerSetUpdate) {
        self.affinity.check();
        match update {
            ServerSetUpdate::Servers { category, servers } => {
                self.selector.update(servers, *category);
            }
            ServerSetUpdate::Reset { scope } => {
                for category in ServerCategory::ALL {
                    if scope.matches(category) {
                        self.selector.clear_category(category);
                    }
                }
            }
        }
    }
}
