//! Response dispatch: one handler per (category, operation) pair.

use std::collections::HashMap;
use std::net::SocketAddr;

use ap_wire::messages::{
    AccountResponse, CdsResponse, JoinChannelResponse, LastmileResponse, NestedBody, ProxyResponse,
    TdsResponse, UnifiedResponse, WorkerResponse,
};
use ap_wire::packet::decode_body;
use ap_wire::uri::nested;
use ap_wire::{DetailMap, PacketKind, WireError, WireMessage};
use tracing::debug;

use super::core::RequestOrchestrator;
use crate::domain::{
    map_server_status, normalize_addresses, DiscoveryEvent, EventOutcome, EventPayload, EventSource,
    LaneState, RequestKey, RequestKind, ResolvedAddress, ServiceFlags,
};
use crate::ports::{DiscoveryEventSink, TransportPool};

/// A received packet handed to a response handler.
pub(crate) struct InboundPacket<'a> {
    pub source: SocketAddr,
    pub body: &'a [u8],
}

pub(crate) type ResponseHandler<T, S> =
    fn(&mut RequestOrchestrator<T, S>, &InboundPacket<'_>) -> Result<(), WireError>;

/// What a response says about one pending request.
struct Answer {
    key: RequestKey,
    kind: RequestKind,
    /// Intents this response answers
    flags: ServiceFlags,
    status: u32,
    addresses: Vec<ResolvedAddress>,
    detail: DetailMap,
    payload: EventPayload,
}

pub(crate) fn default_handlers<T: TransportPool, S: DiscoveryEventSink>(
) -> HashMap<PacketKind, ResponseHandler<T, S>> {
    let mut handlers: HashMap<PacketKind, ResponseHandler<T, S>> = HashMap::new();
    handlers.insert(JoinChannelResponse::kind(), handle_join::<T, S>);
    handlers.insert(CdsResponse::kind(), handle_cds::<T, S>);
    handlers.insert(TdsResponse::kind(), handle_tds::<T, S>);
    handlers.insert(ProxyResponse::kind(), handle_proxy::<T, S>);
    handlers.insert(WorkerResponse::kind(), handle_worker::<T, S>);
    handlers.insert(LastmileResponse::kind(), handle_lastmile::<T, S>);
    handlers.insert(AccountResponse::kind(), handle_account::<T, S>);
    handlers.insert(UnifiedResponse::kind(), handle_unified::<T, S>);
    handlers
}

impl<T: TransportPool, S: DiscoveryEventSink> RequestOrchestrator<T, S> {
    pub(crate) fn dispatch_packet(
        &mut self,
        category: u16,
        operation: u16,
        source: SocketAddr,
        is_udp: bool,
        body: &[u8],
    ) {
        let kind = PacketKind::new(category, operation);
        let Some(handler) = self.handlers.get(&kind).copied() else {
            debug!(%kind, %source, is_udp, "unknown packet dropped");
            return;
        };
        let packet = InboundPacket { source, body };
        if let Err(error) = handler(self, &packet) {
            debug!(%kind, %source, is_udp, %error, "malformed packet dropped");
        }
    }

    /// Feed the selector, clear answered intents and emit the event.
    fn apply_answer(&mut self, source: SocketAddr, answer: Answer) {
        let now = self.now();
        let failure = map_server_status(answer.status);
        if failure.is_some() {
            // Other intents on the failed lane must not pin the server.
            let stranded = self
                .pending
                .get(&answer.key)
                .map_or(ServiceFlags::EMPTY, |pending| {
                    pending.active_flags_to(source) & !answer.flags
                });
            if !stranded.is_empty() {
                self.selector.release(source, stranded);
            }
        }
        match failure {
            None => self.selector.report_success(source, answer.flags),
            Some(code) => self.selector.report_failure(source, answer.flags, code, now),
        };

        let Some(pending) = self.pending.get_mut(&answer.key) else {
            debug!(kind = %answer.kind, %source, "response for missing request dropped");
            return;
        };
        let outstanding = pending.flags & answer.flags;
        if outstanding.is_empty() {
            debug!(id = %pending.id, %source, flags = %answer.flags, "late duplicate dropped");
            return;
        }

        let outcome = match failure {
            None => {
                pending.complete_flags(outstanding);
                pending.settle_answered(source);
                EventOutcome::Succeeded
            }
            Some(code) => {
                pending.finish_server(source, LaneState::Failed);
                EventOutcome::Failed(code)
            }
        };
        let event = DiscoveryEvent::new(EventSource::Request(answer.kind), outcome, outstanding)
            .with_request(pending.id, pending.elapsed(now), pending.success_count)
            .with_server(source)
            .with_status(answer.status)
            .with_addresses(answer.addresses)
            .with_detail(answer.detail)
            .with_payload(answer.payload);
        let finished = pending.is_finished();
        debug!(id = %pending.id, %source, outcome = ?event.outcome, flags = %outstanding, "response applied");

        if finished {
            if let Some(done) = self.pending.remove(&answer.key) {
                self.release_lanes(&done);
            }
            self.release_idle_connections();
        }
        self.emit(event);
        if finished {
            self.disarm_if_idle();
        }
    }

    /// A successful answer with nothing usable in it. The request, its lanes
    /// and the selector are left as they are; only an `Ignored` event is
    /// emitted.
    fn ignore_answer(&mut self, source: SocketAddr, answer: Answer) {
        let now = self.now();
        let Some(pending) = self.pending.get(&answer.key) else {
            debug!(kind = %answer.kind, %source, "response for missing request dropped");
            return;
        };
        let outstanding = pending.flags & answer.flags;
        if outstanding.is_empty() {
            debug!(id = %pending.id, %source, flags = %answer.flags, "late duplicate dropped");
            return;
        }
        debug!(id = %pending.id, %source, "no usable sub-response, answer ignored");
        let event = DiscoveryEvent::new(EventSource::Request(answer.kind), EventOutcome::Ignored, outstanding)
            .with_request(pending.id, pending.elapsed(now), pending.success_count)
            .with_server(source)
            .with_status(answer.status)
            .with_detail(answer.detail)
            .with_payload(answer.payload);
        self.emit(event);
    }
}

fn handle_join<T: TransportPool, S: DiscoveryEventSink>(
    orchestrator: &mut RequestOrchestrator<T, S>,
    packet: &InboundPacket<'_>,
) -> Result<(), WireError> {
    let response: JoinChannelResponse = decode_body(packet.body)?;
    orchestrator.apply_answer(
        packet.source,
        Answer {
            key: RequestKey::Channel(response.channel.clone()),
            kind: RequestKind::ChannelJoin,
            flags: ServiceFlags::CHANNEL_JOIN,
            status: response.code,
            addresses: normalize_addresses(&response.addresses),
            detail: response.detail,
            payload: EventPayload::Channel {
                channel: response.channel,
                cid: response.cid,
                uid: response.uid,
                server_ts: response.server_ts,
            },
        },
    );
    Ok(())
}

fn config_answer(phase: ServiceFlags, code: u32, version: u32, config: String, detail: DetailMap) -> Answer {
    Answer {
        key: RequestKey::Kind(RequestKind::Configuration),
        kind: RequestKind::Configuration,
        flags: phase,
        status: code,
        addresses: Vec::new(),
        detail,
        payload: EventPayload::Configuration { phase, version, config },
    }
}

fn handle_cds<T: TransportPool, S: DiscoveryEventSink>(
    orchestrator: &mut RequestOrchestrator<T, S>,
    packet: &InboundPacket<'_>,
) -> Result<(), WireError> {
    let response: CdsResponse = decode_body(packet.body)?;
    orchestrator.apply_answer(
        packet.source,
        config_answer(
            ServiceFlags::CONFIG_CDS,
            response.code,
            response.version,
            response.config,
            response.detail,
        ),
    );
    Ok(())
}

fn handle_tds<T: TransportPool, S: DiscoveryEventSink>(
    orchestrator: &mut RequestOrchestrator<T, S>,
    packet: &InboundPacket<'_>,
) -> Result<(), WireError> {
    let response: TdsResponse = decode_body(packet.body)?;
    orchestrator.apply_answer(
        packet.source,
        config_answer(
            ServiceFlags::CONFIG_TDS,
            response.code,
            response.version,
            response.config,
            response.detail,
        ),
    );
    Ok(())
}

fn handle_proxy<T: TransportPool, S: DiscoveryEventSink>(
    orchestrator: &mut RequestOrchestrator<T, S>,
    packet: &InboundPacket<'_>,
) -> Result<(), WireError> {
    let response: ProxyResponse = decode_body(packet.body)?;
    orchestrator.apply_answer(
        packet.source,
        Answer {
            key: RequestKey::Kind(RequestKind::ProxyAddress),
            kind: RequestKind::ProxyAddress,
            flags: ServiceFlags::PROXY,
            status: response.code,
            addresses: normalize_addresses(&response.addresses),
            detail: response.detail,
            payload: EventPayload::None,
        },
    );
    Ok(())
}

fn handle_worker<T: TransportPool, S: DiscoveryEventSink>(
    orchestrator: &mut RequestOrchestrator<T, S>,
    packet: &InboundPacket<'_>,
) -> Result<(), WireError> {
    let response: WorkerResponse = decode_body(packet.body)?;
    orchestrator.apply_answer(
        packet.source,
        Answer {
            key: RequestKey::Kind(RequestKind::WorkerAllocation),
            kind: RequestKind::WorkerAllocation,
            flags: ServiceFlags::WORKER,
            status: response.code,
            addresses: normalize_addresses(&response.addresses),
            detail: response.detail,
            payload: EventPayload::Worker {
                service_name: response.service_name,
            },
        },
    );
    Ok(())
}

fn handle_lastmile<T: TransportPool, S: DiscoveryEventSink>(
    orchestrator: &mut RequestOrchestrator<T, S>,
    packet: &InboundPacket<'_>,
) -> Result<(), WireError> {
    let response: LastmileResponse = decode_body(packet.body)?;
    orchestrator.apply_answer(
        packet.source,
        Answer {
            key: RequestKey::Kind(RequestKind::LastmileTest),
            kind: RequestKind::LastmileTest,
            flags: ServiceFlags::LASTMILE,
            status: response.code,
            addresses: normalize_addresses(&response.addresses),
            detail: response.detail,
            payload: EventPayload::None,
        },
    );
    Ok(())
}

fn handle_account<T: TransportPool, S: DiscoveryEventSink>(
    orchestrator: &mut RequestOrchestrator<T, S>,
    packet: &InboundPacket<'_>,
) -> Result<(), WireError> {
    let response: AccountResponse = decode_body(packet.body)?;
    orchestrator.apply_answer(
        packet.source,
        Answer {
            key: RequestKey::Kind(RequestKind::UserAccountRegistration),
            kind: RequestKind::UserAccountRegistration,
            flags: ServiceFlags::ACCOUNT,
            status: response.code,
            addresses: Vec::new(),
            detail: response.detail,
            payload: EventPayload::Account {
                uid: response.uid,
                user_account: response.user_account,
            },
        },
    );
    Ok(())
}

fn handle_unified<T: TransportPool, S: DiscoveryEventSink>(
    orchestrator: &mut RequestOrchestrator<T, S>,
    packet: &InboundPacket<'_>,
) -> Result<(), WireError> {
    let response: UnifiedResponse = decode_body(packet.body)?;
    let parsed = first_sub_response(&response.services);
    let accepted = parsed.is_some() || map_server_status(response.code).is_some();
    let (sub_protocol, addresses) = parsed.unwrap_or((0, Vec::new()));
    let answer = Answer {
        key: RequestKey::Kind(RequestKind::UnifiedLookup),
        kind: RequestKind::UnifiedLookup,
        flags: ServiceFlags::UNIFIED,
        status: response.code,
        addresses,
        detail: response.detail,
        payload: EventPayload::Unified { sub_protocol },
    };
    if accepted {
        orchestrator.apply_answer(packet.source, answer);
    } else {
        orchestrator.ignore_answer(packet.source, answer);
    }
    Ok(())
}

/// Addresses of the first nested response that parses.
fn first_sub_response(services: &[NestedBody]) -> Option<(u16, Vec<ResolvedAddress>)> {
    for service in services {
        let parsed = match service.uri {
            nested::JOIN_CHANNEL_RES => service
                .unwrap_as::<JoinChannelResponse>()
                .map(|inner| normalize_addresses(&inner.addresses)),
            nested::WORKER_RES => service
                .unwrap_as::<WorkerResponse>()
                .map(|inner| normalize_addresses(&inner.addresses)),
            nested::LASTMILE_RES => service
                .unwrap_as::<LastmileResponse>()
                .map(|inner| normalize_addresses(&inner.addresses)),
            nested::ACCOUNT_RES => service.unwrap_as::<AccountResponse>().map(|_| Vec::new()),
            other => {
                debug!(sub_protocol = other, "unknown sub-protocol ignored");
                continue;
            }
        };
        match parsed {
            Ok(addresses) => return Some((service.uri, addresses)),
            Err(error) => debug!(sub_protocol = service.uri, %error, "sub-response skipped"),
        }
    }
    None
}
