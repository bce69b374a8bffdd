//! Discovery events delivered to the host.

use std::net::SocketAddr;
use std::time::Duration;

use ap_wire::{AddressRecord, DetailMap};

use crate::domain::{ErrorCode, RequestId, RequestKind, ServiceFlags};

/// Which component produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventSource {
    Request(RequestKind),
    ProxySelector,
    ReportClient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventOutcome {
    Succeeded,
    /// The server answered with a non-zero status
    Failed(ErrorCode),
    /// The server did not answer within the response budget
    TimedOut,
    /// The policy gate vetoed a retry; terminal
    Aborted,
    /// A successful answer carrying nothing usable (no known sub-response)
    Ignored,
}

impl EventOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// A routing address handed out by an access point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolvedAddress {
    pub addr: SocketAddr,
    /// Opaque authorization token for `addr`
    pub ticket: String,
}

/// Convert wire address records, skipping malformed IPs.
pub fn normalize_addresses(records: &[AddressRecord]) -> Vec<ResolvedAddress> {
    records
        .iter()
        .filter_map(|record| {
            record.socket_addr().map(|addr| ResolvedAddress {
                addr,
                ticket: record.ticket.clone(),
            })
        })
        .collect()
}

/// Kind-specific event data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventPayload {
    #[default]
    None,
    Channel {
        channel: String,
        cid: u32,
        uid: u32,
        server_ts: u64,
    },
    Configuration {
        /// `CONFIG_CDS` or `CONFIG_TDS`
        phase: ServiceFlags,
        version: u32,
        config: String,
    },
    Account {
        uid: u32,
        user_account: String,
    },
    Worker {
        service_name: String,
    },
    Unified {
        /// Nested code of the sub-response the addresses came from
        sub_protocol: u16,
    },
}

/// Outcome record of one answer, timeout or abort.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiscoveryEvent {
    pub source: EventSource,
    pub request_id: Option<RequestId>,
    pub outcome: EventOutcome,
    pub server: Option<SocketAddr>,
    pub addresses: Vec<ResolvedAddress>,
    /// Raw status reported by the server
    pub server_status: Option<u32>,
    pub error: Option<ErrorCode>,
    pub elapsed: Duration,
    pub success_count: u32,
    pub flags: ServiceFlags,
    pub detail: DetailMap,
    pub payload: EventPayload,
}

impl DiscoveryEvent {
    pub fn new(source: EventSource, outcome: EventOutcome, flags: ServiceFlags) -> Self {
        let error = match outcome {
            EventOutcome::Failed(code) => Some(code),
            EventOutcome::TimedOut => Some(ErrorCode::ResponseTimeout),
            EventOutcome::Aborted => Some(ErrorCode::Aborted),
            EventOutcome::Succeeded | EventOutcome::Ignored => None,
        };
        Self {
            source,
            request_id: None,
            outcome,
            server: None,
            addresses: Vec::new(),
            server_status: None,
            error,
            elapsed: Duration::ZERO,
            success_count: 0,
            flags,
            detail: DetailMap::new(),
            payload: EventPayload::None,
        }
    }

    #[must_use]
    pub fn with_request(mut self, id: RequestId, elapsed: Duration, success_count: u32) -> Self {
        self.request_id = Some(id);
        self.elapsed = elapsed;
        self.success_count = success_count;
        self
    }

    #[must_use]
    pub fn with_server(mut self, server: SocketAddr) -> Self {
        self.server = Some(server);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: u32) -> Self {
        self.server_status = Some(status);
        self
    }

    #[must_use]
    pub fn with_addresses(mut self, addresses: Vec<ResolvedAddress>) -> Self {
        self.addresses = addresses;
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: DetailMap) -> Self {
        self.detail = detail;
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = payload;
        self
    }

    pub fn kind(&self) -> Option<RequestKind> {
        match self.source {
            EventSource::Request(kind) => Some(kind),
            EventSource::ProxySelector | EventSource::ReportClient => None,
        }
    }
}
