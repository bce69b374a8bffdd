//! Request contexts and their wire encoding.

use ap_wire::messages::{
    AccountRequest, ConfigRequest, JoinChannelRequest, LastmileRequest, NestedBody, ProxyRequest,
    UnifiedRequest, WorkerRequest,
};
use ap_wire::uri::nested;
use ap_wire::{DetailMap, Packet};

use crate::domain::ServiceFlags;

/// Request family, one per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequestKind {
    ChannelJoin,
    Configuration,
    ProxyAddress,
    WorkerAllocation,
    LastmileTest,
    UserAccountRegistration,
    UnifiedLookup,
}

impl RequestKind {
    pub fn flags(self) -> ServiceFlags {
        match self {
            Self::ChannelJoin => ServiceFlags::CHANNEL_JOIN,
            Self::Configuration => ServiceFlags::CONFIG,
            Self::ProxyAddress => ServiceFlags::PROXY,
            Self::WorkerAllocation => ServiceFlags::WORKER,
            Self::LastmileTest => ServiceFlags::LASTMILE,
            Self::UserAccountRegistration => ServiceFlags::ACCOUNT,
            Self::UnifiedLookup => ServiceFlags::UNIFIED,
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ChannelJoin => "channel-join",
            Self::Configuration => "configuration",
            Self::ProxyAddress => "proxy-address",
            Self::WorkerAllocation => "worker-allocation",
            Self::LastmileTest => "lastmile-test",
            Self::UserAccountRegistration => "account-registration",
            Self::UnifiedLookup => "unified-lookup",
        };
        f.write_str(name)
    }
}

/// Deduplication key in the pending collection.
///
/// Channel joins are deduplicated per channel; every other kind has at most
/// one pending instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestKey {
    Channel(String),
    Kind(RequestKind),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelJoinRequest {
    pub key: String,
    pub channel: String,
    pub uid: u32,
    pub sid: String,
    pub detail: DetailMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationRequest {
    pub key: String,
    pub uid: u32,
    pub sid: String,
    pub features: DetailMap,
    /// Phases to fetch; both by default
    pub phases: ServiceFlags,
}

impl Default for ConfigurationRequest {
    fn default() -> Self {
        Self {
            key: String::new(),
            uid: 0,
            sid: String::new(),
            features: DetailMap::new(),
            phases: ServiceFlags::CONFIG,
        }
    }
}

/// Proxy flavour requested from access points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProxyKind {
    #[default]
    Udp,
    Tcp,
    Tls,
}

impl ProxyKind {
    pub fn wire_code(self) -> u8 {
        match self {
            Self::Udp => 0,
            Self::Tcp => 1,
            Self::Tls => 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyAddressRequest {
    pub key: String,
    pub channel: String,
    pub uid: u32,
    pub sid: String,
    pub proxy_kind: ProxyKind,
    pub detail: DetailMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerAllocationRequest {
    pub key: String,
    pub channel: String,
    pub uid: u32,
    pub sid: String,
    pub service_name: String,
    pub detail: DetailMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastmileTestRequest {
    pub key: String,
    pub sid: String,
    pub detail: DetailMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountRegistrationRequest {
    pub key: String,
    pub sid: String,
    pub user_account: String,
    pub detail: DetailMap,
}

/// Sub-request bundled into a unified lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnifiedService {
    ChannelJoin(ChannelJoinRequest),
    WorkerAllocation(WorkerAllocationRequest),
    AccountRegistration(AccountRegistrationRequest),
    LastmileTest(LastmileTestRequest),
}

impl UnifiedService {
    fn wrap(&self, opid: u64) -> NestedBody {
        match self {
            Self::ChannelJoin(join) => NestedBody::wrap(
                nested::JOIN_CHANNEL_REQ,
                &join_body(join, opid, ServiceFlags::CHANNEL_JOIN),
            ),
            Self::WorkerAllocation(worker) => NestedBody::wrap(
                nested::WORKER_REQ,
                &worker_body(worker, opid, ServiceFlags::WORKER),
            ),
            Self::AccountRegistration(account) => {
                NestedBody::wrap(nested::ACCOUNT_REQ, &account_body(account, opid))
            }
            Self::LastmileTest(lastmile) => NestedBody::wrap(
                nested::LASTMILE_REQ,
                &lastmile_body(lastmile, opid, ServiceFlags::LASTMILE),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnifiedLookupRequest {
    pub key: String,
    pub sid: String,
    pub client_type: u8,
    pub services: Vec<UnifiedService>,
    pub detail: DetailMap,
}

/// A request submitted to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryRequest {
    ChannelJoin(ChannelJoinRequest),
    Configuration(ConfigurationRequest),
    ProxyAddress(ProxyAddressRequest),
    WorkerAllocation(WorkerAllocationRequest),
    LastmileTest(LastmileTestRequest),
    UserAccountRegistration(AccountRegistrationRequest),
    UnifiedLookup(UnifiedLookupRequest),
}

impl DiscoveryRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::ChannelJoin(_) => RequestKind::ChannelJoin,
            Self::Configuration(_) => RequestKind::Configuration,
            Self::ProxyAddress(_) => RequestKind::ProxyAddress,
            Self::WorkerAllocation(_) => RequestKind::WorkerAllocation,
            Self::LastmileTest(_) => RequestKind::LastmileTest,
            Self::UserAccountRegistration(_) => RequestKind::UserAccountRegistration,
            Self::UnifiedLookup(_) => RequestKind::UnifiedLookup,
        }
    }

    /// Intents asked for on first submission.
    pub fn initial_flags(&self) -> ServiceFlags {
        match self {
            Self::Configuration(config) => {
                let phases = config.phases & ServiceFlags::CONFIG;
                if phases.is_empty() {
                    ServiceFlags::CONFIG
                } else {
                    phases
                }
            }
            other => other.kind().flags(),
        }
    }

    pub fn key(&self) -> RequestKey {
        match self {
            Self::ChannelJoin(join) => RequestKey::Channel(join.channel.clone()),
            other => RequestKey::Kind(other.kind()),
        }
    }

    /// Channel name, for kinds that carry one.
    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::ChannelJoin(join) => Some(&join.channel),
            Self::ProxyAddress(proxy) => Some(&proxy.channel),
            Self::WorkerAllocation(worker) => Some(&worker.channel),
            _ => None,
        }
    }

    /// Frame the request asking only for `flags`.
    pub fn encode(&self, opid: u64, flags: ServiceFlags) -> Packet {
        match self {
            Self::ChannelJoin(join) => Packet::from_message(&join_body(join, opid, flags)),
            Self::Configuration(config) => Packet::from_message(&ConfigRequest {
                opid,
                flags: flags.bits(),
                key: config.key.clone(),
                uid: config.uid,
                sid: config.sid.clone(),
                features: config.features.clone(),
            }),
            Self::ProxyAddress(proxy) => Packet::from_message(&ProxyRequest {
                opid,
                flags: flags.bits(),
                key: proxy.key.clone(),
                channel: proxy.channel.clone(),
                uid: proxy.uid,
                sid: proxy.sid.clone(),
                proxy_kind: proxy.proxy_kind.wire_code(),
                detail: proxy.detail.clone(),
            }),
            Self::WorkerAllocation(worker) => Packet::from_message(&worker_body(worker, opid, flags)),
            Self::LastmileTest(lastmile) => Packet::from_message(&lastmile_body(lastmile, opid, flags)),
            Self::UserAccountRegistration(account) => Packet::from_message(&account_body(account, opid)),
            Self::UnifiedLookup(unified) => Packet::from_message(&UnifiedRequest {
                opid,
                flags: flags.bits(),
                key: unified.key.clone(),
                sid: unified.sid.clone(),
                client_type: unified.client_type,
                services: unified.services.iter().map(|service| service.wrap(opid)).collect(),
                detail: unified.detail.clone(),
            }),
        }
    }
}

fn join_body(join: &ChannelJoinRequest, opid: u64, flags: ServiceFlags) -> JoinChannelRequest {
    JoinChannelRequest {
        opid,
        flags: flags.bits(),
        key: join.key.clone(),
        channel: join.channel.clone(),
        uid: join.uid,
        sid: join.sid.clone(),
        detail: join.detail.clone(),
    }
}

fn worker_body(worker: &WorkerAllocationRequest, opid: u64, flags: ServiceFlags) -> WorkerRequest {
    WorkerRequest {
        opid,
        flags: flags.bits(),
        key: worker.key.clone(),
        channel: worker.channel.clone(),
        uid: worker.uid,
        sid: worker.sid.clone(),
        service_name: worker.service_name.clone(),
        detail: worker.detail.clone(),
    }
}

fn lastmile_body(lastmile: &LastmileTestRequest, opid: u64, flags: ServiceFlags) -> LastmileRequest {
    LastmileRequest {
        opid,
        flags: flags.bits(),
        key: lastmile.key.clone(),
        sid: lastmile.sid.clone(),
        detail: lastmile.detail.clone(),
    }
}

fn account_body(account: &AccountRegistrationRequest, opid: u64) -> AccountRequest {
    AccountRequest {
        opid,
        key: account.key.clone(),
        sid: account.sid.clone(),
        user_account: account.user_account.clone(),
        detail: account.detail.clone(),
    }
}
