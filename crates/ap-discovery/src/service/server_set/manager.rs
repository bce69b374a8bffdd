//! ServerSetManager: resolution bookkeeping and listener fan-out.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::rc::{Rc, Weak};

use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::domain::{
    synthesize_nat64, CategoryScope, ConfigError, DnsQueryId, EncryptionPolicy, IpFamily,
    NetworkState, ServerCategory, ServerEndpoint, ServerSetConfig, ServerSetUpdate, Timestamp,
    TransportPolicy,
};
use crate::ports::{
    DnsResolver, DnsResult, RecordType, ServerSetListener, TimeSource, TimerDriven,
};
use crate::service::{RetryTimer, WorkerAffinity};

/// An outstanding resolution.
#[derive(Debug, Clone)]
struct DnsQuery {
    category: ServerCategory,
    domain: String,
    record: RecordType,
}

/// Resolves access-point servers and pushes them to listeners.
pub struct ServerSetManager<R: DnsResolver> {
    config: ServerSetConfig,
    resolver: R,
    time_source: Box<dyn TimeSource>,
    listeners: Vec<Weak<RefCell<dyn ServerSetListener>>>,
    network: NetworkState,
    encryption: EncryptionPolicy,
    queries: HashMap<DnsQueryId, DnsQuery>,
    resolved: BTreeSet<ServerCategory>,
    timer: RetryTimer,
    retries: u32,
    affinity: WorkerAffinity,
}

impl<R: DnsResolver> ServerSetManager<R> {
    /// Create a manager for an IPv4-only host. Nothing is resolved until
    /// [`ServerSetManager::bootstrap`].
    pub fn new(
        config: ServerSetConfig,
        resolver: R,
        time_source: Box<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            encryption: config.encryption,
            timer: RetryTimer::new(config.retry_interval),
            config,
            resolver,
            time_source,
            listeners: Vec::new(),
            network: NetworkState::ipv4_only(),
            queries: HashMap::new(),
            resolved: BTreeSet::new(),
            retries: 0,
            affinity: WorkerAffinity::current(),
        })
    }

    /// Start with a known network state instead of IPv4-only.
    #[must_use]
    pub fn with_network(mut self, network: NetworkState) -> Self {
        self.network = network;
        self
    }

    /// Register a listener. Only a weak reference is kept; dropped listeners
    /// are pruned on the next push.
    pub fn register<L: ServerSetListener + 'static>(&mut self, listener: &Rc<RefCell<L>>) {
        self.affinity.check();
        let listener: Rc<RefCell<dyn ServerSetListener>> = listener.clone();
        self.listeners.push(Rc::downgrade(&listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .iter()
            .filter(|listener| listener.strong_count() > 0)
            .count()
    }

    pub fn network(&self) -> NetworkState {
        self.network
    }

    pub fn encryption(&self) -> EncryptionPolicy {
        self.encryption
    }

    /// Categories the current encryption policy needs servers for.
    pub fn active_categories(&self) -> &'static [ServerCategory] {
        TransportPolicy {
            encryption: self.encryption,
            force_tcp: false,
        }
        .active_categories()
    }

    pub fn is_resolved(&self, category: ServerCategory) -> bool {
        self.resolved.contains(&category)
    }

    pub fn pending_queries(&self) -> usize {
        self.queries.len()
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    /// Publish static servers or start resolving every active category.
    pub fn bootstrap(&mut self) {
        self.affinity.check();
        self.cancel_queries();
        self.resolved.clear();
        self.retries = 0;
        self.timer.disarm();

        let now = self.time_source.now();
        let categories = self.active_categories();
        if !self.config.static_ips.is_empty() {
            for category in categories {
                let ips = self.config.static_ips.clone();
                let servers = self.endpoints(*category, &ips);
                info!(%category, servers = servers.len(), "static servers published");
                self.resolved.insert(*category);
                self.publish(&ServerSetUpdate::Servers {
                    category: *category,
                    servers,
                });
            }
            return;
        }
        for category in categories {
            self.resolve_category(*category, now);
        }
    }

    /// Deliver a DNS result for a query this manager issued.
    pub fn on_dns_resolved(&mut self, query: DnsQueryId, result: DnsResult) {
        self.affinity.check();
        let Some(issued) = self.queries.remove(&query) else {
            debug!(?query, "stale DNS result dropped");
            return;
        };
        let now = self.time_source.now();
        match result {
            Ok(ips) if !ips.is_empty() => {
                let servers = self.endpoints(issued.category, &ips);
                info!(
                    category = %issued.category,
                    domain = %issued.domain,
                    record = ?issued.record,
                    servers = servers.len(),
                    "servers resolved"
                );
                self.resolved.insert(issued.category);
                self.publish(&ServerSetUpdate::Servers {
                    category: issued.category,
                    servers,
                });
            }
            Ok(_) => {
                warn!(category = %issued.category, domain = %issued.domain, "empty DNS answer");
                self.schedule_retry(now);
            }
            Err(error) => {
                warn!(category = %issued.category, domain = %issued.domain, %error, "DNS resolution failed");
                self.schedule_retry(now);
            }
        }
    }

    /// Connectivity changed: drop every pushed server and start over.
    pub fn on_network_changed(&mut self, network: NetworkState) {
        self.affinity.check();
        if network == self.network {
            return;
        }
        info!(?network, "network changed");
        self.network = network;
        self.reset_and_bootstrap();
    }

    /// A network-specific DNS64 prefix was discovered (or lost).
    pub fn on_dns64_prefix(&mut self, prefix: Option<Ipv6Addr>) {
        self.affinity.check();
        if prefix == self.network.dns64_prefix {
            return;
        }
        info!(?prefix, "DNS64 prefix changed");
        self.network.dns64_prefix = prefix;
        self.reset_and_bootstrap();
    }

    pub fn set_encryption_policy(&mut self, encryption: EncryptionPolicy) {
        self.affinity.check();
        if encryption == self.encryption {
            return;
        }
        info!(?encryption, "encryption policy changed");
        self.encryption = encryption;
        self.reset_and_bootstrap();
    }

    fn reset_and_bootstrap(&mut self) {
        self.publish(&ServerSetUpdate::Reset {
            scope: CategoryScope::Any,
        });
        self.bootstrap();
    }

    /// Issue queries for one category. Returns the number issued.
    fn resolve_category(&mut self, category: ServerCategory, now: Timestamp) -> usize {
        let mut issued = 0;
        let v4 = pick_domain(self.config.domains.get(&category));
        if let Some(domain) = v4 {
            issued += self.issue(category, domain, RecordType::A, now);
        }
        if self.network.has_ipv6 {
            if let Some(domain) = pick_domain(self.config.ipv6_domains.get(&category)) {
                issued += self.issue(category, domain, RecordType::Aaaa, now);
            }
        }
        if issued == 0 {
            debug!(%category, "no domain to resolve");
        }
        issued
    }

    fn issue(&mut self, category: ServerCategory, domain: String, record: RecordType, now: Timestamp) -> usize {
        match self.resolver.resolve(&domain, record) {
            Ok(query) => {
                debug!(%category, %domain, ?record, "resolving");
                self.queries.insert(
                    query,
                    DnsQuery {
                        category,
                        domain,
                        record,
                    },
                );
                1
            }
            Err(error) => {
                warn!(%category, %domain, %error, "DNS query rejected");
                self.schedule_retry(now);
                0
            }
        }
    }

    fn schedule_retry(&mut self, now: Timestamp) {
        if self.retries < self.config.max_retries {
            self.timer.arm(now);
        } else {
            warn!(retries = self.retries, "giving up on re-resolution");
        }
    }

    fn cancel_queries(&mut self) {
        for (query, _) in self.queries.drain() {
            self.resolver.cancel(query);
        }
    }

    /// Pair IPs with the category's ports, mapping IPv4 into NAT64 space on
    /// IPv6-only hosts.
    fn endpoints(&self, category: ServerCategory, ips: &[IpAddr]) -> Vec<ServerEndpoint> {
        let ports = self.config.ports_for(category);
        let mut servers = Vec::with_capacity(ips.len() * ports.len());
        for ip in ips {
            let (ip, family) = self.classify(*ip);
            for port in ports {
                servers.push(ServerEndpoint::new(SocketAddr::new(ip, *port), family));
            }
        }
        servers
    }

    fn classify(&self, ip: IpAddr) -> (IpAddr, IpFamily) {
        match ip {
            IpAddr::V4(v4) if self.network.needs_nat64() => {
                let prefix = self
                    .network
                    .dns64_prefix
                    .unwrap_or(IpFamily::WELL_KNOWN_NAT64);
                (IpAddr::V6(synthesize_nat64(prefix, v4)), IpFamily::V6Nat64)
            }
            IpAddr::V6(v6) => {
                let nat64 = self
                    .network
                    .dns64_prefix
                    .is_some_and(|prefix| v6.octets()[..12] == prefix.octets()[..12]);
                if nat64 {
                    (ip, IpFamily::V6Nat64)
                } else {
                    (ip, IpFamily::of(&ip))
                }
            }
            IpAddr::V4(_) => (ip, IpFamily::V4),
        }
    }

    fn publish(&mut self, update: &ServerSetUpdate) {
        self.listeners.retain(|listener| listener.strong_count() > 0);
        for listener in &self.listeners {
            let Some(listener) = listener.upgrade() else {
                continue;
            };
            let borrowed = listener.try_borrow_mut();
            match borrowed {
                Ok(mut listener) => listener.on_server_set(update),
                Err(_) => warn!("listener busy, server set update skipped"),
            };
        }
    }
}

impl<R: DnsResolver> TimerDriven for ServerSetManager<R> {
    /// Re-resolve categories that are still unresolved.
    fn on_tick(&mut self) {
        self.affinity.check();
        let now = self.time_source.now();
        if !self.timer.is_due(now) {
            return;
        }
        self.timer.disarm();
        self.retries += 1;

        let in_flight: BTreeSet<ServerCategory> =
            self.queries.values().map(|query| query.category).collect();
        let unresolved: Vec<ServerCategory> = self
            .active_categories()
            .iter()
            .copied()
            .filter(|category| !self.resolved.contains(category) && !in_flight.contains(category))
            .collect();
        debug!(retry = self.retries, unresolved = unresolved.len(), "re-resolution tick");
        for category in unresolved {
            self.resolve_category(category, now);
        }
    }

    fn next_deadline(&self) -> Option<Timestamp> {
        self.timer.deadline()
    }
}

fn pick_domain(domains: Option<&Vec<String>>) -> Option<String> {
    domains?.choose(&mut rand::thread_rng()).cloned()
}
