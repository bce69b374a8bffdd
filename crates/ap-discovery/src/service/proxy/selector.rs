//! ProxyServerSelector: static list first, then discovered proxies.

use std::net::SocketAddr;

use tracing::{debug, info, warn};

use crate::domain::{
    ConfigError, ConnectionId, DiscoveryError, DiscoveryEvent, DiscoveryRequest, EventSource,
    ProxyAddressRequest, ProxyConfig, RequestKey, RequestKind, ResolvedAddress, ServerSelector,
    ServerSetUpdate, Timestamp,
};
use crate::ports::{
    DiscoveryApi, DiscoveryEventSink, ServerSetListener, TimeSource, TimerDriven, TransportEvents,
    TransportPool,
};
use crate::service::{RequestOrchestrator, WorkerAffinity};

/// A proxy handed out by [`ProxyServerSelector::select_next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyChoice {
    /// From the configured list
    Static(SocketAddr),
    /// Returned by an access point, with its ticket
    Discovered(ResolvedAddress),
}

impl ProxyChoice {
    pub fn addr(&self) -> SocketAddr {
        match self {
            Self::Static(addr) => *addr,
            Self::Discovered(resolved) => resolved.addr,
        }
    }
}

/// Events of the inner lookup, collected for re-emission.
#[derive(Debug, Default)]
struct LookupEvents(Vec<DiscoveryEvent>);

impl DiscoveryEventSink for LookupEvents {
    fn on_event(&mut self, event: &DiscoveryEvent) {
        self.0.push(event.clone());
    }
}

/// Rotates static proxies, then proxies discovered from access points.
pub struct ProxyServerSelector<T: TransportPool, S: DiscoveryEventSink> {
    static_proxies: Vec<SocketAddr>,
    static_cursor: usize,
    discovered: Vec<ResolvedAddress>,
    discovered_cursor: usize,
    request: ProxyAddressRequest,
    lookup: RequestOrchestrator<T, LookupEvents>,
    sink: S,
    affinity: WorkerAffinity,
}

impl<T: TransportPool, S: DiscoveryEventSink> ProxyServerSelector<T, S> {
    /// `request` is the template sent on every proxy-address lookup.
    pub fn new(
        config: ProxyConfig,
        request: ProxyAddressRequest,
        transport: T,
        sink: S,
        time_source: Box<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let lookup = RequestOrchestrator::new(config.lookup, transport, LookupEvents::default(), time_source)?;
        Ok(Self {
            static_proxies: config.static_proxies,
            static_cursor: 0,
            discovered: Vec::new(),
            discovered_cursor: 0,
            request,
            lookup,
            sink,
            affinity: WorkerAffinity::current(),
        })
    }

    /// Next proxy to try.
    ///
    /// # Errors
    ///
    /// `NoAvailableCandidate` when static proxies are exhausted and none has
    /// been discovered yet; a lookup is started and the caller retries once
    /// a `ProxySelector` success event arrives.
    pub fn select_next(&mut self) -> Result<ProxyChoice, DiscoveryError> {
        self.affinity.check();
        if let Some(proxy) = self.static_proxies.get(self.static_cursor) {
            self.static_cursor += 1;
            debug!(proxy = %proxy, "static proxy selected");
            return Ok(ProxyChoice::Static(*proxy));
        }
        if !self.discovered.is_empty() {
            let index = self.discovered_cursor % self.discovered.len();
            self.discovered_cursor = index + 1;
            let proxy = self.discovered[index].clone();
            debug!(proxy = %proxy.addr, "discovered proxy selected");
            return Ok(ProxyChoice::Discovered(proxy));
        }
        self.start_lookup();
        Err(DiscoveryError::NoAvailableCandidate)
    }

    /// Drop a discovered proxy that failed. Returns whether it was known.
    pub fn report_proxy_failure(&mut self, proxy: SocketAddr) -> bool {
        self.affinity.check();
        let before = self.discovered.len();
        self.discovered.retain(|resolved| resolved.addr != proxy);
        let removed = self.discovered.len() < before;
        if removed {
            info!(%proxy, remaining = self.discovered.len(), "discovered proxy dropped");
        } else if self.static_proxies.contains(&proxy) {
            debug!(%proxy, "static proxy failed");
        }
        removed || self.static_proxies.contains(&proxy)
    }

    /// Start over from the first static proxy.
    pub fn reset_rotation(&mut self) {
        self.affinity.check();
        self.static_cursor = 0;
        self.discovered_cursor = 0;
    }

    pub fn set_request(&mut self, request: ProxyAddressRequest) {
        self.request = request;
    }

    pub fn discovered(&self) -> &[ResolvedAddress] {
        &self.discovered
    }

    pub fn is_looking_up(&self) -> bool {
        self.lookup
            .pending_for(&RequestKey::Kind(RequestKind::ProxyAddress))
            .is_some()
    }

    /// Access points known to the lookup.
    pub fn access_points(&self) -> &ServerSelector {
        self.lookup.selector()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.lookup.transport_mut()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Abandon the running lookup and forget discovered proxies.
    pub fn stop(&mut self) {
        self.affinity.check();
        self.lookup.stop_all();
        self.discovered.clear();
        self.reset_rotation();
    }

    fn start_lookup(&mut self) {
        if self.is_looking_up() {
            return;
        }
        match self
            .lookup
            .submit(DiscoveryRequest::ProxyAddress(self.request.clone()))
        {
            Ok(id) => debug!(%id, "proxy lookup started"),
            Err(DiscoveryError::NoAvailableCandidate) => {
                debug!("proxy lookup waiting for access points")
            }
            Err(error) => warn!(%error, "proxy lookup not started"),
        }
        self.forward_events();
    }

    /// Re-emit lookup events as proxy selector events, keeping discovered
    /// proxies from successful answers.
    fn forward_events(&mut self) {
        let events = std::mem::take(&mut self.lookup.sink_mut().0);
        for mut event in events {
            if event.outcome.is_success() && !event.addresses.is_empty() {
                self.discovered.clear();
                for address in &event.addresses {
                    if !self.discovered.contains(address) {
                        self.discovered.push(address.clone());
                    }
                }
                self.discovered_cursor = 0;
                info!(proxies = self.discovered.len(), "proxies discovered");
            }
            event.source = EventSource::ProxySelector;
            self.sink.on_event(&event);
        }
    }
}

impl<T: TransportPool, S: DiscoveryEventSink> TransportEvents for ProxyServerSelector<T, S> {
    fn on_connected(&mut self, connection: ConnectionId) {
        self.lookup.on_connected(connection);
        self.forward_events();
    }

    fn on_disconnected(&mut self, connection: ConnectionId) {
        self.lookup.on_disconnected(connection);
        self.forward_events();
    }

    fn on_response_packet(
        &mut self,
        category: u16,
        operation: u16,
        source: SocketAddr,
        is_udp: bool,
        body: &[u8],
    ) {
        self.lookup
            .on_response_packet(category, operation, source, is_udp, body);
        self.forward_events();
    }
}

impl<T: TransportPool, S: DiscoveryEventSink> TimerDriven for ProxyServerSelector<T, S> {
    fn on_tick(&mut self) {
        self.lookup.on_tick();
        self.forward_events();
    }

    fn next_deadline(&self) -> Option<Timestamp> {
        self.lookup.next_deadline()
    }
}

impl<T: TransportPool, S: DiscoveryEventSink> ServerSetListener for ProxyServerSelector<T, S> {
    fn on_server_set(&mut self, update: &ServerSetUpdate) {
        self.lookup.on_server_set(update);
    }
}
