//! Component configuration.
//!
//! Every struct has production defaults, a `for_testing()` preset with short
//! timers and `with_*` builders. `validate()` rejects values the components
//! cannot run with.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::domain::{
    ConfigError, EncryptionPolicy, IpStackMode, SelectorConfig, ServerCategory, TransportPolicy,
};

/// Request orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrchestratorConfig {
    /// Servers each request is sent to per family and category
    pub candidates_per_round: usize,
    /// Retry timer period
    pub tick_interval: Duration,
    /// Budget before an in-use server is failed by the timeout sweep
    pub response_timeout: Duration,
    pub transport_policy: TransportPolicy,
    pub ip_stack: IpStackMode,
    pub selector: SelectorConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            candidates_per_round: 2,
            tick_interval: Duration::from_secs(1),
            response_timeout: Duration::from_secs(2),
            transport_policy: TransportPolicy::default(),
            ip_stack: IpStackMode::Ipv4,
            selector: SelectorConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Longer response budget for hosts that run the whole join flow
    /// through one orchestrator (join, configuration and account lookups
    /// queued on the same servers).
    pub fn full_flow() -> Self {
        Self {
            response_timeout: Duration::from_secs(5),
            ..Self::default()
        }
    }

    pub fn for_testing() -> Self {
        Self {
            candidates_per_round: 1,
            tick_interval: Duration::from_millis(100),
            response_timeout: Duration::from_millis(500),
            transport_policy: TransportPolicy::default(),
            ip_stack: IpStackMode::Ipv4,
            selector: SelectorConfig::for_testing(),
        }
    }

    #[must_use]
    pub fn with_candidates(mut self, count: usize) -> Self {
        self.candidates_per_round = count;
        self
    }

    #[must_use]
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_transport_policy(mut self, policy: TransportPolicy) -> Self {
        self.transport_policy = policy;
        self
    }

    #[must_use]
    pub fn with_ip_stack(mut self, stack: IpStackMode) -> Self {
        self.ip_stack = stack;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.candidates_per_round == 0 {
            return Err(ConfigError::Zero("candidates_per_round"));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::Zero("tick_interval"));
        }
        if self.response_timeout.is_zero() {
            return Err(ConfigError::Zero("response_timeout"));
        }
        self.selector.validate()
    }
}

/// Where access-point servers come from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerSetConfig {
    /// Domains resolved with `A` lookups, per category
    pub domains: BTreeMap<ServerCategory, Vec<String>>,
    /// Domains additionally resolved with `AAAA` lookups on IPv6 hosts
    pub ipv6_domains: BTreeMap<ServerCategory, Vec<String>>,
    /// Fixed server IPs; when set no domain is resolved
    pub static_ips: Vec<IpAddr>,
    /// Ports paired with every static IP; defaults apply when empty
    pub static_ports: Vec<u16>,
    pub default_ports: BTreeMap<ServerCategory, Vec<u16>>,
    pub encryption: EncryptionPolicy,
    /// Re-resolution period for categories still unresolved
    pub retry_interval: Duration,
    /// Re-resolution attempts per bootstrap
    pub max_retries: u32,
}

impl Default for ServerSetConfig {
    fn default() -> Self {
        let mut default_ports = BTreeMap::new();
        default_ports.insert(ServerCategory::Default, vec![8000, 1080, 25000]);
        default_ports.insert(ServerCategory::HighSecurityCrypto, vec![8443, 9700]);
        default_ports.insert(ServerCategory::TcpTls, vec![443]);
        Self {
            domains: BTreeMap::new(),
            ipv6_domains: BTreeMap::new(),
            static_ips: Vec::new(),
            static_ports: Vec::new(),
            default_ports,
            encryption: EncryptionPolicy::None,
            retry_interval: Duration::from_secs(3),
            max_retries: 5,
        }
    }
}

impl ServerSetConfig {
    pub fn for_testing() -> Self {
        Self {
            retry_interval: Duration::from_millis(100),
            max_retries: 3,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_domains(mut self, category: ServerCategory, domains: Vec<String>) -> Self {
        self.domains.insert(category, domains);
        self
    }

    #[must_use]
    pub fn with_ipv6_domains(mut self, category: ServerCategory, domains: Vec<String>) -> Self {
        self.ipv6_domains.insert(category, domains);
        self
    }

    #[must_use]
    pub fn with_static_ips(mut self, ips: Vec<IpAddr>) -> Self {
        self.static_ips = ips;
        self
    }

    #[must_use]
    pub fn with_static_ports(mut self, ports: Vec<u16>) -> Self {
        self.static_ports = ports;
        self
    }

    #[must_use]
    pub fn with_default_ports(mut self, category: ServerCategory, ports: Vec<u16>) -> Self {
        self.default_ports.insert(category, ports);
        self
    }

    #[must_use]
    pub fn with_encryption(mut self, encryption: EncryptionPolicy) -> Self {
        self.encryption = encryption;
        self
    }

    /// Ports to pair with addresses of `category`.
    pub fn ports_for(&self, category: ServerCategory) -> &[u16] {
        if !self.static_ips.is_empty() && !self.static_ports.is_empty() {
            return &self.static_ports;
        }
        self.default_ports
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_interval.is_zero() {
            return Err(ConfigError::Zero("retry_interval"));
        }
        let policy = TransportPolicy {
            encryption: self.encryption,
            force_tcp: false,
        };
        for category in policy.active_categories() {
            if self.ports_for(*category).is_empty() {
                return Err(ConfigError::MissingPorts(category_name(*category)));
            }
        }
        Ok(())
    }
}

fn category_name(category: ServerCategory) -> &'static str {
    match category {
        ServerCategory::Default => "default",
        ServerCategory::HighSecurityCrypto => "crypto",
        ServerCategory::TcpTls => "tls",
    }
}

/// Proxy server selector configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProxyConfig {
    /// Proxies tried in order before any lookup is made
    pub static_proxies: Vec<SocketAddr>,
    /// How lookups for discovered proxies are run
    pub lookup: OrchestratorConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            static_proxies: Vec::new(),
            lookup: OrchestratorConfig::default(),
        }
    }
}

impl ProxyConfig {
    pub fn for_testing() -> Self {
        Self {
            static_proxies: Vec::new(),
            lookup: OrchestratorConfig::for_testing(),
        }
    }

    #[must_use]
    pub fn with_static_proxies(mut self, proxies: Vec<SocketAddr>) -> Self {
        self.static_proxies = proxies;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lookup.validate()
    }
}

/// Report server client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReportConfig {
    /// Lookup cadence
    pub interval: Duration,
    pub response_timeout: Duration,
    pub candidates_per_round: usize,
    pub selector: SelectorConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            response_timeout: Duration::from_secs(2),
            candidates_per_round: 1,
            selector: SelectorConfig::default(),
        }
    }
}

impl ReportConfig {
    pub fn for_testing() -> Self {
        Self {
            interval: Duration::from_millis(1_000),
            response_timeout: Duration::from_millis(300),
            candidates_per_round: 1,
            selector: SelectorConfig::for_testing(),
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::Zero("interval"));
        }
        if self.response_timeout.is_zero() {
            return Err(ConfigError::Zero("response_timeout"));
        }
        if self.candidates_per_round == 0 {
            return Err(ConfigError::Zero("candidates_per_round"));
        }
        self.selector.validate()
    }
}
