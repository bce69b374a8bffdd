//! Core domain entities: servers, categories, families, connections.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Transport/security class a server belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ServerCategory {
    /// Plain servers reachable over UDP and TCP.
    Default,
    /// Servers speaking the encrypted protocol variant.
    HighSecurityCrypto,
    /// TLS-over-TCP fallback servers.
    TcpTls,
}

impl ServerCategory {
    pub const ALL: [ServerCategory; 3] = [
        ServerCategory::Default,
        ServerCategory::HighSecurityCrypto,
        ServerCategory::TcpTls,
    ];
}

impl std::fmt::Display for ServerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::HighSecurityCrypto => write!(f, "crypto"),
            Self::TcpTls => write!(f, "tls"),
        }
    }
}

/// Category filter for sizing queries and bulk resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryScope {
    /// Aggregate across every category.
    Any,
    Only(ServerCategory),
}

impl CategoryScope {
    pub fn matches(self, category: ServerCategory) -> bool {
        match self {
            Self::Any => true,
            Self::Only(wanted) => wanted == category,
        }
    }
}

impl From<ServerCategory> for CategoryScope {
    fn from(category: ServerCategory) -> Self {
        Self::Only(category)
    }
}

/// IP family of a server address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IpFamily {
    V4,
    /// IPv6 address synthesized from IPv4 by DNS64/NAT64.
    V6Nat64,
    /// Native IPv6 address.
    V6Pure,
}

impl IpFamily {
    /// Well-known NAT64 prefix `64:ff9b::/96` (RFC 6052).
    pub const WELL_KNOWN_NAT64: Ipv6Addr = Ipv6Addr::new(0x64, 0xff9b, 0, 0, 0, 0, 0, 0);

    /// Classify an address. Only the well-known prefix is recognised here;
    /// addresses synthesized with a network-specific prefix are tagged by
    /// whoever synthesized them.
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(v6) if has_prefix_96(v6, &Self::WELL_KNOWN_NAT64) => Self::V6Nat64,
            IpAddr::V6(_) => Self::V6Pure,
        }
    }
}

fn has_prefix_96(addr: &Ipv6Addr, prefix: &Ipv6Addr) -> bool {
    addr.octets()[..12] == prefix.octets()[..12]
}

/// Embed an IPv4 address into a /96 NAT64 prefix.
pub fn synthesize_nat64(prefix: Ipv6Addr, v4: Ipv4Addr) -> Ipv6Addr {
    let mut octets = prefix.octets();
    octets[12..].copy_from_slice(&v4.octets());
    Ipv6Addr::from(octets)
}

/// A server address together with its IP family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerEndpoint {
    pub addr: SocketAddr,
    pub family: IpFamily,
}

impl ServerEndpoint {
    pub fn new(addr: SocketAddr, family: IpFamily) -> Self {
        Self { addr, family }
    }

    /// Endpoint whose family is derived from the address itself.
    pub fn from_addr(addr: SocketAddr) -> Self {
        Self {
            addr,
            family: IpFamily::of(&addr.ip()),
        }
    }
}

impl From<SocketAddr> for ServerEndpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::from_addr(addr)
    }
}

/// Transport flavour of a pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransportKind {
    Udp,
    Tcp,
    Tls,
}

impl TransportKind {
    pub fn is_udp(self) -> bool {
        matches!(self, Self::Udp)
    }
}

/// Opaque handle of a connection owned by the transport pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_classification() {
        let v4: IpAddr = "1.2.3.4".parse().unwrap();
        let nat64: IpAddr = "64:ff9b::102:304".parse().unwrap();
        let pure: IpAddr = "2001:db8::1".parse().unwrap();

        assert_eq!(IpFamily::of(&v4), IpFamily::V4);
        assert_eq!(IpFamily::of(&nat64), IpFamily::V6Nat64);
        assert_eq!(IpFamily::of(&pure), IpFamily::V6Pure);
    }

    #[test]
    fn test_nat64_synthesis_uses_prefix() {
        let synthesized = synthesize_nat64(IpFamily::WELL_KNOWN_NAT64, Ipv4Addr::new(1, 2, 3, 4));
        assert_eq!(synthesized, "64:ff9b::102:304".parse::<Ipv6Addr>().unwrap());
        assert_eq!(IpFamily::of(&IpAddr::V6(synthesized)), IpFamily::V6Nat64);
    }

    #[test]
    fn test_category_scope_wildcard() {
        assert!(CategoryScope::Any.matches(ServerCategory::TcpTls));
        assert!(!CategoryScope::Only(ServerCategory::Default).matches(ServerCategory::TcpTls));
    }
}
