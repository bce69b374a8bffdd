//! Server set notifications pushed from the server set manager.

use std::net::Ipv6Addr;

use crate::domain::{CategoryScope, IpStackMode, ServerCategory, ServerEndpoint};

/// A change to the known access-point servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerSetUpdate {
    /// Fresh servers for one category; listeners merge them in.
    Servers {
        category: ServerCategory,
        servers: Vec<ServerEndpoint>,
    },
    /// Previously pushed servers in `scope` are stale and must be dropped.
    Reset { scope: CategoryScope },
}

/// Connectivity as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkState {
    pub has_ipv4: bool,
    pub has_ipv6: bool,
    /// Network-specific DNS64 prefix when the host sits behind NAT64
    pub dns64_prefix: Option<Ipv6Addr>,
}

impl NetworkState {
    pub fn ipv4_only() -> Self {
        Self {
            has_ipv4: true,
            has_ipv6: false,
            dns64_prefix: None,
        }
    }

    pub fn ipv6_only(dns64_prefix: Option<Ipv6Addr>) -> Self {
        Self {
            has_ipv4: false,
            has_ipv6: true,
            dns64_prefix,
        }
    }

    pub fn dual_stack() -> Self {
        Self {
            has_ipv4: true,
            has_ipv6: true,
            dns64_prefix: None,
        }
    }

    /// IPv4 results must be mapped into NAT64 space to be reachable.
    pub fn needs_nat64(&self) -> bool {
        self.has_ipv6 && !self.has_ipv4
    }

    pub fn stack_mode(&self) -> IpStackMode {
        if self.needs_nat64() {
            IpStackMode::CombinedIpv6
        } else {
            IpStackMode::Ipv4
        }
    }
}
