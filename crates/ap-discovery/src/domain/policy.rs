//! Transport and IP-stack policies.

use crate::domain::ServerCategory;

/// Whether the encrypted server categories are preferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncryptionPolicy {
    #[default]
    None,
    /// Use `HighSecurityCrypto` servers with a `TcpTls` fallback.
    Preferred,
}

/// How requests reach access-point servers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransportPolicy {
    pub encryption: EncryptionPolicy,
    /// Never use UDP.
    pub force_tcp: bool,
}

impl TransportPolicy {
    pub fn encrypted() -> Self {
        Self {
            encryption: EncryptionPolicy::Preferred,
            force_tcp: false,
        }
    }

    #[must_use]
    pub fn with_force_tcp(mut self, force_tcp: bool) -> Self {
        self.force_tcp = force_tcp;
        self
    }

    /// Categories that take part in selection under this policy.
    pub fn active_categories(&self) -> &'static [ServerCategory] {
        match self.encryption {
            EncryptionPolicy::None => &[ServerCategory::Default],
            EncryptionPolicy::Preferred => &[ServerCategory::HighSecurityCrypto, ServerCategory::TcpTls],
        }
    }
}

/// Which IP families the host can reach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IpStackMode {
    #[default]
    Ipv4,
    /// IPv6 host: candidates are split between NAT64 and native v6.
    CombinedIpv6,
}
