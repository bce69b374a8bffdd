//! Selection planning: how many servers of which family and category a
//! request should be sent to, and over which transports.

use crate::domain::{EncryptionPolicy, IpFamily, IpStackMode, ServerCategory, TransportKind, TransportPolicy};

/// One (family, category) bucket of a selection round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSlot {
    pub family: IpFamily,
    pub category: ServerCategory,
    /// Target number of servers, in-use ones included
    pub count: usize,
}

/// Split `count` candidates over the reachable IP families.
///
/// In combined IPv6 mode NAT64 gets the larger half.
pub fn split_families(count: usize, stack: IpStackMode) -> Vec<(IpFamily, usize)> {
    match stack {
        IpStackMode::Ipv4 => vec![(IpFamily::V4, count)],
        IpStackMode::CombinedIpv6 => {
            let nat64 = count.div_ceil(2);
            vec![(IpFamily::V6Nat64, nat64), (IpFamily::V6Pure, count - nat64)]
        }
    }
}

/// Plan a selection round for `count` candidates. Empty slots are omitted.
pub fn plan_selection(count: usize, policy: &TransportPolicy, stack: IpStackMode) -> Vec<SelectionSlot> {
    let mut slots = Vec::new();
    for (family, per_family) in split_families(count, stack) {
        if per_family == 0 {
            continue;
        }
        match policy.encryption {
            EncryptionPolicy::None => slots.push(SelectionSlot {
                family,
                category: ServerCategory::Default,
                count: per_family,
            }),
            EncryptionPolicy::Preferred => {
                slots.push(SelectionSlot {
                    family,
                    category: ServerCategory::HighSecurityCrypto,
                    count: per_family,
                });
                slots.push(SelectionSlot {
                    family,
                    category: ServerCategory::TcpTls,
                    count: 1,
                });
            }
        }
    }
    slots
}

/// Connection kinds to open towards a selected server.
pub fn transport_kinds(category: ServerCategory, policy: &TransportPolicy) -> &'static [TransportKind] {
    match (category, policy.force_tcp) {
        (ServerCategory::Default, false) => &[TransportKind::Udp, TransportKind::Tcp],
        (ServerCategory::Default, true) => &[TransportKind::Tcp],
        (ServerCategory::HighSecurityCrypto, false) => &[TransportKind::Udp],
        (ServerCategory::HighSecurityCrypto, true) => &[TransportKind::Tcp],
        (ServerCategory::TcpTls, _) => &[TransportKind::Tls],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dual_stack_split() {
        assert_eq!(
            split_families(4, IpStackMode::CombinedIpv6),
            vec![(IpFamily::V6Nat64, 2), (IpFamily::V6Pure, 2)]
        );
        assert_eq!(
            split_families(3, IpStackMode::CombinedIpv6),
            vec![(IpFamily::V6Nat64, 2), (IpFamily::V6Pure, 1)]
        );
        assert_eq!(split_families(3, IpStackMode::Ipv4), vec![(IpFamily::V4, 3)]);
    }

    #[test]
    fn test_plan_without_encryption() {
        let plan = plan_selection(2, &TransportPolicy::default(), IpStackMode::Ipv4);
        assert_eq!(
            plan,
            vec![SelectionSlot {
                family: IpFamily::V4,
                category: ServerCategory::Default,
                count: 2
            }]
        );
    }

    #[test]
    fn test_plan_with_encryption_adds_tls_fallback() {
        let plan = plan_selection(1, &TransportPolicy::encrypted(), IpStackMode::CombinedIpv6);
        // Pure v6 gets nothing out of one candidate
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].category, ServerCategory::HighSecurityCrypto);
        assert_eq!(plan[0].family, IpFamily::V6Nat64);
        assert_eq!(plan[1].category, ServerCategory::TcpTls);
        assert_eq!(plan[1].count, 1);
    }

    #[test]
    fn test_transport_kinds() {
        let plain = TransportPolicy::default();
        let forced = TransportPolicy::default().with_force_tcp(true);

        assert_eq!(
            transport_kinds(ServerCategory::Default, &plain),
            &[TransportKind::Udp, TransportKind::Tcp]
        );
        assert_eq!(transport_kinds(ServerCategory::Default, &forced), &[TransportKind::Tcp]);
        assert_eq!(transport_kinds(ServerCategory::HighSecurityCrypto, &plain), &[TransportKind::Udp]);
        assert_eq!(transport_kinds(ServerCategory::HighSecurityCrypto, &forced), &[TransportKind::Tcp]);
        assert_eq!(transport_kinds(ServerCategory::TcpTls, &forced), &[TransportKind::Tls]);
    }
}
