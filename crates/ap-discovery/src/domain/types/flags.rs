//! Service intent bitmask.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// One bit per service a request (or an in-use server) is waiting on.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceFlags(u32);

impl ServiceFlags {
    pub const EMPTY: ServiceFlags = ServiceFlags(0);
    /// Media gateway addresses for joining a channel.
    pub const CHANNEL_JOIN: ServiceFlags = ServiceFlags(1 << 0);
    /// First configuration phase (dynamic configuration).
    pub const CONFIG_CDS: ServiceFlags = ServiceFlags(1 << 1);
    /// Second configuration phase (test/rollout configuration).
    pub const CONFIG_TDS: ServiceFlags = ServiceFlags(1 << 2);
    pub const PROXY: ServiceFlags = ServiceFlags(1 << 3);
    pub const WORKER: ServiceFlags = ServiceFlags(1 << 4);
    pub const LASTMILE: ServiceFlags = ServiceFlags(1 << 5);
    pub const ACCOUNT: ServiceFlags = ServiceFlags(1 << 6);
    pub const UNIFIED: ServiceFlags = ServiceFlags(1 << 7);
    pub const REPORT: ServiceFlags = ServiceFlags(1 << 8);

    /// Both configuration phases.
    pub const CONFIG: ServiceFlags = ServiceFlags(Self::CONFIG_CDS.0 | Self::CONFIG_TDS.0);

    const NAMES: [(ServiceFlags, &'static str); 9] = [
        (Self::CHANNEL_JOIN, "CHANNEL_JOIN"),
        (Self::CONFIG_CDS, "CONFIG_CDS"),
        (Self::CONFIG_TDS, "CONFIG_TDS"),
        (Self::PROXY, "PROXY"),
        (Self::WORKER, "WORKER"),
        (Self::LASTMILE, "LASTMILE"),
        (Self::ACCOUNT, "ACCOUNT"),
        (Self::UNIFIED, "UNIFIED"),
        (Self::REPORT, "REPORT"),
    ];

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// All bits of `other` are set in `self`.
    pub const fn contains(self, other: ServiceFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// At least one bit is shared.
    pub const fn intersects(self, other: ServiceFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: ServiceFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ServiceFlags) {
        self.0 &= !other.0;
    }

    /// Individual named bits set in `self`.
    pub fn iter(self) -> impl Iterator<Item = ServiceFlags> {
        Self::NAMES
            .into_iter()
            .map(|(flag, _)| flag)
            .filter(move |flag| self.contains(*flag))
    }
}

impl BitOr for ServiceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ServiceFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ServiceFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for ServiceFlags {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for ServiceFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Display for ServiceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(empty)");
        }
        let mut first = true;
        let mut known = ServiceFlags::EMPTY;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                known |= flag;
                first = false;
            }
        }
        let unknown = self.0 & !known.0;
        if unknown != 0 {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{unknown:#x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceFlags({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_algebra() {
        let mut flags = ServiceFlags::CHANNEL_JOIN | ServiceFlags::CONFIG_CDS;
        assert!(flags.contains(ServiceFlags::CHANNEL_JOIN));
        assert!(flags.intersects(ServiceFlags::CONFIG));
        assert!(!flags.contains(ServiceFlags::CONFIG));

        flags.remove(ServiceFlags::CHANNEL_JOIN);
        assert_eq!(flags, ServiceFlags::CONFIG_CDS);

        flags.insert(ServiceFlags::CONFIG_TDS);
        assert_eq!(flags, ServiceFlags::CONFIG);
        assert_eq!(flags & !ServiceFlags::CONFIG_CDS, ServiceFlags::CONFIG_TDS);
    }

    #[test]
    fn test_bit_positions_are_stable() {
        assert_eq!(ServiceFlags::CHANNEL_JOIN.bits(), 0x001);
        assert_eq!(ServiceFlags::CONFIG_TDS.bits(), 0x004);
        assert_eq!(ServiceFlags::UNIFIED.bits(), 0x080);
        assert_eq!(ServiceFlags::REPORT.bits(), 0x100);
    }

    #[test]
    fn test_display_lists_names() {
        let flags = ServiceFlags::PROXY | ServiceFlags::WORKER | ServiceFlags::from_bits(1 << 20);
        assert_eq!(flags.to_string(), "PROXY|WORKER|0x100000");
        assert_eq!(ServiceFlags::EMPTY.to_string(), "(empty)");
    }

    #[test]
    fn test_iter_yields_single_bits() {
        let flags = ServiceFlags::CONFIG | ServiceFlags::REPORT;
        let bits: Vec<_> = flags.iter().collect();
        assert_eq!(
            bits,
            vec![
                ServiceFlags::CONFIG_CDS,
                ServiceFlags::CONFIG_TDS,
                ServiceFlags::REPORT
            ]
        );
    }
}
