//! In-memory DNS resolver.

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;

use crate::domain::DnsQueryId;
use crate::ports::{DnsError, DnsResolver, DnsResult, RecordType};

/// A query accepted by [`StaticDnsResolver`] and not yet completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuery {
    pub id: DnsQueryId,
    pub domain: String,
    pub record: RecordType,
}

/// Resolver answering from a fixed table.
///
/// Queries are only answered when the host calls
/// [`StaticDnsResolver::take_completed`], which mimics the asynchronous
/// delivery of a real resolver.
#[derive(Debug, Default)]
pub struct StaticDnsResolver {
    records: HashMap<String, Vec<IpAddr>>,
    refused: HashSet<String>,
    queued: VecDeque<DnsQuery>,
    next_id: u64,
}

impl StaticDnsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `domain` with `ips`; `A` queries see the IPv4 ones and
    /// `AAAA` queries the IPv6 ones.
    #[must_use]
    pub fn with_records(mut self, domain: impl Into<String>, ips: Vec<IpAddr>) -> Self {
        self.set_records(domain, ips);
        self
    }

    pub fn set_records(&mut self, domain: impl Into<String>, ips: Vec<IpAddr>) {
        self.records.insert(domain.into(), ips);
    }

    /// Reject queries for `domain` synchronously.
    pub fn refuse(&mut self, domain: impl Into<String>) {
        self.refused.insert(domain.into());
    }

    /// Queries waiting for an answer, oldest first.
    pub fn queued(&self) -> impl Iterator<Item = &DnsQuery> {
        self.queued.iter()
    }

    pub fn queued_count(&self) -> usize {
        self.queued.len()
    }

    /// Answer every queued query.
    pub fn take_completed(&mut self) -> Vec<(DnsQueryId, DnsResult)> {
        let queued: Vec<DnsQuery> = self.queued.drain(..).collect();
        queued
            .into_iter()
            .map(|query| (query.id, self.answer(&query)))
            .collect()
    }

    fn answer(&self, query: &DnsQuery) -> DnsResult {
        let ips: Vec<IpAddr> = self
            .records
            .get(&query.domain)
            .map(|ips| {
                ips.iter()
                    .copied()
                    .filter(|ip| match query.record {
                        RecordType::A => ip.is_ipv4(),
                        RecordType::Aaaa => ip.is_ipv6(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        if ips.is_empty() {
            return Err(DnsError::NoRecords(query.domain.clone()));
        }
        Ok(ips)
    }
}

impl DnsResolver for StaticDnsResolver {
    fn resolve(&mut self, domain: &str, record: RecordType) -> Result<DnsQueryId, DnsError> {
        if self.refused.contains(domain) {
            return Err(DnsError::Failed {
                domain: domain.to_string(),
                reason: "refused".to_string(),
            });
        }
        self.next_id += 1;
        let id = DnsQueryId(self.next_id);
        self.queued.push_back(DnsQuery {
            id,
            domain: domain.to_string(),
            record,
        });
        Ok(id)
    }

    fn cancel(&mut self, query: DnsQueryId) {
        self.queued.retain(|queued| queued.id != query);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answers_filter_by_record_type() {
        let mut resolver = StaticDnsResolver::new().with_records(
            "ap.example.net",
            vec!["192.0.2.1".parse().unwrap(), "2001:db8::1".parse().unwrap()],
        );
        let a = resolver.resolve("ap.example.net", RecordType::A).unwrap();
        let aaaa = resolver.resolve("ap.example.net", RecordType::Aaaa).unwrap();
        let missing = resolver.resolve("none.example.net", RecordType::A).unwrap();

        let completed: HashMap<DnsQueryId, DnsResult> = resolver.take_completed().into_iter().collect();
        assert_eq!(completed[&a], Ok(vec!["192.0.2.1".parse().unwrap()]));
        assert_eq!(completed[&aaaa], Ok(vec!["2001:db8::1".parse().unwrap()]));
        assert!(matches!(completed[&missing], Err(DnsError::NoRecords(_))));
        assert_eq!(resolver.queued_count(), 0);
    }

    #[test]
    fn test_cancel_and_refuse() {
        let mut resolver = StaticDnsResolver::new();
        let id = resolver.resolve("ap.example.net", RecordType::A).unwrap();
        resolver.cancel(id);
        assert!(resolver.take_completed().is_empty());

        resolver.refuse("bad.example.net");
        assert!(resolver.resolve("bad.example.net", RecordType::A).is_err());
    }
}
