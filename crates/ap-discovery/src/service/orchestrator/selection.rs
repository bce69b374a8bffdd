//! Selection rounds: pick servers per plan slot and open lanes to them.

use std::net::SocketAddr;

use tracing::{debug, warn};

use super::core::{OwnedConnection, RequestOrchestrator};
use crate::domain::{
    plan_selection, transport_kinds, ErrorCode, RequestKey, ServerCategory, ServiceFlags, Timestamp,
};
use crate::ports::{DiscoveryEventSink, TransportPool};

impl<T: TransportPool, S: DiscoveryEventSink> RequestOrchestrator<T, S> {
    /// Bring the request up to the planned number of servers.
    ///
    /// Servers already covering the outstanding intents count towards each
    /// slot. Returns the number of lanes opened.
    pub(crate) fn select_for(&mut self, key: &RequestKey, now: Timestamp) -> usize {
        let Some(pending) = self.pending.get(key) else {
            return 0;
        };
        let flags = pending.flags;
        if flags.is_empty() {
            return 0;
        }
        let covering = pending.covering_servers();
        let policy = self.config.transport_policy;

        let mut opened = 0;
        for slot in plan_selection(self.config.candidates_per_round, &policy, self.config.ip_stack) {
            let already = covering
                .iter()
                .filter_map(|addr| self.selector.entry(addr))
                .filter(|entry| entry.family == slot.family && entry.category == slot.category)
                .count();
            for _ in already..slot.count {
                let Some(server) = self.selector.select(slot.family, flags, slot.category, now) else {
                    debug!(family = ?slot.family, category = %slot.category, %flags, "no candidate for slot");
                    break;
                };
                let lanes = self.open_lanes(key, server, slot.category, flags, now);
                if lanes == 0 {
                    self.selector
                        .report_failure(server, flags, ErrorCode::ConnectionFailed, now);
                }
                opened += lanes;
            }
        }
        opened
    }

    /// Open (or reuse) one connection per transport kind towards `server`.
    fn open_lanes(
        &mut self,
        key: &RequestKey,
        server: SocketAddr,
        category: ServerCategory,
        flags: ServiceFlags,
        now: Timestamp,
    ) -> usize {
        let Some(request_id) = self.pending.get(key).map(|pending| pending.id) else {
            return 0;
        };
        let mut opened = 0;
        for kind in transport_kinds(category, &self.config.transport_policy) {
            let existing = self
                .connections
                .values()
                .find(|owned| owned.server == server && owned.kind == *kind)
                .map(|owned| owned.id);
            let connection = match existing {
                Some(id) => id,
                None => match self.transport.connect(server, category, *kind) {
                    Ok(id) => {
                        self.connections.insert(
                            id,
                            OwnedConnection {
                                id,
                                server,
                                category,
                                kind: *kind,
                                connected: false,
                                queue: Default::default(),
                            },
                        );
                        id
                    }
                    Err(error) => {
                        warn!(%server, ?kind, %error, "connect failed");
                        continue;
                    }
                },
            };

            if let Some(pending) = self.pending.get_mut(key) {
                pending.open_lane(server, connection, now);
            }
            opened += 1;

            let ready = self.transport.is_connected(connection);
            if let Some(owned) = self.connections.get_mut(&connection) {
                owned.connected |= ready;
                if !owned.connected {
                    if !owned.queue.contains(&request_id) {
                        owned.queue.push_back(request_id);
                    }
                    continue;
                }
            }
            if let Err(error) = self.send_request(connection, key) {
                warn!(%server, %connection, %error, "send failed");
                self.drop_connection(connection);
                opened -= 1;
            }
        }
        debug!(%server, %category, %flags, lanes = opened, "lanes opened");
        opened
    }
}
