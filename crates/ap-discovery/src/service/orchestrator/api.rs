//! DiscoveryApi and ServerSetListener implementations.

use tracing::{debug, info};

use super::core::RequestOrchestrator;
use crate::domain::{
    CancelCriteria, DiscoveryError, DiscoveryRequest, PendingRequest, RequestId, RequestKey,
    ServerSetUpdate,
};
use crate::ports::{DiscoveryApi, DiscoveryEventSink, ServerSetListener, TransportPool};

impl<T: TransportPool, S: DiscoveryEventSink> DiscoveryApi for RequestOrchestrator<T, S> {
    fn submit(&mut self, request: DiscoveryRequest) -> Result<RequestId, DiscoveryError> {
        self.affinity.check();
        let kind = request.kind();
        if !self.permits(kind) {
            info!(%kind, "request vetoed by gate");
            return Err(DiscoveryError::Aborted);
        }

        let now = self.now();
        let key = request.key();
        let opid = rand::random::<u64>();
        let id = match self.pending.get_mut(&key) {
            Some(existing) => {
                existing.merge(request, opid);
                debug!(id = %existing.id, %kind, flags = %existing.flags, "request merged");
                existing.id
            }
            None => {
                let id = self.allocate_id();
                let mut pending = PendingRequest::new(id, request, opid, now);
                pending.start();
                debug!(%id, %kind, flags = %pending.flags, "request submitted");
                self.pending.insert(key.clone(), pending);
                id
            }
        };
        self.timer.arm(now);

        self.select_for(&key, now);
        let in_flight = self
            .pending
            .get(&key)
            .is_some_and(|pending| !pending.active_servers().is_empty());
        if in_flight {
            Ok(id)
        } else {
            debug!(%id, %kind, "no lane opened, waiting for retry");
            Err(DiscoveryError::NoAvailableCandidate)
        }
    }

    fn cancel(&mut self, criteria: CancelCriteria) -> Result<(), DiscoveryError> {
        self.affinity.check();
        let keys: Vec<RequestKey> = self
            .pending
            .iter()
            .filter(|(_, pending)| criteria.matches(pending))
            .map(|(key, _)| key.clone())
            .collect();
        if keys.is_empty() {
            return Err(DiscoveryError::NotFound);
        }
        for key in keys {
            if let Some(pending) = self.pending.remove(&key) {
                debug!(id = %pending.id, kind = %pending.kind(), "request cancelled");
                self.release_lanes(&pending);
            }
        }
        self.release_idle_connections();
        self.disarm_if_idle();
        Ok(())
    }

    fn stop_all(&mut self) {
        self.affinity.check();
        let dropped = self.pending.len();
        self.pending.clear();
        for (id, _) in self.connections.drain() {
            self.transport.close(id);
        }
        self.selector.recycle_all();
        self.timer.disarm();
        info!(dropped, "all discovery requests stopped");
    }
}

impl<T: TransportPool, S: DiscoveryEventSink> ServerSetListener for RequestOrchestrator<T, S> {
    fn on_server_set(&mut self, update: &ServerSetUpdate) {
        self.affinity.check();
        match update {
            ServerSetUpdate::Servers { category, servers } => {
                self.selector.update(servers, *category);
            }
            ServerSetUpdate::Reset { scope } => {
                for category in crate::domain::ServerCategory::ALL {
                    if scope.matches(category) {
                        self.selector.clear_category(category);
                    }
                }
            }
        }
    }
}

impl<T: TransportPool, S: DiscoveryEventSink> RequestOrchestrator<T, S> {
    pub(crate) fn disarm_if_idle(&mut self) {
        if self.pending.is_empty() && !self.selector.has_inuse() {
            self.timer.disarm();
        }
    }
}
