//! Retry and timeout loop.

use tracing::{debug, info};

use super::core::RequestOrchestrator;
use crate::domain::{
    DiscoveryEvent, EventOutcome, EventSource, LaneState, RequestKey, Timestamp,
};
use crate::ports::{DiscoveryEventSink, TimerDriven, TransportPool};

impl<T: TransportPool, S: DiscoveryEventSink> TimerDriven for RequestOrchestrator<T, S> {
    /// One firing of the retry timer. Calls before the deadline are ignored.
    fn on_tick(&mut self) {
        self.affinity.check();
        let now = self.now();
        if !self.timer.is_due(now) {
            return;
        }
        self.timer.reschedule(now);

        self.sweep_timeouts(now);
        self.retry_working(now);
        self.release_idle_connections();
        self.disarm_if_idle();
    }

    fn next_deadline(&self) -> Option<Timestamp> {
        self.timer.deadline()
    }
}

impl<T: TransportPool, S: DiscoveryEventSink> RequestOrchestrator<T, S> {
    /// Fail servers that exceeded the response budget and tell the requests
    /// waiting on them.
    fn sweep_timeouts(&mut self, now: Timestamp) {
        let expired = self.selector.check_timeout(self.config.response_timeout, now);
        if expired.is_empty() {
            return;
        }

        let mut events = Vec::new();
        for server in &expired {
            for pending in self.pending.values_mut() {
                if pending.finish_server(*server, LaneState::Failed) == 0 {
                    continue;
                }
                debug!(id = %pending.id, %server, "lane timed out");
                events.push(
                    DiscoveryEvent::new(
                        EventSource::Request(pending.kind()),
                        EventOutcome::TimedOut,
                        pending.flags,
                    )
                    .with_request(pending.id, pending.elapsed(now), pending.success_count)
                    .with_server(*server),
                );
            }
        }
        for event in events {
            self.emit(event);
        }
    }

    /// Re-run selection for every working request the gate still permits.
    fn retry_working(&mut self, now: Timestamp) {
        let keys: Vec<RequestKey> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.is_working())
            .map(|(key, _)| key.clone())
            .collect();

        for key in keys {
            let Some(kind) = self.pending.get(&key).map(|pending| pending.kind()) else {
                continue;
            };
            if !self.permits(kind) {
                self.abort_request(&key, now);
                continue;
            }
            if let Some(pending) = self.pending.get_mut(&key) {
                pending.prune_lanes();
                pending.try_count += 1;
            }
            self.select_for(&key, now);
        }
    }

    /// Gate veto on retry: the request ends with one abort notice.
    fn abort_request(&mut self, key: &RequestKey, now: Timestamp) {
        let Some(mut pending) = self.pending.remove(key) else {
            return;
        };
        pending.abort();
        info!(id = %pending.id, kind = %pending.kind(), "request aborted by gate");
        self.release_lanes(&pending);
        let event = DiscoveryEvent::new(
            EventSource::Request(pending.kind()),
            EventOutcome::Aborted,
            pending.flags,
        )
        .with_request(pending.id, pending.elapsed(now), pending.success_count);
        self.emit(event);
    }
}
