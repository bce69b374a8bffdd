//! Test utilities for access-point discovery.
//!
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use ap_discovery::test_utils::ManualTimeSource;
//! use ap_discovery::ports::TimeSource;
//!
//! let clock = ManualTimeSource::new(1_000);
//! let handle = clock.clone();
//! handle.advance_millis(250);
//! assert_eq!(clock.now().as_millis(), 1_250);
//! ```

use std::cell::Cell;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use ap_wire::{Packet, WireMessage};

use crate::domain::{duration_millis, Timestamp};
use crate::ports::{TimeSource, TransportEvents};

/// A clock moved by hand. Clones share the same time.
///
/// Hand one clone to the component under test and keep another to advance.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    millis: Rc<Cell<u64>>,
}

impl ManualTimeSource {
    /// Create a clock reading `millis`.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Rc::new(Cell::new(millis)),
        }
    }

    pub fn set_millis(&self, millis: u64) {
        self.millis.set(millis);
    }

    pub fn advance_millis(&self, millis: u64) {
        self.millis.set(self.millis.get().saturating_add(millis));
    }

    pub fn advance(&self, duration: Duration) {
        self.advance_millis(duration_millis(duration));
    }

    /// Boxed clone, ready for a component constructor.
    pub fn boxed(&self) -> Box<dyn TimeSource> {
        Box::new(self.clone())
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.get())
    }
}

/// Feed `message` to `target` as if `source` had answered over UDP.
pub fn deliver<M, E>(target: &mut E, source: SocketAddr, message: &M)
where
    M: WireMessage,
    E: TransportEvents + ?Sized,
{
    let packet = Packet::from_message(message);
    target.on_response_packet(
        packet.kind.category,
        packet.kind.operation,
        source,
        true,
        &packet.body,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_time() {
        let clock = ManualTimeSource::new(10);
        let boxed = clock.boxed();
        clock.advance(Duration::from_millis(90));
        assert_eq!(boxed.now(), Timestamp::from_millis(100));

        clock.set_millis(5);
        assert_eq!(boxed.now().as_millis(), 5);
    }
}
