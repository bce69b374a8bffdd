//! Worker thread ownership check.

use std::thread::{self, ThreadId};

/// Records the thread that owns a component.
///
/// Every entry point calls [`WorkerAffinity::check`], which panics in debug
/// builds when called from another thread. Release builds skip the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerAffinity {
    owner: ThreadId,
}

impl WorkerAffinity {
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    #[inline]
    pub fn check(&self) {
        debug_assert_eq!(
            thread::current().id(),
            self.owner,
            "discovery component used outside its worker thread"
        );
    }
}

impl Default for WorkerAffinity {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_thread_passes() {
        let affinity = WorkerAffinity::current();
        affinity.check();
        assert_eq!(affinity.owner(), thread::current().id());
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_foreign_thread_panics() {
        let affinity = WorkerAffinity::current();
        let result = thread::spawn(move || affinity.check()).join();
        assert!(result.is_err());
    }
}
