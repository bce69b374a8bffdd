//! # Server Selector - Candidate Pool with Backoff
//!
//! In-memory pool of access-point servers partitioned into two sets:
//!
//! - **avail**: idle servers, ordered by preference (front = try first)
//! - **inuse**: servers with at least one outstanding service intent
//!
//! A server enters `inuse` when a flag is first assigned and returns to
//! `avail` only once its pending flags are empty. Failures push the server
//! to the back of `avail` with an exponential cooldown; a success resets the
//! cooldown and moves it to the front.
//!
//! All operations take the current time explicitly and perform no I/O.

mod config;
mod entry;
mod pool;

pub use config::SelectorConfig;
pub use entry::{ServerEntry, ServerId, SelectorStats};
pub use pool::ServerSelector;
