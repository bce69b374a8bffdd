//! # Server Set Manager
//!
//! Turns configured domains and static IPs into categorized server lists
//! and pushes them to registered listeners:
//!
//! ```text
//! bootstrap ─┬─ static IPs × ports ────────────────▶ Servers (immediate)
//!            └─ random domain per category ─ DNS ──▶ Servers
//!                                             │
//!                              failure/empty ─┴─▶ re-resolve on tick
//! ```
//!
//! Network, DNS64 and encryption changes push a `Reset` and bootstrap again.

mod manager;

pub use manager::ServerSetManager;
