//! # Report Server Client
//!
//! Asks access points where telemetry reports should go, once per
//! interval. It keeps its own selector and only ever carries the `REPORT`
//! intent, so it never competes with the request orchestrator for servers.
//!
//! Missing candidates and failed lookups are silent: they are logged and
//! fed to the selector's backoff, and the next interval tries again.

mod client;

pub use client::{ReportLookup, ReportServerClient};

#[cfg(test)]
mod tests;
