//! # Proxy Server Selector
//!
//! Hands out proxy endpoints one at a time:
//!
//! 1. Configured static proxies, in order
//! 2. Proxies discovered through proxy-address lookups against access
//!    points, rotated round-robin; failed ones are dropped
//! 3. Nothing known: a lookup is started and the caller retries later

mod selector;

pub use selector::{ProxyChoice, ProxyServerSelector};
