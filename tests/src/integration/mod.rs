//! # Integration Flows
//!
//! Components wired the way a host wires them: one `ServerSetManager`
//! pushing into shared listeners, a manual clock, recording adapters.

pub mod failover;
pub mod flows;
