//! # Access-Point Discovery Benchmarks
//!
//! Hot paths of the discovery client:
//! - Server selection, failure and success reporting on a large pool
//! - Packet framing and message codecs for every lookup kind
//! - A full submit → answer cycle through the orchestrator

pub mod selector;
pub mod wire;
