//! # Access-Point Discovery Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── benchmarks/       # Criterion benchmarks per component
//! │   ├── selector.rs
//! │   └── wire.rs
//! │
//! └── integration/      # Cross-component flows
//!     ├── flows.rs      # Server set feeding orchestrator, proxy, report
//!     └── failover.rs   # Timeouts, backoff and policy switches
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p ap-tests
//!
//! # By category
//! cargo test -p ap-tests integration::flows
//! cargo test -p ap-tests integration::failover
//!
//! # Benchmarks
//! cargo bench -p ap-tests
//! ```

pub mod benchmarks;
pub mod integration;
