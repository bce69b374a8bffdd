//! # Request Orchestrator
//!
//! Owns pending discovery requests and drives them to completion:
//!
//! 1. `submit` stores (or merges) the request and runs a selection round
//! 2. Each selected server gets one lane per transport kind; requests wait
//!    in the connection's FIFO until the transport reports it connected
//! 3. Responses are dispatched by (category, operation) to a handler that
//!    maps the server status, updates the selector and emits an event
//! 4. The retry timer sweeps servers past the response budget, consults the
//!    policy gate and runs a new selection round for unfinished requests
//!
//! ## Per-request state machine
//!
//! ```text
//! Idle ─submit─▶ Working ─┬─ all intents answered ─▶ Complete
//!                         └─ gate veto on retry ───▶ Aborted
//! ```

mod api;
mod connections;
mod core;
mod dispatch;
mod retry;
mod selection;

pub use self::core::{OwnedConnection, RequestOrchestrator};
