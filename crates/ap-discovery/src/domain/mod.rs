//! Domain Layer - Pure discovery logic with no I/O
//!
//! - Service flags, categories, families and timestamps
//! - Server selector (candidate pool with backoff)
//! - Selection planning across IP families and categories
//! - Request contexts and pending request state
//! - Server status mapping and discovery events

pub mod config;
pub mod error_map;
pub mod events;
pub mod planner;
pub mod policy;
pub mod request;
pub mod selector;
pub mod server_set;
/// Core domain types (entities, values, errors, flags)
pub mod types;

pub use config::*;
pub use error_map::map_server_status;
pub use events::*;
pub use planner::*;
pub use policy::*;
pub use request::*;
pub use selector::*;
pub use server_set::*;
pub use types::*;
