//! # Access-Point Wire Protocol
//!
//! Binary protocol spoken between the discovery client and access-point
//! servers.
//!
//! ## Packet Layout
//!
//! ```text
//! ┌──────────────┬───────────────┬──────────────────────────────┐
//! │ category u16 │ operation u16 │ operation-specific body ...  │
//! └──────────────┴───────────────┴──────────────────────────────┘
//! ```
//!
//! The body is not self-describing: its schema is implied by the
//! (category, operation) pair, and every request operation has exactly one
//! response operation (the configuration request is answered by two).
//!
//! All integers are little-endian. Strings and byte strings carry a `u16`
//! length prefix, lists a `u16` element count.
//!
//! ## Example
//!
//! ```rust
//! use ap_wire::{messages::LastmileRequest, Packet};
//!
//! let request = LastmileRequest {
//!     opid: 7,
//!     key: "app-key".into(),
//!     ..Default::default()
//! };
//! let bytes = Packet::from_message(&request).to_bytes();
//! let parsed = Packet::parse(&bytes).unwrap();
//! assert_eq!(parsed.decode_body::<LastmileRequest>().unwrap(), request);
//! ```

pub mod codec;
pub mod error;
mod macros;
pub mod messages;
pub mod packet;
pub mod status;
pub mod uri;

pub use codec::{DetailMap, WireDecode, WireEncode};
pub use error::WireError;
pub use messages::AddressRecord;
pub use packet::{Packet, PacketKind, WireMessage};

#[doc(hidden)]
pub use bytes as __bytes;
