//! Wire decoding errors.

use thiserror::Error;

/// Errors raised while decoding a packet or body.
///
/// Encoding never fails. Strings longer than `u16::MAX` bytes are cut at the
/// last char boundary that fits ([`crate::codec::clamp_str`]) and longer
/// lists keep their leading items ([`crate::codec::checked_len`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The buffer ended before a field was complete.
    #[error("unexpected end of packet: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// A string field did not hold valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// The packet header names a different operation than the one requested.
    #[error("packet kind mismatch: expected {expected_category}/{expected_operation}, got {category}/{operation}")]
    KindMismatch {
        expected_category: u16,
        expected_operation: u16,
        category: u16,
        operation: u16,
    },

    /// A length or count prefix exceeds what the protocol allows.
    #[error("length {0} exceeds protocol maximum")]
    LengthOverflow(usize),
}
