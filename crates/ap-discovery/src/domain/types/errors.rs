//! Error types for access-point discovery.

use std::fmt;

use ap_wire::WireError;
use thiserror::Error;

/// Caller-facing error codes carried by discovery events.
///
/// The first block mirrors statuses reported by access-point servers; the
/// second block is produced locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    InvalidAppId,
    AppNotActivated,
    InvalidChannelName,
    NotAuthorized,
    TokenExpired,
    InvalidIdentity,
    /// Any server status outside the known table.
    Rejected,
    NoAvailableCandidate,
    Aborted,
    /// Synthesized by the timeout sweep; treated like a server failure.
    ResponseTimeout,
    ConnectionFailed,
}

impl ErrorCode {
    /// Stable positive numeric value.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::InvalidAppId => 101,
            Self::AppNotActivated => 102,
            Self::InvalidChannelName => 103,
            Self::NotAuthorized => 104,
            Self::TokenExpired => 105,
            Self::InvalidIdentity => 106,
            Self::Rejected => 107,
            Self::NoAvailableCandidate => 201,
            Self::Aborted => 202,
            Self::ResponseTimeout => 203,
            Self::ConnectionFailed => 204,
        }
    }

    /// Codes produced on this side rather than reported by a server.
    pub fn is_local(self) -> bool {
        matches!(
            self,
            Self::NoAvailableCandidate | Self::Aborted | Self::ResponseTimeout | Self::ConnectionFailed
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAppId => write!(f, "invalid app id"),
            Self::AppNotActivated => write!(f, "app not activated"),
            Self::InvalidChannelName => write!(f, "invalid channel name"),
            Self::NotAuthorized => write!(f, "not authorized"),
            Self::TokenExpired => write!(f, "token expired"),
            Self::InvalidIdentity => write!(f, "invalid identity"),
            Self::Rejected => write!(f, "rejected by server"),
            Self::NoAvailableCandidate => write!(f, "no available candidate"),
            Self::Aborted => write!(f, "aborted"),
            Self::ResponseTimeout => write!(f, "response timeout"),
            Self::ConnectionFailed => write!(f, "connection failed"),
        }
    }
}

/// Synchronous errors returned by discovery operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("no eligible access-point server")]
    NoAvailableCandidate,

    #[error("request vetoed by policy gate")]
    Aborted,

    #[error("no pending request matches")]
    NotFound,

    #[error("no response within {0} ms")]
    ResponseTimeout(u64),

    #[error("server rejected request: {0}")]
    Rejected(ErrorCode),

    #[error("malformed packet: {0}")]
    Wire(#[from] WireError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl DiscoveryError {
    /// Negative integer result code for hosts that speak in integers.
    pub fn code(&self) -> i32 {
        let code = match self {
            Self::NoAvailableCandidate => ErrorCode::NoAvailableCandidate.as_i32(),
            Self::Aborted => ErrorCode::Aborted.as_i32(),
            Self::NotFound => 2,
            Self::ResponseTimeout(_) => ErrorCode::ResponseTimeout.as_i32(),
            Self::Rejected(code) => code.as_i32(),
            Self::Wire(_) => 3,
            Self::Config(_) => 4,
        };
        -code
    }

    /// Caller-facing code, when one applies.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::NoAvailableCandidate => Some(ErrorCode::NoAvailableCandidate),
            Self::Aborted => Some(ErrorCode::Aborted),
            Self::ResponseTimeout(_) => Some(ErrorCode::ResponseTimeout),
            Self::Rejected(code) => Some(*code),
            Self::NotFound | Self::Wire(_) | Self::Config(_) => None,
        }
    }
}

/// Configuration values that cannot drive the subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("initial backoff {initial_ms} ms exceeds maximum {max_ms} ms")]
    BackoffRange { initial_ms: u64, max_ms: u64 },

    #[error("no port configured for category {0}")]
    MissingPorts(&'static str),
}

/// Result alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
