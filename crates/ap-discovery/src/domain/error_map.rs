//! Server status to caller-facing error code.

use ap_wire::status;

use crate::domain::ErrorCode;

/// Map a status reported by an access-point server.
///
/// `None` means success.
pub fn map_server_status(code: u32) -> Option<ErrorCode> {
    match code {
        status::OK => None,
        status::INVALID_APP_ID => Some(ErrorCode::InvalidAppId),
        status::APP_NOT_ACTIVATED => Some(ErrorCode::AppNotActivated),
        status::INVALID_CHANNEL_NAME => Some(ErrorCode::InvalidChannelName),
        status::UNAUTHORIZED => Some(ErrorCode::NotAuthorized),
        status::TOKEN_EXPIRED | status::TOKEN_TIMEOUT => Some(ErrorCode::TokenExpired),
        status::INVALID_IDENTITY => Some(ErrorCode::InvalidIdentity),
        _ => Some(ErrorCode::Rejected),
    }
}
