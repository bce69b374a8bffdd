//! Server status codes carried in the `code` field of every response.

pub const OK: u32 = 0;
pub const INVALID_APP_ID: u32 = 1;
pub const APP_NOT_ACTIVATED: u32 = 2;
pub const INVALID_CHANNEL_NAME: u32 = 3;
pub const UNAUTHORIZED: u32 = 4;
pub const TOKEN_EXPIRED: u32 = 5;
pub const TOKEN_TIMEOUT: u32 = 6;
pub const INVALID_IDENTITY: u32 = 7;
