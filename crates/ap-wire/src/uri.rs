//! Category and operation codes.

/// Category of every access-point discovery packet.
pub const AP_SERVICE: u16 = 0x0011;

/// Top-level operation codes inside [`AP_SERVICE`].
pub mod op {
    pub const JOIN_CHANNEL_REQ: u16 = 1;
    pub const JOIN_CHANNEL_RES: u16 = 2;
    /// One configuration request is answered by both `CONFIG_CDS_RES` and
    /// `CONFIG_TDS_RES`.
    pub const CONFIG_REQ: u16 = 3;
    pub const CONFIG_CDS_RES: u16 = 4;
    pub const CONFIG_TDS_RES: u16 = 5;
    pub const PROXY_REQ: u16 = 6;
    pub const PROXY_RES: u16 = 7;
    pub const WORKER_REQ: u16 = 8;
    pub const WORKER_RES: u16 = 9;
    pub const LASTMILE_REQ: u16 = 10;
    pub const LASTMILE_RES: u16 = 11;
    pub const ACCOUNT_REQ: u16 = 12;
    pub const ACCOUNT_RES: u16 = 13;
    pub const UNIFIED_REQ: u16 = 14;
    pub const UNIFIED_RES: u16 = 15;
    pub const REPORT_REQ: u16 = 16;
    pub const REPORT_RES: u16 = 17;
}

/// Sub-protocol codes nested inside a unified lookup envelope.
pub mod nested {
    pub const JOIN_CHANNEL_REQ: u16 = 101;
    pub const JOIN_CHANNEL_RES: u16 = 102;
    pub const WORKER_REQ: u16 = 103;
    pub const WORKER_RES: u16 = 104;
    pub const ACCOUNT_REQ: u16 = 105;
    pub const ACCOUNT_RES: u16 = 106;
    pub const LASTMILE_REQ: u16 = 107;
    pub const LASTMILE_RES: u16 = 108;

    /// Response code answering a nested request code, if the pair is known.
    pub fn response_for(request: u16) -> Option<u16> {
        match request {
            JOIN_CHANNEL_REQ => Some(JOIN_CHANNEL_RES),
            WORKER_REQ => Some(WORKER_RES),
            ACCOUNT_REQ => Some(ACCOUNT_RES),
            LASTMILE_REQ => Some(LASTMILE_RES),
            _ => None,
        }
    }
}
