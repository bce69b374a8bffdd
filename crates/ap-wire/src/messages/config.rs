use crate::codec::DetailMap;
use crate::uri::{op, AP_SERVICE};

crate::wire_message! {
    /// Two-phase configuration fetch.
    ///
    /// A single request may carry both configuration bits; the server
    /// answers each bit with its own response operation.
    pub struct ConfigRequest {
        pub opid: u64,
        pub flags: u32,
        pub key: String,
        pub uid: u32,
        pub sid: String,
        /// Client feature switches the server tailors the configuration to.
        pub features: DetailMap,
    } => (AP_SERVICE, op::CONFIG_REQ)
}

crate::wire_message! {
    /// Dynamic configuration phase.
    pub struct CdsResponse {
        pub opid: u64,
        pub code: u32,
        pub version: u32,
        pub config: String,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::CONFIG_CDS_RES)
}

crate::wire_message! {
    /// Test/rollout configuration phase.
    pub struct TdsResponse {
        pub opid: u64,
        pub code: u32,
        pub version: u32,
        pub config: String,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::CONFIG_TDS_RES)
}
