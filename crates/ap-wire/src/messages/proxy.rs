use super::AddressRecord;
use crate::codec::DetailMap;
use crate::uri::{op, AP_SERVICE};

crate::wire_message! {
    /// Ask for proxy endpoints.
    pub struct ProxyRequest {
        pub opid: u64,
        pub flags: u32,
        pub key: String,
        pub channel: String,
        pub uid: u32,
        pub sid: String,
        /// Which proxy flavour is wanted (UDP relay, TCP, TLS).
        pub proxy_kind: u8,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::PROXY_REQ)
}

crate::wire_message! {
    pub struct ProxyResponse {
        pub opid: u64,
        pub code: u32,
        pub flags: u32,
        pub addresses: Vec<AddressRecord>,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::PROXY_RES)
}
