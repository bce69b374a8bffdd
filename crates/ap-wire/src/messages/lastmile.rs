use super::AddressRecord;
use crate::codec::DetailMap;
use crate::uri::{op, AP_SERVICE};

crate::wire_message! {
    /// Ask for network-quality test endpoints.
    pub struct LastmileRequest {
        pub opid: u64,
        pub flags: u32,
        pub key: String,
        pub sid: String,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::LASTMILE_REQ)
}

crate::wire_message! {
    pub struct LastmileResponse {
        pub opid: u64,
        pub code: u32,
        pub addresses: Vec<AddressRecord>,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::LASTMILE_RES)
}
