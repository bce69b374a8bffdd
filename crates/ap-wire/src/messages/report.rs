use super::AddressRecord;
use crate::codec::DetailMap;
use crate::uri::{op, AP_SERVICE};

crate::wire_message! {
    /// Ask where telemetry reports should be delivered.
    pub struct ReportRequest {
        pub opid: u64,
        pub flags: u32,
        pub key: String,
        pub sid: String,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::REPORT_REQ)
}

crate::wire_message! {
    pub struct ReportResponse {
        pub opid: u64,
        pub code: u32,
        pub addresses: Vec<AddressRecord>,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::REPORT_RES)
}
