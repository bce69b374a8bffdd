use super::AddressRecord;
use crate::codec::DetailMap;
use crate::uri::{op, AP_SERVICE};

crate::wire_message! {
    /// Allocate a worker from a named service pool.
    pub struct WorkerRequest {
        pub opid: u64,
        pub flags: u32,
        pub key: String,
        pub channel: String,
        pub uid: u32,
        pub sid: String,
        pub service_name: String,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::WORKER_REQ)
}

crate::wire_message! {
    pub struct WorkerResponse {
        pub opid: u64,
        pub code: u32,
        pub flags: u32,
        pub service_name: String,
        pub addresses: Vec<AddressRecord>,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::WORKER_RES)
}
