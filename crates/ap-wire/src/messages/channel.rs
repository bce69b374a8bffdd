use super::AddressRecord;
use crate::codec::DetailMap;
use crate::uri::{op, AP_SERVICE};

crate::wire_message! {
    /// Ask for media gateway addresses for a channel.
    pub struct JoinChannelRequest {
        /// Per-submission random seed, echoed back by the server and used
        /// for ticket derivation.
        pub opid: u64,
        /// Service intents still outstanding (`ServiceFlags` bits).
        pub flags: u32,
        pub key: String,
        pub channel: String,
        pub uid: u32,
        pub sid: String,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::JOIN_CHANNEL_REQ)
}

crate::wire_message! {
    pub struct JoinChannelResponse {
        pub opid: u64,
        pub code: u32,
        pub flags: u32,
        pub channel: String,
        pub cid: u32,
        pub uid: u32,
        pub server_ts: u64,
        pub addresses: Vec<AddressRecord>,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::JOIN_CHANNEL_RES)
}
