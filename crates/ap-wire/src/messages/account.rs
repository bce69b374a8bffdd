use crate::codec::DetailMap;
use crate::uri::{op, AP_SERVICE};

crate::wire_message! {
    /// Register a string user account and obtain its numeric uid.
    pub struct AccountRequest {
        pub opid: u64,
        pub key: String,
        pub sid: String,
        pub user_account: String,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::ACCOUNT_REQ)
}

crate::wire_message! {
    pub struct AccountResponse {
        pub opid: u64,
        pub code: u32,
        pub uid: u32,
        pub user_account: String,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::ACCOUNT_RES)
}
