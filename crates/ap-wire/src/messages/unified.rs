use crate::codec::{DetailMap, WireDecode, WireEncode};
use crate::packet::{decode_body, encode_body};
use crate::uri::{op, AP_SERVICE};
use crate::WireError;

crate::wire_message! {
    /// One sub-protocol body inside a unified envelope.
    pub struct NestedBody {
        /// Code from [`crate::uri::nested`].
        pub uri: u16,
        pub body: Vec<u8>,
    }
}

impl NestedBody {
    /// Wrap an encoded sub-protocol message.
    pub fn wrap<T: WireEncode>(uri: u16, message: &T) -> Self {
        Self {
            uri,
            body: encode_body(message).to_vec(),
        }
    }

    /// Decode the inner body as `T`.
    pub fn unwrap_as<T: WireDecode>(&self) -> Result<T, WireError> {
        decode_body(&self.body)
    }
}

crate::wire_message! {
    /// Envelope bundling one or more sub-protocol requests.
    pub struct UnifiedRequest {
        pub opid: u64,
        pub flags: u32,
        pub key: String,
        pub sid: String,
        pub client_type: u8,
        pub services: Vec<NestedBody>,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::UNIFIED_REQ)
}

crate::wire_message! {
    /// Envelope carrying whichever sub-responses the server produced.
    pub struct UnifiedResponse {
        pub opid: u64,
        pub code: u32,
        pub services: Vec<NestedBody>,
        pub detail: DetailMap,
    } => (AP_SERVICE, op::UNIFIED_RES)
}
