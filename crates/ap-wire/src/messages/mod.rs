//! Request and response bodies, one submodule per operation family.
//!
//! | Family | Request | Response(s) |
//! |--------|---------|-------------|
//! | Channel join | [`JoinChannelRequest`] | [`JoinChannelResponse`] |
//! | Configuration | [`ConfigRequest`] | [`CdsResponse`], [`TdsResponse`] |
//! | Proxy | [`ProxyRequest`] | [`ProxyResponse`] |
//! | Worker pool | [`WorkerRequest`] | [`WorkerResponse`] |
//! | Lastmile test | [`LastmileRequest`] | [`LastmileResponse`] |
//! | User account | [`AccountRequest`] | [`AccountResponse`] |
//! | Unified lookup | [`UnifiedRequest`] | [`UnifiedResponse`] |
//! | Report servers | [`ReportRequest`] | [`ReportResponse`] |

mod account;
mod address;
mod channel;
mod config;
mod lastmile;
mod proxy;
mod report;
mod unified;
mod worker;

pub use account::{AccountRequest, AccountResponse};
pub use address::AddressRecord;
pub use channel::{JoinChannelRequest, JoinChannelResponse};
pub use config::{CdsResponse, ConfigRequest, TdsResponse};
pub use lastmile::{LastmileRequest, LastmileResponse};
pub use proxy::{ProxyRequest, ProxyResponse};
pub use report::{ReportRequest, ReportResponse};
pub use unified::{NestedBody, UnifiedRequest, UnifiedResponse};
pub use worker::{WorkerRequest, WorkerResponse};

/// Well-known keys of the detail map.
pub mod detail {
    pub const WAN_IP: u8 = 1;
    pub const ISP: u8 = 2;
    pub const COUNTRY_CODE: u8 = 3;
    pub const APP_CERT: u8 = 4;
    pub const AREA_CODE: u8 = 5;
    pub const MULTI_PUBLIC_IP: u8 = 6;
    pub const CLIENT_VERSION: u8 = 7;
}
