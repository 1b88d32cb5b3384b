//! Transport implementations
//!
//! Contains HttpTransport and MockTransport.

mod http;
mod mock;

pub use self::http::{HttpTransport, HttpTransportConfig};
pub use self::mock::MockTransport;
