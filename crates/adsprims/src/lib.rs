//! ADS/AMS client primitives for Beckhoff TwinCAT devices.
//!
//! adsprims talks ADS over an AMS router connection: raw index-group
//! access, symbolic reads and writes with full type resolution, device
//! notifications and device state control.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connection to the AMS router
//! - [`frame`]: AMS/TCP and AMS headers, ADS command payloads, return codes
//! - [`types`]: type trees, [`Value`](types::Value) and the value codec
//! - [`client`]: request multiplexing, notifications, resolver and
//!   [`AdsClient`](client::AdsClient) (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use adsprims_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use adsprims_frame::*;
}

/// Re-export type model and value codec.
pub mod types {
    pub use adsprims_types::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use adsprims_client::*;
}
