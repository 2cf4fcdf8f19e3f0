//! TCP transport to an AMS router.
//!
//! ADS traffic travels over one long-lived TCP connection to an AMS router,
//! either the local TwinCAT router or the controller itself (port 48898).
//! This is the lowest layer of adsprims. Everything else builds on top of
//! the [`AmsStream`] type provided here.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::AmsStream;
pub use tcp::{TcpTransport, DEFAULT_ROUTER_PORT};
