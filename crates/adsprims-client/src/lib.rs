//! ADS client over one persistent AMS router connection.
//!
//! - [`Connection`]: multiplexes concurrent requests by invoke id and routes
//!   device notifications to the subscription table
//! - [`resolver`]: expands symbol and data type declarations into a full
//!   [`TypeNode`](adsprims_types::TypeNode) tree
//! - [`StateMonitor`]: polls system and runtime state in the background
//! - [`AdsClient`]: the "just works" layer composing all of the above

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod notification;
pub mod resolver;
pub mod state;

pub use client::{AdsClient, SymbolUploadInfo};
pub use config::{ClientConfig, SubscriptionSettings};
pub use connection::Connection;
pub use error::{ClientError, Result};
pub use event::ClientEvent;
pub use notification::{Notification, NotificationCallback, Subscription, SubscriptionTable};
pub use resolver::{resolve, resolve_type, DeclarationSource};
pub use state::{DeviceStates, StateMonitor};
