//! AMS/ADS wire framing.
//!
//! Every ADS message travels in two nested headers:
//! - a 6-byte AMS/TCP header (reserved/command word + payload length)
//! - a 32-byte AMS header (target and source address, command id, state
//!   flags, data length, error code, invoke id)
//!
//! This crate encodes and decodes those headers, the command payload layouts
//! and notification payloads. It holds no connection state.

pub mod address;
pub mod codec;
pub mod command;
pub mod error;
pub mod header;
pub mod index;
pub mod notification;
pub mod request;
pub mod response;
pub mod return_code;
pub mod state;

pub use address::{AmsAddress, AmsNetId};
pub use codec::{
    decode_packet, encode_ads_packet, encode_port_close, encode_port_connect, AdsPacket,
    AmsCodec, AmsPacket, CodecConfig, DEFAULT_MAX_FRAME,
};
pub use command::{
    ADS_ADD_NOTIFICATION, ADS_DELETE_NOTIFICATION, ADS_NOTIFICATION, ADS_READ,
    ADS_READ_DEVICE_INFO, ADS_READ_STATE, ADS_READ_WRITE, ADS_WRITE, ADS_WRITE_CONTROL,
};
pub use error::{FrameError, Result};
pub use header::{AmsHeader, AmsTcpHeader, AMS_HEADER_SIZE, AMS_TCP_HEADER_SIZE};
pub use notification::{
    filetime_to_system_time, parse_notification, system_time_to_filetime, NotificationSample,
    NotificationStamp,
};
pub use request::{AddNotificationRequest, TransmissionMode};
pub use response::{DeviceInfo, ReadStateResponse};
pub use return_code::AdsReturnCode;
pub use state::AdsState;
