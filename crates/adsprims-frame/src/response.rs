//! Response payload layouts.
//!
//! Every response payload starts with a 4-byte ADS return code. A non-zero
//! code is surfaced as [`FrameError::Ads`] before the rest is parsed.

use bytes::Bytes;

use crate::error::{ensure_len, FrameError, Result};
use crate::return_code::AdsReturnCode;
use crate::state::AdsState;

/// Device name field width in a ReadDeviceInfo reply.
pub const DEVICE_NAME_SIZE: usize = 16;

fn u32_at(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Check the leading return code and return the bytes after it.
pub fn check_result(data: &[u8], what: &'static str) -> Result<usize> {
    ensure_len(data, 4, what)?;
    let code = u32_at(data, 0);
    if code != 0 {
        return Err(FrameError::Ads(AdsReturnCode(code)));
    }
    Ok(4)
}

/// Read and ReadWrite: result (4) + length (4) + data.
pub fn parse_read_response(data: &Bytes) -> Result<Bytes> {
    check_result(data, "read response")?;
    ensure_len(data, 8, "read response")?;
    let length = u32_at(data, 4) as usize;
    ensure_len(&data[8..], length, "read response data")?;
    Ok(data.slice(8..8 + length))
}

/// Write, WriteControl and DeleteNotification: result (4).
pub fn parse_write_response(data: &[u8]) -> Result<()> {
    check_result(data, "write response").map(|_| ())
}

/// AddNotification: result (4) + handle (4).
pub fn parse_add_notification_response(data: &[u8]) -> Result<u32> {
    check_result(data, "add notification response")?;
    ensure_len(data, 8, "add notification response")?;
    Ok(u32_at(data, 4))
}

/// Decoded ReadState reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadStateResponse {
    pub ads_state: AdsState,
    pub device_state: u16,
}

/// ReadState: result (4) + ADS state (2) + device state (2).
pub fn parse_read_state_response(data: &[u8]) -> Result<ReadStateResponse> {
    check_result(data, "read state response")?;
    ensure_len(data, 8, "read state response")?;
    Ok(ReadStateResponse {
        ads_state: AdsState::from_code(u16::from_le_bytes([data[4], data[5]])),
        device_state: u16::from_le_bytes([data[6], data[7]]),
    })
}

/// Decoded ReadDeviceInfo reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub major_version: u8,
    pub minor_version: u8,
    pub build: u16,
    pub name: String,
}

impl DeviceInfo {
    pub fn version(&self) -> String {
        format!(
            "{}.{}.{}",
            self.major_version, self.minor_version, self.build
        )
    }
}

/// ReadDeviceInfo: result (4) + major (1) + minor (1) + build (2) + name (16).
pub fn parse_device_info_response(data: &[u8]) -> Result<DeviceInfo> {
    check_result(data, "device info response")?;
    ensure_len(data, 8 + DEVICE_NAME_SIZE, "device info response")?;
    let name = &data[8..8 + DEVICE_NAME_SIZE];
    let end = name.iter().position(|b| *b == 0).unwrap_or(name.len());
    Ok(DeviceInfo {
        major_version: data[4],
        minor_version: data[5],
        build: u16::from_le_bytes([data[6], data[7]]),
        name: String::from_utf8_lossy(&name[..end]).trim().to_string(),
    })
}
