//! Request payload layouts.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

/// 100 ns ticks per millisecond.
pub const TICKS_PER_MILLI: u64 = 10_000;

/// Read: group (4) + offset (4) + length (4).
pub fn read_request(index_group: u32, index_offset: u32, length: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(12);
    buf.put_u32_le(index_group);
    buf.put_u32_le(index_offset);
    buf.put_u32_le(length);
    buf.freeze()
}

/// Write: group (4) + offset (4) + length (4) + data.
pub fn write_request(index_group: u32, index_offset: u32, data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(12 + data.len());
    buf.put_u32_le(index_group);
    buf.put_u32_le(index_offset);
    buf.put_u32_le(data.len() as u32);
    buf.put_slice(data);
    buf.freeze()
}

/// ReadWrite: group (4) + offset (4) + read length (4) + write length (4) + data.
pub fn read_write_request(
    index_group: u32,
    index_offset: u32,
    read_length: u32,
    data: &[u8],
) -> Bytes {
    let mut buf = BytesMut::with_capacity(16 + data.len());
    buf.put_u32_le(index_group);
    buf.put_u32_le(index_offset);
    buf.put_u32_le(read_length);
    buf.put_u32_le(data.len() as u32);
    buf.put_slice(data);
    buf.freeze()
}

/// WriteControl: ADS state (2) + device state (2) + length (4) + data.
pub fn write_control_request(ads_state: u16, device_state: u16, data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(8 + data.len());
    buf.put_u16_le(ads_state);
    buf.put_u16_le(device_state);
    buf.put_u32_le(data.len() as u32);
    buf.put_slice(data);
    buf.freeze()
}

/// DeleteNotification: handle (4).
pub fn delete_notification_request(handle: u32) -> Bytes {
    Bytes::copy_from_slice(&handle.to_le_bytes())
}

/// When the device sends notification samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionMode {
    /// Every cycle, whether or not the value changed.
    Cyclic,
    /// Only when the value changed, checked once per cycle.
    OnChange,
}

impl TransmissionMode {
    /// Wire value (`ADSTRANS_SERVERCYCLE` / `ADSTRANS_SERVERONCHA`).
    pub fn code(self) -> u32 {
        match self {
            TransmissionMode::Cyclic => 3,
            TransmissionMode::OnChange => 4,
        }
    }
}

/// Body of an AddNotification command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddNotificationRequest {
    pub index_group: u32,
    pub index_offset: u32,
    pub length: u32,
    pub mode: TransmissionMode,
    pub max_delay: Duration,
    pub cycle_time: Duration,
}

impl AddNotificationRequest {
    /// Size of the encoded request, including 16 reserved bytes.
    pub const SIZE: usize = 40;

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u32_le(self.index_group);
        buf.put_u32_le(self.index_offset);
        buf.put_u32_le(self.length);
        buf.put_u32_le(self.mode.code());
        buf.put_u32_le(duration_to_ticks(self.max_delay));
        buf.put_u32_le(duration_to_ticks(self.cycle_time));
        buf.put_bytes(0, 16);
        buf.freeze()
    }
}

/// Milliseconds × 10,000, saturating at `u32::MAX`.
pub fn duration_to_ticks(duration: Duration) -> u32 {
    let ticks = (duration.as_millis() as u64).saturating_mul(TICKS_PER_MILLI);
    u32::try_from(ticks).unwrap_or(u32::MAX)
}
