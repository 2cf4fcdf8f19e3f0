//! ADS command ids and AMS state flags.

/// Invalid / unset command.
pub const ADS_INVALID: u16 = 0;

/// Read device name and version.
pub const ADS_READ_DEVICE_INFO: u16 = 1;

/// Read data by index group / offset.
pub const ADS_READ: u16 = 2;

/// Write data by index group / offset.
pub const ADS_WRITE: u16 = 3;

/// Read ADS and device state.
pub const ADS_READ_STATE: u16 = 4;

/// Change ADS and device state.
pub const ADS_WRITE_CONTROL: u16 = 5;

/// Register a device notification.
pub const ADS_ADD_NOTIFICATION: u16 = 6;

/// Remove a device notification.
pub const ADS_DELETE_NOTIFICATION: u16 = 7;

/// Device notification samples (server initiated, no invoke id correlation).
pub const ADS_NOTIFICATION: u16 = 8;

/// Write data and read the reply in one round trip.
pub const ADS_READ_WRITE: u16 = 9;

/// State flag for an outgoing ADS request over TCP.
pub const STATE_FLAG_REQUEST: u16 = 0x0004;

/// State flag bit set on responses.
pub const STATE_FLAG_RESPONSE: u16 = 0x0001;

/// Returns a human-readable name for a command id.
pub fn command_name(id: u16) -> &'static str {
    match id {
        ADS_INVALID => "Invalid",
        ADS_READ_DEVICE_INFO => "ReadDeviceInfo",
        ADS_READ => "Read",
        ADS_WRITE => "Write",
        ADS_READ_STATE => "ReadState",
        ADS_WRITE_CONTROL => "WriteControl",
        ADS_ADD_NOTIFICATION => "AddNotification",
        ADS_DELETE_NOTIFICATION => "DeleteNotification",
        ADS_NOTIFICATION => "Notification",
        ADS_READ_WRITE => "ReadWrite",
        _ => "Unknown",
    }
}

/// Returns true if the state flags mark a response.
pub fn is_response(state_flags: u16) -> bool {
    state_flags & STATE_FLAG_RESPONSE != 0
}
