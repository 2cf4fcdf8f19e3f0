use std::borrow::Cow;
use std::fmt;

/// Numeric ADS return code carried in AMS headers and response payloads.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdsReturnCode(pub u32);

impl AdsReturnCode {
    pub const NO_ERROR: AdsReturnCode = AdsReturnCode(0);
    pub const TARGET_PORT_NOT_FOUND: AdsReturnCode = AdsReturnCode(0x6);
    pub const SERVICE_NOT_SUPPORTED: AdsReturnCode = AdsReturnCode(0x701);
    pub const INVALID_INDEX_GROUP: AdsReturnCode = AdsReturnCode(0x702);
    pub const INVALID_SIZE: AdsReturnCode = AdsReturnCode(0x705);
    pub const SYMBOL_NOT_FOUND: AdsReturnCode = AdsReturnCode(0x710);
    pub const INVALID_NOTIFICATION_HANDLE: AdsReturnCode = AdsReturnCode(0x714);
    pub const CLIENT_TIMEOUT: AdsReturnCode = AdsReturnCode(0x745);

    pub fn code(self) -> u32 {
        self.0
    }

    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Text from the static table, or `unknown error <code>`.
    pub fn message(self) -> Cow<'static, str> {
        match lookup(self.0) {
            Some(text) => Cow::Borrowed(text),
            None => Cow::Owned(format!("unknown error {}", self.0)),
        }
    }
}

impl fmt::Display for AdsReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:X})", self.message(), self.0)
    }
}

impl fmt::Debug for AdsReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdsReturnCode(0x{:X})", self.0)
    }
}

fn lookup(code: u32) -> Option<&'static str> {
    let text = match code {
        0x0000 => "No error",
        0x0001 => "Internal error",
        0x0002 => "No real time",
        0x0003 => "Allocation locked - memory error",
        0x0004 => "Mailbox full - the ADS message could not be sent",
        0x0005 => "Wrong receive HMSG",
        0x0006 => "Target port not found - ADS server is not started or is not reachable",
        0x0007 => "Target computer not found - AMS route was not found",
        0x0008 => "Unknown command ID",
        0x0009 => "Invalid task ID",
        0x000A => "No IO",
        0x000B => "Unknown AMS command",
        0x000C => "Win32 error",
        0x000D => "Port not connected",
        0x000E => "Invalid AMS length",
        0x000F => "Invalid AMS Net ID",
        0x0010 => "Installation level is too low",
        0x0011 => "No debugging available",
        0x0012 => "Port disabled",
        0x0013 => "Port already connected",
        0x0014 => "AMS Sync Win32 error",
        0x0015 => "AMS Sync timeout",
        0x0016 => "AMS Sync error",
        0x0017 => "No index map for AMS Sync available",
        0x0018 => "Invalid AMS port",
        0x0019 => "No memory",
        0x001A => "TCP send error",
        0x001B => "Host unreachable",
        0x001C => "Invalid AMS fragment",
        0x001D => "TLS send error",
        0x001E => "Access denied",
        0x0500 => "Locked memory cannot be allocated",
        0x0501 => "The router memory size could not be changed",
        0x0502 => "The mailbox has reached the maximum number of possible messages",
        0x0503 => "The debug mailbox has reached the maximum number of possible messages",
        0x0504 => "The port type is unknown",
        0x0505 => "The router is not initialized",
        0x0506 => "The port number is already assigned",
        0x0507 => "The port is not registered",
        0x0508 => "The maximum number of ports has been reached",
        0x0509 => "The port is invalid",
        0x050A => "The router is not active",
        0x050B => "The mailbox has reached the maximum number for fragmented messages",
        0x050C => "A fragment timeout has occurred",
        0x050D => "The port is removed",
        0x0700 => "General device error",
        0x0701 => "Service is not supported by the server",
        0x0702 => "Invalid index group",
        0x0703 => "Invalid index offset",
        0x0704 => "Reading or writing not permitted",
        0x0705 => "Parameter size not correct",
        0x0706 => "Invalid data values",
        0x0707 => "Device is not ready to operate",
        0x0708 => "Device is busy",
        0x0709 => "Invalid operating system context",
        0x070A => "Insufficient memory",
        0x070B => "Invalid parameter values",
        0x070C => "Not found",
        0x070D => "Syntax error in file or command",
        0x070E => "Objects do not match",
        0x070F => "Object already exists",
        0x0710 => "Symbol not found",
        0x0711 => "Invalid symbol version",
        0x0712 => "Device (server) is in invalid state",
        0x0713 => "AdsTransMode not supported",
        0x0714 => "Notification handle is invalid",
        0x0715 => "Notification client not registered",
        0x0716 => "No further handle available",
        0x0717 => "Notification size too large",
        0x0718 => "Device not initialized",
        0x0719 => "Device has a timeout",
        0x071A => "Interface query failed",
        0x071B => "Wrong interface requested",
        0x071C => "Class ID is invalid",
        0x071D => "Object ID is invalid",
        0x071E => "Request pending",
        0x071F => "Request is aborted",
        0x0720 => "Signal warning",
        0x0721 => "Invalid array index",
        0x0722 => "Symbol not active",
        0x0723 => "Access denied",
        0x0724 => "Missing license",
        0x0725 => "License expired",
        0x0726 => "License exceeded",
        0x0727 => "Invalid license",
        0x0728 => "License problem: system ID is invalid",
        0x0729 => "License not limited in time",
        0x072A => "Licensing problem: time in the future",
        0x072B => "License period too long",
        0x072C => "Exception at system startup",
        0x072D => "License file read twice",
        0x072E => "Invalid signature",
        0x072F => "Invalid certificate",
        0x0730 => "Public key not known from OEM",
        0x0731 => "License not valid for this system ID",
        0x0732 => "Demo license prohibited",
        0x0733 => "Invalid function ID",
        0x0734 => "Outside the valid range",
        0x0735 => "Invalid alignment",
        0x0736 => "Invalid platform level",
        0x0737 => "Context - forward to passive level",
        0x0738 => "Context - forward to dispatch level",
        0x0739 => "Context - forward to real time",
        0x0740 => "General client error",
        0x0741 => "Service contains an invalid parameter",
        0x0742 => "Polling list is empty",
        0x0743 => "Var connection already in use",
        0x0744 => "The called ID is already in use",
        0x0745 => "Timeout has occurred",
        0x0746 => "Error in Win32 subsystem",
        0x0747 => "Invalid client timeout value",
        0x0748 => "Port not open",
        0x0749 => "No AMS address",
        0x0750 => "Internal error in Ads sync",
        0x0751 => "Hash table overflow",
        0x0752 => "Key not found in the table",
        0x0753 => "No symbols in the cache",
        0x0754 => "Invalid response received",
        0x0755 => "Sync port is locked",
        0x1000 => "Internal error in the real-time system",
        0x1001 => "Timer value is not valid",
        0x1002 => "Task pointer has the invalid value 0",
        0x1003 => "Stack pointer has the invalid value 0",
        0x1004 => "The requested task priority is already assigned",
        0x1005 => "No free TCB available",
        0x1006 => "No free semaphores available",
        0x1007 => "No free space available in the queue",
        0x100D => "An external synchronization interrupt is already applied",
        0x100E => "No external sync interrupt applied",
        0x100F => "Application of the external synchronization interrupt has failed",
        0x1010 => "Call of a service function in the wrong context",
        0x1017 => "Intel VT-x extension is not supported",
        0x1018 => "Intel VT-x extension is not enabled in the BIOS",
        0x1019 => "Missing function in Intel VT-x extension",
        0x101A => "Activation of Intel VT-x fails",
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(AdsReturnCode::SYMBOL_NOT_FOUND.message(), "Symbol not found");
        assert_eq!(AdsReturnCode(0x6).message().as_ref(), "Target port not found - ADS server is not started or is not reachable");
        assert_eq!(AdsReturnCode(0x1000).message(), "Internal error in the real-time system");
    }

    #[test]
    fn test_unknown_code_text() {
        assert_eq!(AdsReturnCode(0xABCD).message(), "unknown error 43981");
    }

    #[test]
    fn test_display_and_ok() {
        assert!(AdsReturnCode::NO_ERROR.is_ok());
        assert!(!AdsReturnCode(0x705).is_ok());
        assert_eq!(
            AdsReturnCode(0x705).to_string(),
            "Parameter size not correct (0x705)"
        );
    }
}
