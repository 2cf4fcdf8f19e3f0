use bytes::{BufMut, BytesMut};

use crate::address::{AmsAddress, AmsNetId};
use crate::command::{is_response, STATE_FLAG_REQUEST};
use crate::error::{ensure_len, Result};

/// AMS/TCP header: reserved/command (2) + length (4) = 6 bytes.
pub const AMS_TCP_HEADER_SIZE: usize = 6;

/// AMS header: 32 bytes.
pub const AMS_HEADER_SIZE: usize = 32;

/// Outer header of every packet on the TCP stream.
///
/// ```text
/// ┌──────────────────┬──────────────┬──────────────────────┐
/// │ Reserved (2B LE) │ Length (4B)  │ Body (Length bytes)  │
/// │ 0x0000 = AMS     │ LE           │                      │
/// │ 0x1000 = connect │              │                      │
/// └──────────────────┴──────────────┴──────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmsTcpHeader {
    pub command: u16,
    pub length: u32,
}

impl AmsTcpHeader {
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u16_le(self.command);
        dst.put_u32_le(self.length);
    }

    pub fn decode(src: &[u8]) -> Result<Self> {
        ensure_len(src, AMS_TCP_HEADER_SIZE, "ams/tcp header")?;
        Ok(Self {
            command: u16::from_le_bytes([src[0], src[1]]),
            length: u32::from_le_bytes([src[2], src[3], src[4], src[5]]),
        })
    }
}

/// Routing header carried by every ADS command.
///
/// ```text
/// target net id (6) │ target port (2) │ source net id (6) │ source port (2)
/// command id (2)    │ state flags (2) │ data length (4)
/// error code (4)    │ invoke id (4)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmsHeader {
    pub target: AmsAddress,
    pub source: AmsAddress,
    pub command: u16,
    pub state_flags: u16,
    pub data_length: u32,
    pub error_code: u32,
    pub invoke_id: u32,
}

impl AmsHeader {
    /// Header for an outgoing request. `data_length` is filled in at encode time.
    pub fn request(target: AmsAddress, source: AmsAddress, command: u16, invoke_id: u32) -> Self {
        Self {
            target,
            source,
            command,
            state_flags: STATE_FLAG_REQUEST,
            data_length: 0,
            error_code: 0,
            invoke_id,
        }
    }

    /// True if this header belongs to a response.
    pub fn is_response(&self) -> bool {
        is_response(self.state_flags)
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_slice(&self.target.net_id.octets());
        dst.put_u16_le(self.target.port);
        dst.put_slice(&self.source.net_id.octets());
        dst.put_u16_le(self.source.port);
        dst.put_u16_le(self.command);
        dst.put_u16_le(self.state_flags);
        dst.put_u32_le(self.data_length);
        dst.put_u32_le(self.error_code);
        dst.put_u32_le(self.invoke_id);
    }

    pub fn decode(src: &[u8]) -> Result<Self> {
        ensure_len(src, AMS_HEADER_SIZE, "ams header")?;
        let u16_at = |at: usize| u16::from_le_bytes([src[at], src[at + 1]]);
        let u32_at =
            |at: usize| u32::from_le_bytes([src[at], src[at + 1], src[at + 2], src[at + 3]]);
        let net_id_at = |at: usize| {
            let mut octets = [0u8; 6];
            octets.copy_from_slice(&src[at..at + 6]);
            AmsNetId(octets)
        };

        Ok(Self {
            target: AmsAddress::new(net_id_at(0), u16_at(6)),
            source: AmsAddress::new(net_id_at(8), u16_at(14)),
            command: u16_at(16),
            state_flags: u16_at(18),
            data_length: u32_at(20),
            error_code: u32_at(24),
            invoke_id: u32_at(28),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ADS_READ, STATE_FLAG_RESPONSE};
    use crate::error::FrameError;

    fn sample_header() -> AmsHeader {
        AmsHeader {
            target: "192.168.1.10.1.1:851".parse().unwrap(),
            source: "10.0.0.2.1.1:32905".parse().unwrap(),
            command: ADS_READ,
            state_flags: STATE_FLAG_REQUEST,
            data_length: 12,
            error_code: 0,
            invoke_id: 0xDEAD_BEEF,
        }
    }

    #[test]
    fn test_ams_header_layout() {
        let mut buf = BytesMut::new();
        sample_header().encode(&mut buf);

        assert_eq!(buf.len(), AMS_HEADER_SIZE);
        assert_eq!(&buf[0..6], &[192, 168, 1, 10, 1, 1]);
        assert_eq!(&buf[6..8], &851u16.to_le_bytes());
        assert_eq!(&buf[8..14], &[10, 0, 0, 2, 1, 1]);
        assert_eq!(&buf[14..16], &32905u16.to_le_bytes());
        assert_eq!(&buf[16..18], &[0x02, 0x00]);
        assert_eq!(&buf[18..20], &[0x04, 0x00]);
        assert_eq!(&buf[20..24], &[12, 0, 0, 0]);
        assert_eq!(&buf[24..28], &[0, 0, 0, 0]);
        assert_eq!(&buf[28..32], &[0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn test_ams_header_decode_matches_encode() {
        let header = sample_header();
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(AmsHeader::decode(&buf).unwrap(), header);
    }

    #[test]
    fn test_ams_header_short_input() {
        let err = AmsHeader::decode(&[0u8; 31]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                needed: 32,
                got: 31,
                ..
            }
        ));
    }

    #[test]
    fn test_request_constructor_and_response_flag() {
        let target: AmsAddress = "1.2.3.4.1.1:851".parse().unwrap();
        let source: AmsAddress = "5.6.7.8.1.1:30000".parse().unwrap();
        let mut header = AmsHeader::request(target, source, ADS_READ, 7);
        assert_eq!(header.state_flags, STATE_FLAG_REQUEST);
        assert!(!header.is_response());
        header.state_flags |= STATE_FLAG_RESPONSE;
        assert!(header.is_response());
    }

    #[test]
    fn test_tcp_header() {
        let mut buf = BytesMut::new();
        AmsTcpHeader {
            command: 0x1000,
            length: 2,
        }
        .encode(&mut buf);
        assert_eq!(buf.as_ref(), &[0x00, 0x10, 0x02, 0x00, 0x00, 0x00]);
        let decoded = AmsTcpHeader::decode(&buf).unwrap();
        assert_eq!(decoded.command, 0x1000);
        assert_eq!(decoded.length, 2);
    }
}
