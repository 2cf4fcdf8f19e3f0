use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::address::{AmsAddress, AmsNetId};
use crate::error::{FrameError, Result};
use crate::header::{AmsHeader, AmsTcpHeader, AMS_HEADER_SIZE, AMS_TCP_HEADER_SIZE};

/// Default maximum AMS/TCP frame body: 16 MiB.
pub const DEFAULT_MAX_FRAME: usize = 16 * 1024 * 1024;

/// AMS/TCP command word for a regular AMS packet.
pub const TCP_AMS_COMMAND: u16 = 0x0000;
/// AMS/TCP command word for router port registration.
pub const TCP_PORT_CONNECT: u16 = 0x1000;
/// AMS/TCP command word for releasing a registered port.
pub const TCP_PORT_CLOSE: u16 = 0x1001;
/// AMS/TCP command word for router state notifications.
pub const TCP_ROUTER_NOTIFICATION: u16 = 0x1002;

/// One ADS command with its routing header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdsPacket {
    pub header: AmsHeader,
    pub payload: Bytes,
}

/// Everything that can arrive on the router stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmsPacket {
    /// A regular ADS request, response or notification.
    Ads(AdsPacket),
    /// The router's answer to a port registration.
    PortConnect(AmsAddress),
    /// Router state change (0 = stopped, 1 = started, 2 = removed).
    RouterNotification(u32),
}

/// Encode an ADS packet into the wire format.
///
/// The header's `data_length` is taken from `payload`.
pub fn encode_ads_packet(header: &AmsHeader, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let body_len = AMS_HEADER_SIZE + payload.len();
    let length = u32::try_from(body_len).map_err(|_| FrameError::FrameTooLarge {
        size: body_len,
        max: u32::MAX as usize,
    })?;

    dst.reserve(AMS_TCP_HEADER_SIZE + body_len);
    AmsTcpHeader {
        command: TCP_AMS_COMMAND,
        length,
    }
    .encode(dst);
    AmsHeader {
        data_length: payload.len() as u32,
        ..*header
    }
    .encode(dst);
    dst.put_slice(payload);
    Ok(())
}

/// Encode a router port registration request. Port 0 lets the router choose.
pub fn encode_port_connect(requested_port: u16, dst: &mut BytesMut) {
    AmsTcpHeader {
        command: TCP_PORT_CONNECT,
        length: 2,
    }
    .encode(dst);
    dst.put_u16_le(requested_port);
}

/// Encode a router port release request.
pub fn encode_port_close(port: u16, dst: &mut BytesMut) {
    AmsTcpHeader {
        command: TCP_PORT_CLOSE,
        length: 2,
    }
    .encode(dst);
    dst.put_u16_le(port);
}

/// Decode one packet from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes exactly the frame bytes from the buffer.
///
/// A complete frame whose body is internally inconsistent is logged and
/// skipped; the AMS/TCP length still delimits it so the stream stays in sync.
/// A length above `max_frame` cannot be trusted and is returned as an error.
pub fn decode_packet(src: &mut BytesMut, max_frame: usize) -> Result<Option<AmsPacket>> {
    loop {
        if src.len() < AMS_TCP_HEADER_SIZE {
            return Ok(None);
        }

        let tcp = AmsTcpHeader::decode(&src[..AMS_TCP_HEADER_SIZE])?;
        let body_len = tcp.length as usize;
        if body_len > max_frame {
            return Err(FrameError::FrameTooLarge {
                size: body_len,
                max: max_frame,
            });
        }

        let total = AMS_TCP_HEADER_SIZE + body_len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(AMS_TCP_HEADER_SIZE);
        let body = src.split_to(body_len).freeze();

        match parse_body(tcp.command, body) {
            Ok(packet) => return Ok(Some(packet)),
            Err(err) => {
                warn!(
                    %err,
                    tcp_command = tcp.command,
                    length = body_len,
                    "skipping malformed ams frame"
                );
            }
        }
    }
}

fn parse_body(tcp_command: u16, body: Bytes) -> Result<AmsPacket> {
    match tcp_command {
        TCP_AMS_COMMAND => {
            let header = AmsHeader::decode(&body)?;
            let payload_len = body.len() - AMS_HEADER_SIZE;
            if header.data_length as usize != payload_len {
                return Err(FrameError::Malformed(format!(
                    "ams data length {} disagrees with frame payload {payload_len}",
                    header.data_length
                )));
            }
            Ok(AmsPacket::Ads(AdsPacket {
                header,
                payload: body.slice(AMS_HEADER_SIZE..),
            }))
        }
        TCP_PORT_CONNECT => {
            let net_id = AmsNetId::from_slice(&body).ok_or(FrameError::Truncated {
                what: "port connect reply",
                needed: 8,
                got: body.len(),
            })?;
            let port = body
                .get(6..8)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .ok_or(FrameError::Truncated {
                    what: "port connect reply",
                    needed: 8,
                    got: body.len(),
                })?;
            Ok(AmsPacket::PortConnect(AmsAddress::new(net_id, port)))
        }
        TCP_ROUTER_NOTIFICATION => {
            let state = body
                .get(..4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .ok_or(FrameError::Truncated {
                    what: "router notification",
                    needed: 4,
                    got: body.len(),
                })?;
            Ok(AmsPacket::RouterNotification(state))
        }
        other => Err(FrameError::Malformed(format!(
            "unknown ams/tcp command 0x{other:04X}"
        ))),
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Maximum AMS/TCP body size in bytes. Default: 16 MiB.
    pub max_frame_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
        }
    }
}

/// Stream codec for the router connection.
#[derive(Debug, Clone, Default)]
pub struct AmsCodec {
    config: CodecConfig,
}

impl AmsCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

impl Decoder for AmsCodec {
    type Item = AmsPacket;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<AmsPacket>> {
        decode_packet(src, self.config.max_frame_size)
    }
}

impl Encoder<AdsPacket> for AmsCodec {
    type Error = FrameError;

    fn encode(&mut self, item: AdsPacket, dst: &mut BytesMut) -> Result<()> {
        encode_ads_packet(&item.header, &item.payload, dst)
    }
}
