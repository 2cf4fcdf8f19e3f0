//! In-process mock device for client integration tests.
//!
//! The device side of a duplex pipe decodes every request, hands it to a
//! test-supplied handler and writes whatever frames the handler returns.
//! Tests can also push unsolicited frames (notifications) at any time.

#![allow(dead_code)]

use std::time::{Duration, SystemTime};

use adsprims_client::{AdsClient, ClientConfig};
use adsprims_frame::command::STATE_FLAG_RESPONSE;
use adsprims_frame::{
    decode_packet, encode_ads_packet, system_time_to_filetime, AdsPacket, AmsAddress, AmsHeader,
    AmsPacket, ADS_NOTIFICATION, DEFAULT_MAX_FRAME,
};
use adsprims_types::AdsDataType;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

pub const CLIENT: &str = "10.0.0.2.1.1:30000";
pub const TARGET: &str = "10.0.0.1.1.1:851";

pub fn config() -> ClientConfig {
    ClientConfig {
        local: Some(CLIENT.parse().unwrap()),
        target: TARGET.parse().unwrap(),
        request_timeout: Duration::from_millis(300),
        ..ClientConfig::default()
    }
}

pub struct MockDevice {
    pub requests: mpsc::UnboundedReceiver<AdsPacket>,
    push: mpsc::UnboundedSender<Vec<u8>>,
}

impl MockDevice {
    /// Send a frame to the client unprompted.
    pub fn push(&self, frame: Vec<u8>) {
        self.push.send(frame).unwrap();
    }

    /// Close the device end of the pipe.
    pub fn hang_up(self) {
        drop(self.push);
    }

    /// Next request the device saw.
    pub async fn next_request(&mut self) -> AdsPacket {
        tokio::time::timeout(Duration::from_secs(2), self.requests.recv())
            .await
            .expect("no request within 2s")
            .expect("device stopped")
    }
}

/// Start a client wired to a mock device driven by `handler`.
pub async fn start<H>(config: ClientConfig, mut handler: H) -> (AdsClient, MockDevice)
where
    H: FnMut(&AdsPacket) -> Vec<Vec<u8>> + Send + 'static,
{
    let (client_io, mut device_io) = tokio::io::duplex(256 * 1024);
    let (seen_tx, requests) = mpsc::unbounded_channel();
    let (push, mut outbound) = mpsc::unbounded_channel::<Vec<u8>>();

    tokio::spawn(async move {
        let mut buf = BytesMut::new();
        loop {
            tokio::select! {
                frame = outbound.recv() => {
                    let Some(frame) = frame else { break };
                    if device_io.write_all(&frame).await.is_err() {
                        break;
                    }
                }
                read = device_io.read_buf(&mut buf) => {
                    if !matches!(read, Ok(n) if n > 0) {
                        break;
                    }
                    while let Ok(Some(packet)) = decode_packet(&mut buf, DEFAULT_MAX_FRAME) {
                        let AmsPacket::Ads(request) = packet else { continue };
                        let frames = handler(&request);
                        let _ = seen_tx.send(request);
                        for frame in frames {
                            if device_io.write_all(&frame).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        }
    });

    let client = AdsClient::from_stream(client_io, config).await.unwrap();
    (client, MockDevice { requests, push })
}

/// Response frame for `request` with an AMS header error code and payload.
pub fn response(request: &AdsPacket, error_code: u32, payload: &[u8]) -> Vec<u8> {
    let header = AmsHeader {
        target: request.header.source,
        source: request.header.target,
        state_flags: request.header.state_flags | STATE_FLAG_RESPONSE,
        error_code,
        ..request.header
    };
    let mut out = BytesMut::new();
    encode_ads_packet(&header, payload, &mut out).unwrap();
    out.to_vec()
}

pub fn read_ok(data: &[u8]) -> Vec<u8> {
    let mut out = 0u32.to_le_bytes().to_vec();
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    out
}

pub fn result_only(code: u32) -> Vec<u8> {
    code.to_le_bytes().to_vec()
}

pub fn read_state_ok(ads_state: u16, device_state: u16) -> Vec<u8> {
    let mut out = 0u32.to_le_bytes().to_vec();
    out.extend_from_slice(&ads_state.to_le_bytes());
    out.extend_from_slice(&device_state.to_le_bytes());
    out
}

pub fn handle_ok(handle: u32) -> Vec<u8> {
    let mut out = 0u32.to_le_bytes().to_vec();
    out.extend_from_slice(&handle.to_le_bytes());
    out
}

/// Index group and offset of a Read/Write/ReadWrite request.
pub fn index_of(request: &AdsPacket) -> (u32, u32) {
    let p = &request.payload;
    (
        u32::from_le_bytes([p[0], p[1], p[2], p[3]]),
        u32::from_le_bytes([p[4], p[5], p[6], p[7]]),
    )
}

/// NUL-terminated name carried by a ReadWrite request.
pub fn read_write_name(request: &AdsPacket) -> String {
    let data = &request.payload[16..];
    let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

/// Data carried by a Write request.
pub fn write_data(request: &AdsPacket) -> Vec<u8> {
    request.payload[12..].to_vec()
}

/// Device notification frame for the client, one stamp stamped now.
pub fn notification_frame(samples: &[(u32, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&1u32.to_le_bytes());
    body.extend_from_slice(&system_time_to_filetime(SystemTime::now()).to_le_bytes());
    body.extend_from_slice(&(samples.len() as u32).to_le_bytes());
    for (handle, data) in samples {
        body.extend_from_slice(&handle.to_le_bytes());
        body.extend_from_slice(&(data.len() as u32).to_le_bytes());
        body.extend_from_slice(data);
    }
    let mut payload = (body.len() as u32).to_le_bytes().to_vec();
    payload.extend_from_slice(&body);

    let client: AmsAddress = CLIENT.parse().unwrap();
    let device: AmsAddress = TARGET.parse().unwrap();
    let header = AmsHeader::request(client, device, ADS_NOTIFICATION, 0);
    let mut out = BytesMut::new();
    encode_ads_packet(&header, &payload, &mut out).unwrap();
    out.to_vec()
}

pub fn symbol_entry(name: &str, type_name: &str, group: u32, offset: u32, size: u32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&group.to_le_bytes());
    body.extend_from_slice(&offset.to_le_bytes());
    body.extend_from_slice(&size.to_le_bytes());
    body.extend_from_slice(&AdsDataType::BigType.code().to_le_bytes());
    body.extend_from_slice(&8u16.to_le_bytes());
    body.extend_from_slice(&0u16.to_le_bytes());
    body.extend_from_slice(&(name.len() as u16).to_le_bytes());
    body.extend_from_slice(&(type_name.len() as u16).to_le_bytes());
    body.extend_from_slice(&0u16.to_le_bytes());
    for s in [name, type_name, ""] {
        body.extend_from_slice(s.as_bytes());
        body.push(0);
    }
    let mut out = ((body.len() + 4) as u32).to_le_bytes().to_vec();
    out.extend_from_slice(&body);
    out
}

/// Data type entry in device layout.
pub struct TypeEntry {
    pub name: String,
    pub type_name: String,
    pub data_type: AdsDataType,
    pub size: u32,
    pub offset: u32,
    pub dims: Vec<(i32, u32)>,
    pub members: Vec<TypeEntry>,
}

impl TypeEntry {
    pub fn new(name: &str, type_name: &str, data_type: AdsDataType, size: u32) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            data_type,
            size,
            offset: 0,
            dims: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn at(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn dims(mut self, dims: &[(i32, u32)]) -> Self {
        self.dims = dims.to_vec();
        self
    }

    pub fn member(mut self, member: TypeEntry) -> Self {
        self.members.push(member);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for word in [1u32, 0, 0, self.size, self.offset, self.data_type.code(), 1] {
            body.extend_from_slice(&word.to_le_bytes());
        }
        for len in [self.name.len(), self.type_name.len(), 0] {
            body.extend_from_slice(&(len as u16).to_le_bytes());
        }
        body.extend_from_slice(&(self.dims.len() as u16).to_le_bytes());
        body.extend_from_slice(&(self.members.len() as u16).to_le_bytes());
        for s in [self.name.as_str(), self.type_name.as_str(), ""] {
            body.extend_from_slice(s.as_bytes());
            body.push(0);
        }
        for (start, len) in &self.dims {
            body.extend_from_slice(&start.to_le_bytes());
            body.extend_from_slice(&len.to_le_bytes());
        }
        for member in &self.members {
            body.extend_from_slice(&member.build());
        }
        let mut out = ((body.len() + 4) as u32).to_le_bytes().to_vec();
        out.extend_from_slice(&body);
        out
    }
}
