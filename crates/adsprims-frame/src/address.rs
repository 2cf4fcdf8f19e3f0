use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::FrameError;

/// Size of an AMS net id on the wire.
pub const NET_ID_SIZE: usize = 6;

/// Six-octet logical AMS address, written `a.b.c.d.e.f`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AmsNetId(pub [u8; NET_ID_SIZE]);

impl AmsNetId {
    /// `127.0.0.1.1.1`, the usual net id of a local router.
    pub const LOCALHOST: AmsNetId = AmsNetId([127, 0, 0, 1, 1, 1]);

    /// Build the conventional net id for an IPv4 host (`ip.1.1`).
    pub fn from_ipv4(ip: Ipv4Addr) -> Self {
        let [a, b, c, d] = ip.octets();
        Self([a, b, c, d, 1, 1])
    }

    /// Raw octets.
    pub fn octets(&self) -> [u8; NET_ID_SIZE] {
        self.0
    }

    /// Read a net id from the first 6 bytes of `src`.
    pub fn from_slice(src: &[u8]) -> Option<Self> {
        let octets: [u8; NET_ID_SIZE] = src.get(..NET_ID_SIZE)?.try_into().ok()?;
        Some(Self(octets))
    }
}

impl FromStr for AmsNetId {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; NET_ID_SIZE];
        let mut parts = s.trim().split('.');
        for octet in octets.iter_mut() {
            *octet = parts
                .next()
                .and_then(|part| part.parse::<u8>().ok())
                .ok_or_else(|| FrameError::InvalidNetId(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(FrameError::InvalidNetId(s.to_string()));
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for AmsNetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a}.{b}.{c}.{d}.{e}.{g}")
    }
}

impl fmt::Debug for AmsNetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AmsNetId({self})")
    }
}

/// One endpoint on the AMS transport: net id plus AMS port.
///
/// AMS ports are protocol-level service addresses (10000 = system service,
/// 851 = first TwinCAT 3 PLC runtime), unrelated to TCP ports.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AmsAddress {
    pub net_id: AmsNetId,
    pub port: u16,
}

impl AmsAddress {
    pub fn new(net_id: AmsNetId, port: u16) -> Self {
        Self { net_id, port }
    }

    /// Same net id, different port.
    pub fn with_port(self, port: u16) -> Self {
        Self { port, ..self }
    }
}

impl FromStr for AmsAddress {
    type Err = FrameError;

    /// Parses `a.b.c.d.e.f:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (net_id, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| FrameError::InvalidNetId(s.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| FrameError::InvalidNetId(s.to_string()))?;
        Ok(Self::new(net_id.parse()?, port))
    }
}

impl fmt::Display for AmsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.net_id, self.port)
    }
}

impl fmt::Debug for AmsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AmsAddress({self})")
    }
}
