//! Device notification payloads.
//!
//! ```text
//! length (4) │ stamp count (4) │ stamps...
//!   stamp:  timestamp (8, FILETIME) │ sample count (4) │ samples...
//!   sample: handle (4) │ size (4) │ data (size)
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::error::{ensure_len, FrameError, Result};

/// Seconds between 1601-01-01 and 1970-01-01.
pub const FILETIME_EPOCH_OFFSET_SECS: u64 = 11_644_473_600;

const TICKS_PER_SEC: u64 = 10_000_000;
const NANOS_PER_TICK: u64 = 100;

/// One value delivered for a notification handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSample {
    pub handle: u32,
    pub payload: Bytes,
}

/// Samples sharing one device timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationStamp {
    pub timestamp: SystemTime,
    pub samples: Vec<NotificationSample>,
}

/// Convert a FILETIME (100 ns ticks since 1601) to wall-clock time.
///
/// Times before the Unix epoch clamp to `UNIX_EPOCH`.
pub fn filetime_to_system_time(filetime: u64) -> SystemTime {
    let secs = filetime / TICKS_PER_SEC;
    let nanos = (filetime % TICKS_PER_SEC) * NANOS_PER_TICK;
    match secs.checked_sub(FILETIME_EPOCH_OFFSET_SECS) {
        Some(unix_secs) => UNIX_EPOCH + Duration::new(unix_secs, nanos as u32),
        None => UNIX_EPOCH,
    }
}

/// Inverse of [`filetime_to_system_time`], truncated to 100 ns.
pub fn system_time_to_filetime(time: SystemTime) -> u64 {
    let since_unix = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    (since_unix.as_secs() + FILETIME_EPOCH_OFFSET_SECS) * TICKS_PER_SEC
        + u64::from(since_unix.subsec_nanos()) / NANOS_PER_TICK
}

struct Reader<'a> {
    data: &'a Bytes,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &'static str) -> Result<Bytes> {
        ensure_len(&self.data[self.pos..], n, what)?;
        let out = self.data.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(out)
    }

    fn u32(&mut self, what: &'static str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self, what: &'static str) -> Result<u64> {
        let b = self.take(8, what)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&b);
        Ok(u64::from_le_bytes(raw))
    }
}

/// Split a Notification command payload into stamps and samples.
///
/// Sample payloads are zero-copy slices of `data`.
pub fn parse_notification(data: &Bytes) -> Result<Vec<NotificationStamp>> {
    let mut reader = Reader { data, pos: 0 };
    let length = reader.u32("notification length")? as usize;
    if length > data.len() - 4 {
        return Err(FrameError::Truncated {
            what: "notification body",
            needed: length,
            got: data.len() - 4,
        });
    }

    let stamp_count = reader.u32("notification stamp count")?;
    let mut stamps = Vec::with_capacity(stamp_count.min(64) as usize);
    for _ in 0..stamp_count {
        let timestamp = filetime_to_system_time(reader.u64("notification timestamp")?);
        let sample_count = reader.u32("notification sample count")?;
        let mut samples = Vec::with_capacity(sample_count.min(256) as usize);
        for _ in 0..sample_count {
            let handle = reader.u32("notification sample handle")?;
            let size = reader.u32("notification sample size")? as usize;
            let payload = reader.take(size, "notification sample data")?;
            samples.push(NotificationSample { handle, payload });
        }
        stamps.push(NotificationStamp { timestamp, samples });
    }
    Ok(stamps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    const FT_2024: u64 = 133_485_408_000_000_000; // 2024-01-01T00:00:00Z

    fn build(stamps: &[(u64, &[(u32, &[u8])])]) -> Bytes {
        let mut body = BytesMut::new();
        body.put_u32_le(stamps.len() as u32);
        for (ts, samples) in stamps {
            body.put_u64_le(*ts);
            body.put_u32_le(samples.len() as u32);
            for (handle, data) in *samples {
                body.put_u32_le(*handle);
                body.put_u32_le(data.len() as u32);
                body.put_slice(data);
            }
        }
        let mut out = BytesMut::new();
        out.put_u32_le(body.len() as u32);
        out.put_slice(&body);
        out.freeze()
    }

    #[test]
    fn test_two_stamps_three_samples() {
        let data = build(&[
            (FT_2024, &[(1, &[0x2A, 0x00]), (2, &[1])]),
            (FT_2024 + TICKS_PER_SEC, &[(1, &[0x2B, 0x00])]),
        ]);
        let stamps = parse_notification(&data).unwrap();

        assert_eq!(stamps.len(), 2);
        assert_eq!(stamps[0].samples.len(), 2);
        assert_eq!(stamps[1].samples.len(), 1);
        assert_eq!(stamps[0].samples[0].handle, 1);
        assert_eq!(stamps[0].samples[0].payload.as_ref(), &[0x2A, 0x00]);
        assert_eq!(stamps[0].samples[1].handle, 2);
        assert_eq!(stamps[1].samples[0].payload.as_ref(), &[0x2B, 0x00]);
        assert_eq!(
            stamps[1]
                .timestamp
                .duration_since(stamps[0].timestamp)
                .unwrap(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_filetime_conversion() {
        let t = filetime_to_system_time(FT_2024);
        assert_eq!(
            t.duration_since(UNIX_EPOCH).unwrap().as_secs(),
            1_704_067_200
        );
        assert_eq!(system_time_to_filetime(t), FT_2024);
        assert_eq!(filetime_to_system_time(0), UNIX_EPOCH);
    }

    #[test]
    fn test_truncated_sample() {
        let mut data = build(&[(FT_2024, &[(1, &[1, 2, 3, 4])])]).to_vec();
        data.truncate(data.len() - 2);
        let len = (data.len() - 4) as u32;
        data[..4].copy_from_slice(&len.to_le_bytes());
        let err = parse_notification(&Bytes::from(data)).unwrap_err();
        assert!(matches!(err, FrameError::Truncated { .. }));
    }

    #[test]
    fn test_declared_length_exceeds_payload() {
        let mut data = build(&[]).to_vec();
        data[..4].copy_from_slice(&100u32.to_le_bytes());
        assert!(parse_notification(&Bytes::from(data)).is_err());
    }

    #[test]
    fn test_empty_notification() {
        assert!(parse_notification(&build(&[])).unwrap().is_empty());
        assert!(parse_notification(&Bytes::new()).is_err());
    }
}
