//! Wire framing: `[4-byte big-endian length][payload]`.
//!
//! The length prefix counts payload bytes only. There is no padding, checksum
//! or separator between records.

use bytes::{BufMut, BytesMut};

use crate::config::DEFAULT_MAX_RECORD_LENGTH;
use crate::error::DeserializeError;
use crate::record::Record;

/// Size of the length prefix in bytes.
pub const LENGTH_BYTES: usize = 4;

/// Appends `record` to `out` as one framed record.
///
/// Returns the payload length written. On error `out` is left unchanged.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use spillframe::frame_record;
///
/// let mut out = BytesMut::new();
/// frame_record(&b"abc".to_vec(), &mut out)?;
/// assert_eq!(&out[..], b"\x00\x00\x00\x03abc");
/// # Ok::<(), spillframe::DeserializeError>(())
/// ```
pub fn frame_record<T: Record + ?Sized>(
    record: &T,
    out: &mut BytesMut,
) -> Result<usize, DeserializeError> {
    let start = out.len();
    out.put_u32(0);
    record.write(out);

    let len = out.len() - start - LENGTH_BYTES;
    if len > DEFAULT_MAX_RECORD_LENGTH {
        out.truncate(start);
        return Err(DeserializeError::RecordTooLarge {
            actual: len,
            max: DEFAULT_MAX_RECORD_LENGTH,
        });
    }

    out[start..start + LENGTH_BYTES].copy_from_slice(&(len as u32).to_be_bytes());
    Ok(len)
}

/// Decodes a length prefix, rejecting negative values and values above `max`.
pub(crate) fn decode_length(length: i32, max: usize) -> Result<usize, DeserializeError> {
    if length < 0 || length as usize > max {
        tracing::debug!(
            target: "spillframe::frame",
            length,
            max,
            "rejecting corrupt length prefix"
        );
        return Err(DeserializeError::CorruptLength {
            length: i64::from(length),
            max,
        });
    }
    Ok(length as usize)
}

/// Collects the (up to four) bytes of a length prefix that spans buffers.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LengthAccumulator {
    bytes: [u8; LENGTH_BYTES],
    filled: usize,
}

impl LengthAccumulator {
    /// Copies as many bytes as still missing from `data`; returns how many were taken.
    pub(crate) fn fill(&mut self, data: &[u8]) -> usize {
        let n = (LENGTH_BYTES - self.filled).min(data.len());
        self.bytes[self.filled..self.filled + n].copy_from_slice(&data[..n]);
        self.filled += n;
        n
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.filled == LENGTH_BYTES
    }

    pub(crate) fn filled(&self) -> &[u8] {
        &self.bytes[..self.filled]
    }

    pub(crate) fn len(&self) -> usize {
        self.filled
    }

    /// Returns the collected prefix once complete and resets the accumulator.
    pub(crate) fn take(&mut self) -> Option<i32> {
        if !self.is_complete() {
            return None;
        }
        self.filled = 0;
        Some(i32::from_be_bytes(self.bytes))
    }

    pub(crate) fn clear(&mut self) {
        self.filled = 0;
    }
}
