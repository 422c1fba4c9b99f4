//! Fast path: records fully contained in the current buffer.

use bytes::Bytes;

use crate::buffer::Buffer;
use crate::error::DeserializeError;
use crate::frame::{LENGTH_BYTES, LengthAccumulator};
use crate::record::{Record, RecordInput};

use super::{DeserializationResult, UnconsumedSegments};

/// Holds the one buffer currently read in place.
///
/// Invariant: `position <= limit <= buffer.len()`. Once `position == limit`
/// the wrapper is drained and its buffer must be handed back with
/// [`DirectWrapper::clear`] so the orchestrator can release it.
#[derive(Debug, Default)]
pub(crate) struct DirectWrapper {
    buffer: Option<Buffer>,
    position: usize,
    limit: usize,
}

impl DirectWrapper {
    /// Starts reading `buffer[offset..limit]`.
    pub(crate) fn initialize_from_buffer(&mut self, buffer: Buffer, offset: usize, limit: usize) {
        debug_assert!(
            !self.has_remaining(),
            "replacing a buffer that still holds unread bytes"
        );
        debug_assert!(offset <= limit && limit <= buffer.len());

        self.buffer = Some(buffer);
        self.position = offset;
        self.limit = limit;
    }

    pub(crate) fn has_complete_length(&self) -> bool {
        self.remaining() >= LENGTH_BYTES
    }

    pub(crate) fn holds_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    pub(crate) fn has_remaining(&self) -> bool {
        self.position < self.limit
    }

    pub(crate) fn remaining(&self) -> usize {
        self.limit - self.position
    }

    /// Consumes the length prefix. Only valid after [`Self::has_complete_length`].
    pub(crate) fn read_int(&mut self) -> i32 {
        debug_assert!(self.has_complete_length());
        let mut prefix = [0u8; LENGTH_BYTES];
        prefix.copy_from_slice(&self.remaining_slice()[..LENGTH_BYTES]);
        self.position += LENGTH_BYTES;
        i32::from_be_bytes(prefix)
    }

    pub(crate) fn can_read_record(&self, len: usize) -> bool {
        self.remaining() >= len
    }

    /// Decodes one payload of `len` bytes into `target`.
    ///
    /// The position moves past the payload even if the codec fails or leaves
    /// bytes unread, so the framing stays aligned.
    pub(crate) fn read_into<T: Record + ?Sized>(
        &mut self,
        target: &mut T,
        len: usize,
    ) -> Result<DeserializationResult, DeserializeError> {
        debug_assert!(self.can_read_record(len));

        let read = {
            let payload = &self.remaining_slice()[..len];
            target.read(&mut RecordInput::from_slice(payload))
        };
        self.position += len;
        read.map_err(DeserializeError::Payload)?;

        Ok(if self.has_remaining() {
            DeserializationResult::IntermediateRecordFromBuffer
        } else {
            DeserializationResult::LastRecordFromBuffer
        })
    }

    /// Moves a partial length prefix (fewer than four bytes) into `length`.
    pub(crate) fn transfer_to(&mut self, length: &mut LengthAccumulator) {
        debug_assert!(!self.has_complete_length());
        let taken = length.fill(self.remaining_slice());
        debug_assert_eq!(taken, self.remaining());
        self.skip_remaining();
    }

    /// Returns the unread bytes.
    pub(crate) fn remaining_slice(&self) -> &[u8] {
        match &self.buffer {
            Some(buffer) => &buffer.as_slice()[self.position..self.limit],
            None => &[],
        }
    }

    /// Marks every remaining byte as consumed.
    pub(crate) fn skip_remaining(&mut self) {
        self.position = self.limit;
    }

    /// Snapshot of the unread bytes; the read position is not moved.
    pub(crate) fn unconsumed_segment(&self) -> UnconsumedSegments {
        UnconsumedSegments::single(Bytes::copy_from_slice(self.remaining_slice()))
    }

    /// Resets to empty and hands back the buffer without releasing it.
    #[must_use = "the returned buffer must be released by the caller"]
    pub(crate) fn clear(&mut self) -> Option<Buffer> {
        self.position = 0;
        self.limit = 0;
        self.buffer.take()
    }
}
