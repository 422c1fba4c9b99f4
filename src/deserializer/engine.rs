//! The record deserializer: routes buffers between the fast path and the
//! spanning assembler and owns buffer release.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use spillframe::{Buffer, DeserializationResult, DeserializerConfig, RecordDeserializer, frame_record};
//!
//! let mut wire = BytesMut::new();
//! frame_record(&b"first".to_vec(), &mut wire)?;
//! frame_record(&b"second".to_vec(), &mut wire)?;
//!
//! // Split the stream in the middle of the second record
//! let tail = wire.split_off(12);
//!
//! let mut deserializer = RecordDeserializer::new(DeserializerConfig::default());
//! let mut record = Vec::new();
//!
//! deserializer.set_next_buffer(Buffer::new(wire.freeze()))?;
//! assert_eq!(
//!     deserializer.get_next_record(&mut record)?,
//!     DeserializationResult::IntermediateRecordFromBuffer
//! );
//! assert_eq!(record, b"first");
//! assert_eq!(
//!     deserializer.get_next_record(&mut record)?,
//!     DeserializationResult::PartialRecord
//! );
//!
//! deserializer.set_next_buffer(Buffer::new(tail.freeze()))?;
//! assert_eq!(
//!     deserializer.get_next_record(&mut record)?,
//!     DeserializationResult::LastRecordFromBuffer
//! );
//! assert_eq!(record, b"second");
//! # Ok::<(), spillframe::DeserializeError>(())
//! ```

use crate::buffer::Buffer;
use crate::config::DeserializerConfig;
use crate::error::DeserializeError;
use crate::frame::decode_length;
use crate::record::Record;

use super::direct::DirectWrapper;
use super::spanning::SpanningAssembler;
use super::{DeserializationResult, UnconsumedSegments};

/// Reassembles length-prefixed records from a sequence of buffers.
///
/// Feed one buffer with [`set_next_buffer`](Self::set_next_buffer), then call
/// [`get_next_record`](Self::get_next_record) until the result reports the
/// buffer as consumed, then feed the next buffer.
///
/// # Buffer ownership
///
/// The deserializer holds at most one buffer at a time and releases it exactly
/// once, as soon as all its bytes have been consumed. A record that spans
/// buffers is copied out of them as they arrive, in memory or, when its framed
/// size exceeds the spill threshold, into a temporary file.
///
/// # Errors
///
/// Every error leaves the stream unusable except for [`clear`](Self::clear),
/// which releases what is held. Payload errors are the exception: the framing
/// position has already moved past the bad record.
#[derive(Debug)]
pub struct RecordDeserializer {
    direct: DirectWrapper,
    spanning: SpanningAssembler,
    config: DeserializerConfig,
}

impl RecordDeserializer {
    /// Creates a new deserializer with the given configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use spillframe::{DeserializerConfig, RecordDeserializer};
    ///
    /// let deserializer = RecordDeserializer::new(DeserializerConfig::default());
    /// assert_eq!(deserializer.pending_len(), 0);
    /// ```
    pub fn new(config: DeserializerConfig) -> Self {
        Self {
            direct: DirectWrapper::default(),
            spanning: SpanningAssembler::new(&config),
            config,
        }
    }

    /// Hands the next buffer to the deserializer.
    ///
    /// If a spanning record is being gathered the whole buffer goes to it;
    /// otherwise records are read from the buffer in place. Must only be called
    /// after the previous buffer was reported consumed.
    pub fn set_next_buffer(&mut self, buffer: Buffer) -> Result<(), DeserializeError> {
        debug_assert!(
            !self.direct.has_remaining(),
            "set_next_buffer called before the previous buffer was consumed"
        );
        // Drained buffers are released by get_next_record
        debug_assert!(!self.direct.holds_buffer());

        if self.spanning.num_gathered_bytes() > 0 {
            if let Some(drained) = self.spanning.add_next_chunk(buffer)? {
                self.release(drained);
            }
        } else {
            let limit = buffer.len();
            self.direct.initialize_from_buffer(buffer, 0, limit);
        }
        Ok(())
    }

    /// Tries to decode the next record into `target`.
    ///
    /// `target` is only written when the result
    /// [`is_full_record`](DeserializationResult::is_full_record).
    pub fn get_next_record<T: Record + ?Sized>(
        &mut self,
        target: &mut T,
    ) -> Result<DeserializationResult, DeserializeError> {
        let result = self.read_next_record(target);
        if !self.direct.has_remaining() {
            if let Some(buffer) = self.direct.clear() {
                self.release(buffer);
            }
        }
        result
    }

    fn read_next_record<T: Record + ?Sized>(
        &mut self,
        target: &mut T,
    ) -> Result<DeserializationResult, DeserializeError> {
        // The fast path covers most records; spanning records pay for
        // themselves in copying anyway.
        if self.direct.has_complete_length() {
            let record_len = decode_length(self.direct.read_int(), self.config.max_record_length())?;
            if self.direct.can_read_record(record_len) {
                return self.direct.read_into(target, record_len);
            }
            self.spanning.transfer_from(&mut self.direct, record_len)?;
            return Ok(DeserializationResult::PartialRecord);
        }

        if self.direct.has_remaining() {
            self.direct.transfer_to(self.spanning.length_buffer());
            return Ok(DeserializationResult::PartialRecord);
        }

        let read = match self.spanning.input_view() {
            Some(mut input) => target.read(&mut input),
            None => return Ok(DeserializationResult::PartialRecord),
        };

        debug_assert!(!self.direct.holds_buffer());
        self.spanning.transfer_left_over_to(&mut self.direct);
        read.map_err(DeserializeError::Payload)?;

        Ok(if self.direct.has_remaining() {
            DeserializationResult::IntermediateRecordFromBuffer
        } else {
            DeserializationResult::LastRecordFromBuffer
        })
    }

    /// Returns a snapshot of the bytes held toward future records.
    ///
    /// Bytes of a spilled record are read lazily from a second handle on the
    /// spill file as the segments are iterated. Fails only if that handle
    /// cannot be opened.
    pub fn unconsumed_buffer(&self) -> Result<UnconsumedSegments, DeserializeError> {
        if self.direct.has_remaining() {
            Ok(self.direct.unconsumed_segment())
        } else {
            self.spanning.unconsumed_segment()
        }
    }

    /// Releases any held buffer and drops partial records and spill files.
    ///
    /// Safe to call at any time, any number of times.
    pub fn clear(&mut self) {
        if let Some(buffer) = self.direct.clear() {
            self.release(buffer);
        }
        if let Some(buffer) = self.spanning.clear() {
            self.release(buffer);
        }
    }

    /// Returns the number of bytes held toward records not yet returned.
    pub fn pending_len(&self) -> usize {
        self.direct.remaining() + self.spanning.num_gathered_bytes()
    }

    /// Returns true once every byte of the current buffer has been consumed.
    ///
    /// This is also true before the first buffer and after a payload error
    /// on the last record of a buffer.
    pub fn needs_buffer(&self) -> bool {
        !self.direct.has_remaining() && !self.spanning.has_full_record()
    }

    /// Returns true if the record being gathered is stored in a spill file.
    pub fn is_spilling(&self) -> bool {
        self.spanning.is_spilled()
    }

    /// Returns the configuration used by this deserializer.
    pub fn config(&self) -> &DeserializerConfig {
        &self.config
    }

    fn release(&self, buffer: Buffer) {
        tracing::trace!(
            target: "spillframe::deserializer",
            len = buffer.len(),
            "releasing consumed buffer"
        );
        buffer.recycle();
    }
}

impl Default for RecordDeserializer {
    fn default() -> Self {
        Self::new(DeserializerConfig::default())
    }
}
