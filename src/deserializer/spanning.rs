//! Slow path: records whose bytes span two or more buffers.
//!
//! A spanning record moves through an explicit `Phase`:
//!
//! ```text
//! NotStarted -> GatheringLength -> GatheringPayloadMemory -> Ready(Memory)
//!                              \-> GatheringPayloadFile   -> Ready(File)
//! ```
//!
//! The direct wrapper may also enter `GatheringPayload*` straight from
//! `NotStarted` when it has already decoded the length prefix.

use bytes::{BufMut, Bytes, BytesMut};

use crate::buffer::Buffer;
use crate::config::DeserializerConfig;
use crate::error::DeserializeError;
use crate::frame::{LENGTH_BYTES, LengthAccumulator, decode_length};
use crate::record::RecordInput;

use super::direct::DirectWrapper;
use super::spill::{SpillDirectories, SpillReader, SpillWriter};
use super::UnconsumedSegments;

#[derive(Debug)]
enum Phase {
    NotStarted,
    GatheringLength,
    GatheringPayloadMemory { record_len: usize, bytes: Vec<u8> },
    GatheringPayloadFile { record_len: usize, spill: SpillWriter },
    Ready(AssembledRecord),
}

#[derive(Debug)]
enum AssembledRecord {
    Memory(Vec<u8>),
    File(SpillReader),
}

impl AssembledRecord {
    fn len(&self) -> usize {
        match self {
            AssembledRecord::Memory(bytes) => bytes.len(),
            AssembledRecord::File(reader) => reader.len(),
        }
    }
}

/// Bytes of the last fed buffer that lie past the assembled record.
#[derive(Debug)]
struct LeftOver {
    buffer: Buffer,
    start: usize,
}

/// Gathers one record across buffers, in memory or in a spill file.
#[derive(Debug)]
pub(crate) struct SpanningAssembler {
    length: LengthAccumulator,
    phase: Phase,
    left_over: Option<LeftOver>,
    spill_dirs: SpillDirectories,
    spill_threshold: usize,
    file_buffer_size: usize,
    max_record_length: usize,
}

impl SpanningAssembler {
    pub(crate) fn new(config: &DeserializerConfig) -> Self {
        Self {
            length: LengthAccumulator::default(),
            phase: Phase::NotStarted,
            left_over: None,
            spill_dirs: SpillDirectories::new(config.tmp_dirs()),
            spill_threshold: config.spill_threshold(),
            file_buffer_size: config.file_buffer_size(),
            max_record_length: config.max_record_length(),
        }
    }

    /// Returns the length accumulator for a prefix that spans buffers.
    pub(crate) fn length_buffer(&mut self) -> &mut LengthAccumulator {
        debug_assert!(matches!(
            self.phase,
            Phase::NotStarted | Phase::GatheringLength
        ));
        self.phase = Phase::GatheringLength;
        &mut self.length
    }

    /// Starts a record whose length the direct wrapper already decoded and
    /// takes over the partial payload it still holds.
    pub(crate) fn transfer_from(
        &mut self,
        direct: &mut DirectWrapper,
        record_len: usize,
    ) -> Result<(), DeserializeError> {
        debug_assert!(matches!(self.phase, Phase::NotStarted));

        let result = self
            .start_payload(record_len)
            .and_then(|()| self.append_payload(direct.remaining_slice()));
        direct.skip_remaining();
        result.map(|_| ())
    }

    /// Feeds the next buffer of a spanning record.
    ///
    /// Returns the buffer back when every byte of it was consumed. Otherwise
    /// the record is complete and the buffer is kept as left-over for
    /// [`Self::transfer_left_over_to`].
    pub(crate) fn add_next_chunk(&mut self, buffer: Buffer) -> Result<Option<Buffer>, DeserializeError> {
        debug_assert!(self.left_over.is_none());

        let consumed = {
            let data = buffer.as_slice();
            let mut offset = 0;

            if matches!(self.phase, Phase::GatheringLength) {
                offset += self.length.fill(data);
                if let Some(length) = self.length.take() {
                    let record_len = decode_length(length, self.max_record_length)?;
                    self.start_payload(record_len)?;
                }
            }

            offset + self.append_payload(&data[offset..])?
        };

        if consumed < buffer.len() {
            debug_assert!(self.has_full_record());
            tracing::trace!(
                target: "spillframe::spanning",
                left_over = buffer.len() - consumed,
                "record completed mid-buffer"
            );
            self.left_over = Some(LeftOver {
                buffer,
                start: consumed,
            });
            Ok(None)
        } else {
            Ok(Some(buffer))
        }
    }

    pub(crate) fn has_full_record(&self) -> bool {
        matches!(self.phase, Phase::Ready(_))
    }

    /// Returns true while the current record is stored in a spill file.
    pub(crate) fn is_spilled(&self) -> bool {
        matches!(
            self.phase,
            Phase::GatheringPayloadFile { .. } | Phase::Ready(AssembledRecord::File(_))
        )
    }

    /// One-shot view over the assembled record, if complete.
    pub(crate) fn input_view(&mut self) -> Option<RecordInput<'_>> {
        match &mut self.phase {
            Phase::Ready(AssembledRecord::Memory(bytes)) => Some(RecordInput::from_slice(bytes)),
            Phase::Ready(AssembledRecord::File(reader)) => Some(reader.input()),
            _ => None,
        }
    }

    /// Discards the consumed record and moves any left-over bytes, together
    /// with the buffer holding them, into `direct`.
    pub(crate) fn transfer_left_over_to(&mut self, direct: &mut DirectWrapper) {
        let left_over = self.left_over.take();
        self.reset_phase();

        if let Some(LeftOver { buffer, start }) = left_over {
            let limit = buffer.len();
            direct.initialize_from_buffer(buffer, start, limit);
        }
    }

    /// Bytes gathered toward the current record, length prefix included.
    pub(crate) fn num_gathered_bytes(&self) -> usize {
        match &self.phase {
            Phase::NotStarted => 0,
            Phase::GatheringLength => self.length.len(),
            Phase::GatheringPayloadMemory { bytes, .. } => LENGTH_BYTES + bytes.len(),
            Phase::GatheringPayloadFile { spill, .. } => LENGTH_BYTES + spill.written(),
            Phase::Ready(record) => LENGTH_BYTES + record.len(),
        }
    }

    /// Snapshot of everything gathered so far plus any left-over bytes.
    ///
    /// The prefix, the payload and the left-over come out as separate
    /// segments. A spilled payload is read back lazily through a second file
    /// handle; the spill writer keeps its position.
    pub(crate) fn unconsumed_segment(&self) -> Result<UnconsumedSegments, DeserializeError> {
        let mut segments = UnconsumedSegments::empty();
        match &self.phase {
            Phase::NotStarted => return Ok(segments),
            Phase::GatheringLength => {
                segments.push_memory(Bytes::copy_from_slice(self.length.filled()));
                return Ok(segments);
            }
            Phase::GatheringPayloadMemory { record_len, bytes } => {
                segments.push_memory(length_prefix(*record_len));
                segments.push_memory(Bytes::copy_from_slice(bytes));
            }
            Phase::GatheringPayloadFile { record_len, spill } => {
                let (on_disk, buffered) = spill.snapshot()?;
                segments.push_memory(length_prefix(*record_len));
                segments.push_spilled(on_disk);
                segments.push_memory(buffered);
            }
            Phase::Ready(AssembledRecord::Memory(bytes)) => {
                segments.push_memory(length_prefix(bytes.len()));
                segments.push_memory(Bytes::copy_from_slice(bytes));
            }
            Phase::Ready(AssembledRecord::File(reader)) => {
                segments.push_memory(length_prefix(reader.len()));
                segments.push_spilled(reader.snapshot()?);
            }
        }

        if let Some(LeftOver { buffer, start }) = &self.left_over {
            segments.push_memory(Bytes::copy_from_slice(&buffer.as_slice()[*start..]));
        }
        Ok(segments)
    }

    /// Drops any partial or assembled record, deleting its spill file, and
    /// hands back a left-over buffer without releasing it.
    #[must_use = "the returned buffer must be released by the caller"]
    pub(crate) fn clear(&mut self) -> Option<Buffer> {
        self.reset_phase();
        self.left_over.take().map(|l| l.buffer)
    }

    fn reset_phase(&mut self) {
        self.length.clear();
        match std::mem::replace(&mut self.phase, Phase::NotStarted) {
            Phase::GatheringPayloadFile { spill, .. } => spill.discard(),
            Phase::Ready(AssembledRecord::File(reader)) => reader.discard(),
            _ => {}
        }
    }

    /// Enters payload gathering, choosing memory or a spill file by framed size.
    fn start_payload(&mut self, record_len: usize) -> Result<(), DeserializeError> {
        if LENGTH_BYTES + record_len > self.spill_threshold {
            let spill = self.spill_dirs.create(self.file_buffer_size)?;
            tracing::debug!(
                target: "spillframe::spanning",
                record_len,
                threshold = self.spill_threshold,
                "spilling spanning record to disk"
            );
            self.phase = Phase::GatheringPayloadFile { record_len, spill };
        } else {
            self.phase = Phase::GatheringPayloadMemory {
                record_len,
                bytes: Vec::with_capacity(record_len),
            };
        }
        self.complete_if_full()
    }

    /// Appends as much of `data` as the current record still needs.
    fn append_payload(&mut self, data: &[u8]) -> Result<usize, DeserializeError> {
        let n = match &mut self.phase {
            Phase::GatheringPayloadMemory { record_len, bytes } => {
                let n = (*record_len - bytes.len()).min(data.len());
                bytes.extend_from_slice(&data[..n]);
                n
            }
            Phase::GatheringPayloadFile { record_len, spill } => {
                let n = (*record_len - spill.written()).min(data.len());
                spill.write_all(&data[..n])?;
                n
            }
            _ => return Ok(0),
        };

        self.complete_if_full()?;
        Ok(n)
    }

    fn complete_if_full(&mut self) -> Result<(), DeserializeError> {
        let full = match &self.phase {
            Phase::GatheringPayloadMemory { record_len, bytes } => bytes.len() == *record_len,
            Phase::GatheringPayloadFile { record_len, spill } => spill.written() == *record_len,
            _ => false,
        };
        if !full {
            return Ok(());
        }

        self.phase = match std::mem::replace(&mut self.phase, Phase::NotStarted) {
            Phase::GatheringPayloadMemory { bytes, .. } => Phase::Ready(AssembledRecord::Memory(bytes)),
            Phase::GatheringPayloadFile { spill, .. } => {
                Phase::Ready(AssembledRecord::File(spill.finish()?))
            }
            other => other,
        };
        Ok(())
    }
}

fn length_prefix(record_len: usize) -> Bytes {
    let mut prefix = BytesMut::with_capacity(LENGTH_BYTES);
    prefix.put_u32(record_len as u32);
    prefix.freeze()
}
