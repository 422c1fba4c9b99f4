//! Record deserialization across buffer boundaries.
//!
//! - [`RecordDeserializer`] - orchestrates the fast and spanning paths
//! - [`DeserializationResult`] - outcome of one retrieval attempt
//! - [`UnconsumedSegments`] - snapshot of in-flight framing state
//!
//! Internally a record is served by one of two leaves: the direct wrapper
//! reads records that sit entirely inside the current buffer, and the
//! spanning assembler gathers records that cross buffers, spilling to disk
//! above the configured threshold.

mod direct;
mod engine;
mod spanning;
mod spill;

use std::collections::VecDeque;
use std::fmt;
use std::io;

use bytes::Bytes;

pub use engine::RecordDeserializer;

use spill::SpilledSegments;

/// Outcome of [`RecordDeserializer::get_next_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeserializationResult {
    /// No complete record yet; the current buffer has been consumed.
    PartialRecord,
    /// A record was produced and the current buffer still holds bytes.
    IntermediateRecordFromBuffer,
    /// A record was produced and the current buffer has been consumed.
    LastRecordFromBuffer,
}

impl DeserializationResult {
    /// Returns true if the target now holds a complete record.
    pub fn is_full_record(self) -> bool {
        !matches!(self, DeserializationResult::PartialRecord)
    }

    /// Returns true if the caller must supply the next buffer.
    pub fn is_buffer_consumed(self) -> bool {
        !matches!(self, DeserializationResult::IntermediateRecordFromBuffer)
    }
}

impl fmt::Display for DeserializationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeserializationResult::PartialRecord => "partial record",
            DeserializationResult::IntermediateRecordFromBuffer => "intermediate record from buffer",
            DeserializationResult::LastRecordFromBuffer => "last record from buffer",
        };
        f.write_str(name)
    }
}

/// Unread bytes held by the deserializer, as a finite one-pass sequence.
///
/// Segments are copies; iterating does not change the deserializer's state.
/// Concatenated, they form a valid framed byte stream prefix that can be fed
/// to a fresh deserializer to resume.
///
/// Bytes of a spilled record are read lazily from the spill file through a
/// separate handle, one file-buffer-sized chunk per item. A failed read ends
/// the sequence after yielding the error.
#[derive(Debug, Default)]
pub struct UnconsumedSegments {
    parts: VecDeque<Part>,
}

#[derive(Debug)]
enum Part {
    Memory(Bytes),
    Spilled(SpilledSegments),
}

impl UnconsumedSegments {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn single(segment: Bytes) -> Self {
        let mut segments = Self::empty();
        segments.push_memory(segment);
        segments
    }

    pub(crate) fn push_memory(&mut self, segment: Bytes) {
        if !segment.is_empty() {
            self.parts.push_back(Part::Memory(segment));
        }
    }

    pub(crate) fn push_spilled(&mut self, spilled: SpilledSegments) {
        if !spilled.is_empty() {
            self.parts.push_back(Part::Spilled(spilled));
        }
    }
}

impl Iterator for UnconsumedSegments {
    type Item = io::Result<Bytes>;

    fn next(&mut self) -> Option<io::Result<Bytes>> {
        loop {
            match self.parts.pop_front()? {
                Part::Memory(segment) => return Some(Ok(segment)),
                Part::Spilled(mut spilled) => match spilled.next_chunk() {
                    Some(Ok(chunk)) => {
                        self.parts.push_front(Part::Spilled(spilled));
                        return Some(Ok(chunk));
                    }
                    Some(Err(e)) => {
                        self.parts.clear();
                        return Some(Err(e));
                    }
                    None => {}
                },
            }
        }
    }
}

impl std::iter::FusedIterator for UnconsumedSegments {}
