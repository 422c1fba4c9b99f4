//! Bounded input view over one record payload.

use std::fmt;
use std::io::{self, Read};

/// Sequential, one-shot view over exactly one record payload.
///
/// The view is backed either by memory (the network buffer itself or an
/// in-memory assembly buffer) or by a spill file. It reports end of input at
/// the payload boundary regardless of what follows in the backing storage.
pub struct RecordInput<'a> {
    source: Source<'a>,
    remaining: usize,
}

enum Source<'a> {
    Memory(&'a [u8]),
    Spilled(&'a mut dyn Read),
}

impl<'a> RecordInput<'a> {
    /// Creates a view over an in-memory payload.
    pub fn from_slice(payload: &'a [u8]) -> Self {
        Self {
            remaining: payload.len(),
            source: Source::Memory(payload),
        }
    }

    /// Creates a view over the next `len` bytes of `reader`.
    pub(crate) fn from_reader(reader: &'a mut dyn Read, len: usize) -> Self {
        Self {
            source: Source::Spilled(reader),
            remaining: len,
        }
    }

    /// Returns the number of payload bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Returns true if the view is backed by a spill file.
    pub fn is_spilled(&self) -> bool {
        matches!(self.source, Source::Spilled(_))
    }
}

impl Read for RecordInput<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let max = buf.len().min(self.remaining);
        if max == 0 {
            return Ok(0);
        }

        let n = match &mut self.source {
            Source::Memory(payload) => {
                let n = max.min(payload.len());
                buf[..n].copy_from_slice(&payload[..n]);
                *payload = &payload[n..];
                n
            }
            Source::Spilled(reader) => reader.read(&mut buf[..max])?,
        };

        self.remaining -= n;
        Ok(n)
    }
}

impl fmt::Debug for RecordInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordInput")
            .field("remaining", &self.remaining)
            .field("spilled", &self.is_spilled())
            .finish()
    }
}
