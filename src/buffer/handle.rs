//! The owned buffer handle.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

/// Receives the memory of a [`Buffer`] once it has been fully consumed.
///
/// Implementations must not panic; `recycle` runs on the buffer's drop path.
pub trait BufferRecycler: Send + Sync {
    /// Takes back the segment of a released buffer.
    fn recycle(&self, segment: Bytes);
}

/// A block of bytes delivered by the transport.
///
/// The deserializer takes ownership of a `Buffer` in
/// [`set_next_buffer`](crate::RecordDeserializer::set_next_buffer) and drops it
/// as soon as every byte has been consumed. Dropping is the release: the
/// attached [`BufferRecycler`] sees each buffer exactly once.
///
/// # Example
///
/// ```
/// use spillframe::Buffer;
///
/// let buffer = Buffer::new(&b"\x00\x00\x00\x02hi"[..]);
/// assert_eq!(buffer.len(), 6);
/// buffer.recycle();
/// ```
pub struct Buffer {
    segment: Bytes,
    recycler: Option<Arc<dyn BufferRecycler>>,
}

impl Buffer {
    /// Creates an unpooled buffer. Releasing it simply frees the memory.
    pub fn new(segment: impl Into<Bytes>) -> Self {
        Self {
            segment: segment.into(),
            recycler: None,
        }
    }

    /// Creates a buffer whose segment is handed to `recycler` on release.
    pub fn with_recycler(segment: impl Into<Bytes>, recycler: Arc<dyn BufferRecycler>) -> Self {
        Self {
            segment: segment.into(),
            recycler: Some(recycler),
        }
    }

    /// Returns the number of readable bytes.
    pub fn len(&self) -> usize {
        self.segment.len()
    }

    /// Returns true if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.segment.is_empty()
    }

    /// Returns the readable bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.segment
    }

    /// Releases the buffer back to its owner.
    pub fn recycle(self) {
        drop(self);
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(recycler) = self.recycler.take() {
            recycler.recycle(std::mem::take(&mut self.segment));
        }
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Bytes> for Buffer {
    fn from(segment: Bytes) -> Self {
        Self::new(segment)
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(segment: Vec<u8>) -> Self {
        Self::new(segment)
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.segment.len())
            .field("pooled", &self.recycler.is_some())
            .finish()
    }
}
