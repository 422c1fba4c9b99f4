//! Fixed-capacity segment pool for efficient buffer reuse.

use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::{Bytes, BytesMut};

use super::{Buffer, BufferRecycler};

/// Default segment size for pooled buffers (32 KiB).
pub const DEFAULT_SEGMENT_SIZE: usize = 32 * 1024;

/// Maximum number of free segments kept per pool.
pub(crate) const MAX_POOL_SIZE: usize = 4;

/// A pool of fixed-capacity segments.
///
/// Every [`Buffer`] lent by the pool returns its memory here when released.
/// Segments that are still shared (for example because a caller kept a
/// `Bytes` clone) cannot be reclaimed and are simply freed.
///
/// # Example
///
/// ```
/// use spillframe::BufferPool;
///
/// let pool = BufferPool::new(8);
/// let mut source: &[u8] = b"0123456789";
///
/// let buffer = pool.read_buffer(&mut source)?.expect("source has data");
/// assert_eq!(buffer.len(), 8);
/// assert_eq!(pool.outstanding(), 1);
///
/// buffer.recycle();
/// assert_eq!(pool.outstanding(), 0);
/// assert_eq!(pool.available(), 1);
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct BufferPool {
    segment_size: usize,
    free: Mutex<Vec<BytesMut>>,
    outstanding: AtomicUsize,
}

impl BufferPool {
    /// Creates a pool lending segments of `segment_size` bytes (at least 1).
    pub fn new(segment_size: usize) -> Arc<Self> {
        Arc::new(Self {
            segment_size: segment_size.max(1),
            free: Mutex::new(Vec::with_capacity(MAX_POOL_SIZE)),
            outstanding: AtomicUsize::new(0),
        })
    }

    /// Returns the capacity of every segment handed out by this pool.
    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    /// Returns the number of lent buffers that have not been released yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Returns the number of free segments ready for reuse.
    pub fn available(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Takes a segment of `segment_size` bytes, reusing a free one if possible.
    ///
    /// Only fresh segments are zero-filled. A reused segment keeps the bytes
    /// of its previous read; just the tail past that read is zeroed to bring
    /// it back to full length.
    pub fn take_segment(&self) -> BytesMut {
        let reused = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match reused {
            Some(mut segment) => {
                segment.resize(self.segment_size, 0);
                segment
            }
            None => BytesMut::zeroed(self.segment_size),
        }
    }

    /// Lends `segment` as a [`Buffer`] that returns to this pool on release.
    pub fn lend(self: &Arc<Self>, segment: BytesMut) -> Buffer {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        let recycler: Arc<dyn BufferRecycler> = self.clone();
        Buffer::with_recycler(segment.freeze(), recycler)
    }

    /// Fills one segment with a single read from `reader`.
    ///
    /// Returns `Ok(None)` at end of input. The buffer may be shorter than
    /// `segment_size` if the reader delivered fewer bytes.
    pub fn read_buffer<R: Read>(self: &Arc<Self>, reader: &mut R) -> io::Result<Option<Buffer>> {
        let mut segment = self.take_segment();
        let n = loop {
            match reader.read(&mut segment[..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.put_back(segment);
                    return Err(e);
                }
            }
        };

        if n == 0 {
            self.put_back(segment);
            return Ok(None);
        }

        segment.truncate(n);
        Ok(Some(self.lend(segment)))
    }

    /// Returns an unused segment to the free list.
    pub(crate) fn put_back(&self, segment: BytesMut) {
        if segment.capacity() < self.segment_size {
            return;
        }
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < MAX_POOL_SIZE {
            free.push(segment);
        }
    }
}

impl BufferRecycler for BufferPool {
    fn recycle(&self, segment: Bytes) {
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
        if let Ok(segment) = segment.try_into_mut() {
            self.put_back(segment);
        }
    }
}
