//! Synchronous adapter: records from any [`std::io::Read`] source.
//!
//! [`RecordReader`] reads the source one pooled buffer at a time, feeds the
//! buffers to a [`RecordDeserializer`] and yields every decoded record.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use spillframe::{DeserializerConfig, RecordReader, frame_record};
//!
//! let mut wire = BytesMut::new();
//! frame_record(&"alpha".to_string(), &mut wire)?;
//! frame_record(&"beta".to_string(), &mut wire)?;
//!
//! let records: Vec<String> = RecordReader::new(&wire[..], DeserializerConfig::default())
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(records, ["alpha", "beta"]);
//! # Ok::<(), spillframe::DeserializeError>(())
//! ```

use std::io::Read;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::buffer::{BufferPool, DEFAULT_SEGMENT_SIZE};
use crate::config::DeserializerConfig;
use crate::deserializer::RecordDeserializer;
use crate::error::DeserializeError;
use crate::record::Record;

/// Iterator yielding records decoded from a [`Read`] source.
///
/// Each item is a fresh `T::default()` filled by [`Record::read`].
///
/// # Errors
///
/// A [`DeserializeError::Payload`] error skips the bad record and iteration
/// continues. Any other error is yielded once and ends the iteration. A
/// source that ends inside a record yields [`DeserializeError::UnexpectedEof`].
#[derive(Debug)]
pub struct RecordReader<R, T> {
    reader: R,
    pool: Arc<BufferPool>,
    deserializer: RecordDeserializer,
    finished: bool,
    _record: PhantomData<fn() -> T>,
}

impl<R: Read, T> RecordReader<R, T> {
    /// Creates a reader using its own [`BufferPool`] of
    /// [`DEFAULT_SEGMENT_SIZE`] segments.
    pub fn new(reader: R, config: DeserializerConfig) -> Self {
        Self::with_pool(reader, config, BufferPool::new(DEFAULT_SEGMENT_SIZE))
    }

    /// Creates a reader that borrows its buffers from `pool`.
    ///
    /// # Example
    ///
    /// ```
    /// use spillframe::{BufferPool, DeserializerConfig, RecordReader};
    ///
    /// let pool = BufferPool::new(4096);
    /// let source: &[u8] = &[0, 0, 0, 2, b'h', b'i'];
    ///
    /// let reader = RecordReader::<_, Vec<u8>>::with_pool(source, DeserializerConfig::default(), pool.clone());
    /// let records: Vec<_> = reader.collect::<Result<_, _>>()?;
    ///
    /// assert_eq!(records, [b"hi".to_vec()]);
    /// assert_eq!(pool.outstanding(), 0);
    /// # Ok::<(), spillframe::DeserializeError>(())
    /// ```
    pub fn with_pool(reader: R, config: DeserializerConfig, pool: Arc<BufferPool>) -> Self {
        Self {
            reader,
            pool,
            deserializer: RecordDeserializer::new(config),
            finished: false,
            _record: PhantomData,
        }
    }
}

impl<R, T> RecordReader<R, T> {
    /// Returns the underlying deserializer.
    pub fn deserializer(&self) -> &RecordDeserializer {
        &self.deserializer
    }

    /// Drops any partial record and returns the source.
    pub fn into_inner(mut self) -> R {
        self.deserializer.clear();
        self.reader
    }

    fn fail(&mut self, err: DeserializeError) -> Option<Result<T, DeserializeError>> {
        tracing::debug!(
            target: "spillframe::reader",
            error = %err,
            pending = self.deserializer.pending_len(),
            "record stream failed"
        );
        self.finished = true;
        self.deserializer.clear();
        Some(Err(err))
    }
}

impl<R: Read, T: Record + Default> Iterator for RecordReader<R, T> {
    type Item = Result<T, DeserializeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            if self.deserializer.needs_buffer() {
                match self.pool.read_buffer(&mut self.reader) {
                    Ok(Some(buffer)) => {
                        if let Err(e) = self.deserializer.set_next_buffer(buffer) {
                            return self.fail(e);
                        }
                    }
                    Ok(None) => {
                        let pending = self.deserializer.pending_len();
                        if pending > 0 {
                            return self.fail(DeserializeError::UnexpectedEof { pending });
                        }
                        self.finished = true;
                        return None;
                    }
                    Err(e) => return self.fail(e.into()),
                }
            }

            let mut record = T::default();
            match self.deserializer.get_next_record(&mut record) {
                Ok(result) if result.is_full_record() => return Some(Ok(record)),
                Ok(_) => {}
                Err(e @ DeserializeError::Payload(_)) => return Some(Err(e)),
                Err(e) => return self.fail(e),
            }
        }
    }
}

impl<R: Read, T: Record + Default> std::iter::FusedIterator for RecordReader<R, T> {}
