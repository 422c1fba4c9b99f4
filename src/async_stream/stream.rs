//! Async stream adapter for record deserialization.
//!
//! # Example
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use spillframe::{deserialize_async, DeserializerConfig};
//! use futures_io::AsyncRead;
//!
//! async fn demo<R: AsyncRead + Unpin>(reader: R) -> Result<(), spillframe::DeserializeError> {
//!     let mut stream = deserialize_async::<_, String>(reader, DeserializerConfig::default());
//!
//!     while let Some(record) = stream.next().await {
//!         println!("record: {}", record?);
//!     }
//!     Ok(())
//! }
//! ```

use std::io;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::BytesMut;
use futures_core::Stream;
use futures_io::AsyncRead;
use pin_project_lite::pin_project;

use crate::buffer::{BufferPool, DEFAULT_SEGMENT_SIZE};
use crate::config::DeserializerConfig;
use crate::deserializer::RecordDeserializer;
use crate::error::DeserializeError;
use crate::record::Record;

pin_project! {
    /// A stream that yields records decoded from an async reader.
    ///
    /// Reads go straight into pooled segments, which are handed to a
    /// [`RecordDeserializer`] one at a time. Error handling matches
    /// [`RecordReader`](crate::RecordReader): payload errors skip the record,
    /// everything else ends the stream.
    pub struct RecordStream<R, T> {
        #[pin]
        reader: R,
        pool: Arc<BufferPool>,
        deserializer: RecordDeserializer,
        // Segment kept across a pending read
        segment: Option<BytesMut>,
        finished: bool,
        _record: PhantomData<fn() -> T>,
    }
}

impl<R, T> RecordStream<R, T> {
    /// Creates a stream using its own [`BufferPool`] of
    /// [`DEFAULT_SEGMENT_SIZE`] segments.
    pub fn new(reader: R, config: DeserializerConfig) -> Self {
        Self::with_pool(reader, config, BufferPool::new(DEFAULT_SEGMENT_SIZE))
    }

    /// Creates a stream that borrows its buffers from `pool`.
    pub fn with_pool(reader: R, config: DeserializerConfig, pool: Arc<BufferPool>) -> Self {
        Self {
            reader,
            pool,
            deserializer: RecordDeserializer::new(config),
            segment: None,
            finished: false,
            _record: PhantomData,
        }
    }

    /// Returns the underlying deserializer.
    pub fn deserializer(&self) -> &RecordDeserializer {
        &self.deserializer
    }
}

impl<R, T> std::fmt::Debug for RecordStream<R, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("deserializer", &self.deserializer)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

fn fail<T>(
    deserializer: &mut RecordDeserializer,
    finished: &mut bool,
    err: DeserializeError,
) -> Poll<Option<Result<T, DeserializeError>>> {
    tracing::debug!(
        target: "spillframe::stream",
        error = %err,
        pending = deserializer.pending_len(),
        "record stream failed"
    );
    *finished = true;
    deserializer.clear();
    Poll::Ready(Some(Err(err)))
}

impl<R: AsyncRead, T: Record + Default> Stream for RecordStream<R, T> {
    type Item = Result<T, DeserializeError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.finished {
            return Poll::Ready(None);
        }

        loop {
            if this.deserializer.needs_buffer() {
                let mut segment = match this.segment.take() {
                    Some(segment) => segment,
                    None => this.pool.take_segment(),
                };

                match this.reader.as_mut().poll_read(cx, &mut segment[..]) {
                    Poll::Pending => {
                        *this.segment = Some(segment);
                        return Poll::Pending;
                    }
                    Poll::Ready(Err(e)) if e.kind() == io::ErrorKind::Interrupted => {
                        *this.segment = Some(segment);
                        continue;
                    }
                    Poll::Ready(Err(e)) => {
                        this.pool.put_back(segment);
                        return fail(this.deserializer, this.finished, e.into());
                    }
                    Poll::Ready(Ok(0)) => {
                        this.pool.put_back(segment);
                        let pending = this.deserializer.pending_len();
                        if pending > 0 {
                            return fail(
                                this.deserializer,
                                this.finished,
                                DeserializeError::UnexpectedEof { pending },
                            );
                        }
                        *this.finished = true;
                        return Poll::Ready(None);
                    }
                    Poll::Ready(Ok(n)) => {
                        segment.truncate(n);
                        let buffer = this.pool.lend(segment);
                        if let Err(e) = this.deserializer.set_next_buffer(buffer) {
                            return fail(this.deserializer, this.finished, e);
                        }
                    }
                }
            }

            let mut record = T::default();
            match this.deserializer.get_next_record(&mut record) {
                Ok(result) if result.is_full_record() => return Poll::Ready(Some(Ok(record))),
                Ok(_) => {}
                Err(e @ DeserializeError::Payload(_)) => return Poll::Ready(Some(Err(e))),
                Err(e) => return fail(this.deserializer, this.finished, e),
            }
        }
    }
}

/// Creates a record stream from an async reader.
///
/// Uses `futures_io::AsyncRead` for runtime-agnostic async I/O.
///
/// # Runtime Compatibility
///
/// For tokio users, `tokio_util::compat` converts a `tokio::io::AsyncRead`:
///
/// ```ignore
/// use tokio_util::compat::TokioAsyncReadCompatExt;
/// use spillframe::{deserialize_async, DeserializerConfig};
///
/// let file = tokio::fs::File::open("records.bin").await?;
/// let stream = deserialize_async::<_, Vec<u8>>(file.compat(), DeserializerConfig::default());
/// ```
pub fn deserialize_async<R: AsyncRead, T: Record + Default>(
    reader: R,
    config: DeserializerConfig,
) -> RecordStream<R, T> {
    RecordStream::new(reader, config)
}
