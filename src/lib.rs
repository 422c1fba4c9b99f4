//! spillframe
//!
//! Streaming record deserialization over fixed-capacity network buffers.
//!
//! `spillframe` turns a sequence of buffers into the length-prefixed records
//! they carry, no matter where the buffer boundaries fall. It is designed as a
//! small, composable primitive for the receiving end of:
//!
//! - shuffle and exchange channels in dataflow engines
//! - replication and log shipping streams
//! - any transport that frames records as `[u32 length][payload]`
//!
//! The crate intentionally:
//! - does NOT own the transport
//! - does NOT define payload encodings (see [`Record`])
//! - does NOT manage concurrency
//! - does NOT keep records that exceed the spill threshold in memory
//!
//! It only does one thing: **Buffers in → records out**
//!
//! # Buffers
//!
//! ```
//! use bytes::BytesMut;
//! use spillframe::{Buffer, RecordDeserializer, frame_record};
//!
//! let mut wire = BytesMut::new();
//! frame_record(&b"hello".to_vec(), &mut wire)?;
//!
//! let mut deserializer = RecordDeserializer::default();
//! deserializer.set_next_buffer(Buffer::new(wire.freeze()))?;
//!
//! let mut record = Vec::new();
//! let result = deserializer.get_next_record(&mut record)?;
//! assert!(result.is_full_record());
//! assert_eq!(record, b"hello");
//! # Ok::<(), spillframe::DeserializeError>(())
//! ```
//!
//! # Readers
//!
//! ```no_run
//! use std::fs::File;
//! use spillframe::{DeserializerConfig, DeserializeError, RecordReader};
//!
//! fn main() -> Result<(), DeserializeError> {
//!     let file = File::open("records.bin")?;
//!
//!     for record in RecordReader::<_, Vec<u8>>::new(file, DeserializerConfig::default()) {
//!         let record = record?;
//!         println!("record {} bytes", record.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Async (feature = "async-io")
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use spillframe::{deserialize_async, DeserializerConfig};
//! use futures_io::AsyncRead;
//!
//! async fn demo<R: AsyncRead + Unpin>(reader: R) -> Result<(), spillframe::DeserializeError> {
//!     let mut stream = deserialize_async::<_, Vec<u8>>(reader, DeserializerConfig::default());
//!
//!     while let Some(record) = stream.next().await {
//!         let record = record?;
//!         println!("record {}", record.len());
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod config;
mod deserializer;
mod error;
mod frame;
mod reader;
mod record;

#[cfg(feature = "async-io")]
mod async_stream;

//
// Public surface
//

pub use buffer::{Buffer, BufferPool, BufferRecycler, DEFAULT_SEGMENT_SIZE};
pub use config::{
    DEFAULT_FILE_BUFFER_SIZE, DEFAULT_MAX_RECORD_LENGTH, DEFAULT_SPILL_THRESHOLD,
    DeserializerConfig, MIN_FILE_BUFFER_SIZE, MIN_SPILL_THRESHOLD,
};
pub use deserializer::{DeserializationResult, RecordDeserializer, UnconsumedSegments};
pub use error::DeserializeError;
pub use frame::{LENGTH_BYTES, frame_record};
pub use reader::RecordReader;
pub use record::{Record, RecordInput};

#[cfg(feature = "async-io")]
pub use async_stream::{RecordStream, deserialize_async};
