//! Async streaming support for record deserialization.
//!
//! This module decodes records from a `futures-io::AsyncRead` source, which
//! keeps it runtime-agnostic: tokio (through `tokio_util::compat`), async-std
//! and smol readers all work.
//!
//! - [`deserialize_async`] - Creates an async stream of records from an async reader
//!
//! This module requires the `async-io` feature to be enabled.

mod stream;

pub use stream::{RecordStream, deserialize_async};
