//! The `Record` trait and implementations for raw payload types.

use std::io::{self, Read};

use bytes::{Bytes, BytesMut};

use super::RecordInput;

/// A value that can be carried as the payload of a framed record.
///
/// The framing layer owns the length prefix; implementations only see the
/// payload. `read` receives a [`RecordInput`] that ends exactly at the payload
/// boundary, so reading past the record is impossible. Bytes a codec leaves
/// unread are skipped by the deserializer.
///
/// # Example
///
/// ```
/// use std::io::{self, Read};
/// use bytes::{BufMut, BytesMut};
/// use spillframe::{Record, RecordInput};
///
/// #[derive(Default)]
/// struct Counter(u64);
///
/// impl Record for Counter {
///     fn read(&mut self, input: &mut RecordInput<'_>) -> io::Result<()> {
///         let mut raw = [0u8; 8];
///         input.read_exact(&mut raw)?;
///         self.0 = u64::from_be_bytes(raw);
///         Ok(())
///     }
///
///     fn write(&self, out: &mut BytesMut) {
///         out.put_u64(self.0);
///     }
/// }
/// ```
pub trait Record {
    /// Replaces `self` with the record decoded from `input`.
    fn read(&mut self, input: &mut RecordInput<'_>) -> io::Result<()>;

    /// Appends the payload encoding of `self` to `out`.
    fn write(&self, out: &mut BytesMut);
}

impl Record for Vec<u8> {
    fn read(&mut self, input: &mut RecordInput<'_>) -> io::Result<()> {
        self.clear();
        self.reserve(input.remaining());
        input.read_to_end(self)?;
        Ok(())
    }

    fn write(&self, out: &mut BytesMut) {
        out.extend_from_slice(self);
    }
}

impl Record for Bytes {
    fn read(&mut self, input: &mut RecordInput<'_>) -> io::Result<()> {
        let mut payload = Vec::with_capacity(input.remaining());
        input.read_to_end(&mut payload)?;
        *self = Bytes::from(payload);
        Ok(())
    }

    fn write(&self, out: &mut BytesMut) {
        out.extend_from_slice(self);
    }
}

impl Record for String {
    fn read(&mut self, input: &mut RecordInput<'_>) -> io::Result<()> {
        self.clear();
        input.read_to_string(self)?;
        Ok(())
    }

    fn write(&self, out: &mut BytesMut) {
        out.extend_from_slice(self.as_bytes());
    }
}
