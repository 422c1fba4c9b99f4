//! Record payload codec capability.
//!
//! - [`Record`] - decodes a payload from, and encodes it into, raw bytes
//! - [`RecordInput`] - bounded sequential view over exactly one payload

mod codec;
mod input;

pub use codec::Record;
pub use input::RecordInput;
