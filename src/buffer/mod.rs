//! Network buffers lent to the deserializer.
//!
//! - [`Buffer`] - owned, fixed-capacity block of bytes with a recycle hook
//! - [`BufferRecycler`] - receives a buffer's memory when it is released
//! - [`BufferPool`] - reusable segments for feed adapters and transports
//!
//! Release is tied to ownership: a `Buffer` is recycled exactly once, when it
//! is dropped or passed to [`Buffer::recycle`].

mod handle;
mod pool;

pub use handle::{Buffer, BufferRecycler};
pub use pool::{BufferPool, DEFAULT_SEGMENT_SIZE};
