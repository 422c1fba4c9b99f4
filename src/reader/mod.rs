//! Feed adapter for blocking byte sources.
//!
//! - [`RecordReader`] - iterator of records read from a [`std::io::Read`]

mod iter;

pub use iter::RecordReader;
