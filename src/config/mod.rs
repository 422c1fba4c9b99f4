//! Configuration for record deserialization.
//!
//! This module provides [`DeserializerConfig`], which controls when a spanning
//! record is spilled to disk and how spill files are written:
//!
//! - spill threshold - framed record size above which assembly moves to a file
//! - file buffer size - size of the buffered writer/reader over a spill file
//! - temp directories - candidate directories for spill files
//! - maximum record length - upper bound accepted from a length prefix
//!
//! # Example
//!
//! ```
//! use spillframe::DeserializerConfig;
//!
//! let config = DeserializerConfig::default()
//!     .with_spill_threshold(1024 * 1024)
//!     .with_tmp_dir("/var/tmp");
//!
//! assert_eq!(config.spill_threshold(), 1024 * 1024);
//! # Ok::<(), spillframe::DeserializeError>(())
//! ```

use std::path::PathBuf;

use crate::error::DeserializeError;

/// Default spill threshold (5 MiB).
pub const DEFAULT_SPILL_THRESHOLD: usize = 5 * 1024 * 1024;

/// Default spill file buffer size (2 MiB).
pub const DEFAULT_FILE_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// Smallest accepted spill threshold (100 KiB). Lower values are clamped.
pub const MIN_SPILL_THRESHOLD: usize = 100 * 1024;

/// Smallest accepted spill file buffer size (50 KiB). Lower values are clamped.
pub const MIN_FILE_BUFFER_SIZE: usize = 50 * 1024;

/// Default maximum record length, the largest value a 4-byte prefix can carry.
pub const DEFAULT_MAX_RECORD_LENGTH: usize = i32::MAX as usize;

/// Configuration for a [`RecordDeserializer`](crate::RecordDeserializer).
///
/// A record whose framed size (length prefix plus payload) is at most
/// `spill_threshold` is assembled in memory when it spans buffers; a larger
/// record is written to a spill file in one of `tmp_dirs`.
///
/// # Floors
///
/// `spill_threshold` and `file_buffer_size` are clamped to
/// [`MIN_SPILL_THRESHOLD`] and [`MIN_FILE_BUFFER_SIZE`] respectively.
///
/// # Example
///
/// ```
/// use spillframe::{DeserializerConfig, MIN_SPILL_THRESHOLD};
///
/// let config = DeserializerConfig::default().with_spill_threshold(10);
/// assert_eq!(config.spill_threshold(), MIN_SPILL_THRESHOLD);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeserializerConfig {
    spill_threshold: usize,
    file_buffer_size: usize,
    tmp_dirs: Vec<PathBuf>,
    max_record_length: usize,
}

impl DeserializerConfig {
    /// Creates a configuration that spills into the given directories.
    ///
    /// Returns an error if `tmp_dirs` is empty.
    pub fn new<I, P>(tmp_dirs: I) -> Result<Self, DeserializeError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let config = Self::default().with_tmp_dirs(tmp_dirs);
        config.validate()?;
        Ok(config)
    }

    /// Sets the spill threshold in bytes, clamped to [`MIN_SPILL_THRESHOLD`].
    pub fn with_spill_threshold(mut self, bytes: usize) -> Self {
        self.spill_threshold = bytes.max(MIN_SPILL_THRESHOLD);
        self
    }

    /// Sets the spill file buffer size in bytes, clamped to [`MIN_FILE_BUFFER_SIZE`].
    pub fn with_file_buffer_size(mut self, bytes: usize) -> Self {
        self.file_buffer_size = bytes.max(MIN_FILE_BUFFER_SIZE);
        self
    }

    /// Replaces the candidate spill directories.
    ///
    /// Note: This does not validate the configuration. Use
    /// [`DeserializerConfig::validate`] to check that at least one directory is set.
    pub fn with_tmp_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.tmp_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the candidate spill directories with a single directory.
    pub fn with_tmp_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.with_tmp_dirs([dir.into()])
    }

    /// Sets the largest record length accepted from a length prefix.
    ///
    /// Values above [`DEFAULT_MAX_RECORD_LENGTH`] are clamped to it.
    pub fn with_max_record_length(mut self, bytes: usize) -> Self {
        self.max_record_length = bytes.min(DEFAULT_MAX_RECORD_LENGTH);
        self
    }

    /// Returns the spill threshold in bytes.
    pub fn spill_threshold(&self) -> usize {
        self.spill_threshold
    }

    /// Returns the spill file buffer size in bytes.
    pub fn file_buffer_size(&self) -> usize {
        self.file_buffer_size
    }

    /// Returns the candidate spill directories.
    pub fn tmp_dirs(&self) -> &[PathBuf] {
        &self.tmp_dirs
    }

    /// Returns the largest accepted record length.
    pub fn max_record_length(&self) -> usize {
        self.max_record_length
    }

    /// Validates the current configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use spillframe::DeserializerConfig;
    ///
    /// let config = DeserializerConfig::default().with_tmp_dirs(Vec::<String>::new());
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.tmp_dirs.is_empty() {
            return Err(DeserializeError::InvalidConfig {
                message: "at least one spill directory is required",
            });
        }
        Ok(())
    }
}

impl Default for DeserializerConfig {
    fn default() -> Self {
        Self {
            spill_threshold: DEFAULT_SPILL_THRESHOLD,
            file_buffer_size: DEFAULT_FILE_BUFFER_SIZE,
            tmp_dirs: vec![std::env::temp_dir()],
            max_record_length: DEFAULT_MAX_RECORD_LENGTH,
        }
    }
}
