//! Spill files for records too large to assemble in memory.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use bytes::Bytes;
use tempfile::NamedTempFile;

use crate::error::DeserializeError;
use crate::record::RecordInput;

const SPILL_PREFIX: &str = "spillframe-";
const SPILL_SUFFIX: &str = ".inputchannel";

/// Candidate directories for spill files, used round-robin.
///
/// A directory that refuses a file is skipped; creation fails only when every
/// candidate has been tried.
#[derive(Debug)]
pub(crate) struct SpillDirectories {
    dirs: Vec<PathBuf>,
    next: usize,
}

impl SpillDirectories {
    pub(crate) fn new(dirs: &[PathBuf]) -> Self {
        Self {
            dirs: dirs.to_vec(),
            next: 0,
        }
    }

    /// Creates a uniquely named spill file and wraps it in a buffered writer.
    pub(crate) fn create(&mut self, file_buffer_size: usize) -> Result<SpillWriter, DeserializeError> {
        let mut last_error = None;

        for attempt in 0..self.dirs.len() {
            let index = (self.next + attempt) % self.dirs.len();
            let dir = &self.dirs[index];

            match tempfile::Builder::new()
                .prefix(SPILL_PREFIX)
                .suffix(SPILL_SUFFIX)
                .tempfile_in(dir)
            {
                Ok(file) => {
                    self.next = (index + 1) % self.dirs.len();
                    tracing::debug!(
                        target: "spillframe::spill",
                        path = %file.path().display(),
                        "created spill file"
                    );
                    return Ok(SpillWriter {
                        writer: BufWriter::with_capacity(file_buffer_size, file),
                        written: 0,
                        file_buffer_size,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        target: "spillframe::spill",
                        dir = %dir.display(),
                        error = %e,
                        "cannot create spill file, trying next directory"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(DeserializeError::SpillFile {
            directories: self.dirs.len(),
            source: last_error.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "no spill directories configured")
            }),
        })
    }
}

/// Write side of a spill file while a record is being gathered.
#[derive(Debug)]
pub(crate) struct SpillWriter {
    writer: BufWriter<NamedTempFile>,
    written: usize,
    file_buffer_size: usize,
}

impl SpillWriter {
    pub(crate) fn write_all(&mut self, data: &[u8]) -> Result<(), DeserializeError> {
        self.writer.write_all(data)?;
        self.written += data.len();
        Ok(())
    }

    /// Number of payload bytes written so far.
    pub(crate) fn written(&self) -> usize {
        self.written
    }

    /// Flushes the file and rewinds it for a single read pass.
    pub(crate) fn finish(self) -> Result<SpillReader, DeserializeError> {
        let mut file = self.writer.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.as_file_mut().seek(SeekFrom::Start(0))?;
        Ok(SpillReader {
            reader: BufReader::with_capacity(self.file_buffer_size, file),
            len: self.written,
            file_buffer_size: self.file_buffer_size,
        })
    }

    /// Snapshot of the bytes written so far: the part already on disk, read
    /// lazily through a second handle, and the part still in the write buffer.
    ///
    /// The write handle and its position are not touched.
    pub(crate) fn snapshot(&self) -> Result<(SpilledSegments, Bytes), DeserializeError> {
        let buffered = self.writer.buffer();
        let on_disk = self.written.saturating_sub(buffered.len());
        let file = self.writer.get_ref().reopen()?;
        Ok((
            SpilledSegments::new(file, on_disk, self.file_buffer_size),
            Bytes::copy_from_slice(buffered),
        ))
    }

    /// Deletes the file without flushing buffered bytes.
    pub(crate) fn discard(self) {
        let (file, _) = self.writer.into_parts();
        remove(file);
    }
}

/// Read side of a completely gathered spill file.
#[derive(Debug)]
pub(crate) struct SpillReader {
    reader: BufReader<NamedTempFile>,
    len: usize,
    file_buffer_size: usize,
}

impl SpillReader {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns a view over the spilled payload.
    pub(crate) fn input(&mut self) -> RecordInput<'_> {
        RecordInput::from_reader(&mut self.reader, self.len)
    }

    /// Lazily reads the whole record through a second handle.
    pub(crate) fn snapshot(&self) -> Result<SpilledSegments, DeserializeError> {
        let file = self.reader.get_ref().reopen()?;
        Ok(SpilledSegments::new(file, self.len, self.file_buffer_size))
    }

    pub(crate) fn discard(self) {
        remove(self.reader.into_inner());
    }
}

/// Reads the first `remaining` bytes of a spill file in chunks of at most
/// `chunk_size` bytes, one chunk per call.
#[derive(Debug)]
pub(crate) struct SpilledSegments {
    file: File,
    remaining: usize,
    chunk_size: usize,
}

impl SpilledSegments {
    fn new(file: File, remaining: usize, chunk_size: usize) -> Self {
        Self {
            file,
            remaining,
            chunk_size: chunk_size.max(1),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    pub(crate) fn next_chunk(&mut self) -> Option<io::Result<Bytes>> {
        if self.remaining == 0 {
            return None;
        }
        let mut chunk = vec![0u8; self.chunk_size.min(self.remaining)];
        match self.file.read_exact(&mut chunk) {
            Ok(()) => {
                self.remaining -= chunk.len();
                Some(Ok(Bytes::from(chunk)))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}

fn remove(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    match file.close() {
        Ok(()) => tracing::debug!(
            target: "spillframe::spill",
            path = %path.display(),
            "removed spill file"
        ),
        Err(e) => tracing::warn!(
            target: "spillframe::spill",
            path = %path.display(),
            error = %e,
            "failed to remove spill file"
        ),
    }
}
