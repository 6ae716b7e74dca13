//! Byte sources backing row materialization.
//!
//! Reads are offset based. A read that starts inside the source but runs
//! past its end returns the available prefix; a read that starts at or past
//! the end fails with `IoError::OutOfBounds`.

pub mod error;

use crate::io::error::{IoError, Result};
use bytes::Bytes;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Random-access byte storage addressed by file offset.
pub trait ByteSource {
    /// Read up to `len` bytes starting at `offset`.
    fn read(&self, offset: u64, len: usize) -> Result<Bytes>;

    /// Total size in bytes.
    fn size(&self) -> u64;
}

fn bounded_range(offset: u64, len: usize, size: u64) -> Result<(usize, usize)> {
    if offset >= size {
        return Err(IoError::OutOfBounds { offset, len, size });
    }
    let end = offset.saturating_add(len as u64).min(size);
    Ok((offset as usize, end as usize))
}

/// In-memory byte source.
#[derive(Debug, Clone, Default)]
pub struct SliceSource {
    data: Bytes,
}

impl SliceSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

impl ByteSource for SliceSource {
    fn read(&self, offset: u64, len: usize) -> Result<Bytes> {
        let (start, end) = bounded_range(offset, len, self.size())?;
        Ok(self.data.slice(start..end))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Read-only memory-mapped file.
pub struct MappedFile {
    path: PathBuf,
    // None when the file size is zero; memmap cannot map empty files.
    mmap: Option<Mmap>,
    file_size: u64,
}

impl MappedFile {
    /// Opens and maps a file, refusing files larger than `max_file_size`.
    pub fn open<P: AsRef<Path>>(path: P, max_file_size: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        debug!(
            path = %path.display(),
            size = file_size,
            max_file_size,
            "Mapping file for row materialization"
        );

        if file_size > max_file_size {
            warn!(
                path = %path.display(),
                size = file_size,
                limit = max_file_size,
                "File is too large"
            );
            return Err(IoError::FileTooLarge {
                limit: max_file_size,
                found: file_size,
            });
        }

        let mmap = if file_size == 0 {
            None
        } else {
            // Safety: read-only map of a regular file; callers must not truncate it while mapped.
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            file_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for MappedFile {
    fn read(&self, offset: u64, len: usize) -> Result<Bytes> {
        let (start, end) = bounded_range(offset, len, self.file_size)?;
        let map = match &self.mmap {
            Some(m) => m,
            None => return Ok(Bytes::new()),
        };
        trace!(path = %self.path.display(), offset, len = end - start, "Performed read");
        Ok(Bytes::copy_from_slice(&map[start..end]))
    }

    fn size(&self) -> u64 {
        self.file_size
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&self, offset: u64, len: usize) -> Result<Bytes> {
        (**self).read(offset, len)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }
}
