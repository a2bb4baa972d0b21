/// Disk image stand-in for a block device
///
/// A regular file sized like a small drive and pre-filled with a recognizable
/// pattern, so tests can tell overwritten regions from untouched ones.
use std::io::{Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

/// Byte every mock drive starts out filled with
pub const INITIAL_FILL: u8 = 0xAB;

pub struct MockDrive {
    size_bytes: u64,
    temp_file: NamedTempFile,
}

impl MockDrive {
    /// Create an image of `size_bytes` filled with [`INITIAL_FILL`]
    pub fn with_size(size_bytes: u64) -> std::io::Result<Self> {
        let mut temp_file = NamedTempFile::new()?;

        let mut written = 0u64;
        let chunk_size = 1024 * 1024; // 1MB chunks

        while written < size_bytes {
            let write_size = (size_bytes - written).min(chunk_size);
            temp_file.write_all(&vec![INITIAL_FILL; write_size as usize])?;
            written += write_size;
        }

        temp_file.flush()?;
        temp_file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            size_bytes,
            temp_file,
        })
    }

    pub fn create_mb(size_mb: u64) -> std::io::Result<Self> {
        Self::with_size(size_mb * 1024 * 1024)
    }

    pub fn path(&self) -> &std::path::Path {
        self.temp_file.path()
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}
