// Raw write handle over a regular file or a block device

use super::platform_specific::{get_platform_io, target_size, PlatformIO};
use super::{BlockDeviceHandle, TargetHandle};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

pub struct RawTarget {
    file: File,
    platform: Box<dyn PlatformIO>,
}

impl RawTarget {
    /// Open an existing regular file for in-place overwrite (never truncates)
    pub fn open_file(path: &Path) -> io::Result<Self> {
        if !fs::metadata(path)?.is_file() {
            return Err(invalid_target("not a regular file"));
        }

        let mut options = OpenOptions::new();
        options.write(true);
        // a path swapped for a FIFO after the check fails with ENXIO instead of blocking
        #[cfg(unix)]
        options.custom_flags(libc::O_NONBLOCK);

        let file = options.open(path)?;
        if !file.metadata()?.is_file() {
            return Err(invalid_target("not a regular file"));
        }

        Ok(Self {
            file,
            platform: get_platform_io(),
        })
    }

    /// Open a raw block device (or disk image) through the platform layer
    pub fn open_device(path: &Path) -> io::Result<Self> {
        check_device_kind(path)?;
        let platform = get_platform_io();
        let file = platform.open_device(path)?;
        Ok(Self { file, platform })
    }

    /// Current length of the underlying file
    pub fn file_len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn platform_name(&self) -> &str {
        self.platform.platform_name()
    }

    /// Release the handle
    pub fn close(self) {
        drop(self.file);
    }
}

fn invalid_target(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

// Only disk images and device nodes are opened; FIFOs and sockets would block
#[cfg(unix)]
fn check_device_kind(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::FileTypeExt;

    let file_type = fs::metadata(path)?.file_type();
    if file_type.is_file() || file_type.is_block_device() || file_type.is_char_device() {
        Ok(())
    } else {
        Err(invalid_target("not a block device or disk image"))
    }
}

// Windows device paths (\\.\PhysicalDriveN) have no useful metadata
#[cfg(not(unix))]
fn check_device_kind(_path: &Path) -> io::Result<()> {
    Ok(())
}

impl TargetHandle for RawTarget {
    fn rewind(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0)).map(|_| ())
    }

    fn write_some(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.platform.sync_data(&self.file)
    }
}

impl BlockDeviceHandle for RawTarget {
    fn query_size(&self) -> io::Result<u64> {
        target_size(self.platform.as_ref(), &self.file)
    }
}
