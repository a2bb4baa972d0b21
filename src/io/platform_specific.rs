// Platform-specific raw device access: open, geometry query and durable sync

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Platform-specific I/O handler
pub trait PlatformIO: Send + Sync {
    /// Open a raw device (or disk image) for writing
    fn open_device(&self, path: &Path) -> io::Result<File>;

    /// Byte size of an open block device
    fn device_size(&self, file: &File) -> io::Result<u64>;

    /// Force written data to stable storage
    fn sync_data(&self, file: &File) -> io::Result<()> {
        file.sync_all()
    }

    /// Get platform name
    fn platform_name(&self) -> &str;
}

/// Size of an open target: the file length for regular files, otherwise the
/// platform geometry query
pub fn target_size(platform: &dyn PlatformIO, file: &File) -> io::Result<u64> {
    let metadata = file.metadata()?;
    if metadata.is_file() {
        return Ok(metadata.len());
    }
    platform.device_size(file)
}

// ============= LINUX IMPLEMENTATION =============

#[cfg(target_os = "linux")]
mod linux_ioctl {
    // BLKGETSIZE64 = _IOR(0x12, 114, size_t)
    nix::ioctl_read!(blkgetsize64, 0x12, 114, u64);
}

#[cfg(target_os = "linux")]
pub struct LinuxIO;

#[cfg(target_os = "linux")]
impl PlatformIO for LinuxIO {
    fn open_device(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new().write(true).open(path)
    }

    fn device_size(&self, file: &File) -> io::Result<u64> {
        use std::os::unix::io::AsRawFd;

        let mut size = 0u64;
        unsafe { linux_ioctl::blkgetsize64(file.as_raw_fd(), &mut size) }
            .map_err(io::Error::from)?;
        Ok(size)
    }

    fn platform_name(&self) -> &str {
        "Linux (BLKGETSIZE64)"
    }
}

// ============= MACOS IMPLEMENTATION =============

#[cfg(target_os = "macos")]
mod macos_ioctl {
    // DKIOCGETBLOCKSIZE = _IOR('d', 24, uint32_t)
    nix::ioctl_read!(dkioc_get_block_size, b'd', 24, u32);
    // DKIOCGETBLOCKCOUNT = _IOR('d', 25, uint64_t)
    nix::ioctl_read!(dkioc_get_block_count, b'd', 25, u64);
}

#[cfg(target_os = "macos")]
pub struct MacOSIO;

#[cfg(target_os = "macos")]
impl PlatformIO for MacOSIO {
    fn open_device(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new().write(true).open(path)
    }

    fn device_size(&self, file: &File) -> io::Result<u64> {
        use std::os::unix::io::AsRawFd;

        let fd = file.as_raw_fd();
        let mut block_size = 0u32;
        let mut block_count = 0u64;
        unsafe {
            macos_ioctl::dkioc_get_block_size(fd, &mut block_size).map_err(io::Error::from)?;
            macos_ioctl::dkioc_get_block_count(fd, &mut block_count).map_err(io::Error::from)?;
        }
        Ok(block_count * block_size as u64)
    }

    fn sync_data(&self, file: &File) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        // F_FULLFSYNC asks the drive itself to flush its write cache
        let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_FULLFSYNC) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn platform_name(&self) -> &str {
        "macOS (DKIOCGETBLOCKCOUNT, F_FULLFSYNC)"
    }
}

// ============= WINDOWS IMPLEMENTATION =============

#[cfg(target_os = "windows")]
pub struct WindowsIO;

#[cfg(target_os = "windows")]
impl PlatformIO for WindowsIO {
    fn open_device(&self, path: &Path) -> io::Result<File> {
        use std::os::windows::fs::OpenOptionsExt;

        const FILE_SHARE_READ: u32 = 0x0000_0001;
        const FILE_SHARE_WRITE: u32 = 0x0000_0002;

        OpenOptions::new()
            .write(true)
            .share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE)
            .open(path)
    }

    fn device_size(&self, file: &File) -> io::Result<u64> {
        use std::os::windows::io::AsRawHandle;
        use winapi::um::ioapiset::DeviceIoControl;
        use winapi::um::winioctl::{GET_LENGTH_INFORMATION, IOCTL_DISK_GET_LENGTH_INFO};

        let mut info: GET_LENGTH_INFORMATION = unsafe { std::mem::zeroed() };
        let mut returned = 0u32;
        let ok = unsafe {
            DeviceIoControl(
                file.as_raw_handle() as _,
                IOCTL_DISK_GET_LENGTH_INFO,
                std::ptr::null_mut(),
                0,
                &mut info as *mut GET_LENGTH_INFORMATION as *mut _,
                std::mem::size_of::<GET_LENGTH_INFORMATION>() as u32,
                &mut returned,
                std::ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(unsafe { *info.Length.QuadPart() } as u64)
    }

    fn platform_name(&self) -> &str {
        "Windows (IOCTL_DISK_GET_LENGTH_INFO)"
    }
}

// ============= GENERIC FALLBACK =============

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub struct GenericIO;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
impl PlatformIO for GenericIO {
    fn open_device(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new().write(true).open(path)
    }

    fn device_size(&self, file: &File) -> io::Result<u64> {
        use std::io::{Seek, SeekFrom};

        // Seeking to the end of a raw device reports its extent on the BSDs
        let mut handle = file;
        let size = handle.seek(SeekFrom::End(0))?;
        handle.seek(SeekFrom::Start(0))?;
        Ok(size)
    }

    fn platform_name(&self) -> &str {
        "generic (seek to end)"
    }
}

// ============= PLATFORM FACTORY =============

/// Get the appropriate platform I/O implementation
pub fn get_platform_io() -> Box<dyn PlatformIO> {
    #[cfg(target_os = "linux")]
    {
        Box::new(LinuxIO)
    }

    #[cfg(target_os = "macos")]
    {
        Box::new(MacOSIO)
    }

    #[cfg(target_os = "windows")]
    {
        Box::new(WindowsIO)
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        Box::new(GenericIO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_platform_io_creation() {
        let io = get_platform_io();
        assert!(!io.platform_name().is_empty());
    }

    #[test]
    fn test_image_file_size_uses_length() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&[0xABu8; 12345]).unwrap();
        temp.flush().unwrap();

        let io = get_platform_io();
        let file = io.open_device(temp.path()).unwrap();
        assert_eq!(target_size(io.as_ref(), &file).unwrap(), 12345);
        io.sync_data(&file).unwrap();
    }

    #[test]
    fn test_open_missing_device_fails() {
        let io = get_platform_io();
        let err = io
            .open_device(Path::new("/nonexistent/wipe-engine/device"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_geometry_query_rejects_non_device() {
        // BLKGETSIZE64 on a regular file fails with ENOTTY
        let temp = NamedTempFile::new().unwrap();
        assert!(LinuxIO.device_size(temp.as_file()).is_err());
    }
}
