pub mod buffer_pool;
pub mod device;
pub mod executor;
pub mod metrics;
pub mod platform_specific;
pub mod secure_delete;

#[cfg(test)]
mod tests;

// Re-exports
pub use buffer_pool::{AlignedBuffer, BufferHandle, PatternBufferPool, RandomBuffer};
pub use device::RawTarget;
pub use executor::{run_pass, PassReport};
pub use metrics::PassMetrics;
pub use platform_specific::{get_platform_io, PlatformIO};
pub use secure_delete::secure_delete;

use std::io;

/// Write side of a wipe target, positioned by the executor
pub trait TargetHandle {
    /// Reposition to offset 0
    fn rewind(&mut self) -> io::Result<()>;

    /// Write some prefix of `data`, returning how many bytes were accepted
    fn write_some(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Force written data to physical media
    fn sync(&mut self) -> io::Result<()>;
}

/// A raw device whose extent comes from a geometry query
pub trait BlockDeviceHandle: TargetHandle {
    fn query_size(&self) -> io::Result<u64>;
}
