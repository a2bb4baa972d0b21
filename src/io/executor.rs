// Overwrite Pass Executor
//
// One pass = rewind, write the pattern across the full extent, then force it
// to stable storage. Only full-extent coverage counts as success.

use super::buffer_pool::BufferHandle;
use super::metrics::PassMetrics;
use super::TargetHandle;
use crate::algorithms::Pass;
use crate::ui::progress::ProgressSink;
use crate::{EngineResult, ProgressUpdate, WipeError, WipePhase};
use std::io;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub bytes_written: u64,
    pub elapsed: Duration,
    pub write_calls: u64,
    pub short_writes: u64,
}

/// Write `buffer` repeatedly over `len` bytes of `handle`, then sync.
///
/// Short writes are retried from the new offset. On error the target is left
/// partially overwritten and the caller must not delete it.
pub fn run_pass<H: TargetHandle + ?Sized>(
    handle: &mut H,
    len: u64,
    buffer: BufferHandle<'_>,
    pass: &Pass,
    target: &Path,
    progress: &dyn ProgressSink,
    sample_interval: Duration,
) -> EngineResult<PassReport> {
    let mut metrics = PassMetrics::new(sample_interval);

    if len == 0 {
        return Ok(report(&metrics));
    }

    let write_err = |source: io::Error| WipeError::Write {
        path: target.to_path_buf(),
        pass: pass.index,
        source,
    };

    let data = buffer.as_slice();
    if data.is_empty() {
        return Err(write_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "empty pattern buffer",
        )));
    }

    // Passes share one handle, so every pass starts from offset 0
    handle.rewind().map_err(write_err)?;

    let phase = WipePhase::Overwriting {
        pass: pass.index,
        total: pass.total,
        pattern: pass.pattern,
    };

    while metrics.bytes_written() < len {
        let chunk = (len - metrics.bytes_written()).min(data.len() as u64) as usize;
        let mut pending = &data[..chunk];

        while !pending.is_empty() {
            match handle.write_some(pending) {
                Ok(0) => {
                    return Err(write_err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!(
                            "device accepted no data at offset {}",
                            metrics.bytes_written()
                        ),
                    )))
                }
                Ok(n) => {
                    let n = n.min(pending.len());
                    metrics.record_write(pending.len(), n);
                    pending = &pending[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(write_err(e)),
            }
        }

        if metrics.should_sample() {
            progress.report(&ProgressUpdate {
                target: target.to_path_buf(),
                phase: phase.clone(),
                percent_complete: metrics.percent_of(len),
                throughput_bps: metrics.throughput(),
            });
        }
    }

    handle.sync().map_err(|source| WipeError::Flush {
        path: target.to_path_buf(),
        pass: pass.index,
        source,
    })?;

    debug_assert_eq!(metrics.bytes_written(), len);

    progress.report(&ProgressUpdate {
        target: target.to_path_buf(),
        phase,
        percent_complete: 100.0,
        throughput_bps: metrics.throughput(),
    });

    tracing::debug!(
        path = %target.display(),
        pass = pass.index,
        total = pass.total,
        pattern = %pass.pattern,
        bytes = metrics.bytes_written(),
        short_writes = metrics.short_writes(),
        "pass complete"
    );

    Ok(report(&metrics))
}

fn report(metrics: &PassMetrics) -> PassReport {
    PassReport {
        bytes_written: metrics.bytes_written(),
        elapsed: metrics.elapsed(),
        write_calls: metrics.write_calls(),
        short_writes: metrics.short_writes(),
    }
}
