// Per-pass progress accounting and throughput sampling

use std::time::{Duration, Instant};

/// Progress state of the pass currently running on one target.
///
/// Owned and mutated by the executor only; nothing else writes to it.
#[derive(Debug, Clone)]
pub struct PassMetrics {
    start_time: Instant,
    bytes_written: u64,
    write_calls: u64,
    short_writes: u64,
    last_sample: Instant,
    sample_interval: Duration,
}

impl PassMetrics {
    pub fn new(sample_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            bytes_written: 0,
            write_calls: 0,
            short_writes: 0,
            last_sample: now,
            sample_interval,
        }
    }

    /// Record one write call that accepted `written` of `requested` bytes
    pub fn record_write(&mut self, requested: usize, written: usize) {
        self.write_calls += 1;
        if written < requested {
            self.short_writes += 1;
        }
        self.bytes_written += written as u64;
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn write_calls(&self) -> u64 {
        self.write_calls
    }

    pub fn short_writes(&self) -> u64 {
        self.short_writes
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Bytes per second since the pass started
    pub fn throughput(&self) -> u64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.bytes_written as f64 / elapsed) as u64
    }

    pub fn percent_of(&self, total: u64) -> f64 {
        if total == 0 {
            return 100.0;
        }
        (self.bytes_written as f64 / total as f64) * 100.0
    }

    /// True at most once per sampling interval
    pub fn should_sample(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_sample) >= self.sample_interval {
            self.last_sample = now;
            true
        } else {
            false
        }
    }
}

/// Format throughput in human-readable form
pub fn throughput_human(bytes_per_sec: u64) -> String {
    let mb_per_sec = bytes_per_sec as f64 / (1024.0 * 1024.0);
    if mb_per_sec >= 1000.0 {
        format!("{:.2} GB/s", mb_per_sec / 1024.0)
    } else {
        format!("{:.2} MB/s", mb_per_sec)
    }
}
