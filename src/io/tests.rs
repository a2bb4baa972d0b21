#[cfg(test)]
mod tests {
    use crate::algorithms::{Pass, PatternKind};
    use crate::io::*;
    use crate::ui::progress::ProgressSink;
    use crate::{ErrorKind, ProgressUpdate, WipePhase};
    use proptest::prelude::*;
    use std::io;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory target that records every byte at its offset
    struct MemoryTarget {
        data: Vec<u8>,
        pos: usize,
        max_write: usize,
        syncs: usize,
        fail_write_at: Option<usize>,
        fail_sync: bool,
        interrupt_once: bool,
    }

    impl MemoryTarget {
        fn new(len: usize) -> Self {
            Self {
                data: vec![0x5Cu8; len],
                pos: 0,
                max_write: usize::MAX,
                syncs: 0,
                fail_write_at: None,
                fail_sync: false,
                interrupt_once: false,
            }
        }

        fn short_writes(mut self, max_write: usize) -> Self {
            self.max_write = max_write;
            self
        }
    }

    impl TargetHandle for MemoryTarget {
        fn rewind(&mut self) -> io::Result<()> {
            self.pos = 0;
            Ok(())
        }

        fn write_some(&mut self, data: &[u8]) -> io::Result<usize> {
            if self.interrupt_once {
                self.interrupt_once = false;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            if let Some(limit) = self.fail_write_at {
                if self.pos >= limit {
                    return Err(io::Error::new(io::ErrorKind::Other, "media error"));
                }
            }
            let n = data.len().min(self.max_write);
            let end = self.pos + n;
            if end > self.data.len() {
                self.data.resize(end, 0);
            }
            self.data[self.pos..end].copy_from_slice(&data[..n]);
            self.pos = end;
            Ok(n)
        }

        fn sync(&mut self) -> io::Result<()> {
            if self.fail_sync {
                return Err(io::Error::new(io::ErrorKind::Other, "flush rejected"));
            }
            self.syncs += 1;
            Ok(())
        }
    }

    /// Device that accepts nothing
    struct StuckTarget;

    impl TargetHandle for StuckTarget {
        fn rewind(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn write_some(&mut self, _data: &[u8]) -> io::Result<usize> {
            Ok(0)
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<ProgressUpdate>>,
    }

    impl ProgressSink for RecordingSink {
        fn report(&self, update: &ProgressUpdate) {
            self.updates.lock().unwrap().push(update.clone());
        }
    }

    fn pass(pattern: PatternKind) -> Pass {
        Pass {
            pattern,
            index: 1,
            total: 1,
        }
    }

    fn pool(size: usize) -> (PatternBufferPool, RandomBuffer) {
        let pool = PatternBufferPool::initialize(size, 1 << 20).unwrap();
        let random = pool.random_buffer().unwrap();
        (pool, random)
    }

    #[test]
    fn test_pass_covers_full_extent() {
        let (pool, mut random) = pool(4096);
        let mut target = MemoryTarget::new(10_000);
        let sink = RecordingSink::default();

        let buffer = pool.get(PatternKind::ONES, &mut random).unwrap();
        let report = run_pass(
            &mut target,
            10_000,
            buffer,
            &pass(PatternKind::ONES),
            Path::new("mem"),
            &sink,
            Duration::from_secs(60),
        )
        .unwrap();

        assert_eq!(report.bytes_written, 10_000);
        assert_eq!(report.write_calls, 3);
        assert_eq!(report.short_writes, 0);
        assert_eq!(target.data.len(), 10_000);
        assert!(target.data.iter().all(|&b| b == 0xFF));
        assert_eq!(target.syncs, 1);
    }

    #[test]
    fn test_zero_length_is_noop() {
        let (pool, mut random) = pool(4096);
        let mut target = MemoryTarget::new(0);
        let sink = RecordingSink::default();

        let buffer = pool.get(PatternKind::ZERO, &mut random).unwrap();
        let report = run_pass(
            &mut target,
            0,
            buffer,
            &pass(PatternKind::ZERO),
            Path::new("empty"),
            &sink,
            Duration::ZERO,
        )
        .unwrap();

        assert_eq!(report.bytes_written, 0);
        assert_eq!(report.write_calls, 0);
        assert_eq!(target.syncs, 0);
        assert!(sink.updates.lock().unwrap().is_empty());
    }

    #[test]
    fn test_short_writes_are_resumed() {
        let (pool, mut random) = pool(4096);
        let mut target = MemoryTarget::new(9000).short_writes(1000);
        let sink = RecordingSink::default();

        let buffer = pool.get(PatternKind::ALT_AA, &mut random).unwrap();
        let report = run_pass(
            &mut target,
            9000,
            buffer,
            &pass(PatternKind::ALT_AA),
            Path::new("short"),
            &sink,
            Duration::from_secs(60),
        )
        .unwrap();

        assert_eq!(report.bytes_written, 9000);
        assert!(report.short_writes > 0);
        assert!(target.data.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_interrupted_write_is_retried() {
        let (pool, mut random) = pool(4096);
        let mut target = MemoryTarget::new(4096);
        target.interrupt_once = true;

        let buffer = pool.get(PatternKind::ZERO, &mut random).unwrap();
        let report = run_pass(
            &mut target,
            4096,
            buffer,
            &pass(PatternKind::ZERO),
            Path::new("eintr"),
            &crate::NoProgress,
            Duration::from_secs(60),
        )
        .unwrap();

        assert_eq!(report.bytes_written, 4096);
    }

    #[test]
    fn test_write_failure_is_write_error() {
        let (pool, mut random) = pool(4096);
        let mut target = MemoryTarget::new(16_384);
        target.fail_write_at = Some(8192);

        let buffer = pool.get(PatternKind::ZERO, &mut random).unwrap();
        let err = run_pass(
            &mut target,
            16_384,
            buffer,
            &pass(PatternKind::ZERO),
            Path::new("bad-sector"),
            &crate::NoProgress,
            Duration::from_secs(60),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Write);
        assert_eq!(target.syncs, 0);
    }

    #[test]
    fn test_zero_length_write_is_write_error() {
        let (pool, mut random) = pool(4096);
        let buffer = pool.get(PatternKind::ZERO, &mut random).unwrap();
        let err = run_pass(
            &mut StuckTarget,
            4096,
            buffer,
            &pass(PatternKind::ZERO),
            Path::new("stuck"),
            &crate::NoProgress,
            Duration::from_secs(60),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Write);
    }

    #[test]
    fn test_sync_failure_is_flush_error() {
        let (pool, mut random) = pool(4096);
        let mut target = MemoryTarget::new(4096);
        target.fail_sync = true;

        let buffer = pool.get(PatternKind::ONES, &mut random).unwrap();
        let err = run_pass(
            &mut target,
            4096,
            buffer,
            &pass(PatternKind::ONES),
            Path::new("cache"),
            &crate::NoProgress,
            Duration::from_secs(60),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Flush);
    }

    #[test]
    fn test_progress_ends_at_100_percent() {
        let (pool, mut random) = pool(1024);
        let mut target = MemoryTarget::new(8192);
        let sink = RecordingSink::default();
        let p = Pass {
            pattern: PatternKind::Random,
            index: 3,
            total: 3,
        };

        let buffer = pool.get(PatternKind::Random, &mut random).unwrap();
        run_pass(
            &mut target,
            8192,
            buffer,
            &p,
            Path::new("progress"),
            &sink,
            Duration::ZERO,
        )
        .unwrap();

        let updates = sink.updates.lock().unwrap();
        // one sample per chunk plus the final report
        assert_eq!(updates.len(), 9);
        let last = updates.last().unwrap();
        assert_eq!(last.percent_complete, 100.0);
        assert_eq!(
            last.phase,
            WipePhase::Overwriting {
                pass: 3,
                total: 3,
                pattern: PatternKind::Random
            }
        );
        assert!(updates
            .windows(2)
            .all(|w| w[0].percent_complete <= w[1].percent_complete));
    }

    #[test]
    fn test_progress_sampling_is_rate_limited() {
        let (pool, mut random) = pool(1024);
        let mut target = MemoryTarget::new(64 * 1024);
        let sink = RecordingSink::default();

        let buffer = pool.get(PatternKind::ZERO, &mut random).unwrap();
        run_pass(
            &mut target,
            64 * 1024,
            buffer,
            &pass(PatternKind::ZERO),
            Path::new("quiet"),
            &sink,
            Duration::from_secs(3600),
        )
        .unwrap();

        // only the final report gets through
        assert_eq!(sink.updates.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_random_pass_repeats_buffer_content() {
        let (pool, mut random) = pool(512);
        let mut target = MemoryTarget::new(2048);

        let buffer = pool.get(PatternKind::Random, &mut random).unwrap();
        let expected = buffer.as_slice().to_vec();
        run_pass(
            &mut target,
            2048,
            buffer,
            &pass(PatternKind::Random),
            Path::new("random"),
            &crate::NoProgress,
            Duration::from_secs(60),
        )
        .unwrap();

        for chunk in target.data.chunks(512) {
            assert_eq!(chunk, &expected[..]);
        }
    }

    #[test]
    fn test_raw_target_pass_over_tempfile() {
        use std::io::Write;

        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(&vec![0x11u8; 100_000]).unwrap();
        temp.flush().unwrap();

        let (pool, mut random) = pool(32 * 1024);
        let mut target = RawTarget::open_file(temp.path()).unwrap();
        let len = target.file_len().unwrap();

        let buffer = pool.get(PatternKind::ZERO, &mut random).unwrap();
        let report = run_pass(
            &mut target,
            len,
            buffer,
            &pass(PatternKind::ZERO),
            temp.path(),
            &crate::NoProgress,
            Duration::from_secs(60),
        )
        .unwrap();
        target.close();

        assert_eq!(report.bytes_written, 100_000);
        let contents = std::fs::read(temp.path()).unwrap();
        assert_eq!(contents.len(), 100_000);
        assert!(contents.iter().all(|&b| b == 0));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_pass_writes_exactly_len_bytes(
            len in 1u64..200_000,
            buffer_size in 1usize..16_384,
            max_write in 1usize..8192,
        ) {
            let (pool, mut random) = pool(buffer_size);
            let mut target = MemoryTarget::new(0).short_writes(max_write);

            let buffer = pool.get(PatternKind::ALT_55, &mut random).unwrap();
            let report = run_pass(
                &mut target,
                len,
                buffer,
                &pass(PatternKind::ALT_55),
                Path::new("prop"),
                &crate::NoProgress,
                Duration::from_secs(60),
            )
            .unwrap();

            prop_assert_eq!(report.bytes_written, len);
            prop_assert_eq!(target.data.len() as u64, len);
            prop_assert!(target.data.iter().all(|&b| b == 0x55));
        }
    }
}
