// Wipe Orchestrator - routes a target to the file, folder or block device path
//
// Files and devices run on the calling thread. Folders fan their files out to
// the worker pool and walk subdirectories depth-first on the calling thread,
// removing each directory only after all of its direct children succeeded.

use crate::algorithms::WipeMethod;
use crate::config::EngineConfig;
use crate::io::{
    run_pass, secure_delete, BlockDeviceHandle, PatternBufferPool, RandomBuffer, RawTarget,
    TargetHandle,
};
use crate::report::{DirectoryResult, WipeSummary};
use crate::ui::progress::ProgressSink;
use crate::worker_pool::{LeafTask, WorkerPool};
use crate::{
    is_interrupted, EngineResult, Outcome, ProgressUpdate, TargetKind, WipeError,
    WipePhase, WipeResult, WipeTarget,
};
use chrono::Utc;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Everything a leaf wipe needs, shared read-only with every worker
#[derive(Clone)]
pub struct LeafWiper {
    method: Arc<WipeMethod>,
    pool: Arc<PatternBufferPool>,
    progress: Arc<dyn ProgressSink>,
    sample_interval: Duration,
}

// Passes that finished before a schedule stopped
struct ScheduleFailure {
    error: WipeError,
    passes_completed: usize,
    bytes_processed: u64,
}

impl LeafWiper {
    pub fn method(&self) -> &WipeMethod {
        &self.method
    }

    /// Open → passes → close → scrub and unlink
    pub fn wipe_file(&self, path: &Path, random: &mut RandomBuffer) -> WipeResult {
        let start = Instant::now();
        self.emit(path, WipePhase::Opening, 0.0, 0);

        let opened = RawTarget::open_file(path).and_then(|handle| {
            let len = handle.file_len()?;
            Ok((handle, len))
        });
        let (handle, len) = match opened {
            Ok(opened) => opened,
            Err(source) => {
                let error = WipeError::Open {
                    path: path.to_path_buf(),
                    source,
                };
                return self.failed(path, TargetKind::File, &error, 0, 0, start);
            }
        };

        tracing::debug!(path = %path.display(), bytes = len, method = %self.method.name, "wiping file");

        self.wipe_open_file(path, handle, len, random, start)
    }

    // The handle is dropped before the directory entry is touched
    fn wipe_open_file<H: TargetHandle>(
        &self,
        path: &Path,
        mut handle: H,
        len: u64,
        random: &mut RandomBuffer,
        start: Instant,
    ) -> WipeResult {
        let scheduled = self.run_schedule(&mut handle, len, path, random);
        drop(handle);

        let (passes, bytes) = match scheduled {
            Ok(done) => done,
            Err(f) => {
                return self.failed(
                    path,
                    TargetKind::File,
                    &f.error,
                    f.passes_completed,
                    f.bytes_processed,
                    start,
                );
            }
        };

        self.emit(path, WipePhase::Deleting, 100.0, 0);
        if let Err(source) = secure_delete(path) {
            let error = WipeError::Delete {
                path: path.to_path_buf(),
                source,
            };
            return self.failed(path, TargetKind::File, &error, passes, bytes, start);
        }

        self.succeeded(path, TargetKind::File, passes, bytes, start)
    }

    /// Open the raw device, query its size, run every pass. Never deletes.
    pub fn wipe_disk(&self, path: &Path, random: &mut RandomBuffer) -> WipeResult {
        let start = Instant::now();
        self.emit(path, WipePhase::Opening, 0.0, 0);

        let mut handle = match RawTarget::open_device(path) {
            Ok(handle) => handle,
            Err(source) => {
                let error = WipeError::Open {
                    path: path.to_path_buf(),
                    source,
                };
                return self.failed(path, TargetKind::BlockDevice, &error, 0, 0, start);
            }
        };

        tracing::info!(path = %path.display(), platform = handle.platform_name(), "opened device");

        let result = self.wipe_block_device(path, &mut handle, random);
        handle.close();
        result
    }

    /// Geometry query then the full schedule over an already-open device
    pub fn wipe_block_device<H: BlockDeviceHandle + ?Sized>(
        &self,
        path: &Path,
        handle: &mut H,
        random: &mut RandomBuffer,
    ) -> WipeResult {
        let start = Instant::now();

        let len = match handle.query_size() {
            Ok(len) => len,
            Err(source) => {
                let error = WipeError::Geometry {
                    path: path.to_path_buf(),
                    source,
                };
                return self.failed(path, TargetKind::BlockDevice, &error, 0, 0, start);
            }
        };

        tracing::info!(path = %path.display(), bytes = len, method = %self.method.name, "wiping device");

        match self.run_schedule(handle, len, path, random) {
            Ok((passes, bytes)) => {
                self.succeeded(path, TargetKind::BlockDevice, passes, bytes, start)
            }
            Err(f) => self.failed(
                path,
                TargetKind::BlockDevice,
                &f.error,
                f.passes_completed,
                f.bytes_processed,
                start,
            ),
        }
    }

    /// Remove a symbolic link found inside a folder without following it
    fn unlink_symlink(&self, path: &Path) -> WipeResult {
        let start = Instant::now();
        match fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed symbolic link");
                self.succeeded(path, TargetKind::File, 0, 0, start)
            }
            Err(source) => {
                let error = WipeError::Delete {
                    path: path.to_path_buf(),
                    source,
                };
                self.failed(path, TargetKind::File, &error, 0, 0, start)
            }
        }
    }

    // Strictly sequential: pass i+1 starts only after pass i has synced
    fn run_schedule<H: TargetHandle + ?Sized>(
        &self,
        handle: &mut H,
        len: u64,
        path: &Path,
        random: &mut RandomBuffer,
    ) -> Result<(usize, u64), ScheduleFailure> {
        let mut passes_completed = 0;
        let mut bytes_processed = 0u64;

        for pass in &self.method.passes {
            let outcome = match self.pool.get(pass.pattern, random) {
                Ok(buffer) => run_pass(
                    &mut *handle,
                    len,
                    buffer,
                    pass,
                    path,
                    self.progress.as_ref(),
                    self.sample_interval,
                ),
                Err(error) => Err(error),
            };

            match outcome {
                Ok(report) => {
                    passes_completed += 1;
                    bytes_processed += report.bytes_written;
                }
                Err(error) => {
                    return Err(ScheduleFailure {
                        error,
                        passes_completed,
                        bytes_processed,
                    })
                }
            }
        }

        Ok((passes_completed, bytes_processed))
    }

    fn emit(&self, path: &Path, phase: WipePhase, percent_complete: f64, throughput_bps: u64) {
        self.progress.report(&ProgressUpdate {
            target: path.to_path_buf(),
            phase,
            percent_complete,
            throughput_bps,
        });
    }

    fn succeeded(
        &self,
        path: &Path,
        kind: TargetKind,
        passes_completed: usize,
        bytes_processed: u64,
        start: Instant,
    ) -> WipeResult {
        self.emit(path, WipePhase::Complete, 100.0, 0);
        tracing::info!(
            path = %path.display(),
            passes = passes_completed,
            bytes = bytes_processed,
            "target wiped"
        );
        WipeResult {
            target: path.to_path_buf(),
            kind,
            outcome: Outcome::Success,
            passes_completed,
            bytes_processed,
            duration: start.elapsed(),
        }
    }

    fn failed(
        &self,
        path: &Path,
        kind: TargetKind,
        error: &WipeError,
        passes_completed: usize,
        bytes_processed: u64,
        start: Instant,
    ) -> WipeResult {
        self.emit(path, WipePhase::Failed(error.kind()), 0.0, 0);
        tracing::warn!(
            path = %path.display(),
            passes = passes_completed,
            error = %error,
            "target failed"
        );
        WipeResult {
            target: path.to_path_buf(),
            kind,
            outcome: Outcome::from(error),
            passes_completed,
            bytes_processed,
            duration: start.elapsed(),
        }
    }
}

/// Main entry point: validates everything up front, then dispatches targets
pub struct WipeOrchestrator {
    wiper: LeafWiper,
    config: EngineConfig,
    // Random buffer used for file and device targets run on this thread
    random: Mutex<RandomBuffer>,
}

impl WipeOrchestrator {
    /// Resolve the method and allocate the pattern buffers.
    ///
    /// Unknown methods and invalid configuration fail with `Config`; buffer
    /// allocation failure fails with `Allocation`. No target is touched.
    pub fn new(
        method: &str,
        config: EngineConfig,
        progress: Arc<dyn ProgressSink>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let method = WipeMethod::from_name(method)?;

        let pool = PatternBufferPool::initialize(config.buffer_size, config.reseed_interval)?;
        let random = pool.random_buffer()?;

        tracing::info!(
            method = %method,
            buffer_size = config.buffer_size,
            workers = config.workers,
            "wipe engine ready"
        );

        Ok(Self {
            wiper: LeafWiper {
                method: Arc::new(method),
                pool: Arc::new(pool),
                progress,
                sample_interval: config.progress_interval(),
            },
            config,
            random: Mutex::new(random),
        })
    }

    pub fn method(&self) -> &WipeMethod {
        self.wiper.method()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Wipe one target and aggregate its outcome.
    ///
    /// Only an allocation failure while starting the worker pool is returned
    /// as an error; every per-target failure lands in the summary.
    pub fn execute(&self, target: &WipeTarget) -> EngineResult<WipeSummary> {
        let started_at = Utc::now();
        let start = Instant::now();

        if is_interrupted() {
            tracing::warn!(path = %target.path.display(), "interrupted before start");
            return Ok(self.summarize(target, started_at, start, Vec::new(), Vec::new(), 0, true));
        }

        match target.kind {
            TargetKind::File => {
                let leaf = self.with_random(|random| self.wiper.wipe_file(&target.path, random));
                Ok(self.summarize(target, started_at, start, vec![leaf], Vec::new(), 1, false))
            }
            TargetKind::BlockDevice => {
                let leaf = self.with_random(|random| self.wiper.wipe_disk(&target.path, random));
                Ok(self.summarize(target, started_at, start, vec![leaf], Vec::new(), 1, false))
            }
            TargetKind::Folder => {
                let walk = self.wipe_folder(&target.path)?;
                Ok(self.summarize(
                    target,
                    started_at,
                    start,
                    walk.leaves,
                    walk.directories,
                    walk.peak_concurrency,
                    walk.interrupted,
                ))
            }
        }
    }

    /// Wipe an already-open device handle on this thread
    pub fn wipe_block_device<H: BlockDeviceHandle + ?Sized>(
        &self,
        path: &Path,
        handle: &mut H,
    ) -> WipeResult {
        self.with_random(|random| self.wiper.wipe_block_device(path, handle, random))
    }

    /// Release the pattern buffers. Every worker has exited by now.
    pub fn shutdown(self) {
        let WipeOrchestrator { wiper, random, .. } = self;
        drop(random);
        let LeafWiper { pool, .. } = wiper;
        match Arc::try_unwrap(pool) {
            Ok(pool) => pool.teardown(),
            Err(_) => tracing::warn!("pattern buffers still referenced at shutdown"),
        }
    }

    fn with_random<T>(&self, f: impl FnOnce(&mut RandomBuffer) -> T) -> T {
        let mut random = self.random.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut random)
    }

    fn wipe_folder(&self, root: &Path) -> EngineResult<FolderWalk> {
        // One random buffer per worker, all allocated before any file is opened
        let states = (0..self.config.workers)
            .map(|_| self.wiper.pool.random_buffer())
            .collect::<EngineResult<Vec<_>>>()?;

        let wiper = self.wiper.clone();
        let pool = WorkerPool::spawn(states, move |random: &mut RandomBuffer, path: PathBuf| {
            wiper.wipe_file(&path, random)
        })?;

        let mut walk = FolderWalk::default();

        match fs::symlink_metadata(root) {
            Ok(meta) if meta.is_dir() => {
                walk.visit(root, &self.wiper, &pool);
            }
            Ok(_) => walk
                .directories
                .push(DirectoryResult::kept(root.to_path_buf(), "not a directory")),
            Err(e) => walk
                .directories
                .push(DirectoryResult::kept(root.to_path_buf(), e.to_string())),
        }

        let stats = pool.shutdown();
        walk.peak_concurrency = stats.peak();
        tracing::debug!(
            completed = stats.completed(),
            failures = stats.failures(),
            peak = stats.peak(),
            "worker pool drained"
        );

        Ok(walk)
    }

    #[allow(clippy::too_many_arguments)]
    fn summarize(
        &self,
        target: &WipeTarget,
        started_at: chrono::DateTime<Utc>,
        start: Instant,
        leaves: Vec<WipeResult>,
        directories: Vec<DirectoryResult>,
        peak_concurrency: usize,
        interrupted: bool,
    ) -> WipeSummary {
        WipeSummary::finalize(
            &self.wiper.method.name,
            target.clone(),
            started_at,
            start.elapsed(),
            leaves,
            directories,
            peak_concurrency,
            interrupted,
        )
    }
}

#[derive(Default)]
struct FolderWalk {
    leaves: Vec<WipeResult>,
    directories: Vec<DirectoryResult>,
    peak_concurrency: usize,
    interrupted: bool,
}

impl FolderWalk {
    fn stop_requested(&mut self) -> bool {
        if is_interrupted() {
            self.interrupted = true;
        }
        self.interrupted
    }

    /// Process `dir` and its subtree; true if `dir` itself was removed
    fn visit(&mut self, dir: &Path, wiper: &LeafWiper, pool: &WorkerPool) -> bool {
        let entries = match fs::read_dir(dir).and_then(|rd| rd.collect::<Result<Vec<_>, _>>()) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "cannot read directory");
                self.directories
                    .push(DirectoryResult::kept(dir.to_path_buf(), e.to_string()));
                return false;
            }
        };

        let (reply_tx, reply_rx) = crossbeam_channel::unbounded();
        let mut dispatched: HashSet<PathBuf> = HashSet::new();
        let mut subdirs = Vec::new();
        let mut all_ok = true;

        for entry in entries {
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(source) => {
                    self.leaves.push(wiper.failed(
                        &path,
                        TargetKind::File,
                        &WipeError::Open { path: path.clone(), source },
                        0,
                        0,
                        Instant::now(),
                    ));
                    all_ok = false;
                    continue;
                }
            };

            if file_type.is_dir() {
                subdirs.push(path);
            } else if file_type.is_symlink() {
                let leaf = wiper.unlink_symlink(&path);
                all_ok &= leaf.is_success();
                self.leaves.push(leaf);
            } else if file_type.is_file() {
                if self.stop_requested() {
                    all_ok = false;
                    break;
                }
                let task = LeafTask {
                    path: path.clone(),
                    reply: reply_tx.clone(),
                };
                match pool.submit(task) {
                    Ok(()) => {
                        dispatched.insert(path);
                    }
                    Err(task) => {
                        self.leaves.push(unreported(wiper, &task.path));
                        all_ok = false;
                    }
                }
            } else {
                let error = WipeError::Open {
                    path: path.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "not a regular file",
                    ),
                };
                self.leaves.push(wiper.failed(
                    &path,
                    TargetKind::File,
                    &error,
                    0,
                    0,
                    Instant::now(),
                ));
                all_ok = false;
            }
        }

        // This directory's files keep running on the workers meanwhile
        for sub in subdirs {
            if self.stop_requested() {
                all_ok = false;
                break;
            }
            all_ok &= self.visit(&sub, wiper, pool);
        }

        // Join barrier: every dispatched child reports, or its sender is gone
        drop(reply_tx);
        for result in reply_rx.iter() {
            dispatched.remove(&result.target);
            all_ok &= result.is_success();
            self.leaves.push(result);
        }
        for path in dispatched {
            self.leaves.push(unreported(wiper, &path));
            all_ok = false;
        }

        if !all_ok {
            let reason = if self.interrupted {
                "interrupted before every child was processed"
            } else {
                "not every child was wiped"
            };
            tracing::warn!(path = %dir.display(), reason, "keeping directory");
            self.directories
                .push(DirectoryResult::kept(dir.to_path_buf(), reason));
            return false;
        }

        wiper.emit(dir, WipePhase::RemovingDirectory, 100.0, 0);
        match fs::remove_dir(dir) {
            Ok(()) => {
                tracing::debug!(path = %dir.display(), "removed directory");
                self.directories.push(DirectoryResult::removed(dir.to_path_buf()));
                true
            }
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "cannot remove directory");
                self.directories
                    .push(DirectoryResult::kept(dir.to_path_buf(), e.to_string()));
                false
            }
        }
    }
}

// A dispatched leaf whose worker went away without replying
fn unreported(wiper: &LeafWiper, path: &Path) -> WipeResult {
    let error = WipeError::Write {
        path: path.to_path_buf(),
        pass: 0,
        source: std::io::Error::new(
            std::io::ErrorKind::Other,
            "worker exited before reporting a result",
        ),
    };
    wiper.failed(path, TargetKind::File, &error, 0, 0, Instant::now())
}

/// One-shot convenience: build an orchestrator, wipe `target`, release buffers
pub fn wipe(
    target: &WipeTarget,
    method: &str,
    config: EngineConfig,
    progress: Arc<dyn ProgressSink>,
) -> EngineResult<WipeSummary> {
    let orchestrator = WipeOrchestrator::new(method, config, progress)?;
    let summary = orchestrator.execute(target);
    orchestrator.shutdown();
    summary
}
