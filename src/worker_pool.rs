// Worker Pool: W named threads draining a rendezvous queue of leaf tasks
//
// The queue has zero capacity, so `submit` blocks until a worker is free to
// take the task. At most W tasks are ever in flight.

use crate::{EngineResult, WipeError, WipeResult};
use crossbeam_channel::{Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// One leaf handed to a worker, with the channel its result goes back on
pub struct LeafTask {
    pub path: PathBuf,
    pub reply: Sender<WipeResult>,
}

/// Counters shared between the pool and its workers
#[derive(Default)]
pub struct PoolStats {
    active: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
    failures: Mutex<usize>,
}

impl PoolStats {
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of tasks observed running at the same time
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> usize {
        *self.failures.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record_failure(&self) {
        *self.failures.lock().unwrap_or_else(|e| e.into_inner()) += 1;
    }
}

// Keeps `active` accurate even if a job panics
struct ActiveGuard<'a>(&'a PoolStats);

impl<'a> ActiveGuard<'a> {
    fn enter(stats: &'a PoolStats) -> Self {
        let now = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak.fetch_max(now, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct WorkerPool {
    tx: Option<Sender<LeafTask>>,
    handles: Vec<JoinHandle<()>>,
    stats: Arc<PoolStats>,
}

impl WorkerPool {
    /// Spawn one thread per element of `states`.
    ///
    /// Each worker owns its state exclusively (its random buffer, in
    /// practice) and runs `job` for every task it takes off the queue.
    pub fn spawn<S, F>(states: Vec<S>, job: F) -> EngineResult<Self>
    where
        S: Send + 'static,
        F: Fn(&mut S, PathBuf) -> WipeResult + Send + Sync + 'static,
    {
        if states.is_empty() {
            return Err(WipeError::Config(
                "worker pool needs at least one worker".to_string(),
            ));
        }

        let (tx, rx) = crossbeam_channel::bounded::<LeafTask>(0);
        let stats = Arc::new(PoolStats::default());
        let job = Arc::new(job);

        let mut handles = Vec::with_capacity(states.len());
        for (idx, state) in states.into_iter().enumerate() {
            let rx: Receiver<LeafTask> = rx.clone();
            let worker_stats = Arc::clone(&stats);
            let worker_job = Arc::clone(&job);

            let handle = thread::Builder::new()
                .name(format!("wipe-worker-{idx}"))
                .spawn(move || {
                    let mut state = state;
                    for task in rx.iter() {
                        let result = {
                            let _active = ActiveGuard::enter(&worker_stats);
                            worker_job(&mut state, task.path)
                        };
                        if !result.is_success() {
                            worker_stats.record_failure();
                        }
                        worker_stats.completed.fetch_add(1, Ordering::SeqCst);
                        // Dispatcher may have given up on this directory
                        let _ = task.reply.send(result);
                    }
                })
                .map_err(|e| WipeError::Allocation(format!("cannot spawn worker: {e}")))?;
            handles.push(handle);
        }

        tracing::debug!(workers = handles.len(), "worker pool started");

        Ok(Self {
            tx: Some(tx),
            handles,
            stats,
        })
    }

    /// Hand a task to the next free worker, blocking while all are busy.
    ///
    /// Gives the task back if no worker is left to take it.
    pub fn submit(&self, task: LeafTask) -> Result<(), LeafTask> {
        match &self.tx {
            Some(tx) => tx.send(task).map_err(|e| e.into_inner()),
            None => Err(task),
        }
    }

    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Close the queue and wait for every worker to drain and exit
    pub fn shutdown(mut self) -> Arc<PoolStats> {
        self.join_all();
        Arc::clone(&self.stats)
    }

    fn join_all(&mut self) {
        drop(self.tx.take());
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                tracing::error!(worker = %name, "worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.join_all();
    }
}
