pub mod algorithms;
pub mod config;
pub mod crypto;
pub mod io;
pub mod report;
pub mod ui;
pub mod wipe_orchestrator;
pub mod worker_pool;

// Re-export the dispatcher and the types callers need to drive it
pub use algorithms::{Pass, PatternKind, WipeMethod};
pub use config::EngineConfig;
pub use report::{DirectoryResult, LeafFailure, SummaryStatus, WipeSummary};
pub use ui::progress::{ChannelProgress, NoProgress, ProgressSink};
pub use wipe_orchestrator::{wipe, WipeOrchestrator};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

// Global flag for handling Ctrl+C interrupts
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Set the interrupt flag (called by signal handler)
pub fn set_interrupted() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Check if an interrupt has been received
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Reset the interrupt flag (primarily for testing)
pub fn reset_interrupted() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

#[derive(Error, Debug)]
pub enum WipeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("pattern buffer allocation failed: {0}")]
    Allocation(String),

    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot determine size of {}: {source}", path.display())]
    Geometry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write failed on {} during pass {pass}: {source}", path.display())]
    Write {
        path: PathBuf,
        pass: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("flush failed on {} after pass {pass}: {source}", path.display())]
    Flush {
        path: PathBuf,
        pass: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("{} was overwritten but could not be removed: {source}", path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WipeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WipeError::Config(_) => ErrorKind::Config,
            WipeError::Allocation(_) => ErrorKind::Allocation,
            WipeError::Open { .. } => ErrorKind::Open,
            WipeError::Geometry { .. } => ErrorKind::Geometry,
            WipeError::Write { .. } => ErrorKind::Write,
            WipeError::Flush { .. } => ErrorKind::Flush,
            WipeError::Delete { .. } => ErrorKind::Delete,
        }
    }

    /// Whether this error aborts the whole invocation rather than a single leaf
    pub fn is_fatal(&self) -> bool {
        matches!(self, WipeError::Config(_) | WipeError::Allocation(_))
    }
}

pub type EngineResult<T> = Result<T, WipeError>;

/// Serializable error classification attached to failed results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Config,
    Allocation,
    Open,
    Geometry,
    Write,
    Flush,
    Delete,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Config => "ConfigError",
            ErrorKind::Allocation => "AllocationError",
            ErrorKind::Open => "OpenError",
            ErrorKind::Geometry => "GeometryError",
            ErrorKind::Write => "WriteError",
            ErrorKind::Flush => "FlushError",
            ErrorKind::Delete => "DeleteError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    File,
    Folder,
    BlockDevice,
}

/// What the caller asked to erase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipeTarget {
    pub path: PathBuf,
    pub kind: TargetKind,
}

impl WipeTarget {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: TargetKind::File,
        }
    }

    pub fn folder(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: TargetKind::Folder,
        }
    }

    pub fn block_device(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: TargetKind::BlockDevice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failed { kind: ErrorKind, message: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Outcome::Success => None,
            Outcome::Failed { kind, .. } => Some(*kind),
        }
    }
}

impl From<&WipeError> for Outcome {
    fn from(err: &WipeError) -> Self {
        Outcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Terminal result of one leaf target (a file or a whole device)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WipeResult {
    pub target: PathBuf,
    pub kind: TargetKind,
    pub outcome: Outcome,
    pub passes_completed: usize,
    pub bytes_processed: u64,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl WipeResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

// Phase reported on the progress stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WipePhase {
    Opening,
    Overwriting {
        pass: usize,
        total: usize,
        pattern: PatternKind,
    },
    Deleting,
    RemovingDirectory,
    Complete,
    Failed(ErrorKind),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub target: PathBuf,
    pub phase: WipePhase,
    pub percent_complete: f64,
    pub throughput_bps: u64,
}

pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
