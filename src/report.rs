// Finalizer: aggregates leaf and directory outcomes into one summary

use crate::ui::progress::human_bytes;
use crate::{ErrorKind, Outcome, WipeResult, WipeTarget};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryStatus {
    Success,
    PartialFailure,
}

/// One failed leaf, as enumerated in the summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafFailure {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

/// Fate of one directory of a folder target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryResult {
    pub path: PathBuf,
    pub removed: bool,
    /// Why the directory was kept, if it was
    pub error: Option<String>,
}

impl DirectoryResult {
    pub fn removed(path: PathBuf) -> Self {
        Self {
            path,
            removed: true,
            error: None,
        }
    }

    pub fn kept(path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            path,
            removed: false,
            error: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WipeSummary {
    pub session_id: Uuid,
    pub method: String,
    pub target: WipeTarget,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(with = "crate::duration_millis")]
    pub elapsed: Duration,
    pub leaves: Vec<WipeResult>,
    pub directories: Vec<DirectoryResult>,
    pub peak_concurrency: usize,
    pub interrupted: bool,
}

impl WipeSummary {
    /// Build a summary once every leaf has reported.
    ///
    /// Results are taken as-is and never merged; ordering is normalized by
    /// path so output is stable regardless of completion order.
    #[allow(clippy::too_many_arguments)]
    pub fn finalize(
        method: &str,
        target: WipeTarget,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        mut leaves: Vec<WipeResult>,
        mut directories: Vec<DirectoryResult>,
        peak_concurrency: usize,
        interrupted: bool,
    ) -> Self {
        leaves.sort_by(|a, b| a.target.cmp(&b.target));
        // children before parents, matching removal order
        directories.sort_by(|a, b| b.path.cmp(&a.path));

        let summary = Self {
            session_id: Uuid::new_v4(),
            method: method.to_string(),
            target,
            started_at,
            finished_at: Utc::now(),
            elapsed,
            leaves,
            directories,
            peak_concurrency,
            interrupted,
        };

        tracing::info!(
            session = %summary.session_id,
            method = %summary.method,
            attempted = summary.attempted(),
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            bytes = summary.total_bytes(),
            interrupted,
            "wipe finished"
        );

        summary
    }

    pub fn attempted(&self) -> usize {
        self.leaves.len()
    }

    pub fn succeeded(&self) -> usize {
        self.leaves.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    pub fn total_bytes(&self) -> u64 {
        self.leaves.iter().map(|r| r.bytes_processed).sum()
    }

    /// Bytes per second over the whole invocation
    pub fn average_throughput(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0;
        }
        (self.total_bytes() as f64 / secs) as u64
    }

    pub fn failures(&self) -> Vec<LeafFailure> {
        self.leaves
            .iter()
            .filter_map(|r| match &r.outcome {
                Outcome::Success => None,
                Outcome::Failed { kind, message } => Some(LeafFailure {
                    path: r.target.clone(),
                    kind: *kind,
                    message: message.clone(),
                }),
            })
            .collect()
    }

    pub fn directories_kept(&self) -> usize {
        self.directories.iter().filter(|d| !d.removed).count()
    }

    /// Success iff every leaf succeeded, every directory was removed and
    /// the run was not cut short
    pub fn status(&self) -> SummaryStatus {
        if self.failed() == 0 && self.directories_kept() == 0 && !self.interrupted {
            SummaryStatus::Success
        } else {
            SummaryStatus::PartialFailure
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == SummaryStatus::Success
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable report
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n📊 Wipe Summary");
        let _ = writeln!(out, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        let _ = writeln!(out, "  Session: {}", self.session_id);
        let _ = writeln!(out, "  Target: {} ({:?})", self.target.path.display(), self.target.kind);
        let _ = writeln!(out, "  Method: {}", self.method);
        let _ = writeln!(
            out,
            "  Started: {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(
            out,
            "  ⏱️  Elapsed: {}",
            humantime::format_duration(Duration::from_millis(self.elapsed.as_millis() as u64))
        );
        let _ = writeln!(
            out,
            "  🎯 Targets: {} attempted, {} succeeded, {} failed",
            self.attempted(),
            self.succeeded(),
            self.failed()
        );
        let _ = writeln!(
            out,
            "  📦 Bytes processed: {} ({})",
            self.total_bytes(),
            human_bytes(self.total_bytes() as f64)
        );
        let _ = writeln!(
            out,
            "  ⚡ Average throughput: {}/s",
            human_bytes(self.average_throughput() as f64)
        );
        if self.peak_concurrency > 0 {
            let _ = writeln!(out, "  🔄 Peak concurrent tasks: {}", self.peak_concurrency);
        }

        let failures = self.failures();
        if !failures.is_empty() {
            let _ = writeln!(out, "\n❌ Failed targets:");
            for failure in &failures {
                let _ = writeln!(
                    out,
                    "  {} [{}] {}",
                    failure.path.display(),
                    failure.kind,
                    failure.message
                );
            }
        }

        if self.directories_kept() > 0 {
            let _ = writeln!(out, "\n📁 Directories kept:");
            for dir in self.directories.iter().filter(|d| !d.removed) {
                let _ = writeln!(
                    out,
                    "  {} ({})",
                    dir.path.display(),
                    dir.error.as_deref().unwrap_or("not removed")
                );
            }
        }

        if self.interrupted {
            let _ = writeln!(out, "\n⚠️  Interrupted: remaining targets were not processed");
        }

        let status = match self.status() {
            SummaryStatus::Success => "✅ SUCCESS".green().bold(),
            SummaryStatus::PartialFailure => "⚠️  PARTIAL FAILURE".red().bold(),
        };
        let _ = writeln!(out, "\n{}", status);
        let _ = writeln!(out, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}
