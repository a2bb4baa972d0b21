use crate::{ProgressUpdate, WipePhase};
use crossbeam_channel::{Receiver, Sender};
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Instant;

/// Consumer of the engine's live progress stream.
///
/// Called from worker threads; implementations must not block for long.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: &ProgressUpdate);
}

/// Discards every update
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _update: &ProgressUpdate) {}
}

/// Forwards updates to a channel the caller drains
pub struct ChannelProgress {
    tx: Sender<ProgressUpdate>,
}

impl ChannelProgress {
    pub fn new(tx: Sender<ProgressUpdate>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end of an unbounded stream
    pub fn channel() -> (Self, Receiver<ProgressUpdate>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, update: &ProgressUpdate) {
        // A caller that stopped listening does not stop the wipe
        let _ = self.tx.send(update.clone());
    }
}

/// Logs phase changes; suited to folder runs where many leaves interleave
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, update: &ProgressUpdate) {
        match &update.phase {
            WipePhase::Overwriting { pass, total, pattern } if update.percent_complete >= 100.0 => {
                tracing::debug!(
                    path = %update.target.display(),
                    pass,
                    total,
                    pattern = %pattern,
                    throughput_bps = update.throughput_bps,
                    "pass finished"
                );
            }
            WipePhase::Overwriting { .. } => {}
            WipePhase::Failed(kind) => {
                tracing::warn!(path = %update.target.display(), error = %kind, "target failed");
            }
            phase => {
                tracing::info!(path = %update.target.display(), phase = ?phase, "progress");
            }
        }
    }
}

/// Animated terminal bar for single-target runs
pub struct TerminalProgress {
    bar: Mutex<ProgressBar>,
}

impl TerminalProgress {
    pub fn new(width: usize) -> Self {
        Self {
            bar: Mutex::new(ProgressBar::new(width)),
        }
    }
}

impl ProgressSink for TerminalProgress {
    fn report(&self, update: &ProgressUpdate) {
        let mut bar = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        match &update.phase {
            WipePhase::Overwriting { pass, total, pattern } => {
                let label = format!("pass {}/{} {}", pass, total, pattern);
                bar.render(update.percent_complete, &label, update.throughput_bps);
            }
            WipePhase::Complete => bar.finish("done"),
            WipePhase::Failed(kind) => bar.finish(&kind.to_string()),
            _ => {}
        }
    }
}

pub(crate) const CAT_FRAMES: [&str; 6] = [
    "ฅ(^･ω･^=)  ", // cat happy
    "ฅ(=^･ω･^ ) ",
    "ฅ(^･ᴥ･^=)  ",
    "ฅ(=^ᴥ^= )  ",
    "ฅ(^･ω･^=)  ",
    "ฅ(=^･ω･^ ) ",
];

pub struct ProgressBar {
    width: usize,
    cat_pos: usize,
    cat_frame: usize,
    start: Instant,
    first_render: bool,
}

impl ProgressBar {
    /// width = number of bar character slots (not including the brackets)
    pub fn new(width: usize) -> Self {
        Self {
            width,
            cat_pos: 0,
            cat_frame: 0,
            start: Instant::now(),
            first_render: true,
        }
    }

    /// Render the bar
    /// - `progress`: 0.0..=100.0
    /// - `label`: what is being written (pass and pattern)
    pub fn render(&mut self, progress: f64, label: &str, throughput_bps: u64) {
        let (cat_line, bar) = self.frame(progress);
        let info = format!(
            "\x1b[1m{:.1}%\x1b[0m  \x1b[38;5;51m{} @ {}/s  {}\x1b[0m",
            clamp_percent(progress),
            label,
            human_bytes(throughput_bps as f64),
            format_duration(self.start.elapsed().as_secs())
        );

        let mut out = io::stdout().lock();
        if self.first_render {
            let _ = write!(out, "{}\n[{}] {}\n", cat_line, bar, info);
            self.first_render = false;
        } else {
            // \x1b[2A moves up 2 lines, \x1b[2K clears line
            let _ = write!(out, "\x1b[2A\x1b[2K\r{}\n\x1b[2K\r[{}] {}\n", cat_line, bar, info);
        }
        let _ = out.flush();
    }

    /// Final line once the target reaches a terminal state
    pub fn finish(&mut self, message: &str) {
        if !self.first_render {
            println!("   {} in {}", message, format_duration(self.start.elapsed().as_secs()));
        }
        self.first_render = true;
    }

    /// Build the cat line and the colored bar for `progress`
    pub(crate) fn frame(&mut self, progress: f64) -> (String, String) {
        let pct = clamp_percent(progress);
        let filled = ((pct / 100.0) * self.width as f64).round() as usize;
        let empty = self.width.saturating_sub(filled);

        // advance animation frames
        self.cat_pos = (self.cat_pos + 1) % (self.width.max(1));
        self.cat_frame = (self.cat_frame + 1) % CAT_FRAMES.len();

        // cat walks independently across the width, wraps around
        let mut cat_line = vec![' '; self.width + 2];
        let cat_chars: Vec<char> = CAT_FRAMES[self.cat_frame].chars().collect();
        let pos = self
            .cat_pos
            .min((self.width + 1).saturating_sub(cat_chars.len()));
        for (i, c) in cat_chars.iter().enumerate() {
            if pos + i < cat_line.len() {
                cat_line[pos + i] = *c;
            }
        }

        let bar = format!(
            "\x1b[1m\x1b[38;5;82m{}\x1b[0m\x1b[38;5;240m{}\x1b[0m",
            "█".repeat(filled),
            "░".repeat(empty)
        );

        (cat_line.into_iter().collect(), bar)
    }
}

fn clamp_percent(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    }
}

/// Convert bytes/sec to readable string
pub fn human_bytes(bps: f64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    if bps <= 0.0 {
        return "0B".to_string();
    }
    let mut val = bps;
    let mut i = 0usize;
    while val >= 1024.0 && i + 1 < units.len() {
        val /= 1024.0;
        i += 1;
    }
    format!("{:.2}{}", val, units[i])
}

/// Format seconds to H:MM:SS or M:SS
pub fn format_duration(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
