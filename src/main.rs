use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wipe_engine::ui::progress::{NoProgress, ProgressSink, TerminalProgress, TracingProgress};
use wipe_engine::{EngineConfig, WipeOrchestrator, WipeTarget};

#[derive(Parser)]
#[command(name = "wipe-engine")]
#[command(about = "Multi-pass secure erasure of files, folders and block devices")]
#[command(version = "1.0.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Number of concurrent file workers for folder targets
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Pattern buffer size in bytes
    #[arg(long, global = true)]
    buffer_size: Option<usize>,

    /// Print the summary as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable the progress display
    #[arg(long, global = true)]
    no_progress: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Overwrite a single file, then delete it
    File {
        path: PathBuf,

        /// Sanitization method (clear, purge, destroy)
        #[arg(short, long, default_value = "clear")]
        method: String,
    },

    /// Overwrite and delete every file under a folder, then remove the folder
    Folder {
        path: PathBuf,

        /// Sanitization method (clear, purge, destroy)
        #[arg(short, long, default_value = "clear")]
        method: String,
    },

    /// Overwrite an entire block device (or disk image) in place
    Disk {
        /// Device path (e.g., /dev/sdb)
        path: PathBuf,

        /// Sanitization method (clear, purge, destroy)
        #[arg(short, long, default_value = "clear")]
        method: String,
    },
}

impl Commands {
    fn target_and_method(&self) -> (WipeTarget, &str) {
        match self {
            Commands::File { path, method } => (WipeTarget::file(path), method.as_str()),
            Commands::Folder { path, method } => (WipeTarget::folder(path), method.as_str()),
            Commands::Disk { path, method } => (WipeTarget::block_device(path), method.as_str()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.debug);
    setup_signal_handlers()?;

    let mut config = EngineConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(buffer_size) = cli.buffer_size {
        config.buffer_size = buffer_size;
    }

    let (target, method) = cli.command.target_and_method();

    let progress: Arc<dyn ProgressSink> = if cli.no_progress || cli.json {
        Arc::new(NoProgress)
    } else if matches!(cli.command, Commands::Folder { .. }) {
        // many leaves interleave; a single bar would be meaningless
        Arc::new(TracingProgress)
    } else {
        Arc::new(TerminalProgress::new(50))
    };

    let orchestrator = WipeOrchestrator::new(method, config, progress)
        .context("Failed to initialize wipe engine")?;

    if !cli.json {
        println!("\n🚀 Wiping {}", target.path.display());
        println!("Method: {}", orchestrator.method());
        println!("{}", "=".repeat(70));
    }

    let summary = orchestrator.execute(&target)?;
    orchestrator.shutdown();

    if cli.json {
        println!("{}", summary.to_json()?);
    } else {
        summary.print();
    }

    if !summary.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Signal handler for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers() -> Result<()> {
    use signal_hook::{consts::SIGINT, iterator::Signals};

    let mut signals = Signals::new([SIGINT])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            if sig == SIGINT {
                eprintln!("\n\n🛑 Interrupt received! No further targets will be started.");
                eprintln!("   Passes already running will finish first...");
                wipe_engine::set_interrupted();
            }
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers() -> Result<()> {
    Ok(())
}
