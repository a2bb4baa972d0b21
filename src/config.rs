// Engine configuration: built-in defaults, optional TOML file, WIPE_ENGINE_* env

use crate::crypto::DEFAULT_RESEED_INTERVAL;
use crate::io::buffer_pool::DEFAULT_BUFFER_SIZE;
use crate::{EngineResult, WipeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on concurrently open leaf targets
pub const MAX_WORKERS: usize = 64;

pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 250;

const ENV_PREFIX: &str = "WIPE_ENGINE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of every pattern buffer in bytes
    pub buffer_size: usize,
    /// Worker bound for folder traversal
    pub workers: usize,
    /// Minimum spacing of sampled progress updates
    pub progress_interval_ms: u64,
    /// Bytes a random source emits before reseeding from the OS
    pub reseed_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            workers: num_cpus::get().clamp(1, MAX_WORKERS),
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            reseed_interval: DEFAULT_RESEED_INTERVAL,
        }
    }
}

impl EngineConfig {
    /// Load defaults, then `path` (or the per-user config file when `None`),
    /// then `WIPE_ENGINE_*` environment variables.
    ///
    /// An explicit `path` must exist; the per-user file is optional.
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(
                    config::File::from(path.to_path_buf())
                        .format(config::FileFormat::Toml)
                        .required(true),
                );
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    builder = builder.add_source(
                        config::File::from(default_path)
                            .format(config::FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        let loaded: EngineConfig = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| WipeError::Config(e.to_string()))?;

        tracing::debug!(
            buffer_size = loaded.buffer_size,
            workers = loaded.workers,
            progress_interval_ms = loaded.progress_interval_ms,
            reseed_interval = loaded.reseed_interval,
            "configuration loaded"
        );

        Ok(loaded)
    }

    /// `<config_dir>/wipe-engine/config.toml` for the current user
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "wipe-engine")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.buffer_size == 0 {
            return Err(WipeError::Config(
                "buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(WipeError::Config(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.workers > MAX_WORKERS {
            return Err(WipeError::Config(format!(
                "workers must be at most {} (got {})",
                MAX_WORKERS, self.workers
            )));
        }
        if self.reseed_interval == 0 {
            return Err(WipeError::Config(
                "reseed_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}
