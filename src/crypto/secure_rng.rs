use crate::{EngineResult, WipeError};
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

/// Bytes a generator emits before it is reseeded from the OS (1 GiB)
pub const DEFAULT_RESEED_INTERVAL: u64 = 1024 * 1024 * 1024;

/// Size of the block compared by the continuous repetition test
const CONTINUOUS_TEST_BLOCK: usize = 16;

/// Pseudorandom pattern generator owned by exactly one worker.
///
/// Each instance is seeded independently from the OS entropy source, so two
/// workers never share a stream. Output is a ChaCha keystream (`StdRng`),
/// fast enough to refill a multi-megabyte buffer before every random pass.
pub struct PatternRng {
    rng: StdRng,
    bytes_since_reseed: u64,
    max_bytes_before_reseed: u64,
    /// Leading block of the previous fill, for the continuous test
    last_block: Option<[u8; CONTINUOUS_TEST_BLOCK]>,
}

impl PatternRng {
    pub fn new(max_bytes_before_reseed: u64) -> EngineResult<Self> {
        let rng = StdRng::from_rng(OsRng).map_err(|e| {
            WipeError::Allocation(format!("cannot seed random pattern source: {}", e))
        })?;

        Ok(Self {
            rng,
            bytes_since_reseed: 0,
            max_bytes_before_reseed: max_bytes_before_reseed.max(1),
            last_block: None,
        })
    }

    /// Fill `dest` with fresh pseudorandom bytes
    pub fn fill_bytes(&mut self, dest: &mut [u8]) {
        if self.bytes_since_reseed >= self.max_bytes_before_reseed {
            self.reseed();
        }

        self.rng.fill_bytes(dest);
        self.bytes_since_reseed = self.bytes_since_reseed.saturating_add(dest.len() as u64);

        // Continuous test: a fill must never repeat the previous fill's leading block
        if dest.len() >= CONTINUOUS_TEST_BLOCK {
            let mut block = [0u8; CONTINUOUS_TEST_BLOCK];
            block.copy_from_slice(&dest[..CONTINUOUS_TEST_BLOCK]);

            if self.last_block == Some(block) {
                tracing::warn!("random pattern repeated its previous block, reseeding");
                self.reseed();
                self.rng.fill_bytes(dest);
                block.copy_from_slice(&dest[..CONTINUOUS_TEST_BLOCK]);
            }
            self.last_block = Some(block);
        }
    }

    pub fn bytes_since_reseed(&self) -> u64 {
        self.bytes_since_reseed
    }

    fn reseed(&mut self) {
        match StdRng::from_rng(OsRng) {
            Ok(rng) => {
                self.rng = rng;
                self.bytes_since_reseed = 0;
                tracing::debug!("random pattern source reseeded");
            }
            // Keep the current stream; it is still unpredictable, just longer-lived
            Err(e) => tracing::warn!(error = %e, "reseeding random pattern source failed"),
        }
    }
}
