pub mod secure_rng;

#[cfg(test)]
mod secure_rng_tests;

// Re-export
pub use secure_rng::{PatternRng, DEFAULT_RESEED_INTERVAL};
