// Tests for the per-worker pattern generator

use super::secure_rng::*;

#[test]
fn test_fill_produces_non_degenerate_output() {
    let mut rng = PatternRng::new(DEFAULT_RESEED_INTERVAL).unwrap();
    let mut buf = vec![0u8; 64 * 1024];
    rng.fill_bytes(&mut buf);

    // A 64KB ChaCha block will contain (practically) every byte value
    let mut seen = [false; 256];
    for &b in &buf {
        seen[b as usize] = true;
    }
    assert!(seen.iter().filter(|&&s| s).count() > 250);
    assert!(!buf.iter().all(|&b| b == buf[0]));
}

#[test]
fn test_consecutive_fills_differ() {
    let mut rng = PatternRng::new(DEFAULT_RESEED_INTERVAL).unwrap();
    let mut a = vec![0u8; 4096];
    let mut b = vec![0u8; 4096];
    rng.fill_bytes(&mut a);
    rng.fill_bytes(&mut b);
    assert_ne!(a, b);
}

#[test]
fn test_independent_generators_differ() {
    let mut first = PatternRng::new(DEFAULT_RESEED_INTERVAL).unwrap();
    let mut second = PatternRng::new(DEFAULT_RESEED_INTERVAL).unwrap();
    let mut a = vec![0u8; 4096];
    let mut b = vec![0u8; 4096];
    first.fill_bytes(&mut a);
    second.fill_bytes(&mut b);
    assert_ne!(a, b, "separately seeded generators must not share a stream");
}

#[test]
fn test_reseed_counter_resets() {
    let mut rng = PatternRng::new(1024).unwrap();
    let mut buf = vec![0u8; 1024];

    rng.fill_bytes(&mut buf);
    assert_eq!(rng.bytes_since_reseed(), 1024);

    // Threshold reached: the next fill reseeds first
    rng.fill_bytes(&mut buf);
    assert_eq!(rng.bytes_since_reseed(), 1024);
}

#[test]
fn test_zero_reseed_interval_is_clamped() {
    let mut rng = PatternRng::new(0).unwrap();
    let mut buf = [0u8; 32];
    rng.fill_bytes(&mut buf);
    rng.fill_bytes(&mut buf);
    assert_eq!(rng.bytes_since_reseed(), 32);
}
