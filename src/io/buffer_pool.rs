// Pattern buffer pool: pre-filled, page-aligned buffers for every overwrite pattern

use crate::algorithms::PatternKind;
use crate::crypto::PatternRng;
use crate::{EngineResult, WipeError};
use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;

/// Alignment requirements for Direct I/O
pub const SECTOR_SIZE: usize = 512;
pub const PAGE_SIZE: usize = 4096;

/// Default pattern buffer size (4MB)
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// The fixed byte patterns the pool keeps resident
pub const FIXED_PATTERNS: [u8; 4] = [0x00, 0xFF, 0xAA, 0x55];

/// Aligned heap buffer, never reallocated after construction
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
    size: usize,
}

impl AlignedBuffer {
    /// Allocate `size` bytes aligned to `alignment` (zeroed)
    pub fn new(size: usize, alignment: usize) -> EngineResult<Self> {
        if !alignment.is_power_of_two() {
            return Err(WipeError::Allocation(format!(
                "alignment {} is not a power of 2",
                alignment
            )));
        }
        if size == 0 {
            return Err(WipeError::Allocation(
                "buffer size must be non-zero".to_string(),
            ));
        }

        let layout = Layout::from_size_align(size, alignment)
            .map_err(|e| WipeError::Allocation(e.to_string()))?;

        let ptr = unsafe {
            let raw_ptr = alloc(layout);
            match NonNull::new(raw_ptr) {
                Some(ptr) => ptr,
                None => {
                    return Err(WipeError::Allocation(format!(
                        "failed to allocate {} bytes",
                        size
                    )))
                }
            }
        };

        let mut buffer = Self { ptr, layout, size };
        buffer.zero();
        Ok(buffer)
    }

    /// Create buffer aligned to page boundary (4KB)
    pub fn page_aligned(size: usize) -> EngineResult<Self> {
        Self::new(size, PAGE_SIZE)
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) }
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    pub fn zero(&mut self) {
        unsafe {
            std::ptr::write_bytes(self.ptr.as_ptr(), 0, self.size);
        }
    }

    /// Set every byte to `value`
    pub fn fill_byte(&mut self, value: u8) {
        fill_pattern(self.as_mut_slice(), value);
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        unsafe {
            dealloc(self.ptr.as_ptr(), self.layout);
        }
    }
}

// The buffer exclusively owns its allocation
unsafe impl Send for AlignedBuffer {}
unsafe impl Sync for AlignedBuffer {}

/// Fill `buf` with `value` using the widest vector stores the CPU supports.
///
/// Observable result is identical on every path: each byte equals `value`.
pub fn fill_pattern(buf: &mut [u8], value: u8) {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") {
            // SAFETY: feature presence checked at runtime
            unsafe { fill_avx2(buf, value) };
            return;
        }
        // SSE2 is part of the x86_64 baseline
        unsafe { fill_sse2(buf, value) };
    }

    #[cfg(not(target_arch = "x86_64"))]
    buf.fill(value);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn fill_avx2(buf: &mut [u8], value: u8) {
    use std::arch::x86_64::{__m256i, _mm256_set1_epi8, _mm256_storeu_si256};

    let v = _mm256_set1_epi8(value as i8);
    let mut chunks = buf.chunks_exact_mut(32);
    for chunk in &mut chunks {
        _mm256_storeu_si256(chunk.as_mut_ptr() as *mut __m256i, v);
    }
    chunks.into_remainder().fill(value);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn fill_sse2(buf: &mut [u8], value: u8) {
    use std::arch::x86_64::{__m128i, _mm_set1_epi8, _mm_storeu_si128};

    let v = _mm_set1_epi8(value as i8);
    let mut chunks = buf.chunks_exact_mut(16);
    for chunk in &mut chunks {
        _mm_storeu_si128(chunk.as_mut_ptr() as *mut __m128i, v);
    }
    chunks.into_remainder().fill(value);
}

/// Random-pattern buffer owned by a single worker.
///
/// Regenerated immediately before every random pass, so no two passes ever
/// write the same random content and no other thread can observe it mid-fill.
pub struct RandomBuffer {
    buffer: AlignedBuffer,
    rng: PatternRng,
    generation: u64,
}

impl RandomBuffer {
    pub fn new(size: usize, reseed_interval: u64) -> EngineResult<Self> {
        let mut buffer = AlignedBuffer::page_aligned(size)?;
        let mut rng = PatternRng::new(reseed_interval)?;
        rng.fill_bytes(buffer.as_mut_slice());

        Ok(Self {
            buffer,
            rng,
            generation: 0,
        })
    }

    /// Draw fresh bytes for the next random pass
    pub fn regenerate(&mut self) -> &[u8] {
        self.rng.fill_bytes(self.buffer.as_mut_slice());
        self.generation += 1;
        self.buffer.as_slice()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    pub fn size(&self) -> usize {
        self.buffer.size()
    }

    /// Number of regenerations so far
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A pattern-tagged view of one pool buffer, valid for one pass
#[derive(Clone, Copy)]
pub struct BufferHandle<'a> {
    pattern: PatternKind,
    data: &'a [u8],
}

impl<'a> BufferHandle<'a> {
    pub fn pattern(&self) -> PatternKind {
        self.pattern
    }

    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Owner of the resident fixed-pattern buffers.
///
/// Fixed buffers are read-only once [`PatternBufferPool::initialize`] returns
/// and are shared by every worker without locking. Random content never lives
/// here: each execution unit brings its own [`RandomBuffer`].
pub struct PatternBufferPool {
    fixed: Vec<(u8, AlignedBuffer)>,
    buffer_size: usize,
    reseed_interval: u64,
}

impl PatternBufferPool {
    /// Allocate and fill one buffer per fixed pattern.
    ///
    /// Any allocation failure is fatal for the whole run.
    pub fn initialize(buffer_size: usize, reseed_interval: u64) -> EngineResult<Self> {
        let mut fixed = Vec::with_capacity(FIXED_PATTERNS.len());
        for &value in FIXED_PATTERNS.iter() {
            let mut buffer = AlignedBuffer::page_aligned(buffer_size)?;
            buffer.fill_byte(value);
            fixed.push((value, buffer));
        }

        tracing::debug!(
            buffer_size,
            buffers = fixed.len(),
            "pattern buffer pool initialized"
        );

        Ok(Self {
            fixed,
            buffer_size,
            reseed_interval,
        })
    }

    /// Allocate a random buffer for one execution unit (worker or dispatcher)
    pub fn random_buffer(&self) -> EngineResult<RandomBuffer> {
        RandomBuffer::new(self.buffer_size, self.reseed_interval)
    }

    /// Buffer for `pattern`.
    ///
    /// Fixed patterns are an O(1) lookup into shared memory. `Random`
    /// regenerates the caller's own `random` buffer and hands that out.
    pub fn get<'a>(
        &'a self,
        pattern: PatternKind,
        random: &'a mut RandomBuffer,
    ) -> EngineResult<BufferHandle<'a>> {
        let data = match pattern {
            PatternKind::FixedByte(value) => self.fixed(value).ok_or_else(|| {
                WipeError::Config(format!("no resident buffer for pattern 0x{:02X}", value))
            })?,
            PatternKind::Random => random.regenerate(),
        };

        Ok(BufferHandle { pattern, data })
    }

    fn fixed(&self, value: u8) -> Option<&[u8]> {
        self.fixed
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, buffer)| buffer.as_slice())
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Release every buffer. Only called once all workers have finished.
    pub fn teardown(self) {
        tracing::debug!(
            released_bytes = self.buffer_size * self.fixed.len(),
            "pattern buffer pool released"
        );
    }
}
