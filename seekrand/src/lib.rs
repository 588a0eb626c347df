//! Seekable, counter-based random streams and the unique sequences derived from them.
//!
//! [`Rand`] is a Threefry-4x64-20 stream in counter mode: every 256 bytes of output are a pure
//! function of the key and a 64-bit counter, so the stream can be repositioned in O(1) with
//! [`Rand::seek`] and the output never depends on how it was read (one big [`Rand::rand_n`], or
//! many small reads of any size). The byte order is little-endian on every host.
//!
//! [`Rand::enable_ortho`] switches to a disjoint counter space so that callers can draw extra
//! values without disturbing the primary stream, and [`Rand::get_seq`] spawns a [`RandSeq`] that
//! writes random-access sequences of unique values, optionally with a minimum pairwise Hamming
//! distance.
//!
//! ```
//! use seekrand::{Rand, SeqType};
//!
//! let mut rng = Rand::new(42);
//! let x = rng.rand_u64();
//! let die = rng.rand_range(6);
//! assert!(die < 6);
//!
//! let seq = rng.get_seq(SeqType::Dist2, 2);
//! let mut buf = [0u8; 2 * 16];
//! seq.write(&mut buf, 0, 16).unwrap();
//!
//! rng.seek(0);
//! assert_eq!(rng.rand_u64(), x);
//! ```
#![forbid(unsafe_op_in_unsafe_fn)]
#![no_std]

// Needed for runtime CPU feature detection, and by the tests.
#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

mod backend;
pub mod config;
mod error;
mod feistel;
mod perm;
#[cfg(feature = "rand_core_0_6")]
mod rand_core_0_6;
#[cfg(feature = "rand_core_0_9")]
mod rand_core_0_9;
mod seq;

use core::fmt;

use arrayref::array_ref;

use backend::{BLOCK_WORDS, BUF_BYTES, LANES};

pub use backend::Backend;
pub use error::{RandError, RandResult};
pub use seq::{RandSeq, SeqType};

/// Number of 64-bit words produced by one invocation of the block function.
pub const BLOCK_OUTPUT_WORDS: usize = LANES * BLOCK_WORDS;

// First tweak word of every orthogonal counter space. Primary streams use zero.
const ORTHO_TAG: u64 = u64::from_le_bytes(*b"orthogon");

// Block counters are taken modulo 2^56, so the stream repeats after exactly 2^64 bytes and every
// position is reachable by `seek`.
const CTR_MASK: u64 = u64::MAX / BUF_BYTES as u64;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Threefry key schedule: four key words plus their parity word.
///
/// The fifth word is always `PARITY ^ k0 ^ k1 ^ k2 ^ k3`; the type cannot be constructed any
/// other way.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Key([u64; 5]);

impl Key {
    /// The Threefish key schedule parity constant.
    pub const PARITY: u64 = 0x1BD1_1BDA_A9FC_1A22;

    /// Builds a key from four raw words, computing the parity word.
    pub fn new(words: [u64; 4]) -> Self {
        let [k0, k1, k2, k3] = words;
        Self([k0, k1, k2, k3, Self::PARITY ^ k0 ^ k1 ^ k2 ^ k3])
    }

    /// Expands a seed and a stream number into a key.
    ///
    /// The first two words are bijections of `seed` and `stream` respectively, so distinct
    /// `(seed, stream)` pairs never share a key.
    pub fn expand(seed: u64, stream: u64) -> Self {
        let k0 = fmix64(seed.wrapping_add(GOLDEN_GAMMA));
        let k1 = fmix64(stream.wrapping_add(GOLDEN_GAMMA.wrapping_mul(2)));
        let k2 = fmix64((k0 ^ k1.rotate_left(32)).wrapping_add(GOLDEN_GAMMA.wrapping_mul(3)));
        let k3 = fmix64(k0.wrapping_add(k1).wrapping_add(GOLDEN_GAMMA.wrapping_mul(4)));
        Self::new([k0, k1, k2, k3])
    }

    pub fn words(&self) -> &[u64; 5] {
        &self.0
    }
}

// SplitMix64 finalizer, a bijection on u64.
fn fmix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// None of the backends require this alignment for soundness, but SIMD stores that cross 32-byte
// boundaries are slightly slower on a bunch of CPUs.
#[derive(Clone, Copy)]
#[repr(align(32))]
struct Buffer {
    bytes: [u8; BUF_BYTES],
}

// Primary stream position parked while orthogonal mode is active.
#[derive(Clone)]
struct Parked {
    ctr: u64,
    tweak: [u64; 2],
    bytes_consumed: usize,
    filled: bool,
    buf: Buffer,
}

/// A seekable pseudorandom byte stream.
///
/// Two generators compare equal when they have the same key and the same position (including
/// any parked orthogonal state), which implies they will produce the same output from here on.
#[derive(Clone)]
pub struct Rand {
    backend: Backend,
    key: Key,
    // Block containing the read position. `buf` holds its output iff `filled`.
    ctr: u64,
    tweak: [u64; 2],
    // Always `< BUF_BYTES`; moving past the end of a block bumps `ctr` instead.
    bytes_consumed: usize,
    filled: bool,
    parked: Option<Parked>,
    buf: Buffer,
}

impl Rand {
    pub fn new(seed: u64) -> Self {
        Self::with_stream(seed, 0)
    }

    /// Creates the generator for stream number `stream` of `seed`.
    ///
    /// Different streams of the same seed are unrelated to each other.
    pub fn with_stream(seed: u64, stream: u64) -> Self {
        Self::with_backend(seed, stream, Backend::detect_best())
    }

    pub fn with_backend(seed: u64, stream: u64, backend: Backend) -> Self {
        Self::from_key(Key::expand(seed, stream), backend)
    }

    pub(crate) fn from_key(key: Key, backend: Backend) -> Self {
        Self {
            backend,
            key,
            ctr: 0,
            tweak: [0; 2],
            bytes_consumed: 0,
            filled: false,
            parked: None,
            buf: Buffer {
                bytes: [0; BUF_BYTES],
            },
        }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.reseed_stream(seed, 0);
    }

    /// Replaces the key and rewinds to offset 0. Also leaves orthogonal mode.
    pub fn reseed_stream(&mut self, seed: u64, stream: u64) {
        tracing::trace!(seed, stream, "reseeding");
        self.key = Key::expand(seed, stream);
        self.ctr = 0;
        self.tweak = [0; 2];
        self.bytes_consumed = 0;
        self.filled = false;
        self.parked = None;
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Returns the next eight bytes of the stream as a little-endian integer.
    #[inline]
    pub fn rand_u64(&mut self) -> u64 {
        if let Some(src) = self.cached().first_chunk::<8>() {
            let result = u64::from_le_bytes(*src);
            self.consume(8);
            return result;
        }
        // Straddles two blocks, only possible after an unaligned read or seek.
        let mut bytes = [0; 8];
        self.rand_n(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    /// Returns the next four bytes of the stream as a little-endian integer.
    #[inline]
    pub fn rand_u32(&mut self) -> u32 {
        if let Some(src) = self.cached().first_chunk::<4>() {
            let result = u32::from_le_bytes(*src);
            self.consume(4);
            return result;
        }
        let mut bytes = [0; 4];
        self.rand_n(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    /// Fills `dest` with the next `dest.len()` bytes of the stream.
    pub fn rand_n(&mut self, dest: &mut [u8]) {
        if dest.is_empty() {
            return;
        }

        let mut drained = 0;
        if self.filled || self.bytes_consumed != 0 {
            let src = self.cached();
            drained = src.len().min(dest.len());
            dest[..drained].copy_from_slice(&src[..drained]);
            self.consume(drained);
        }
        let dest = &mut dest[drained..];

        // Now `dest` is empty or we're at the start of an unfilled block, so whole blocks can
        // go straight to the destination without a detour through the cache.
        let (blocks, tail) = dest.as_chunks_mut::<BUF_BYTES>();
        for block in blocks {
            debug_assert!(!self.filled && self.bytes_consumed == 0);
            self.backend.refill(&self.key, &self.block_input(), block);
            self.ctr = self.ctr.wrapping_add(1) & CTR_MASK;
        }

        if !tail.is_empty() {
            let src = self.cached();
            tail.copy_from_slice(&src[..tail.len()]);
            self.consume(tail.len());
        }
    }

    /// Returns a value uniformly distributed in `[0, n)`, or 0 if `n` is 0 or 1.
    ///
    /// Always consumes exactly one 64-bit value. The result is the high half of the 128-bit
    /// product of that value and `n`, which is biased by at most `n / 2^64`.
    pub fn rand_range(&mut self, n: u64) -> u64 {
        let r = self.rand_u64();
        ((u128::from(r) * u128::from(n)) >> 64) as u64
    }

    /// Current position in the stream, in bytes.
    ///
    /// The stream has a period of 2^64 bytes, so reading past offset `u64::MAX` continues at 0.
    pub fn getoffset(&self) -> u64 {
        self.ctr
            .wrapping_mul(BUF_BYTES as u64)
            .wrapping_add(self.bytes_consumed as u64)
    }

    /// Moves to byte `offset` of the stream. Nothing is generated until the next read.
    pub fn seek(&mut self, offset: u64) {
        let ctr = offset / BUF_BYTES as u64;
        if ctr != self.ctr {
            self.ctr = ctr;
            self.filled = false;
        }
        self.bytes_consumed = (offset % BUF_BYTES as u64) as usize;
    }

    /// Switches to a counter space derived from the current offset.
    ///
    /// Values drawn until the matching [`Rand::disable_ortho`] neither depend on nor affect the
    /// primary stream. Orthogonal mode does not nest.
    pub fn enable_ortho(&mut self) {
        debug_assert!(self.parked.is_none(), "orthogonal mode is already enabled");
        if self.parked.is_some() {
            return;
        }
        let offset = self.getoffset();
        tracing::trace!(offset, "entering orthogonal stream");
        self.parked = Some(Parked {
            ctr: self.ctr,
            tweak: self.tweak,
            bytes_consumed: self.bytes_consumed,
            filled: self.filled,
            buf: self.buf,
        });
        self.ctr = 0;
        self.tweak = [ORTHO_TAG, offset];
        self.bytes_consumed = 0;
        self.filled = false;
    }

    /// Returns to the primary stream and skips `consumed` 64-bit values of it.
    ///
    /// Whatever was drawn in orthogonal mode is forgotten, so the resulting state only depends on
    /// the state before [`Rand::enable_ortho`] and on `consumed`.
    pub fn disable_ortho(&mut self, consumed: u64) {
        debug_assert!(self.parked.is_some(), "orthogonal mode is not enabled");
        let Some(parked) = self.parked.take() else {
            return;
        };
        tracing::trace!(consumed, "leaving orthogonal stream");
        self.ctr = parked.ctr;
        self.tweak = parked.tweak;
        self.bytes_consumed = parked.bytes_consumed;
        self.filled = parked.filled;
        self.buf = parked.buf;
        self.seek(self.getoffset().wrapping_add(consumed.wrapping_mul(8)));
    }

    pub fn is_ortho(&self) -> bool {
        self.parked.is_some()
    }

    /// Spawns a sequence generator keyed by the next value of this stream.
    ///
    /// For [`SeqType::Num`], `size` is the largest value in the sequence. For the distance kinds it
    /// is the element width in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero for a distance kind.
    pub fn get_seq(&mut self, kind: SeqType, size: u32) -> RandSeq {
        let seed = self.rand_u64();
        tracing::debug!(?kind, size, offset = self.getoffset(), "spawning sequence");
        RandSeq::new(kind, size, seed, self.backend)
    }

    // Block counter and tweak for the block at the read position. Word 1 is the lane number,
    // filled in by the backend.
    fn block_input(&self) -> [u64; 4] {
        [self.ctr, 0, self.tweak[0], self.tweak[1]]
    }

    // Unread bytes of the current block, generating it first if needed.
    #[inline]
    fn cached(&mut self) -> &[u8] {
        if !self.filled {
            self.backend
                .refill(&self.key, &self.block_input(), &mut self.buf.bytes);
            self.filled = true;
        }
        &self.buf.bytes[self.bytes_consumed..]
    }

    #[inline]
    fn consume(&mut self, n: usize) {
        self.bytes_consumed += n;
        debug_assert!(self.bytes_consumed <= BUF_BYTES);
        if self.bytes_consumed == BUF_BYTES {
            self.ctr = self.ctr.wrapping_add(1) & CTR_MASK;
            self.bytes_consumed = 0;
            self.filled = false;
        }
    }
}

impl Default for Rand {
    /// Seeds from [`config::default_seed`].
    fn default() -> Self {
        Self::new(config::default_seed())
    }
}

impl PartialEq for Rand {
    fn eq(&self, other: &Self) -> bool {
        let parked_eq = match (&self.parked, &other.parked) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.ctr == b.ctr && a.tweak == b.tweak && a.bytes_consumed == b.bytes_consumed
            }
            _ => false,
        };
        self.key == other.key
            && self.ctr == other.ctr
            && self.tweak == other.tweak
            && self.bytes_consumed == other.bytes_consumed
            && parked_eq
    }
}

impl Eq for Rand {}

impl fmt::Debug for Rand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rand")
            .field("backend", &self.backend)
            .field("offset", &self.getoffset())
            .field("ortho", &self.is_ortho())
            .finish_non_exhaustive()
    }
}

// This impl block is here, not in the `backend` mod, to minimize that code that has access to
// `Backend`'s private fields.
impl Backend {
    /// The fastest backend available on this machine.
    ///
    /// Without the `std` feature, x86 and aarch64 backends are only used if the target features
    /// are enabled at compile time.
    pub fn detect_best() -> Self {
        backend::detect_best()
    }

    pub fn scalar() -> Self {
        backend::scalar()
    }

    pub fn x86_sse2() -> Option<Self> {
        backend::sse2::detect()
    }

    pub fn x86_avx2() -> Option<Self> {
        backend::avx2::detect()
    }

    pub fn aarch64_neon() -> Option<Self> {
        backend::neon::detect()
    }

    pub fn wasm32_simd128() -> Option<Self> {
        backend::simd128::detect()
    }

    /// Runs the block function for `counter` with a zero tweak.
    ///
    /// Word `4 * lane + i` of the result is word `i` of the Threefry block `[counter, lane, 0, 0]`.
    pub fn generate(self, key: &Key, counter: u64) -> [u64; BLOCK_OUTPUT_WORDS] {
        let mut bytes = [0; BUF_BYTES];
        self.refill(key, &[counter, 0, 0, 0], &mut bytes);
        core::array::from_fn(|i| u64::from_le_bytes(*array_ref![bytes, 8 * i, 8]))
    }

    /// Writes the raw output for `counter` into `buf`. Only for benchmarking.
    #[cfg(feature = "unstable_internals")]
    #[doc(hidden)]
    pub fn refill_raw(self, key: &Key, counter: u64, buf: &mut [u8; BUF_BYTES]) {
        self.refill(key, &[counter, 0, 0, 0], buf);
    }
}
