use arrayref::array_ref;
use rand_core_0_9::{RngCore, SeedableRng};

use crate::Rand;

/// Integration with rand_core v0.9 / rand v0.9. Requires crate feature `rand_core_0_9`.
///
/// The trait methods simply delegate to the equivalent inherent methods. `next_u32` maps to
/// [`Rand::rand_u32`], and so on.
impl RngCore for Rand {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.rand_u32()
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.rand_u64()
    }

    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rand_n(dest);
    }
}

/// The seed is the little-endian seed followed by the little-endian stream number, so
/// `from_seed` is equivalent to [`Rand::with_stream`]. `seed_from_u64` is [`Rand::new`].
impl SeedableRng for Rand {
    type Seed = [u8; 16];

    #[inline]
    fn from_seed(seed: [u8; 16]) -> Self {
        let s = u64::from_le_bytes(*array_ref![seed, 0, 8]);
        let stream = u64::from_le_bytes(*array_ref![seed, 8, 8]);
        Self::with_stream(s, stream)
    }

    #[inline]
    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}
