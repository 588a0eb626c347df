use arrayref::array_ref;
use rand_core_0_6::{RngCore, SeedableRng};

use crate::Rand;

/// Integration with rand_core v0.6 / rand v0.8. Requires crate feature `rand_core_0_6`.
impl RngCore for Rand {
    fn next_u32(&mut self) -> u32 {
        self.rand_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rand_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rand_n(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core_0_6::Error> {
        self.rand_n(dest);
        Ok(())
    }
}

impl SeedableRng for Rand {
    type Seed = [u8; 16];

    fn from_seed(seed: [u8; 16]) -> Self {
        Self::with_stream(
            u64::from_le_bytes(*array_ref![seed, 0, 8]),
            u64::from_le_bytes(*array_ref![seed, 8, 8]),
        )
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}
