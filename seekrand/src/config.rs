//! Process-wide default seed.
//!
//! [`Rand::default`](crate::Rand::default) and anything else that isn't given a seed explicitly
//! reads it through [`default_seed`]. It can be set once with [`init_default_seed`], before the
//! first read; after that it never changes, so a generator constructed later in the process can't
//! observe a different value than one constructed earlier.

use alloc::boxed::Box;

use once_cell::race::OnceBox;

use crate::{RandError, RandResult};

/// Seed used when [`init_default_seed`] was never called.
pub const FALLBACK_SEED: u64 = 0x5EED_2025_0000_0001;

static DEFAULT_SEED: OnceBox<u64> = OnceBox::new();

/// Sets the default seed.
///
/// Fails with [`RandError::DefaultSeedFrozen`] if the seed was already set, or already read by
/// [`default_seed`] (which freezes it to [`FALLBACK_SEED`]).
pub fn init_default_seed(seed: u64) -> RandResult<()> {
    DEFAULT_SEED
        .set(Box::new(seed))
        .map_err(|_| RandError::DefaultSeedFrozen)?;
    tracing::debug!(seed, "default seed initialized");
    Ok(())
}

/// Returns the default seed, freezing it.
pub fn default_seed() -> u64 {
    *DEFAULT_SEED.get_or_init(|| Box::new(FALLBACK_SEED))
}

#[cfg(test)]
mod tests {
    use super::*;

    // The cell is process-wide, so everything that touches it lives in one test.
    #[test]
    fn default_seed_is_set_at_most_once() {
        let first = default_seed();
        assert_eq!(
            init_default_seed(first.wrapping_add(1)),
            Err(RandError::DefaultSeedFrozen)
        );
        assert_eq!(default_seed(), first);
        assert_eq!(crate::Rand::default(), crate::Rand::new(first));
    }
}
