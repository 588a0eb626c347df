//! Keyed bijections on `[0, 2^bits)` for any width up to 64 bits.
//!
//! The value is split into a low half of `bits / 2` bits and a high half of the remaining bits.
//! Each round XORs a keyed function of one half into the other, alternating, so every round (and
//! hence the whole network) is invertible no matter what the round function does. Odd widths just
//! make the halves differ by one bit.

/// Number of round keys in a key set.
pub(crate) const MAX_ROUNDS: usize = 8;

// Widths up to this many bits have halves of at most 8 bits, which need the extra rounds.
const NARROW_BITS: u32 = 16;
const WIDE_ROUNDS: usize = 6;

pub(crate) type FeistelKeys = [u32; MAX_ROUNDS];

pub(crate) fn rounds(bits: u32) -> usize {
    if bits <= NARROW_BITS {
        MAX_ROUNDS
    } else {
        WIDE_ROUNDS
    }
}

/// Encrypts `n`, which must be below `2^bits`.
pub(crate) fn feistel(keys: &FeistelKeys, n: u64, bits: u32) -> u64 {
    debug_assert!(bits <= 64, "feistel width {bits} out of range");
    debug_assert!(bits == 64 || n >> bits == 0, "{n} does not fit in {bits} bits");

    let lo_bits = bits / 2;
    let hi_bits = bits - lo_bits;
    let lo_mask = low_mask(lo_bits);
    let hi_mask = low_mask(hi_bits);

    let mut lo = (n as u32) & lo_mask;
    // `lo_bits` is at most 32, so this shift is always in range.
    let mut hi = ((n >> lo_bits) as u32) & hi_mask;

    for (round, &key) in keys[..rounds(bits)].iter().enumerate() {
        if round % 2 == 0 {
            lo ^= round_fn(hi, key) & lo_mask;
        } else {
            hi ^= round_fn(lo, key) & hi_mask;
        }
    }

    (u64::from(hi) << lo_bits) | u64::from(lo)
}

fn low_mask(bits: u32) -> u32 {
    u32::MAX.checked_shr(32 - bits).unwrap_or(0)
}

// murmur3's finalizer over the keyed input. Every output bit depends on every input bit, which
// matters because only the low bits of the result survive the mask.
#[inline]
fn round_fn(half: u32, key: u32) -> u32 {
    let mut h = half ^ key;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85EB_CA6B);
    h ^= h >> 13;
    h = h.wrapping_mul(0xC2B2_AE35);
    h ^= h >> 16;
    h.wrapping_add(key.rotate_left(16))
}
