//! Random-access sequences of unique values.
//!
//! Element `i` of a sequence is a keyed bijection applied to `i`, so sequences are never stored or
//! shuffled: any sub-range can be written directly, and writing `[lo, lo + n)` in one call or one
//! element at a time gives the same bytes.
//!
//! The distance kinds encrypt `i` into a slightly narrower domain and spend the withheld bits on a
//! linear code. Multiplying by a polynomial `g` over GF(2) maps distinct values to distinct
//! multiples of `g`, and when `g` has the right shape any two multiples differ in at least 2 or 3
//! bits. A fixed random mask is XORed on top; that shifts every codeword by the same amount, so
//! distances are unchanged, but values like all-zero are no longer special.

use crate::{
    Backend, Key, Rand, RandError, RandResult,
    feistel::{FeistelKeys, feistel},
    perm::{self, PERM_MAX_ELEMS},
};

/// What a [`RandSeq`] produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeqType {
    /// A permutation of `0..=max`, written as little-endian `u32`s.
    Num,
    /// Unique values using every bit of the element.
    Dist1,
    /// Unique values, any two differing in at least 2 bits.
    Dist2,
    /// Unique values, any two differing in at least 3 bits.
    Dist3,
}

impl SeqType {
    /// Guaranteed minimum Hamming distance between two elements of one sequence.
    pub fn min_distance(self) -> u32 {
        match self {
            SeqType::Num | SeqType::Dist1 => 1,
            SeqType::Dist2 => 2,
            SeqType::Dist3 => 3,
        }
    }
}

/// Code parameters by code width in bytes (index 0 is 1 byte): `(d, a)` such that
/// `1 + x^a + x^d` is a primitive trinomial and `2^d - 1` is at least the code width in bits.
/// Multiples of a primitive polynomial of degree `d` shorter than `2^d - 1` bits form a shortened
/// Hamming code, whose minimum distance is 3.
const POLYTABLE: [(u32, u32); 8] = [
    (4, 1), //  8 bits <= 15
    (5, 2), // 16 bits <= 31
    (5, 2), // 24 bits <= 31
    (6, 1), // 32 bits <= 63
    (6, 1), // 40 bits <= 63
    (6, 1), // 48 bits <= 63
    (6, 1), // 56 bits <= 63
    (7, 1), // 64 bits <= 127
];

// Key expansion stream for the per-sequence keys, so they never coincide with a user stream of
// the same seed.
const SEQ_STREAM: u64 = u64::from_le_bytes(*b"randseq\0");

// Bytes of each element covered by the uniqueness guarantee.
const CODE_BYTES_MAX: usize = 8;

/// A sequence of unique values, spawned by [`Rand::get_seq`].
#[derive(Clone, Debug)]
pub struct RandSeq {
    kind: SeqType,
    // Maximum value for `Num`, element width in bytes otherwise.
    size: u32,
    feistel_keys: FeistelKeys,
    perm_key: u64,
    mask: u64,
    // Keys the stream that fills element bytes past `CODE_BYTES_MAX`.
    tail_key: Key,
    backend: Backend,
}

impl RandSeq {
    pub(crate) fn new(kind: SeqType, size: u32, seed: u64, backend: Backend) -> Self {
        assert!(
            kind == SeqType::Num || size > 0,
            "{kind:?} sequences need a nonzero element width"
        );
        let mut rng = Rand::from_key(Key::expand(seed, SEQ_STREAM), backend);
        let feistel_keys = core::array::from_fn(|_| rng.rand_u32());
        let perm_key = rng.rand_u64();
        let mask = rng.rand_u64();
        let tail_key = Key::new(core::array::from_fn(|_| rng.rand_u64()));
        Self {
            kind,
            size,
            feistel_keys,
            perm_key,
            mask,
            tail_key,
            backend,
        }
    }

    /// Number of elements in a sequence of this kind and size.
    ///
    /// `2^64` doesn't fit and is reported as `u64::MAX`.
    pub fn max_elements(kind: SeqType, size: u32) -> u64 {
        match kind {
            SeqType::Num => u64::from(size) + 1,
            _ if size == 0 => 0,
            _ => {
                let code_bytes = (size as usize).min(CODE_BYTES_MAX);
                let bits = 8 * code_bytes as u32 - withheld_bits(kind, code_bytes);
                1u64.checked_shl(bits).unwrap_or(u64::MAX)
            }
        }
    }

    /// Number of elements in this sequence.
    pub fn len(&self) -> u64 {
        Self::max_elements(self.kind, self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> SeqType {
        self.kind
    }

    /// Bytes per element in the output of [`RandSeq::write`].
    pub fn elem_bytes(&self) -> usize {
        match self.kind {
            SeqType::Num => size_of::<u32>(),
            _ => self.size as usize,
        }
    }

    /// Writes elements `start..start + count` to the front of `buf`, back to back.
    ///
    /// Fails without writing anything if the range overflows, reaches past [`RandSeq::len`], or
    /// doesn't fit in `buf`.
    pub fn write(&self, buf: &mut [u8], start: u64, count: u64) -> RandResult<()> {
        let end = start
            .checked_add(count)
            .ok_or(RandError::InvalidRange { start, count })?;
        let max = self.len();
        if end > max {
            tracing::debug!(start, count, max, "sequence write out of range");
            return Err(RandError::OutOfRange { end, max });
        }
        let need = count.saturating_mul(self.elem_bytes() as u64);
        let have = buf.len() as u64;
        if need > have {
            tracing::debug!(need, have, "sequence write buffer too small");
            return Err(RandError::BufferTooSmall { need, have });
        }

        // `need <= buf.len()`, so this can't truncate.
        let out = &mut buf[..need as usize];
        match self.kind {
            SeqType::Num if max <= PERM_MAX_ELEMS as u64 => self.fill_perm(out, start),
            SeqType::Num => self.fill_num(out, start),
            SeqType::Dist1 => self.fill_dist::<1>(out, start),
            SeqType::Dist2 => self.fill_dist::<2>(out, start),
            SeqType::Dist3 => self.fill_dist::<3>(out, start),
        }
        Ok(())
    }

    fn fill_perm(&self, out: &mut [u8], start: u64) {
        let n = self.len() as usize;
        let perm = perm::decode(perm::perm_index(self.perm_key, n), n);
        let (dest, _) = out.as_chunks_mut::<4>();
        for (d, &v) in dest.iter_mut().zip(&perm[start as usize..n]) {
            *d = u32::from(v).to_le_bytes();
        }
    }

    // Cycle walking: encrypt over the smallest power-of-two domain containing `0..=max`, and
    // re-encrypt while the result is above `max`. Since the cipher permutes the larger domain, the
    // walk from an in-range value must return to the range before it could cycle back to its
    // start, and the in-range results are again a permutation. Less than half the domain is out of
    // range, so the expected number of steps is below 2. There is no worst-case bound.
    fn fill_num(&self, out: &mut [u8], start: u64) {
        let max = u64::from(self.size);
        let bits = u64::BITS - max.leading_zeros();
        let (dest, _) = out.as_chunks_mut::<4>();
        for (i, d) in (start..).zip(dest) {
            let mut v = feistel(&self.feistel_keys, i, bits);
            while v > max {
                v = feistel(&self.feistel_keys, v, bits);
            }
            // `v <= max`, which came from a u32.
            *d = (v as u32).to_le_bytes();
        }
    }

    fn fill_dist<const D: u32>(&self, out: &mut [u8], start: u64) {
        let size = self.size as usize;
        let code_bytes = size.min(CODE_BYTES_MAX);
        let code_bits = 8 * code_bytes as u32;
        let kind = match D {
            1 => SeqType::Dist1,
            2 => SeqType::Dist2,
            _ => SeqType::Dist3,
        };
        let domain_bits = code_bits - withheld_bits(kind, code_bytes);
        let (d, a) = POLYTABLE[code_bytes - 1];
        let mask = match D {
            1 => 0,
            _ => self.mask & u64::MAX.checked_shr(64 - code_bits).unwrap_or(0),
        };

        let tail_bytes = size - code_bytes;
        let mut tail = (tail_bytes > 0).then(|| {
            let mut rng = Rand::from_key(self.tail_key, self.backend);
            rng.seek(start.wrapping_mul(tail_bytes as u64));
            rng
        });

        for (i, elem) in (start..).zip(out.chunks_exact_mut(size)) {
            let v = feistel(&self.feistel_keys, i, domain_bits);
            // `v` has at most `code_bits - d` bits, so none of these shifts lose anything.
            let coded = match D {
                1 => v,
                2 => v ^ (v << 1),
                _ => v ^ (v << a) ^ (v << d),
            };
            let (code, rest) = elem.split_at_mut(code_bytes);
            code.copy_from_slice(&(coded ^ mask).to_le_bytes()[..code_bytes]);
            if let Some(tail) = &mut tail {
                tail.rand_n(rest);
            }
        }
    }
}

fn withheld_bits(kind: SeqType, code_bytes: usize) -> u32 {
    match kind {
        SeqType::Num | SeqType::Dist1 => 0,
        SeqType::Dist2 => 1,
        SeqType::Dist3 => POLYTABLE[code_bytes - 1].0,
    }
}

#[cfg(test)]
mod tests {
    use std::{vec, vec::Vec};

    use super::*;

    // Multiplies `v` by the table polynomial over GF(2) the slow way.
    fn clmul(v: u64, poly: u64) -> u128 {
        (0..64)
            .filter(|bit| poly >> bit & 1 == 1)
            .fold(0, |acc, bit| acc ^ (u128::from(v) << bit))
    }

    #[test]
    fn polytable_degrees_cover_code_width() {
        for (i, &(d, a)) in POLYTABLE.iter().enumerate() {
            let code_bits = 8 * (i as u32 + 1);
            assert!((1u64 << d) - 1 >= u64::from(code_bits), "width {}", i + 1);
            assert!(0 < a && a < d);
        }
    }

    // A primitive polynomial of degree d has order 2^d - 1: x^k = 1 (mod g) for no smaller k > 0.
    #[test]
    fn polytable_trinomials_are_primitive() {
        for &(d, a) in &POLYTABLE {
            let g = (1u64 << d) | (1 << a) | 1;
            let period = (1u64 << d) - 1;
            let mut x = 1u64;
            for k in 1..=period {
                x <<= 1;
                if x >> d & 1 == 1 {
                    x ^= g;
                }
                assert_eq!(x == 1, k == period, "d = {d}, a = {a}, k = {k}");
            }
        }
    }

    #[test]
    fn folding_is_polynomial_multiplication() {
        let (d, a) = POLYTABLE[3];
        let poly = (1 << d) | (1 << a) | 1;
        let mut rng = Rand::new(3);
        for _ in 0..100 {
            let v = rng.rand_u64() >> (64 - (32 - d));
            assert_eq!(u128::from(v ^ (v << a) ^ (v << d)), clmul(v, poly));
        }
    }

    #[test]
    fn max_elements_by_kind() {
        assert_eq!(RandSeq::max_elements(SeqType::Num, 0), 1);
        assert_eq!(RandSeq::max_elements(SeqType::Num, 999), 1000);
        assert_eq!(RandSeq::max_elements(SeqType::Num, u32::MAX), 1 << 32);
        assert_eq!(RandSeq::max_elements(SeqType::Dist1, 1), 256);
        assert_eq!(RandSeq::max_elements(SeqType::Dist2, 1), 128);
        assert_eq!(RandSeq::max_elements(SeqType::Dist3, 1), 16);
        assert_eq!(RandSeq::max_elements(SeqType::Dist3, 4), 1 << 26);
        assert_eq!(RandSeq::max_elements(SeqType::Dist1, 8), u64::MAX);
        assert_eq!(RandSeq::max_elements(SeqType::Dist1, 12), u64::MAX);
        assert_eq!(RandSeq::max_elements(SeqType::Dist2, 12), 1 << 63);
        assert_eq!(RandSeq::max_elements(SeqType::Dist3, 12), 1 << 57);
        assert_eq!(RandSeq::max_elements(SeqType::Dist2, 0), 0);
    }

    #[test]
    fn rejects_bad_ranges() {
        let seq = Rand::new(1).get_seq(SeqType::Dist1, 1);
        let mut buf = vec![0u8; 300];
        assert_eq!(
            seq.write(&mut buf, u64::MAX, 2),
            Err(RandError::InvalidRange {
                start: u64::MAX,
                count: 2
            })
        );
        assert_eq!(
            seq.write(&mut buf, 200, 57),
            Err(RandError::OutOfRange { end: 257, max: 256 })
        );
        assert_eq!(
            seq.write(&mut buf[..10], 0, 11),
            Err(RandError::BufferTooSmall { need: 11, have: 10 })
        );
        assert!(seq.write(&mut buf, 256, 0).is_ok());
        assert!(buf.iter().all(|&b| b == 0), "failed writes must not touch the buffer");
    }

    #[test]
    fn leaves_rest_of_buffer_alone() {
        let seq = Rand::new(2).get_seq(SeqType::Dist2, 3);
        let mut buf = vec![0xAA; 3 * 5 + 7];
        seq.write(&mut buf, 10, 5).unwrap();
        assert!(buf[15..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn num_walks_into_range() {
        let max = 1000;
        let seq = Rand::new(4).get_seq(SeqType::Num, max);
        let mut buf = vec![0u8; 4 * (max as usize + 1)];
        seq.write(&mut buf, 0, u64::from(max) + 1).unwrap();
        let mut values: Vec<u32> = buf
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        values.sort_unstable();
        assert_eq!(values, (0..=max).collect::<Vec<_>>());
    }

    #[test]
    fn small_num_uses_every_permutation_slot() {
        for max in 0..PERM_MAX_ELEMS as u32 {
            let seq = Rand::new(u64::from(max)).get_seq(SeqType::Num, max);
            let n = max as usize + 1;
            let mut buf = vec![0u8; 4 * n];
            seq.write(&mut buf, 0, n as u64).unwrap();
            let mut values: Vec<u32> = buf
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
                .collect();
            values.sort_unstable();
            assert_eq!(values, (0..=max).collect::<Vec<_>>());
        }
    }

    #[test]
    fn distance_masks_differ_between_sequences() {
        let mut rng = Rand::new(5);
        let a = rng.get_seq(SeqType::Dist2, 4);
        let b = rng.get_seq(SeqType::Dist2, 4);
        assert_ne!(a.mask, b.mask);
        assert_ne!(a.feistel_keys, b.feistel_keys);
    }

    #[test]
    #[should_panic(expected = "nonzero element width")]
    fn zero_width_distance_sequence_panics() {
        Rand::new(6).get_seq(SeqType::Dist3, 0);
    }
}
