//! Exact permutations of tiny domains, selected by index.
//!
//! A Feistel network over two or three bits has far fewer distinct keys than there are
//! permutations and visibly fails to mix, so domains of up to [`PERM_MAX_ELEMS`] elements decode
//! their permutation from a Lehmer code instead.

/// Largest domain handled here.
pub(crate) const PERM_MAX_ELEMS: usize = 10;

/// `n!` for every `n` up to [`PERM_MAX_ELEMS`].
const FACTORIALS: [u64; PERM_MAX_ELEMS + 1] = {
    let mut f = [1u64; PERM_MAX_ELEMS + 1];
    let mut i = 1;
    while i <= PERM_MAX_ELEMS {
        f[i] = f[i - 1] * i as u64;
        i += 1;
    }
    f
};

/// Maps a uniformly random 64-bit value onto an index in `[0, n!)`.
pub(crate) fn perm_index(key: u64, n: usize) -> u64 {
    debug_assert!(n <= PERM_MAX_ELEMS);
    ((u128::from(key) * u128::from(FACTORIALS[n])) >> 64) as u64
}

/// Decodes permutation number `index` of `0..n`, with `index < n!`.
///
/// Only the first `n` entries of the result are meaningful.
pub(crate) fn decode(index: u64, n: usize) -> [u8; PERM_MAX_ELEMS] {
    debug_assert!(n <= PERM_MAX_ELEMS && index < FACTORIALS[n]);

    // Factorial-base digits, most significant first: digit `i` is in `0..n - i`.
    let mut perm = [0u8; PERM_MAX_ELEMS];
    let mut rest = index;
    for (i, digit) in perm[..n].iter_mut().enumerate() {
        let place = FACTORIALS[n - 1 - i];
        *digit = (rest / place) as u8;
        rest %= place;
    }

    // Each digit counts the smaller values that are still unused at its position. Walking from
    // the back, bump every later entry that is not smaller than the current one.
    for i in (0..n).rev() {
        for j in i + 1..n {
            if perm[j] >= perm[i] {
                perm[j] += 1;
            }
        }
    }
    perm
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, vec::Vec};

    use rstest::rstest;

    use super::*;

    #[test]
    fn factorials_are_exact() {
        assert_eq!(FACTORIALS[0], 1);
        assert_eq!(FACTORIALS[5], 120);
        assert_eq!(FACTORIALS[10], 3_628_800);
    }

    #[test]
    fn identity_and_reverse_are_the_ends() {
        assert_eq!(decode(0, 4)[..4], [0, 1, 2, 3]);
        assert_eq!(decode(23, 4)[..4], [3, 2, 1, 0]);
        assert_eq!(decode(1, 3)[..3], [0, 2, 1]);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(4)]
    #[case(6)]
    fn every_index_is_a_distinct_permutation(#[case] n: usize) {
        let perms: HashSet<Vec<u8>> = (0..FACTORIALS[n])
            .map(|index| {
                let perm = decode(index, n);
                let mut sorted = perm[..n].to_vec();
                sorted.sort_unstable();
                assert_eq!(sorted, (0..n as u8).collect::<Vec<_>>());
                perm[..n].to_vec()
            })
            .collect();
        assert_eq!(perms.len() as u64, FACTORIALS[n]);
    }

    #[test]
    fn index_stays_in_range() {
        for n in 0..=PERM_MAX_ELEMS {
            assert_eq!(perm_index(0, n), 0);
            assert_eq!(perm_index(u64::MAX, n), FACTORIALS[n] - 1);
        }
    }
}
