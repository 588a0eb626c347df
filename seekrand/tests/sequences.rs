use std::collections::HashSet;

use rstest::rstest;
use seekrand::{Rand, RandError, RandSeq, SeqType};

fn write_all(seq: &RandSeq, start: u64, count: u64) -> Vec<u8> {
    let mut buf = vec![0; count as usize * seq.elem_bytes()];
    seq.write(&mut buf, start, count).unwrap();
    buf
}

fn hamming(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

fn num_values(buf: &[u8]) -> Vec<u32> {
    buf.chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect()
}

#[rstest]
fn distance_sequences_keep_their_distance(
    #[values(SeqType::Dist1, SeqType::Dist2, SeqType::Dist3)] kind: SeqType,
    #[values(1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12)] size: u32,
) {
    let seq = Rand::new(u64::from(size)).get_seq(kind, size);
    let count = seq.len().min(400);
    let buf = write_all(&seq, 0, count);
    let elems: Vec<&[u8]> = buf.chunks_exact(size as usize).collect();

    for (i, a) in elems.iter().enumerate() {
        for b in &elems[i + 1..] {
            let d = hamming(a, b);
            assert!(
                d >= kind.min_distance(),
                "{kind:?} width {size}: distance {d} between {a:02x?} and {b:02x?}"
            );
        }
    }
}

#[rstest]
#[case(SeqType::Dist1, 1)]
#[case(SeqType::Dist2, 1)]
#[case(SeqType::Dist3, 1)]
#[case(SeqType::Dist1, 2)]
#[case(SeqType::Dist2, 2)]
#[case(SeqType::Dist3, 2)]
#[case(SeqType::Dist3, 3)]
fn whole_small_sequences_are_unique(#[case] kind: SeqType, #[case] size: u32) {
    let seq = Rand::new(99).get_seq(kind, size);
    let n = seq.len();
    let buf = write_all(&seq, 0, n);
    let distinct: HashSet<&[u8]> = buf.chunks_exact(size as usize).collect();
    assert_eq!(distinct.len() as u64, n);
}

#[test]
fn one_byte_dist1_uses_every_byte() {
    let seq = Rand::new(1).get_seq(SeqType::Dist1, 1);
    assert_eq!(seq.len(), 256);
    let mut bytes = write_all(&seq, 0, 256);
    assert_ne!(bytes, (0..=255).collect::<Vec<u8>>());
    bytes.sort_unstable();
    assert_eq!(bytes, (0..=255).collect::<Vec<u8>>());
}

#[test]
fn one_byte_dist3_is_sixteen_codewords() {
    let seq = Rand::new(2).get_seq(SeqType::Dist3, 1);
    assert_eq!(seq.len(), 16);
    let buf = write_all(&seq, 0, 16);
    for (i, a) in buf.iter().enumerate() {
        for b in &buf[i + 1..] {
            assert!((a ^ b).count_ones() >= 3);
        }
    }
}

#[rstest]
#[case(SeqType::Num, 0)]
#[case(SeqType::Num, 7)]
#[case(SeqType::Num, 5000)]
#[case(SeqType::Dist1, 3)]
#[case(SeqType::Dist2, 8)]
#[case(SeqType::Dist3, 11)]
fn random_access_matches_sequential(#[case] kind: SeqType, #[case] size: u32) {
    let seq = Rand::new(5).get_seq(kind, size);
    let count = seq.len().min(300);
    let elem = seq.elem_bytes();
    let whole = write_all(&seq, 0, count);

    for i in (0..count).rev() {
        assert_eq!(
            write_all(&seq, i, 1),
            whole[i as usize * elem..][..elem],
            "element {i}"
        );
    }
    for (lo, hi) in [(0, count), (count / 3, count / 2), (1, count)] {
        assert_eq!(
            write_all(&seq, lo, hi - lo),
            whole[lo as usize * elem..hi as usize * elem]
        );
    }
}

#[test]
fn wide_elements_deep_in_the_sequence() {
    let seq = Rand::new(6).get_seq(SeqType::Dist2, 20);
    let start = u64::MAX / 3;
    let run = write_all(&seq, start, 50);
    for i in 0..50 {
        assert_eq!(write_all(&seq, start + i, 1), run[i as usize * 20..][..20]);
    }
    let distinct: HashSet<&[u8]> = run.chunks_exact(20).collect();
    assert_eq!(distinct.len(), 50);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(9)]
#[case(10)]
#[case(11)]
#[case(1000)]
#[case(4095)]
#[case(4096)]
fn num_sequences_are_permutations(#[case] max: u32) {
    let seq = Rand::new(u64::from(max)).get_seq(SeqType::Num, max);
    assert_eq!(seq.len(), u64::from(max) + 1);
    assert_eq!(seq.elem_bytes(), 4);
    let mut values = num_values(&write_all(&seq, 0, seq.len()));
    values.sort_unstable();
    assert_eq!(values, (0..=max).collect::<Vec<_>>());
}

#[test]
fn num_sequences_differ_between_seeds() {
    let a = Rand::new(1).get_seq(SeqType::Num, 9);
    let b = Rand::new(2).get_seq(SeqType::Num, 9);
    let c = Rand::new(3).get_seq(SeqType::Num, 9);
    let [a, b, c] = [a, b, c].map(|s| write_all(&s, 0, 10));
    assert!(a != b || b != c);
}

#[test]
fn full_range_num() {
    let seq = Rand::new(7).get_seq(SeqType::Num, u32::MAX);
    assert_eq!(seq.len(), 1 << 32);
    let values = num_values(&write_all(&seq, (1 << 32) - 1000, 1000));
    let distinct: HashSet<u32> = values.iter().copied().collect();
    assert_eq!(distinct.len(), 1000);
}

#[test]
fn seq_depends_only_on_parent_state() {
    let mut a = Rand::new(8);
    let mut b = Rand::new(8);
    a.rand_n(&mut [0; 40]);
    b.seek(40);
    let sa = a.get_seq(SeqType::Dist3, 6);
    let sb = b.get_seq(SeqType::Dist3, 6);
    assert_eq!(write_all(&sa, 100, 10), write_all(&sb, 100, 10));
    assert_eq!(a.getoffset(), 48);
    assert_ne!(
        write_all(&a.get_seq(SeqType::Dist3, 6), 100, 10),
        write_all(&sa, 100, 10)
    );
}

#[test]
fn seq_from_orthogonal_stream_leaves_primary_alone() {
    let mut plain = Rand::new(9);
    let mut rng = Rand::new(9);
    rng.enable_ortho();
    let seq = rng.get_seq(SeqType::Dist1, 4);
    rng.disable_ortho(0);
    assert_eq!(rng.rand_u64(), plain.rand_u64());
    assert_eq!(write_all(&seq, 0, 4).len(), 16);
}

#[test]
fn write_errors() {
    let seq = Rand::new(10).get_seq(SeqType::Dist3, 1);
    let mut buf = [0u8; 32];
    assert_eq!(
        seq.write(&mut buf, 10, 7),
        Err(RandError::OutOfRange { end: 17, max: 16 })
    );
    assert_eq!(
        seq.write(&mut buf, 1, u64::MAX),
        Err(RandError::InvalidRange {
            start: 1,
            count: u64::MAX
        })
    );

    let num = Rand::new(10).get_seq(SeqType::Num, 100);
    assert_eq!(
        num.write(&mut buf, 0, 9),
        Err(RandError::BufferTooSmall { need: 36, have: 32 })
    );
    assert!(num.write(&mut buf, 93, 8).is_ok());
    assert!(num.write(&mut buf, 94, 8).is_err());
}

#[test]
fn max_elements_matches_len() {
    for kind in [SeqType::Num, SeqType::Dist1, SeqType::Dist2, SeqType::Dist3] {
        for size in [1, 4, 8, 16] {
            let seq = Rand::new(0).get_seq(kind, size);
            assert_eq!(seq.len(), RandSeq::max_elements(kind, size));
            assert_eq!(seq.kind(), kind);
        }
    }
}
