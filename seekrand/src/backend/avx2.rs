#[cfg(target_arch = "x86")]
use core::arch::x86;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64 as x86;

use x86::{
    __m128i, __m256i, _mm_set_epi64x, _mm256_add_epi64, _mm256_set1_epi64x, _mm256_setr_epi64x,
    _mm256_sll_epi64, _mm256_srl_epi64, _mm256_storeu_si256, _mm256_xor_si256,
};

use crate::{
    Backend, Key,
    backend::{BUF_BYTES, LANES, init_state, store_lane, twenty_rounds},
};

pub(crate) fn detect() -> Option<Backend> {
    #[cfg(feature = "std")]
    let has_avx2 = std::is_x86_feature_detected!("avx2");
    #[cfg(not(feature = "std"))]
    let has_avx2 = cfg!(target_feature = "avx2");
    if has_avx2 {
        // SAFETY: `fill_buf` is only unsafe because it enables the AVX2 `target_feature`, and we've
        // ensured that AVX2 is available, so it's now effectively a safe function.
        unsafe { Some(Backend::new_unchecked("avx2", fill_buf)) }
    } else {
        None
    }
}

#[target_feature(enable = "avx2")]
fn fill_buf(key: &Key, block: &[u64; 4], buf: &mut [u8; BUF_BYTES]) {
    let splat = |x: u64| _mm256_set1_epi64x(x.cast_signed());

    for first_lane in (0..LANES).step_by(4) {
        let lane = first_lane as i64;
        let lane_ids = _mm256_setr_epi64x(lane, lane + 1, lane + 2, lane + 3);
        let mut x = init_state(block, lane_ids, splat);

        twenty_rounds(
            &mut x,
            key,
            splat,
            |a, b| _mm256_add_epi64(a, b),
            |ab, rot| mix(ab, rot),
        );

        // Vector `k` holds word `k` of four consecutive lanes, so this is a 4x4 transpose.
        let words = x.map(|v| to_array(v));
        for i in 0..4 {
            store_lane(buf, first_lane + i, words.map(|w| w[i]));
        }
    }
}

#[inline]
#[target_feature(enable = "avx2")]
fn mix([a, b]: [__m256i; 2], rot: u32) -> [__m256i; 2] {
    let a = _mm256_add_epi64(a, b);
    [a, _mm256_xor_si256(rotl(b, rot), a)]
}

#[inline]
#[target_feature(enable = "avx2")]
fn rotl(x: __m256i, rot: u32) -> __m256i {
    // The shift count comes from a table indexed by the round number, so use the variants that
    // take the count in a register rather than as an immediate.
    let left: __m128i = _mm_set_epi64x(0, i64::from(rot));
    let right: __m128i = _mm_set_epi64x(0, i64::from(64 - rot));
    _mm256_xor_si256(_mm256_sll_epi64(x, left), _mm256_srl_epi64(x, right))
}

#[inline]
#[target_feature(enable = "avx2")]
fn to_array(x: __m256i) -> [u64; 4] {
    let mut out = [0u64; 4];
    // SAFETY: stores 256 bits through the pointer (no alignment requirement), which is OK because
    // it's derived from a mutable reference to `[u64; 4]`.
    unsafe {
        _mm256_storeu_si256(out.as_mut_ptr().cast::<__m256i>(), x);
    }
    out
}
