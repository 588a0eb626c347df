#[cfg(target_arch = "x86")]
use core::arch::x86;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64 as x86;

use x86::{
    __m128i, _mm_add_epi64, _mm_set_epi64x, _mm_set1_epi64x, _mm_sll_epi64, _mm_srl_epi64,
    _mm_storeu_si128, _mm_xor_si128,
};

use crate::{
    Backend, Key,
    backend::{BUF_BYTES, LANES, init_state, store_lane, twenty_rounds},
};

pub(crate) fn detect() -> Option<Backend> {
    #[cfg(feature = "std")]
    let has_sse2 = std::arch::is_x86_feature_detected!("sse2");
    #[cfg(not(feature = "std"))]
    let has_sse2 = cfg!(target_feature = "sse2");
    if has_sse2 {
        // SAFETY: `fill_buf` is safe to call because SSE2 is available.
        Some(unsafe { Backend::new_unchecked("sse2", fill_buf) })
    } else {
        None
    }
}

#[target_feature(enable = "sse2")]
fn fill_buf(key: &Key, block: &[u64; 4], buf: &mut [u8; BUF_BYTES]) {
    let splat = |x: u64| _mm_set1_epi64x(x.cast_signed());

    for first_lane in (0..LANES).step_by(2) {
        let lane = first_lane as i64;
        // Note the argument order: `_mm_set_epi64x` takes the high element first.
        let mut x = init_state(block, _mm_set_epi64x(lane + 1, lane), splat);

        twenty_rounds(
            &mut x,
            key,
            splat,
            |a, b| _mm_add_epi64(a, b),
            |ab, rot| mix(ab, rot),
        );

        let [w0, w1, w2, w3] = x.map(|v| to_array(v));
        store_lane(buf, first_lane, [w0[0], w1[0], w2[0], w3[0]]);
        store_lane(buf, first_lane + 1, [w0[1], w1[1], w2[1], w3[1]]);
    }
}

#[inline]
#[target_feature(enable = "sse2")]
fn mix([a, b]: [__m128i; 2], rot: u32) -> [__m128i; 2] {
    let a = _mm_add_epi64(a, b);
    [a, _mm_xor_si128(rotl(b, rot), a)]
}

#[inline]
#[target_feature(enable = "sse2")]
fn rotl(x: __m128i, rot: u32) -> __m128i {
    let left = _mm_set_epi64x(0, i64::from(rot));
    let right = _mm_set_epi64x(0, i64::from(64 - rot));
    _mm_xor_si128(_mm_sll_epi64(x, left), _mm_srl_epi64(x, right))
}

#[inline]
#[target_feature(enable = "sse2")]
fn to_array(x: __m128i) -> [u64; 2] {
    let mut out = [0u64; 2];
    // TODO: can we get the same codegen without any unsafe? Maybe `_mm_cvtsi128_si64` plus a
    // shuffle gets optimized into the same store, but that intrinsic is x86_64-only.
    // SAFETY: Stores 128 bits through the pointer, which is OK because it's derived from a mutable
    // reference to `[u64; 2]`. There is no alignment requirement.
    unsafe {
        _mm_storeu_si128(out.as_mut_ptr().cast::<__m128i>(), x);
    }
    out
}
