use core::arch::aarch64::{
    int64x2_t, uint64x2_t, vaddq_u64, vcombine_u64, vcreate_u64, vdupq_n_s64, vdupq_n_u64,
    veorq_u64, vgetq_lane_u64, vshlq_u64,
};

use crate::{
    Backend, Key,
    backend::{BUF_BYTES, LANES, init_state, store_lane, twenty_rounds},
};

pub(crate) fn detect() -> Option<Backend> {
    #[cfg(feature = "std")]
    let has_neon = std::arch::is_aarch64_feature_detected!("neon");
    #[cfg(not(feature = "std"))]
    let has_neon = cfg!(target_feature = "neon");
    if has_neon {
        // SAFETY: `fill_buf` is safe to call because neon is available.
        Some(unsafe { Backend::new_unchecked("neon", fill_buf) })
    } else {
        None
    }
}

#[target_feature(enable = "neon")]
fn fill_buf(key: &Key, block: &[u64; 4], buf: &mut [u8; BUF_BYTES]) {
    let splat = |x| vdupq_n_u64(x);

    for first_lane in (0..LANES).step_by(2) {
        let lane = first_lane as u64;
        let lane_ids = vcombine_u64(vcreate_u64(lane), vcreate_u64(lane + 1));
        let mut x = init_state(block, lane_ids, splat);

        twenty_rounds(
            &mut x,
            key,
            splat,
            |a, b| vaddq_u64(a, b),
            |ab, rot| mix(ab, rot),
        );

        let lo = x.map(|v| vgetq_lane_u64::<0>(v));
        let hi = x.map(|v| vgetq_lane_u64::<1>(v));
        store_lane(buf, first_lane, lo);
        store_lane(buf, first_lane + 1, hi);
    }
}

#[inline]
#[target_feature(enable = "neon")]
fn mix([a, b]: [uint64x2_t; 2], rot: u32) -> [uint64x2_t; 2] {
    let a = vaddq_u64(a, b);
    [a, veorq_u64(rotl(b, rot), a)]
}

#[inline]
#[target_feature(enable = "neon")]
fn rotl(x: uint64x2_t, rot: u32) -> uint64x2_t {
    // USHL shifts right for negative counts, so both halves of the rotate use the same
    // instruction with a register operand.
    let left: int64x2_t = vdupq_n_s64(i64::from(rot));
    let right: int64x2_t = vdupq_n_s64(-i64::from(64 - rot));
    veorq_u64(vshlq_u64(x, left), vshlq_u64(x, right))
}
