use core::arch::wasm32::{
    u64x2, u64x2_add, u64x2_extract_lane, u64x2_shl, u64x2_shr, u64x2_splat, v128, v128_xor,
};

use crate::{
    Backend, Key,
    backend::{BUF_BYTES, LANES, init_state, store_lane, twenty_rounds},
};

pub(crate) fn detect() -> Option<Backend> {
    Some(Backend::new("simd128", fill_buf))
}

pub(crate) fn fill_buf(key: &Key, block: &[u64; 4], buf: &mut [u8; BUF_BYTES]) {
    let splat = |x| u64x2_splat(x);

    for first_lane in (0..LANES).step_by(2) {
        let lane = first_lane as u64;
        let mut x = init_state(block, u64x2(lane, lane + 1), splat);

        twenty_rounds(&mut x, key, splat, |a, b| u64x2_add(a, b), mix);

        store_lane(buf, first_lane, x.map(|v| u64x2_extract_lane::<0>(v)));
        store_lane(buf, first_lane + 1, x.map(|v| u64x2_extract_lane::<1>(v)));
    }
}

#[inline(always)]
fn mix([a, b]: [v128; 2], rot: u32) -> [v128; 2] {
    let a = u64x2_add(a, b);
    [a, v128_xor(rotl(b, rot), a)]
}

#[inline(always)]
fn rotl(x: v128, amt: u32) -> v128 {
    v128_xor(u64x2_shl(x, amt), u64x2_shr(x, 64 - amt))
}
