use crate::{
    Key,
    backend::{BUF_BYTES, LANES, init_state, store_lane, twenty_rounds},
};

#[inline(never)]
pub(crate) fn fill_buf(key: &Key, block: &[u64; 4], buf: &mut [u8; BUF_BYTES]) {
    for lane in 0..LANES {
        let mut x = init_state(block, lane as u64, |n| n);
        twenty_rounds(&mut x, key, |n| n, u64::wrapping_add, mix);
        store_lane(buf, lane, x);
    }
}

#[inline(always)]
fn mix([a, b]: [u64; 2], rot: u32) -> [u64; 2] {
    let a = a.wrapping_add(b);
    [a, b.rotate_left(rot) ^ a]
}
