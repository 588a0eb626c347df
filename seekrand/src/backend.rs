// Conceptually this belongs here, not in a submodule, but we need the extra module to have a
// private field and enforce the use of the constructor. Unsafe fields would simplify this.
pub use details::Backend;
mod details;

mod scalar;

use crate::Key;

/// Number of independent Threefry blocks computed per refill.
pub(crate) const LANES: usize = 8;
/// Words of output per Threefry-4x64 block.
pub(crate) const BLOCK_WORDS: usize = 4;
/// Bytes produced per refill.
pub(crate) const BUF_BYTES: usize = LANES * BLOCK_WORDS * 8;

pub(crate) fn scalar() -> Backend {
    Backend::new("scalar", scalar::fill_buf)
}

macro_rules! arch_backends {
    ($(#[cfg($cond:meta)] mod $name:ident;)+) => {
        $(
            #[cfg(all(feature = "simd", $cond))]
            pub(crate) mod $name;

            #[cfg(not(all(feature = "simd", $cond)))]
            pub(crate) mod $name {
                pub(crate) fn detect() -> Option<crate::Backend> {
                    None
                }
            }
        )+
    };
}

arch_backends! {
    #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
    mod avx2;

    #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
    mod sse2;

    // The neon backend is limited to little-endian because aarch64be NEON has historically been
    // broken (https://github.com/rust-lang/stdarch/issues/1484). The scalar code is tested on big
    // endian (via s390x).
    #[cfg(all(target_arch = "aarch64", target_endian = "little"))]
    mod neon;

    // Wasm validation doesn't play nice with runtime detection, so we do static detection only.
    #[cfg(all(target_arch = "wasm32", target_feature = "simd128"))]
    mod simd128;
}

pub(crate) fn detect_best() -> Backend {
    // AVX2 does four lanes per vector, everything else does two. The 2-lane backends are for
    // mutually exclusive targets, chaining them is just less of a mess than the `cfg` soup.
    let backend = avx2::detect()
        .or_else(sse2::detect)
        .or_else(neon::detect)
        .or_else(simd128::detect)
        .unwrap_or_else(scalar);
    tracing::debug!(backend = backend.name(), "selected block backend");
    backend
}

// Rotation constants for Threefry-4x64, indexed by round modulo 8.
const ROTATIONS: [[u32; 2]; 8] = [
    [14, 16],
    [52, 57],
    [23, 40],
    [5, 37],
    [25, 33],
    [46, 12],
    [58, 22],
    [32, 32],
];

const ROUNDS: usize = 20;

/// Loads a block input into `T`, one lane per vector element.
///
/// `lane_ids` must hold the lane numbers covered by this vector (`[0, 1]`, `[4, 5, 6, 7]`, ...).
#[inline(always)]
pub(crate) fn init_state<T: Copy>(
    block: &[u64; 4],
    lane_ids: T,
    splat: impl Fn(u64) -> T,
) -> [T; 4] {
    debug_assert_eq!(block[1], 0, "lane word is owned by the backend");
    [splat(block[0]), lane_ids, splat(block[2]), splat(block[3])]
}

/// Twenty Threefry-4x64 rounds with key injection every four rounds.
///
/// `mix` takes a word pair and a rotation amount and returns `[a + b, rotl(b, r) ^ (a + b)]`.
// NB: like the closures handed to it, this must be inline(always) so it ends up inside the
// `target_feature` function of each SIMD backend.
#[inline(always)]
pub(crate) fn twenty_rounds<T: Copy>(
    x: &mut [T; 4],
    key: &Key,
    splat: impl Fn(u64) -> T,
    add: impl Fn(T, T) -> T,
    mix: impl Fn([T; 2], u32) -> [T; 2],
) {
    let ks = key.words();
    inject(x, ks, 0, &splat, &add);
    for r in 0..ROUNDS {
        let [rot0, rot1] = ROTATIONS[r % 8];
        if r % 2 == 0 {
            [x[0], x[1]] = mix([x[0], x[1]], rot0);
            [x[2], x[3]] = mix([x[2], x[3]], rot1);
        } else {
            [x[0], x[3]] = mix([x[0], x[3]], rot0);
            [x[2], x[1]] = mix([x[2], x[1]], rot1);
        }
        if r % 4 == 3 {
            inject(x, ks, r / 4 + 1, &splat, &add);
        }
    }
}

// Key schedule word `s + i` goes into word `i`, and the injection count into word 3 so that no
// two injections are alike even for an all-equal key.
#[inline(always)]
fn inject<T: Copy>(
    x: &mut [T; 4],
    ks: &[u64; 5],
    s: usize,
    splat: &impl Fn(u64) -> T,
    add: &impl Fn(T, T) -> T,
) {
    for (i, xi) in x.iter_mut().enumerate() {
        *xi = add(*xi, splat(ks[(s + i) % 5]));
    }
    x[3] = add(x[3], splat(s as u64));
}

/// Writes lane `lane`'s four output words to their slot in `buf`, little-endian.
#[inline(always)]
pub(crate) fn store_lane(buf: &mut [u8; BUF_BYTES], lane: usize, words: [u64; 4]) {
    let (blocks, _) = buf.as_chunks_mut::<{ BLOCK_WORDS * 8 }>();
    let (dest, _) = blocks[lane].as_chunks_mut::<8>();
    for (d, w) in dest.iter_mut().zip(words) {
        // The only place where byte order is decided. Free on little-endian hosts.
        *d = w.to_le_bytes();
    }
}
