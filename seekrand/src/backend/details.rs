use core::fmt;

use super::BUF_BYTES;
use crate::Key;

type FillBuf = unsafe fn(&Key, &[u64; 4], &mut [u8; BUF_BYTES]);

// Safety invariant: only constructed with functions that are safe to call. Either because it's
// actually a safe function, or because the function only requires certain target features that
// were checked to be available.
//
// (The latter case is the whole reason why it's an `unsafe` fn pointer to begin with.)
#[derive(Clone, Copy)]
pub struct Backend {
    name: &'static str,
    fill_buf: FillBuf,
}

impl Backend {
    pub(crate) fn new(
        name: &'static str,
        fill_buf: fn(&Key, &[u64; 4], &mut [u8; BUF_BYTES]),
    ) -> Self {
        Self { name, fill_buf }
    }

    /// # Safety
    ///
    /// `fill_buf` must be safe to call for the rest of the program's execution, typically because
    /// the target features it enables were detected.
    // Only the x86 and aarch64 backends need runtime-checked target features.
    #[cfg(all(
        feature = "simd",
        any(
            target_arch = "x86",
            target_arch = "x86_64",
            all(target_arch = "aarch64", target_endian = "little")
        )
    ))]
    pub(crate) unsafe fn new_unchecked(name: &'static str, fill_buf: FillBuf) -> Self {
        Self { name, fill_buf }
    }

    /// Short identifier of the implementation, e.g. `"avx2"`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Computes the eight Threefry blocks `[block[0], lane, block[2], block[3]]` for lanes `0..8`.
    #[inline]
    pub(crate) fn refill(self, key: &Key, block: &[u64; 4], buf: &mut [u8; BUF_BYTES]) {
        // SAFETY: function is safe to call because that's literally what this type's invariant
        // states.
        unsafe { (self.fill_buf)(key, block, buf) }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Backend").field(&self.name).finish()
    }
}
