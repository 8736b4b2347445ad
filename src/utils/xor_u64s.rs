//! Word-wise XOR used by the GF(2) row operations.

pub(self) mod native {
    #[inline]
    pub unsafe fn xor_u64s_inplace(x: *mut u64, y: *const u64, len: usize) {
        for i in 0..len {
            *x.add(i) ^= *y.add(i);
        }
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub(self) mod avx2 {
    #[inline]
    pub unsafe fn xor_u64s_inplace(x: *mut u64, y: *const u64, len: usize) {
        use std::arch::x86_64::*;
        let mut i = 0;
        let body = len - len % 4;
        while i < body {
            let x_vec = _mm256_loadu_si256(x.add(i) as *const _);
            let y_vec = _mm256_loadu_si256(y.add(i) as *const _);
            _mm256_storeu_si256(x.add(i) as *mut _, _mm256_xor_si256(x_vec, y_vec));
            i += 4;
        }
        super::native::xor_u64s_inplace(x.add(i), y.add(i), len - i);
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "sse2", not(target_feature = "avx2")))]
pub(self) mod sse2 {
    #[inline]
    pub unsafe fn xor_u64s_inplace(x: *mut u64, y: *const u64, len: usize) {
        use std::arch::x86_64::*;
        let mut i = 0;
        let body = len - len % 2;
        while i < body {
            let x_vec = _mm_loadu_si128(x.add(i) as *const _);
            let y_vec = _mm_loadu_si128(y.add(i) as *const _);
            _mm_storeu_si128(x.add(i) as *mut _, _mm_xor_si128(x_vec, y_vec));
            i += 2;
        }
        super::native::xor_u64s_inplace(x.add(i), y.add(i), len - i);
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
use avx2::xor_u64s_inplace as xor_raw;

#[cfg(all(target_arch = "x86_64", target_feature = "sse2", not(target_feature = "avx2")))]
use sse2::xor_u64s_inplace as xor_raw;

#[cfg(not(all(target_arch = "x86_64", any(target_feature = "avx2", target_feature = "sse2"))))]
use native::xor_u64s_inplace as xor_raw;

/// `x[i] ^= y[i]` over the common prefix of the two slices.
#[inline]
pub fn xor_u64s_inplace(x: &mut [u64], y: &[u64]) {
    let len = x.len().min(y.len());
    // SAFETY: both pointers are valid for `len` words and the borrows cannot alias.
    unsafe { xor_raw(x.as_mut_ptr(), y.as_ptr(), len) }
}
