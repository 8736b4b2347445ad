//! Table sizes of the 3-hash two-core garbled cuckoo table.
//!
//! The storage is split as `D = L || R`: `lm` sparse slots addressed by the
//! three cuckoo hashes and `rm` dense slots addressed by the dense mask.

use crate::error::{OkvsError, Result};
use crate::utils::byte_align;

/// Statistical security parameter λ used for `rm`.
pub const STAT_SEC_PARAM: usize = 40;
/// Number of sparse positions per key.
pub const SPARSE_HASH_NUM: usize = 3;
/// Sparse hashes plus the dense hash.
pub const HASH_NUM: usize = SPARSE_HASH_NUM + 1;
/// ε_l: `lm = ε_l * n`.
const LEFT_EPSILON: f64 = 1.3;
/// ε_r: `rm = ε_r * log(n) + λ`.
const RIGHT_EPSILON: f64 = 0.5;
/// -log2 of the encode failure probability with the default λ.
pub const NEG_LOG_FAILURE_PROBABILITY: u32 = 29;

/// How slots that no key touches are filled at the end of encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FillMode {
    /// Independent uniform values, so the whole storage looks random.
    #[default]
    Random,
    /// Zeros. Encoded keys still decode correctly.
    Zero,
}

/// Construction parameters together with the derived table sizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OkvsParams {
    n: usize,
    l: usize,
    security: usize,
    lm: usize,
    rm: usize,
    fill_mode: FillMode,
}

impl OkvsParams {
    /// `n` keys at most, `l`-bit values, default λ.
    pub fn new(n: usize, l: usize) -> Result<Self> {
        Self::with_security(n, l, STAT_SEC_PARAM)
    }

    /// `n` keys at most, `l`-bit values, statistical security `security`.
    pub fn with_security(n: usize, l: usize, security: usize) -> Result<Self> {
        if n == 0 {
            return Err(OkvsError::InvalidParams("n must be positive".to_string()));
        }
        if l == 0 || l % 8 != 0 {
            return Err(OkvsError::InvalidParams(format!(
                "l = {} must be a positive multiple of 8",
                l
            )));
        }
        if security == 0 {
            return Err(OkvsError::InvalidParams("security parameter must be positive".to_string()));
        }
        Ok(Self {
            n,
            l,
            security,
            lm: left_m(n),
            rm: right_m(n, security),
            fill_mode: FillMode::default(),
        })
    }

    /// Set the fill mode of untouched slots.
    pub fn with_fill_mode(mut self, fill_mode: FillMode) -> Self {
        self.fill_mode = fill_mode;
        self
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn l(&self) -> usize {
        self.l
    }

    /// Value length in bytes.
    pub fn byte_l(&self) -> usize {
        self.l / 8
    }

    pub fn security(&self) -> usize {
        self.security
    }

    /// Sparse range.
    pub fn lm(&self) -> usize {
        self.lm
    }

    /// Dense width.
    pub fn rm(&self) -> usize {
        self.rm
    }

    /// Total number of slots.
    pub fn m(&self) -> usize {
        self.lm + self.rm
    }

    pub fn fill_mode(&self) -> FillMode {
        self.fill_mode
    }
}

/// `lm = 1.3 * n`, rounded up to a multiple of 8.
pub fn left_m(n: usize) -> usize {
    byte_align((LEFT_EPSILON * n as f64).ceil() as usize)
}

/// `rm = 0.5 * log2(n) + λ`, rounded up to a multiple of 8.
///
/// Small tables collide often and leave large two-cores, so for
/// `n <= 2^11` the width comes from measured core sizes instead
/// (2^8: 186, 2^9: 328, 2^10: 561, 2^11: 907).
pub fn right_m(n: usize, security: usize) -> usize {
    let r = byte_align((RIGHT_EPSILON * (n as f64).log2()).ceil() as usize + security);
    if n <= 1 << 8 {
        byte_align(r.max(n))
    } else if n <= 1 << 9 {
        byte_align(n.min(328))
    } else if n <= 1 << 10 {
        byte_align(n.min(561))
    } else if n <= 1 << 11 {
        byte_align(907)
    } else {
        r
    }
}
