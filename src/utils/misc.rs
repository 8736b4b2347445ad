//! Utility functions and structs.

/// Ceil div
#[inline]
pub fn ceil_div(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// Round `a` up to a multiple of `b`.
#[inline]
pub fn round_up_to_multiple(a: usize, b: usize) -> usize {
    ceil_div(a, b) * b
}

/// Round a bit length up to whole bytes, returned in bits.
#[inline]
pub fn byte_align(bits: usize) -> usize {
    round_up_to_multiple(bits, 8)
}

/// XOR y into x. Lengths must match.
#[inline]
pub fn xor_u8s_inplace(x: &mut [u8], y: &[u8]) {
    assert_eq!(x.len(), y.len());
    for (a, b) in x.iter_mut().zip(y.iter()) {
        *a ^= *b;
    }
}

/// XOR into `out` every slot of `slots` whose bit in `word` is set.
/// Bit `i` of `word` selects `slots[i]`; at most 64 slots are considered.
#[inline]
pub fn xor_selected_slots(word: u64, slots: &[Vec<u8>], out: &mut [u8]) {
    let mut rest = word;
    while rest != 0 {
        let i = rest.trailing_zeros() as usize;
        if i >= slots.len() {
            break;
        }
        xor_u8s_inplace(out, &slots[i]);
        rest &= rest - 1;
    }
}

/// Measures one interval and reports it as a `trace` event when finished.
pub struct TimerOnce {
    start: std::time::Instant,
}

impl TimerOnce {
    /// Create a new timer.
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
    /// Report the time since creation under `stage`.
    pub fn finish(self, stage: &str) -> std::time::Duration {
        let elapsed = self.start.elapsed();
        tracing::trace!(stage, elapsed_us = elapsed.as_micros() as u64, "stage finished");
        elapsed
    }
}

impl Default for TimerOnce {
    fn default() -> Self {
        Self::new()
    }
}
