//! Utility functions and structs.

mod misc;
mod xor_u64s;

pub use misc::*;
pub use xor_u64s::xor_u64s_inplace;
