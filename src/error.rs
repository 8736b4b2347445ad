//! Error types for the garbled cuckoo table.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OkvsError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Too many keys: {len} > n = {n}")]
    TooManyKeys { len: usize, n: usize },

    #[error("Value {index} has {actual} bytes, expected {expected}")]
    ValueLength { index: usize, expected: usize, actual: usize },

    #[error("Key {index} appears more than once")]
    DuplicateKey { index: usize },

    #[error("Two-core has {core} edges, exceeds rm = {rm}")]
    CoreTooLarge { core: usize, rm: usize },

    #[error("Dense sub-matrix of the {core}-edge two-core has rank {rank}")]
    RankDeficient { core: usize, rank: usize },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Malformed storage: expected {expected}, got {actual}")]
    MalformedStorage { expected: String, actual: String },
}

impl OkvsError {
    /// Capacity failures depend on the hypergraph shape only, so encoding again
    /// with fresh oracle keys (or a larger `rm`) may succeed.
    pub fn is_capacity(&self) -> bool {
        matches!(self, OkvsError::CoreTooLarge { .. } | OkvsError::RankDeficient { .. })
    }
}

pub type Result<T> = std::result::Result<T, OkvsError>;
