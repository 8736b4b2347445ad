//! Hash position oracle: maps a key to its three sparse positions in
//! `[0, lm)` and its `rm`-bit dense mask.
//!
//! Each of the four hash functions is a keyed blake3 instance. The oracle keys
//! are fixed when the oracle is built; nothing else is stored, so the oracle
//! is freely shared between threads.

use rand::{CryptoRng, RngCore};

use crate::bitstring::BitString;
use crate::hash::{Hashable, Hasher};
use crate::params::{HASH_NUM, SPARSE_HASH_NUM};

/// 128-bit key of one hash function.
pub type PrfKey = [u8; 16];

const KEY_DERIVATION_CONTEXT: &str = "h3gct 2024-01-01 oracle key";
/// Words read from one sparse hash before falling back to probing.
const MAX_RESAMPLE: usize = 64;

/// Keys of the three sparse hashes followed by the dense hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashKeys(pub [PrfKey; HASH_NUM]);

impl HashKeys {
    /// Draw fresh keys. Use a fresh set to retry after a capacity failure.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut keys = [[0u8; 16]; HASH_NUM];
        for key in keys.iter_mut() {
            rng.fill_bytes(key);
        }
        Self(keys)
    }

    /// Draw fresh keys from the thread-local generator.
    pub fn from_entropy() -> Self {
        Self::random(&mut rand::thread_rng())
    }
}

/// Deterministic key to positions map.
#[derive(Clone)]
pub struct PositionOracle {
    lm: usize,
    rm: usize,
    sparse: [Hasher; SPARSE_HASH_NUM],
    dense: Hasher,
}

impl std::fmt::Debug for PositionOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionOracle")
            .field("lm", &self.lm)
            .field("rm", &self.rm)
            .finish_non_exhaustive()
    }
}

fn keyed(key: &PrfKey) -> Hasher {
    Hasher::new_keyed(&blake3::derive_key(KEY_DERIVATION_CONTEXT, key))
}

impl PositionOracle {
    /// `lm` must be at least 3 and `rm` a multiple of 8.
    pub fn new(lm: usize, rm: usize, keys: &HashKeys) -> Self {
        assert!(lm >= SPARSE_HASH_NUM, "lm = {} leaves no room for 3 distinct positions", lm);
        assert_eq!(rm % 8, 0, "rm = {} must be byte aligned", rm);
        let [k0, k1, k2, kr] = &keys.0;
        Self {
            lm,
            rm,
            sparse: [keyed(k0), keyed(k1), keyed(k2)],
            dense: keyed(kr),
        }
    }

    pub fn lm(&self) -> usize {
        self.lm
    }

    pub fn rm(&self) -> usize {
        self.rm
    }

    /// Three pairwise distinct positions in `[0, lm)`.
    ///
    /// Position `i` is read from hash `i` and resampled while it collides
    /// with an earlier one.
    pub fn sparse_positions<K: Hashable + ?Sized>(&self, key: &K) -> [usize; SPARSE_HASH_NUM] {
        let mut positions = [0usize; SPARSE_HASH_NUM];
        for i in 0..SPARSE_HASH_NUM {
            let mut hasher = self.sparse[i].clone();
            key.append_to_hasher(&mut hasher);
            let mut reader = hasher.finalize_xof();
            let taken = &positions[..i];
            let mut candidate = 0;
            let mut found = false;
            for _ in 0..MAX_RESAMPLE {
                let mut word = [0u8; 8];
                reader.fill(&mut word);
                candidate = (u64::from_le_bytes(word) % self.lm as u64) as usize;
                if !taken.contains(&candidate) {
                    found = true;
                    break;
                }
            }
            if !found {
                // linear probe from the last sample; lm >= 3 guarantees a free slot
                while taken.contains(&candidate) {
                    candidate = (candidate + 1) % self.lm;
                }
            }
            positions[i] = candidate;
        }
        positions
    }

    /// The `rm`-bit dense mask.
    pub fn dense_positions<K: Hashable + ?Sized>(&self, key: &K) -> BitString {
        let mut hasher = self.dense.clone();
        key.append_to_hasher(&mut hasher);
        let mut bytes = vec![0u8; self.rm / 8];
        hasher.finalize_xof().fill(&mut bytes);
        BitString::from_bytes(&bytes, self.rm)
    }
}
