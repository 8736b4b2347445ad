//! Provides hashing of keys and the buffered PRNG used to fill slots.

pub use blake3::Hasher;

/// Functions that allow an object to be hashed.
///
/// Keys of the table are anything that can be appended to a blake3 hasher.
pub trait Hashable {
    /// Append the information of Self to an existing hasher. Note that the order of appending matters.
    fn append_to_hasher(&self, hasher: &mut Hasher);
}

impl Hashable for [u8] {
    #[inline]
    fn append_to_hasher(&self, hasher: &mut Hasher) {
        hasher.update(self);
    }
}

impl Hashable for Vec<u8> {
    #[inline]
    fn append_to_hasher(&self, hasher: &mut Hasher) {
        hasher.update(self);
    }
}

impl<const C: usize> Hashable for [u8; C] {
    #[inline]
    fn append_to_hasher(&self, hasher: &mut Hasher) {
        hasher.update(self);
    }
}

impl Hashable for str {
    #[inline]
    fn append_to_hasher(&self, hasher: &mut Hasher) {
        hasher.update(self.as_bytes());
    }
}

impl Hashable for String {
    #[inline]
    fn append_to_hasher(&self, hasher: &mut Hasher) {
        hasher.update(self.as_bytes());
    }
}

impl Hashable for usize {
    #[inline]
    fn append_to_hasher(&self, hasher: &mut Hasher) {
        hasher.update(&(*self as u64).to_le_bytes());
    }
}

impl Hashable for u64 {
    #[inline]
    fn append_to_hasher(&self, hasher: &mut Hasher) {
        hasher.update(&self.to_le_bytes());
    }
}

impl Hashable for u128 {
    #[inline]
    fn append_to_hasher(&self, hasher: &mut Hasher) {
        hasher.update(&self.to_le_bytes());
    }
}

impl<T: Hashable + ?Sized> Hashable for &T {
    #[inline]
    fn append_to_hasher(&self, hasher: &mut Hasher) {
        (**self).append_to_hasher(hasher);
    }
}

const BUFFER_LENGTH_BLOCKS: usize = 512;
const BUFFER_LENGTH_BYTES: usize = BUFFER_LENGTH_BLOCKS * 16;

/// Seeded random generator: AES-128 in counter mode.
///
/// This is implemented with a buffer. Every time it samples
/// new randomness it takes bytes from the buffer. When the buffer is drained
/// it is refilled by encrypting the next counters. Filling the buffer is
/// the expensive part, so this pays off for bulk output such as slot values.
pub struct BufferedRandomGenerator {
    counter: u128,
    encryptor: aes::Aes128,
    buffer: Box<[aes::Block; BUFFER_LENGTH_BLOCKS]>,
    pointer: usize,
}

impl BufferedRandomGenerator {
    /// Create a new random generator from the given seed.
    pub fn new(seed: [u8; 16]) -> Self {
        use aes::cipher::KeyInit;
        let key = aes::cipher::generic_array::GenericArray::from(seed);
        Self {
            counter: 0,
            encryptor: aes::Aes128::new(&key),
            buffer: Box::new([aes::Block::default(); BUFFER_LENGTH_BLOCKS]),
            pointer: BUFFER_LENGTH_BYTES,
        }
    }

    /// Create a new random generator from entropy.
    pub fn from_entropy() -> Self {
        let mut rng = rand::thread_rng();
        Self::new(rand::Rng::gen::<[u8; 16]>(&mut rng))
    }

    /// Refill RNG buffer.
    fn refill(&mut self) {
        use aes::cipher::BlockEncrypt;
        for each in self.buffer.iter_mut() {
            *each = aes::Block::from(self.counter.to_le_bytes());
            self.counter = self.counter.wrapping_add(1);
        }
        self.encryptor.encrypt_blocks(&mut self.buffer[..]);
        self.pointer = 0;
    }

    /// Fill `dest` with fresh output.
    pub fn fill(&mut self, dest: &mut [u8]) {
        let mut written = 0;
        while written < dest.len() {
            if self.pointer == BUFFER_LENGTH_BYTES {
                self.refill();
            }
            let block = self.pointer / 16;
            let offset = self.pointer % 16;
            let take = (16 - offset).min(dest.len() - written);
            dest[written..written + take].copy_from_slice(&self.buffer[block][offset..offset + take]);
            written += take;
            self.pointer += take;
        }
    }

    /// Generate a u64
    #[inline]
    pub fn gen_u64(&mut self) -> u64 {
        let mut ret = [0u8; 8];
        self.fill(&mut ret);
        u64::from_le_bytes(ret)
    }

    /// Generate `length` random bytes.
    pub fn gen_bytes(&mut self, length: usize) -> Vec<u8> {
        let mut ret = vec![0u8; length];
        self.fill(&mut ret);
        ret
    }
}

impl rand::RngCore for BufferedRandomGenerator {
    fn next_u32(&mut self) -> u32 {
        let mut ret = [0u8; 4];
        self.fill(&mut ret);
        u32::from_le_bytes(ret)
    }

    fn next_u64(&mut self) -> u64 {
        self.gen_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.fill(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill(dest);
        Ok(())
    }
}

impl rand::CryptoRng for BufferedRandomGenerator {}

#[cfg(test)]
mod tests {

    use super::*;
    use rand::RngCore;

    #[test]
    fn random_generator() {
        let mut a = BufferedRandomGenerator::new([1u8; 16]);
        let mut b = BufferedRandomGenerator::new([1u8; 16]);
        for _ in 0..2000 {
            assert_eq!(a.gen_u64(), b.gen_u64());
        }
        let mut a = BufferedRandomGenerator::new([1u8; 16]);
        let mut b = BufferedRandomGenerator::new([32u8; 16]);
        for _ in 0..100 {
            assert_ne!(a.gen_u64(), b.gen_u64());
        }
    }

    #[test]
    fn fill_is_a_byte_stream() {
        // reading in odd-sized pieces gives the same stream as one large read
        let mut a = BufferedRandomGenerator::new([7u8; 16]);
        let mut b = BufferedRandomGenerator::new([7u8; 16]);
        let whole = a.gen_bytes(BUFFER_LENGTH_BYTES + 100);
        let mut pieces = Vec::new();
        for len in [3usize, 13, 16, 1, 29].iter().cycle() {
            if pieces.len() >= whole.len() {
                break;
            }
            let len = (*len).min(whole.len() - pieces.len());
            let mut buf = vec![0u8; len];
            b.fill_bytes(&mut buf);
            pieces.extend(buf);
        }
        assert_eq!(whole, pieces);
    }

    fn digest<K: Hashable + ?Sized>(key: &K) -> blake3::Hash {
        let mut hasher = Hasher::new();
        key.append_to_hasher(&mut hasher);
        hasher.finalize()
    }

    #[test]
    fn hashable_is_consistent_across_borrows() {
        let owned = b"key".to_vec();
        let sliced: &[u8] = b"key";
        let array = *b"key";
        let h0 = digest(&owned);
        assert_eq!(h0, digest(sliced));
        assert_eq!(h0, digest(&array));
        assert_eq!(h0, digest(&&owned));
        assert_eq!(h0, digest("key"));
        assert_ne!(h0, digest(&1u64));
    }

    #[test]
    fn oracle_sees_borrowed_keys_as_owned() {
        use crate::oracle::{HashKeys, PositionOracle};
        let oracle = PositionOracle::new(1304, 568, &HashKeys([[7u8; 16]; 4]));
        let owned = String::from("alice");
        assert_eq!(oracle.sparse_positions(&owned), oracle.sparse_positions("alice"));
        assert_eq!(oracle.dense_positions(&&owned), oracle.dense_positions(owned.as_bytes()));
    }
}
