//! Provides BitString that behaves like [`Vec<bool>`] but saves memory.
//!
//! The bits are stored in a [`Vec<u64>`]. Dense masks and the rows of the
//! GF(2) elimination are both BitStrings.

use crate::utils::{ceil_div, xor_selected_slots, xor_u64s_inplace};

pub(crate) type Storage = u64;
pub(crate) const ITEM_BITS: usize = std::mem::size_of::<Storage>() * 8;
pub(crate) const ITEM_BITS_LOG2: u32 = ITEM_BITS.trailing_zeros();
pub(crate) const ITEM_BITS_MASK: usize = ITEM_BITS - 1;

/// A bit string that behaves like [`Vec<bool>`] but saves memory.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitString {
    data: Vec<Storage>,
    len: usize,
}

impl BitString {
    /// A BitString with specified length, all set to 0.
    pub fn new_zeros(bit_length: usize) -> Self {
        Self {
            data: vec![0; ceil_div(bit_length, ITEM_BITS)],
            len: bit_length,
        }
    }

    /// Build from little-endian bytes: bit `i` is bit `i % 8` of byte `i / 8`.
    /// Bits past `bit_length` are dropped, missing bytes read as 0.
    pub fn from_bytes(bytes: &[u8], bit_length: usize) -> Self {
        let mut ret = Self::new_zeros(bit_length);
        for (i, byte) in bytes.iter().enumerate().take(ceil_div(bit_length, 8)) {
            ret.data[(i * 8) >> ITEM_BITS_LOG2] |= (*byte as Storage) << ((i * 8) & ITEM_BITS_MASK);
        }
        ret.clear_tail();
        ret
    }

    /// Set one bit.
    #[inline]
    pub fn set(&mut self, index: usize, bit: bool) {
        debug_assert!(
            index < self.len,
            "Index {} must be smaller than len {}.",
            index,
            self.len
        );
        if bit {
            self.data[index >> ITEM_BITS_LOG2] |= (1 as Storage) << (index & ITEM_BITS_MASK);
        } else {
            self.data[index >> ITEM_BITS_LOG2] &= !((1 as Storage) << (index & ITEM_BITS_MASK));
        }
    }

    /// Get one bit.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(
            index < self.len,
            "Index {} must be smaller than len {}.",
            index,
            self.len
        );
        ((self.data[index >> ITEM_BITS_LOG2] >> (index & ITEM_BITS_MASK)) & 1) != 0
    }

    /// Bit length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the bit length is zero.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reaches the internal data.
    #[inline]
    pub fn data(&self) -> &[Storage] {
        &self.data
    }

    /// How many ones are there in the bitstring.
    pub fn count_ones(&self) -> usize {
        self.data.iter().map(|x| x.count_ones() as usize).sum()
    }

    /// Whether every bit is 0.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|x| *x == 0)
    }

    /// XOR self with another bitstring of the same length.
    #[inline]
    pub fn xor_inplace(&mut self, other: &Self) {
        assert_eq!(
            self.len, other.len,
            "The Xor'ed bit strings have different length."
        );
        xor_u64s_inplace(&mut self.data, &other.data);
    }

    /// Index of the first 1, if any.
    pub fn first_one_index(&self) -> Option<usize> {
        self.data
            .iter()
            .position(|x| *x != 0)
            .map(|id| (id << ITEM_BITS_LOG2) + self.data[id].trailing_zeros() as usize)
    }

    /// Indices of the ones, ascending.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.data.iter().enumerate().flat_map(|(id, word)| {
            let mut rest = *word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some((id << ITEM_BITS_LOG2) + bit)
            })
        })
    }

    /// Inner product with a vector of byte strings: XOR into `out` every
    /// `slots[i]` whose bit `i` is set.
    pub fn xor_selected(&self, slots: &[Vec<u8>], out: &mut [u8]) {
        for (id, word) in self.data.iter().enumerate() {
            let start = id << ITEM_BITS_LOG2;
            if start >= slots.len() {
                break;
            }
            xor_selected_slots(*word, &slots[start..], out);
        }
    }

    fn clear_tail(&mut self) {
        let last_bits = self.len & ITEM_BITS_MASK;
        if last_bits > 0 {
            if let Some(last) = self.data.last_mut() {
                *last &= ((1 as Storage) << last_bits) - 1;
            }
        }
    }
}

impl std::fmt::Display for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in 0..self.len {
            f.write_str(if self.get(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BitString({})", self)
    }
}

impl From<&[bool]> for BitString {
    fn from(s: &[bool]) -> Self {
        let mut ret = Self::new_zeros(s.len());
        for (i, bit) in s.iter().enumerate() {
            ret.set(i, *bit);
        }
        ret
    }
}

impl std::ops::BitXorAssign<&BitString> for BitString {
    #[inline]
    fn bitxor_assign(&mut self, rhs: &BitString) {
        self.xor_inplace(rhs);
    }
}
