//! Fixed-capacity bit vector
//!
//! Bits are stored LSB-first within little-endian u64 words, so the byte
//! serialization is a portable little-endian packed bit vector: bit `i`
//! lives in byte `i / 8` at bit `i % 8`. Set algebra treats a shorter
//! operand as zero-extended.

const WORD_BITS: usize = u64::BITS as usize;
const WORD_BYTES: usize = std::mem::size_of::<u64>();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitset {
    words: Vec<u64>,
    capacity: usize,
}

impl Bitset {
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set(&mut self, index: usize) {
        assert!(index < self.capacity, "bit index out of capacity");
        self.words[index / WORD_BITS] |= 1 << (index % WORD_BITS);
    }

    pub fn clear(&mut self, index: usize) {
        assert!(index < self.capacity, "bit index out of capacity");
        self.words[index / WORD_BITS] &= !(1 << (index % WORD_BITS));
    }

    pub fn has(&self, index: usize) -> bool {
        if index >= self.capacity {
            return false;
        }
        self.words[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0
    }

    /// Number of set bits
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Word-wise AND. The shorter operand is treated as zero-extended.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.intersect_in_place(other);
        result.capacity = self.capacity.max(other.capacity);
        result.words.resize(result.capacity.div_ceil(WORD_BITS), 0);
        result
    }

    pub fn intersect_in_place(&mut self, other: &Self) {
        for (i, word) in self.words.iter_mut().enumerate() {
            *word &= other.words.get(i).copied().unwrap_or(0);
        }
    }

    /// Word-wise OR. The shorter operand is treated as zero-extended.
    pub fn union(&self, other: &Self) -> Self {
        let (longer, shorter) = if self.words.len() >= other.words.len() {
            (self, other)
        } else {
            (other, self)
        };

        let mut result = longer.clone();
        for (i, word) in shorter.words.iter().enumerate() {
            result.words[i] |= word;
        }

        result.capacity = self.capacity.max(other.capacity);
        result
    }

    /// Set bit positions, strictly ascending
    pub fn to_indices(&self) -> Vec<u32> {
        let mut indices = Vec::with_capacity(self.count());

        for (word_idx, word) in self.words.iter().enumerate() {
            let mut word = *word;
            while word != 0 {
                let bit = word.trailing_zeros() as usize;
                indices.push((word_idx * WORD_BITS + bit) as u32);
                word &= word - 1;
            }
        }

        indices
    }

    /// Word-aligned little-endian bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.words.len() * WORD_BYTES);
        for word in &self.words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    /// Rebuild from little-endian bytes. Capacity is rounded up to the
    /// containing word, so membership agrees with the source bitset on
    /// every index below its original capacity.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut words = Vec::with_capacity(bytes.len().div_ceil(WORD_BYTES));

        for chunk in bytes.chunks(WORD_BYTES) {
            let mut word_bytes = [0; WORD_BYTES];
            word_bytes[..chunk.len()].copy_from_slice(chunk);
            words.push(u64::from_le_bytes(word_bytes));
        }

        Self {
            capacity: words.len() * WORD_BITS,
            words,
        }
    }

    pub fn from_indices(indices: &[u32], capacity: usize) -> Self {
        let mut bitset = Self::new(capacity);
        for index in indices {
            bitset.set(*index as usize);
        }
        bitset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_set_has_clear() {
        let mut bits = Bitset::new(100);
        assert!(!bits.has(63));

        bits.set(63);
        bits.set(64);
        bits.set(0);
        assert!(bits.has(63));
        assert!(bits.has(64));
        assert!(bits.has(0));
        assert_eq!(bits.count(), 3);

        bits.clear(64);
        assert!(!bits.has(64));
        assert_eq!(bits.count(), 2);
    }

    #[test]
    fn test_has_out_of_capacity_is_false() {
        let bits = Bitset::new(10);
        assert!(!bits.has(10));
        assert!(!bits.has(1000));
    }

    #[test]
    fn test_to_indices_ascending() {
        let bits = Bitset::from_indices(&[77, 3, 64, 3, 0], 100);
        assert_eq!(bits.to_indices(), vec![0, 3, 64, 77]);
    }

    #[test]
    fn test_intersect_mismatched_capacity() {
        let a = Bitset::from_indices(&[1, 5, 70], 100);
        let b = Bitset::from_indices(&[1, 5], 10);

        let i = a.intersect(&b);
        assert_eq!(i.to_indices(), vec![1, 5]);
        assert_eq!(i.capacity(), 100);

        // symmetric
        assert_eq!(b.intersect(&a).to_indices(), vec![1, 5]);
    }

    #[test]
    fn test_union_mismatched_capacity() {
        let a = Bitset::from_indices(&[1, 70], 100);
        let b = Bitset::from_indices(&[2], 10);

        let u = a.union(&b);
        assert_eq!(u.to_indices(), vec![1, 2, 70]);
        assert_eq!(u.capacity(), 100);
        assert_eq!(b.union(&a).to_indices(), vec![1, 2, 70]);
    }

    #[test]
    fn test_intersect_in_place() {
        let mut a = Bitset::from_indices(&[1, 2, 3], 100);
        let b = Bitset::from_indices(&[2, 3, 4], 100);

        a.intersect_in_place(&b);
        assert_eq!(a.to_indices(), vec![2, 3]);
    }

    #[test]
    fn test_byte_layout_lsb_first() {
        let mut bits = Bitset::new(16);
        bits.set(0);
        bits.set(9);

        let bytes = bits.to_bytes();
        assert_eq!(bytes[0], 0b0000_0001);
        assert_eq!(bytes[1], 0b0000_0010);
    }

    #[quickcheck]
    fn prop_byte_round_trip(indices: Vec<u16>) -> bool {
        let capacity = 1 + indices.iter().copied().max().unwrap_or(0) as usize;
        let indices: Vec<u32> = indices.iter().map(|i| *i as u32).collect();

        let bits = Bitset::from_indices(&indices, capacity);
        let back = Bitset::from_bytes(&bits.to_bytes());

        (0..capacity).all(|i| bits.has(i) == back.has(i)) && bits.count() == back.count()
    }

    #[quickcheck]
    fn prop_to_indices_strictly_increasing(indices: Vec<u16>) -> bool {
        let capacity = 1 + indices.iter().copied().max().unwrap_or(0) as usize;
        let indices: Vec<u32> = indices.iter().map(|i| *i as u32).collect();

        let out = Bitset::from_indices(&indices, capacity).to_indices();
        out.windows(2).all(|w| w[0] < w[1])
    }
}
