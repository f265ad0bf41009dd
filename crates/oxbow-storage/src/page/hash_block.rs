//! Block page layout for the linear-probing hash index.
//!
//! A block page is one bucket: two bitmaps followed by a fixed array of
//! encoded `(key, value)` slots.
//!
//! # Layout
//!
//! ```text
//! Offset          Size            Field
//! ------          ----            -----
//! 0               ceil(n/8)       occupied bitmap
//! ceil(n/8)       ceil(n/8)       readable bitmap
//! 2*ceil(n/8)     n*(K+V)         slot array
//! ```
//!
//! where `n` is [`block_array_size`]. A slot's two bits encode three
//! states: empty-never-used (`occupied=0`), tombstoned (`occupied=1,
//! readable=0`), and live (both set). The occupied bit is set on first
//! insert and never cleared, so probe sequences stay intact across
//! removals.

use std::marker::PhantomData;

use oxbow_common::constants::PAGE_SIZE;
use oxbow_common::types::Storable;

/// Number of slots in a block page for the given key and value widths.
///
/// Each slot costs its encoded pair plus two bitmap bits, giving
/// `4 * PAGE_SIZE / (4 * (K + V) + 1)` slots per page. The two bitmaps and
/// the slot array always fit inside one page.
#[must_use]
pub const fn block_array_size<K: Storable, V: Storable>() -> usize {
    (4 * PAGE_SIZE) / (4 * (K::LEN + V::LEN) + 1)
}

/// Mutable view over a hash index block page.
pub struct HashBlockPage<'a, K, V> {
    data: &'a mut [u8],
    _marker: PhantomData<(K, V)>,
}

impl<'a, K: Storable, V: Storable> HashBlockPage<'a, K, V> {
    /// Number of slots in a block of this key/value shape.
    pub const SLOT_COUNT: usize = block_array_size::<K, V>();

    const BITMAP_BYTES: usize = (Self::SLOT_COUNT + 7) / 8;
    const READABLE_OFFSET: usize = Self::BITMAP_BYTES;
    const ARRAY_OFFSET: usize = 2 * Self::BITMAP_BYTES;
    const ENTRY_LEN: usize = K::LEN + V::LEN;

    /// Creates a view into the given page buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than `PAGE_SIZE`.
    pub fn new(data: &'a mut [u8]) -> Self {
        assert!(data.len() >= PAGE_SIZE, "buffer too small for block page");
        debug_assert!(
            Self::ARRAY_OFFSET + Self::SLOT_COUNT * Self::ENTRY_LEN <= PAGE_SIZE,
            "block layout exceeds page"
        );
        Self {
            data,
            _marker: PhantomData,
        }
    }

    /// Returns true iff the slot has ever held an entry.
    #[must_use]
    pub fn is_occupied(&self, slot: usize) -> bool {
        slot < Self::SLOT_COUNT && self.bit(0, slot)
    }

    /// Returns true iff the slot holds a live entry.
    #[must_use]
    pub fn is_readable(&self, slot: usize) -> bool {
        slot < Self::SLOT_COUNT && self.bit(Self::READABLE_OFFSET, slot)
    }

    /// Decodes the key stored at `slot`.
    #[must_use]
    pub fn key_at(&self, slot: usize) -> K {
        K::read_from(&self.data[Self::entry_offset(slot)..])
    }

    /// Decodes the value stored at `slot`.
    #[must_use]
    pub fn value_at(&self, slot: usize) -> V {
        V::read_from(&self.data[Self::entry_offset(slot) + K::LEN..])
    }

    /// Writes `(key, value)` into `slot` if it has never been used.
    ///
    /// Returns false without writing when the slot is occupied. Tombstoned
    /// slots count as occupied and are never reused.
    pub fn insert(&mut self, slot: usize, key: &K, value: &V) -> bool {
        if slot >= Self::SLOT_COUNT || self.is_occupied(slot) {
            return false;
        }

        self.set_bit(0, slot);
        self.set_bit(Self::READABLE_OFFSET, slot);

        let offset = Self::entry_offset(slot);
        key.write_to(&mut self.data[offset..]);
        value.write_to(&mut self.data[offset + K::LEN..]);
        true
    }

    /// Tombstones the slot: the readable bit is cleared, the occupied bit
    /// and the stored bytes stay.
    pub fn remove(&mut self, slot: usize) {
        if slot >= Self::SLOT_COUNT {
            return;
        }
        self.clear_bit(Self::READABLE_OFFSET, slot);
    }

    #[inline]
    fn entry_offset(slot: usize) -> usize {
        Self::ARRAY_OFFSET + slot * Self::ENTRY_LEN
    }

    #[inline]
    fn bit(&self, bitmap_offset: usize, slot: usize) -> bool {
        self.data[bitmap_offset + slot / 8] & (1 << (slot % 8)) != 0
    }

    #[inline]
    fn set_bit(&mut self, bitmap_offset: usize, slot: usize) {
        self.data[bitmap_offset + slot / 8] |= 1 << (slot % 8);
    }

    #[inline]
    fn clear_bit(&mut self, bitmap_offset: usize, slot: usize) {
        self.data[bitmap_offset + slot / 8] &= !(1 << (slot % 8));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type IntBlock<'a> = HashBlockPage<'a, i32, i32>;

    #[test]
    fn test_block_array_size() {
        // (i32, i32) pairs: 8 bytes per entry plus two bitmap bits.
        assert_eq!(block_array_size::<i32, i32>(), 496);
        // Layouts fit for every supported entry width.
        assert!(2 * ((496 + 7) / 8) + 496 * 8 <= PAGE_SIZE);
        assert_eq!(block_array_size::<u64, u64>(), 252);
    }

    #[test]
    fn test_fresh_block_is_empty() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let block = IntBlock::new(&mut buf);

        for slot in 0..IntBlock::SLOT_COUNT {
            assert!(!block.is_occupied(slot));
            assert!(!block.is_readable(slot));
        }
    }

    #[test]
    fn test_insert_and_read() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut block = IntBlock::new(&mut buf);

        assert!(block.insert(3, &-5, &77));
        assert!(block.is_occupied(3));
        assert!(block.is_readable(3));
        assert_eq!(block.key_at(3), -5);
        assert_eq!(block.value_at(3), 77);

        // Neighboring slots are untouched.
        assert!(!block.is_occupied(2));
        assert!(!block.is_occupied(4));
    }

    #[test]
    fn test_occupied_slot_rejects_insert() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut block = IntBlock::new(&mut buf);

        assert!(block.insert(0, &1, &1));
        assert!(!block.insert(0, &2, &2));
        assert_eq!(block.key_at(0), 1);
    }

    #[test]
    fn test_remove_leaves_tombstone() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut block = IntBlock::new(&mut buf);

        block.insert(5, &10, &20);
        block.remove(5);

        assert!(block.is_occupied(5));
        assert!(!block.is_readable(5));
        // Tombstoned slots are never reused.
        assert!(!block.insert(5, &11, &21));
    }

    #[test]
    fn test_out_of_range_slots() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut block = IntBlock::new(&mut buf);

        let past_end = IntBlock::SLOT_COUNT;
        assert!(!block.is_occupied(past_end));
        assert!(!block.is_readable(past_end));
        assert!(!block.insert(past_end, &1, &1));
        block.remove(past_end);
    }

    #[test]
    fn test_last_slot_stays_inside_page() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut block = IntBlock::new(&mut buf);

        let last = IntBlock::SLOT_COUNT - 1;
        assert!(block.insert(last, &i32::MAX, &i32::MIN));
        assert_eq!(block.key_at(last), i32::MAX);
        assert_eq!(block.value_at(last), i32::MIN);
    }

    #[test]
    fn test_wide_entries() {
        use oxbow_common::types::{Key16, PageId, RecordId};

        let mut buf = vec![0u8; PAGE_SIZE];
        let mut block = HashBlockPage::<Key16, RecordId>::new(&mut buf);

        let key = Key16::from_bytes(b"wide-key");
        let rid = RecordId::new(PageId::new(9), 4);
        assert!(block.insert(0, &key, &rid));
        assert_eq!(block.key_at(0), key);
        assert_eq!(block.value_at(0), rid);
    }
}
