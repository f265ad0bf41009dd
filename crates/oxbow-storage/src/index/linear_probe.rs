//! Linear-probing hash table over buffer pool pages.

use std::cmp::Ordering as CmpOrdering;
use std::marker::PhantomData;
use std::sync::Arc;

use oxbow_common::types::{KeyComparator, PageId, Storable};
use parking_lot::RwLock;
use tracing::trace;

use super::error::{IndexError, IndexResult};
use super::hash_fn::HashFunction;
use super::Transaction;
use crate::buffer::BufferPoolManager;
use crate::page::{HashBlockPage, HashHeaderPage, HEADER_BLOCK_CAPACITY};

/// Persistent bucket-array hash index.
///
/// A header page records the bucket count and one block page id per
/// bucket; block pages are allocated lazily when an insert first touches
/// their bucket. Within a block, collisions resolve by probing forward
/// from the hash-derived slot. Probing never crosses into another block,
/// so an insert into a full bucket block reports failure instead of
/// spilling; rehashing into more buckets is not implemented.
///
/// Removal tombstones the slot (the occupied bit stays set), which keeps
/// probe sequences over the remaining entries intact.
pub struct LinearProbeHashTable<K, V, C, H> {
    /// Index name, for diagnostics.
    name: String,
    /// Pool all pages are acquired through.
    bpm: Arc<BufferPoolManager>,
    /// Key collation.
    comparator: C,
    /// Key placement.
    hash_fn: H,
    /// The header page allocated at construction.
    header_page_id: PageId,
    /// Guards structural stability of the table. All operations take it in
    /// shared mode; block growth is still safe because the header list is
    /// append-only and slot bits flip monotonically under an exclusive
    /// page-data lock.
    table_latch: RwLock<()>,
    _marker: PhantomData<(K, V)>,
}

impl<K, V, C, H> LinearProbeHashTable<K, V, C, H>
where
    K: Storable,
    V: Storable + PartialEq,
    C: KeyComparator<K>,
    H: HashFunction<K>,
{
    /// Number of slots in one bucket block.
    const BLOCK_SLOTS: usize = HashBlockPage::<'static, K, V>::SLOT_COUNT;

    /// Creates a new hash table with `num_buckets` buckets.
    ///
    /// Allocates and formats the header page; block pages follow lazily as
    /// inserts touch their buckets. `num_buckets` must fit in one header
    /// page (at most [`HEADER_BLOCK_CAPACITY`]).
    pub fn new(
        name: impl Into<String>,
        bpm: Arc<BufferPoolManager>,
        comparator: C,
        num_buckets: usize,
        hash_fn: H,
    ) -> IndexResult<Self> {
        if num_buckets == 0 || num_buckets > HEADER_BLOCK_CAPACITY {
            return Err(IndexError::InvalidBucketCount { got: num_buckets });
        }

        let name = name.into();
        let header = bpm.new_page()?;
        let header_page_id = header.page_id();
        {
            let mut data = header.data_mut();
            let mut view = HashHeaderPage::new(&mut data[..]);
            view.init(header_page_id, num_buckets as u32);
        }
        bpm.unpin_page(header_page_id, true)?;

        trace!(name = %name, header_page_id = %header_page_id, num_buckets, "hash table created");
        Ok(Self {
            name,
            bpm,
            comparator,
            hash_fn,
            header_page_id,
            table_latch: RwLock::new(()),
            _marker: PhantomData,
        })
    }

    /// Returns the index name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the header page id.
    #[must_use]
    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    /// Collects every value stored under `key`, in slot order.
    ///
    /// Returns an empty vector when the key's bucket has no block or holds
    /// no matching entry.
    pub fn get_value(&self, _txn: &Transaction, key: &K) -> IndexResult<Vec<V>> {
        let header = self.bpm.fetch_page(self.header_page_id)?;
        let hash = self.hash_fn.hash_key(key);

        let block_page_id = {
            let mut data = header.data_mut();
            let view = HashHeaderPage::new(&mut data[..]);
            let bucket = (hash % u64::from(view.size())) as usize;
            view.block_page_id(bucket)
        };
        let slot_offset = (hash % Self::BLOCK_SLOTS as u64) as usize;

        let mut result = Vec::new();
        let latch = self.table_latch.read();
        if let Some(block_page_id) = block_page_id {
            let block = self.bpm.fetch_page(block_page_id)?;
            {
                let mut data = block.data_mut();
                let view = HashBlockPage::<K, V>::new(&mut data[..]);
                for slot in slot_offset..Self::BLOCK_SLOTS {
                    if view.is_readable(slot)
                        && self.comparator.compare(&view.key_at(slot), key) == CmpOrdering::Equal
                    {
                        result.push(view.value_at(slot));
                    }
                }
            }
            self.bpm.unpin_page(block_page_id, false)?;
        }
        drop(latch);

        self.bpm.unpin_page(self.header_page_id, false)?;
        Ok(result)
    }

    /// Inserts `(key, value)` into the key's bucket.
    ///
    /// Probes forward from the hash-derived slot for the first never-used
    /// slot. Returns false when the bucket block has no room left, and
    /// also when the identical pair is already present: a live duplicate
    /// observed during the probe stops the scan with the result of the
    /// last attempted slot.
    pub fn insert(&self, _txn: &Transaction, key: &K, value: &V) -> IndexResult<bool> {
        let header = self.bpm.fetch_page(self.header_page_id)?;
        let hash = self.hash_fn.hash_key(key);

        let block_page_id = {
            let mut data = header.data_mut();
            let mut view = HashHeaderPage::new(&mut data[..]);
            let bucket = (hash % u64::from(view.size())) as usize;

            // Grow the block list until it covers the target bucket. Each
            // fresh block is unpinned right away; it is re-fetched below
            // only if it is the target.
            while view.num_blocks() <= bucket {
                let block = self.bpm.new_page()?;
                let block_page_id = block.page_id();
                let added = view.add_block_page_id(block_page_id);
                debug_assert!(added, "bucket count is validated against header capacity");
                self.bpm.unpin_page(block_page_id, false)?;
            }

            view.block_page_id(bucket)
                .expect("block list covers the bucket after growth")
        };
        let slot_offset = (hash % Self::BLOCK_SLOTS as u64) as usize;

        let latch = self.table_latch.read();
        let block = self.bpm.fetch_page(block_page_id)?;
        let mut inserted = false;
        {
            let mut data = block.data_mut();
            let mut view = HashBlockPage::<K, V>::new(&mut data[..]);
            let mut slot = slot_offset;
            while slot < Self::BLOCK_SLOTS && !inserted {
                inserted = view.insert(slot, key, value);
                if view.is_readable(slot)
                    && self.comparator.compare(&view.key_at(slot), key) == CmpOrdering::Equal
                    && view.value_at(slot) == *value
                {
                    break;
                }
                slot += 1;
            }
        }
        drop(latch);

        self.bpm.unpin_page(block_page_id, true)?;
        self.bpm.unpin_page(self.header_page_id, true)?;
        Ok(inserted)
    }

    /// Removes the first live slot holding exactly `(key, value)`.
    ///
    /// The slot is tombstoned: its readable bit is dropped while its
    /// occupied bit stays set, preserving probe continuity for entries
    /// further along the block. Returns true iff a slot was cleared.
    pub fn remove(&self, _txn: &Transaction, key: &K, value: &V) -> IndexResult<bool> {
        let header = self.bpm.fetch_page(self.header_page_id)?;
        let hash = self.hash_fn.hash_key(key);

        let block_page_id = {
            let mut data = header.data_mut();
            let view = HashHeaderPage::new(&mut data[..]);
            let bucket = (hash % u64::from(view.size())) as usize;
            view.block_page_id(bucket)
        };
        let slot_offset = (hash % Self::BLOCK_SLOTS as u64) as usize;

        let mut removed = false;
        let latch = self.table_latch.read();
        if let Some(block_page_id) = block_page_id {
            let block = self.bpm.fetch_page(block_page_id)?;
            {
                let mut data = block.data_mut();
                let mut view = HashBlockPage::<K, V>::new(&mut data[..]);
                for slot in slot_offset..Self::BLOCK_SLOTS {
                    if view.is_readable(slot)
                        && self.comparator.compare(&view.key_at(slot), key) == CmpOrdering::Equal
                        && view.value_at(slot) == *value
                    {
                        view.remove(slot);
                        removed = true;
                        break;
                    }
                }
            }
            self.bpm.unpin_page(block_page_id, true)?;
        }
        drop(latch);

        self.bpm.unpin_page(self.header_page_id, false)?;
        Ok(removed)
    }

    /// Returns the number of block pages the header currently records.
    ///
    /// Note this counts allocated bucket blocks, not live entries: a table
    /// whose inserts have all been removed still reports every block it
    /// ever grew.
    pub fn get_size(&self) -> IndexResult<usize> {
        let header = self.bpm.fetch_page(self.header_page_id)?;
        let num_blocks = {
            let mut data = header.data_mut();
            let view = HashHeaderPage::new(&mut data[..]);
            view.num_blocks()
        };
        self.bpm.unpin_page(self.header_page_id, false)?;
        Ok(num_blocks)
    }

    /// Rehashing is not implemented; the bucket count is fixed at
    /// construction and this call does nothing.
    pub fn resize(&self, _initial_size: usize) {}
}

impl<K, V, C, H> std::fmt::Debug for LinearProbeHashTable<K, V, C, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearProbeHashTable")
            .field("name", &self.name)
            .field("header_page_id", &self.header_page_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPoolConfig;
    use crate::disk::FileDiskManager;
    use crate::index::hash_fn::{DefaultHashFunction, IdentityHashFunction};
    use oxbow_common::types::{OrdComparator, TxnId};
    use tempfile::tempdir;

    type IntTable = LinearProbeHashTable<i32, i32, OrdComparator<i32>, IdentityHashFunction>;

    fn make_pool(dir: &tempfile::TempDir, num_frames: usize) -> Arc<BufferPoolManager> {
        let disk = Arc::new(FileDiskManager::open(dir.path().join("index.db")).unwrap());
        Arc::new(BufferPoolManager::new(BufferPoolConfig::new(num_frames), disk, None).unwrap())
    }

    fn make_table(bpm: Arc<BufferPoolManager>, num_buckets: usize) -> IntTable {
        IntTable::new(
            "test_index",
            bpm,
            OrdComparator::new(),
            num_buckets,
            IdentityHashFunction,
        )
        .unwrap()
    }

    #[test]
    fn test_bucket_count_validation() {
        let dir = tempdir().unwrap();
        let bpm = make_pool(&dir, 16);

        assert!(matches!(
            IntTable::new("bad", bpm.clone(), OrdComparator::new(), 0, IdentityHashFunction),
            Err(IndexError::InvalidBucketCount { got: 0 })
        ));
        assert!(IntTable::new(
            "huge",
            bpm,
            OrdComparator::new(),
            HEADER_BLOCK_CAPACITY + 1,
            IdentityHashFunction
        )
        .is_err());
    }

    #[test]
    fn test_insert_and_get_colliding_keys() {
        let dir = tempdir().unwrap();
        let table = make_table(make_pool(&dir, 16), 2);
        let txn = Transaction::new(TxnId::new(1));

        // Same key twice: both values land in the same bucket, probing
        // into adjacent slots, and come back in slot order.
        assert!(table.insert(&txn, &5, &101).unwrap());
        assert!(table.insert(&txn, &5, &102).unwrap());
        assert_eq!(table.get_value(&txn, &5).unwrap(), vec![101, 102]);
    }

    #[test]
    fn test_remove_tombstones_one_pair() {
        let dir = tempdir().unwrap();
        let table = make_table(make_pool(&dir, 16), 2);
        let txn = Transaction::new(TxnId::new(1));

        table.insert(&txn, &5, &101).unwrap();
        table.insert(&txn, &5, &102).unwrap();

        assert!(table.remove(&txn, &5, &101).unwrap());
        assert_eq!(table.get_value(&txn, &5).unwrap(), vec![102]);
        assert!(!table.remove(&txn, &5, &101).unwrap());
    }

    #[test]
    fn test_lazy_block_growth() {
        let dir = tempdir().unwrap();
        let table = make_table(make_pool(&dir, 16), 4);
        let txn = Transaction::new(TxnId::new(1));

        assert_eq!(table.get_size().unwrap(), 0);

        // Key 3 hashes to bucket 3, so blocks 0 through 3 come into
        // existence in one step.
        assert!(table.insert(&txn, &3, &30).unwrap());
        assert_eq!(table.get_size().unwrap(), 4);

        // Growth does not repeat for buckets already covered.
        assert!(table.insert(&txn, &1, &10).unwrap());
        assert_eq!(table.get_size().unwrap(), 4);
    }

    #[test]
    fn test_missing_bucket_reads_empty() {
        let dir = tempdir().unwrap();
        let table = make_table(make_pool(&dir, 16), 2);
        let txn = Transaction::new(TxnId::new(1));

        // Only bucket 0 has a block.
        table.insert(&txn, &0, &1).unwrap();
        assert_eq!(table.get_size().unwrap(), 1);

        assert_eq!(table.get_value(&txn, &1).unwrap(), Vec::<i32>::new());
        assert!(!table.remove(&txn, &1, &1).unwrap());
    }

    #[test]
    fn test_duplicate_pair_is_rejected() {
        let dir = tempdir().unwrap();
        let table = make_table(make_pool(&dir, 16), 2);
        let txn = Transaction::new(TxnId::new(1));

        assert!(table.insert(&txn, &7, &70).unwrap());
        assert!(!table.insert(&txn, &7, &70).unwrap());
        assert_eq!(table.get_value(&txn, &7).unwrap(), vec![70]);
    }

    #[test]
    fn test_tombstone_preserves_probe_continuity() {
        let dir = tempdir().unwrap();
        let table = make_table(make_pool(&dir, 16), 1);
        let txn = Transaction::new(TxnId::new(1));

        table.insert(&txn, &0, &1).unwrap();
        table.insert(&txn, &0, &2).unwrap();
        table.remove(&txn, &0, &1).unwrap();

        // The tombstone at the first slot does not hide the survivor.
        assert_eq!(table.get_value(&txn, &0).unwrap(), vec![2]);

        // New inserts skip the tombstone instead of reusing it.
        table.insert(&txn, &0, &3).unwrap();
        assert_eq!(table.get_value(&txn, &0).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_distinct_keys_share_a_probe_chain() {
        let dir = tempdir().unwrap();
        let table = make_table(make_pool(&dir, 16), 1);
        let txn = Transaction::new(TxnId::new(1));

        // 503 % 496 == 7, so both keys start probing at slot 7.
        let slots = block_array_size_of();
        assert_eq!(503 % slots, 7);

        table.insert(&txn, &7, &70).unwrap();
        table.insert(&txn, &503, &530).unwrap();

        assert_eq!(table.get_value(&txn, &7).unwrap(), vec![70]);
        assert_eq!(table.get_value(&txn, &503).unwrap(), vec![530]);
    }

    fn block_array_size_of() -> i32 {
        crate::page::block_array_size::<i32, i32>() as i32
    }

    #[test]
    fn test_full_bucket_rejects_insert() {
        let dir = tempdir().unwrap();
        let table = make_table(make_pool(&dir, 16), 1);
        let txn = Transaction::new(TxnId::new(1));

        let slots = crate::page::block_array_size::<i32, i32>();
        for v in 0..slots as i32 {
            assert!(table.insert(&txn, &0, &v).unwrap(), "slot {v}");
        }
        assert!(!table.insert(&txn, &0, &(slots as i32)).unwrap());
        assert_eq!(table.get_value(&txn, &0).unwrap().len(), slots);
    }

    #[test]
    fn test_resize_is_a_noop() {
        let dir = tempdir().unwrap();
        let table = make_table(make_pool(&dir, 16), 2);
        let txn = Transaction::new(TxnId::new(1));

        table.insert(&txn, &0, &1).unwrap();
        let before = table.get_size().unwrap();

        table.resize(1024);
        assert_eq!(table.get_size().unwrap(), before);
        assert_eq!(table.get_value(&txn, &0).unwrap(), vec![1]);
    }

    #[test]
    fn test_get_size_counts_blocks_not_entries() {
        let dir = tempdir().unwrap();
        let table = make_table(make_pool(&dir, 16), 2);
        let txn = Transaction::new(TxnId::new(1));

        table.insert(&txn, &0, &1).unwrap();
        table.remove(&txn, &0, &1).unwrap();

        // The block survives its last entry.
        assert_eq!(table.get_size().unwrap(), 1);
    }

    #[test]
    fn test_default_hash_function_end_to_end() {
        let dir = tempdir().unwrap();
        let bpm = make_pool(&dir, 16);
        let table = LinearProbeHashTable::<i32, i32, _, _>::new(
            "siphash_index",
            bpm,
            OrdComparator::new(),
            8,
            DefaultHashFunction::new(),
        )
        .unwrap();
        let txn = Transaction::new(TxnId::new(1));

        for key in 0..32 {
            assert!(table.insert(&txn, &key, &(key * 10)).unwrap());
        }
        for key in 0..32 {
            assert_eq!(table.get_value(&txn, &key).unwrap(), vec![key * 10]);
        }
        assert_eq!(table.get_value(&txn, &99).unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn test_survives_pool_eviction() {
        let dir = tempdir().unwrap();
        // Pool smaller than the page set: header and block pages keep
        // cycling through disk.
        let bpm = make_pool(&dir, 2);
        let table = LinearProbeHashTable::<i32, i32, _, _>::new(
            "tiny_pool_index",
            bpm,
            OrdComparator::new(),
            8,
            IdentityHashFunction,
        )
        .unwrap();
        let txn = Transaction::new(TxnId::new(1));

        for key in 0..8 {
            assert!(table.insert(&txn, &key, &(key + 100)).unwrap());
        }
        for key in 0..8 {
            assert_eq!(table.get_value(&txn, &key).unwrap(), vec![key + 100]);
        }
    }
}
