//! Computed-result cache.
//!
//! A lossy direct-mapped table memoizing operation results. Entries are
//! advisory: colliding keys overwrite each other, and the engine clears the
//! whole cache on every garbage-collection pass, because cached results key
//! on node handles that collection may recycle for unrelated content.

use std::cell::Cell;
use std::marker::PhantomData;

use crate::table::MyHash;

struct Entry<V> {
    key: u64,
    value: V,
}

pub struct Cache<K, V> {
    data: Vec<Option<Entry<V>>>,
    bitmask: u64,
    len: usize,
    hits: Cell<usize>,
    misses: Cell<usize>,
    _phantom: PhantomData<K>,
}

impl<K, V> Cache<K, V> {
    /// Create a new cache of size `2^bits`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bits should be in the range 0..=31");

        let size = 1 << bits;
        let bitmask = (size - 1) as u64;

        Self {
            data: std::iter::repeat_with(|| None).take(size).collect(),
            bitmask,
            len: 0,
            hits: Cell::new(0),
            misses: Cell::new(0),
            _phantom: PhantomData,
        }
    }

    /// Get the number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits.get()
    }
    /// Get the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    /// Discard all entries.
    pub fn clear(&mut self) {
        self.data.fill_with(|| None);
        self.len = 0;
    }

    fn index(&self, key: u64) -> usize {
        (key & self.bitmask) as usize
    }

    /// Get the cached result.
    pub fn get(&self, key: &K) -> Option<&V>
    where
        K: MyHash,
    {
        let key = key.hash();
        let index = self.index(key);
        match &self.data[index] {
            Some(entry) if entry.key == key => {
                self.hits.set(self.hits.get() + 1);
                Some(&entry.value)
            }
            _ => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    /// Insert a result into the cache, evicting whatever occupied the slot.
    pub fn insert(&mut self, key: &K, value: V)
    where
        K: MyHash,
    {
        let k = key.hash();
        let index = self.index(k);
        if self.data[index].is_none() {
            self.len += 1;
        }
        self.data[index] = Some(Entry { key: k, value });
    }
}
