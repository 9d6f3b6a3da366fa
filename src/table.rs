//! Hash-consed storage with per-entry reference counts.
//!
//! [`UniqueTable`] is the canonical home of every node in the engine: cells
//! are chained into hash buckets, and [`UniqueTable::put`] returns the index
//! of an existing structurally equal value instead of inserting a duplicate.
//! Each occupied cell carries a reference count that the engine drives via
//! `inc_ref`/`dec_ref`; the garbage collector walks the buckets directly to
//! unlink and drop dead cells.

use std::cmp::min;

/// Hash used for bucket placement and cache keys.
pub trait MyHash {
    fn hash(&self) -> u64;
}

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: usize,
    occupied: bool,
    refcount: u32,
}

impl<T> Entry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            next: 0,
            occupied: false,
            refcount: 0,
        }
    }
}

impl<T> Default for Entry<T>
where
    T: Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

pub struct UniqueTable<T> {
    data: Vec<Entry<T>>,

    buckets: Vec<usize>,
    bitmask: u64,

    /// Index of the first *possibly* free (non-occupied) cell.
    min_free: usize,
    /// Index of the last occupied cell.
    last_index: usize,
    /// Number of occupied cells.
    real_size: usize,
}

impl<T> UniqueTable<T>
where
    T: Default,
{
    /// Create a new table of size `2^bits`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let capacity = 1 << bits;
        let mut data: Vec<Entry<T>> = Vec::with_capacity(capacity);
        data.resize_with(capacity, Entry::default);
        data[0].occupied = true; // Set 0th cell as occupied (sentry).

        let buckets_bits = min(bits, 16);
        let buckets_size = 1 << buckets_bits;
        let buckets = vec![0; buckets_size];
        let bitmask = (buckets_size - 1) as u64;

        Self {
            data,
            buckets,
            bitmask,
            min_free: 1,
            last_index: 0,
            real_size: 0,
        }
    }
}

impl<T> UniqueTable<T> {
    /// Get the capacity of the table.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }
    /// Get the index of the last occupied cell.
    pub fn size(&self) -> usize {
        self.last_index
    }
    /// Get the number of occupied cells.
    pub fn real_size(&self) -> usize {
        self.real_size
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        assert!(self.data[index].occupied, "Index {} is not occupied", index);
        &self.data[index].value
    }

    /// Check if the cell at the given index is occupied.
    pub fn is_occupied(&self, index: usize) -> bool {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].occupied
    }
    /// Get the index of the next cell in the bucket chain.
    pub fn next(&self, index: usize) -> usize {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next
    }
    /// Set the index of the next cell in the bucket chain.
    pub fn set_next(&mut self, index: usize, next: usize) {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next = next;
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }
    pub fn bucket(&self, i: usize) -> usize {
        self.buckets[i]
    }
    pub fn set_bucket(&mut self, i: usize, index: usize) {
        self.buckets[i] = index;
    }

    pub fn ref_count(&self, index: usize) -> u32 {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].refcount
    }
    pub fn inc_ref(&mut self, index: usize) {
        assert!(self.data[index].occupied, "Index {} is not occupied", index);
        self.data[index].refcount += 1;
    }
    pub fn dec_ref(&mut self, index: usize) {
        let entry = &mut self.data[index];
        assert!(entry.occupied, "Index {} is not occupied", index);
        assert!(entry.refcount > 0, "Refcount underflow at index {}", index);
        entry.refcount -= 1;
    }

    /// Allocate a new cell in the table and return its index.
    pub(crate) fn alloc(&mut self) -> usize {
        let index = (self.min_free..=self.last_index)
            .find(|&i| !self.data[i].occupied)
            .unwrap_or_else(|| {
                self.last_index += 1;
                self.last_index
            });

        if index >= self.capacity() {
            panic!("Unique table is full");
        }

        self.data[index].occupied = true;
        self.data[index].refcount = 0;
        self.min_free = index + 1;
        self.real_size += 1;

        index
    }

    /// Drop the cell at the given index. The bucket chain must be relinked
    /// by the caller.
    pub fn drop(&mut self, index: usize) {
        assert_ne!(index, 0, "Index is 0");
        assert_eq!(
            self.data[index].refcount, 0,
            "Dropping a referenced cell at index {}",
            index
        );

        self.data[index].occupied = false;
        self.min_free = min(self.min_free, index);
        self.real_size -= 1;
    }

    /// Add a new value to the table, outside of any bucket chain.
    pub fn add(&mut self, value: T) -> usize {
        let index = self.alloc();

        self.data[index].value = value;
        self.data[index].next = 0;

        index
    }
}

impl<T> UniqueTable<T>
where
    T: MyHash,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Put a value into the table. Returns the canonical index and whether a
    /// new cell was inserted (`false` means the value was already present).
    pub fn put(&mut self, value: T) -> (usize, bool)
    where
        T: Eq,
    {
        let bucket_index = self.bucket_index(&value);
        let mut index = self.buckets[bucket_index];

        if index == 0 {
            // Create a new cell and put it into the bucket.
            let i = self.add(value);
            self.buckets[bucket_index] = i;
            return (i, true);
        }

        loop {
            assert!(index > 0);

            if &value == self.value(index) {
                // The value already exists.
                return (index, false);
            }

            let next = self.next(index);

            if next == 0 {
                // Create a new cell and append it to the bucket.
                let i = self.add(value);
                self.set_next(index, i);
                return (i, true);
            } else {
                // Go to the next cell in the bucket.
                index = next;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc() {
        let mut table = UniqueTable::<()>::new(2);
        assert_eq!(table.alloc(), 1);
        assert_eq!(table.alloc(), 2);
        assert_eq!(table.alloc(), 3);
    }

    #[test]
    #[should_panic(expected = "Unique table is full")]
    fn test_alloc_too_much() {
        let mut table = UniqueTable::<()>::new(2);
        assert_eq!(table.alloc(), 1);
        assert_eq!(table.alloc(), 2);
        assert_eq!(table.alloc(), 3);
        table.alloc();
    }

    #[test]
    fn test_put_dedups() {
        #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
        struct Item(i32);

        impl MyHash for Item {
            fn hash(&self) -> u64 {
                self.0.unsigned_abs() as u64
            }
        }

        let mut table = UniqueTable::new(2);
        let (index1, inserted1) = table.put(Item(5));
        let (index2, inserted2) = table.put(Item(-5));
        let (index3, inserted3) = table.put(Item(5));
        assert!(inserted1);
        assert!(inserted2);
        assert!(!inserted3);
        assert_ne!(index1, index2);
        assert_eq!(index1, index3);
        // Items 5 and -5 collide and end up chained in one bucket.
        assert_eq!(table.next(index1), index2);
    }

    #[test]
    fn test_ref_counts() {
        let mut table = UniqueTable::new(2);
        let index = table.add(42);
        assert_eq!(table.ref_count(index), 0);
        table.inc_ref(index);
        table.inc_ref(index);
        assert_eq!(table.ref_count(index), 2);
        table.dec_ref(index);
        table.dec_ref(index);
        table.drop(index);
        assert!(!table.is_occupied(index));
    }

    #[test]
    #[should_panic(expected = "Dropping a referenced cell")]
    fn test_drop_referenced() {
        let mut table = UniqueTable::new(2);
        let index = table.add(42);
        table.inc_ref(index);
        table.drop(index);
    }
}
