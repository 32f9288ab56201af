//! Set facade over the table core, for dedup workloads.
//!
//! A `HashSet` is a [`HashTable`] of key-only [`SetCell`]s. There is no
//! payload-initialization discipline to uphold, so this facade is a thin
//! rename of the table's own operations.

use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::DefaultHashBuilder;
use crate::allocator::HeapAllocator;
use crate::allocator::TableAllocator;
use crate::cell::Cell;
use crate::cell::SetCell;
use crate::cell::ZeroKey;
use crate::grower::DefaultGrower;
use crate::grower::Grower;
use crate::hash_table::HashTable;

/// A set of trivial-width keys with zero-key sentinel storage.
///
/// ## Example
///
/// ```rust
/// use probe_hash::HashSet;
///
/// let mut seen: HashSet<u64> = HashSet::new();
/// assert!(seen.insert(7));
/// assert!(!seen.insert(7));
/// assert!(seen.insert(0));
/// assert_eq!(seen.len(), 2);
/// ```
pub struct HashSet<K, S = DefaultHashBuilder, G = DefaultGrower, A = HeapAllocator>
where
    K: ZeroKey + Hash,
    G: Grower,
    A: TableAllocator,
{
    table: HashTable<SetCell<K>, S, G, A>,
}

impl<K, S, G, A> HashSet<K, S, G, A>
where
    K: ZeroKey + Hash,
    S: BuildHasher + Default,
    G: Grower,
    A: TableAllocator,
{
    /// Creates an empty set with the default capacity.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a set that holds at least `capacity` keys without resizing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, S, G, A> Default for HashSet<K, S, G, A>
where
    K: ZeroKey + Hash,
    S: BuildHasher + Default,
    G: Grower,
    A: TableAllocator,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S, G, A> HashSet<K, S, G, A>
where
    K: ZeroKey + Hash,
    S: BuildHasher,
    G: Grower,
    A: TableAllocator,
{
    /// Creates an empty set with the given hasher builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        HashSet {
            table: HashTable::with_hasher(hash_builder),
        }
    }

    /// Creates a set sized for `capacity` keys with the given hasher
    /// builder.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        HashSet {
            table: HashTable::with_capacity_and_hasher(capacity, hash_builder),
        }
    }

    /// Inserts `key`, returning `true` if it was not already present.
    pub fn insert(&mut self, key: K) -> bool {
        self.table.emplace(key).1
    }

    /// Returns `true` if the set contains `key`.
    pub fn contains(&self, key: K) -> bool {
        self.table.find(key).is_some()
    }

    /// Number of keys in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no keys.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Maximum occupancy before the next insert triggers a resize.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all keys, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Reserves capacity for at least `additional` more keys.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Returns an iterator over the keys, the zero key first if present.
    pub fn iter(&self) -> Iter<'_, K, S, G, A> {
        Iter {
            inner: self.table.iter(),
        }
    }
}

impl<K, S, G, A> Debug for HashSet<K, S, G, A>
where
    K: ZeroKey + Hash + Debug,
    S: BuildHasher,
    G: Grower,
    A: TableAllocator,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// An iterator over the keys of a [`HashSet`].
pub struct Iter<'a, K, S, G, A>
where
    K: ZeroKey + Hash,
    G: Grower,
    A: TableAllocator,
{
    inner: crate::hash_table::Iter<'a, SetCell<K>, S, G, A>,
}

impl<'a, K, S, G, A> Iterator for Iter<'a, K, S, G, A>
where
    K: ZeroKey + Hash,
    S: BuildHasher,
    G: Grower,
    A: TableAllocator,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        self.inner.next().map(|cell| cell.key())
    }
}

impl<'a, K, S, G, A> IntoIterator for &'a HashSet<K, S, G, A>
where
    K: ZeroKey + Hash,
    S: BuildHasher,
    G: Grower,
    A: TableAllocator,
{
    type Item = K;
    type IntoIter = Iter<'a, K, S, G, A>;

    fn into_iter(self) -> Iter<'a, K, S, G, A> {
        self.iter()
    }
}
