//! Map facade over the table core.
//!
//! `HashMapTable` pairs every key with a mapped value and takes over the
//! payload-initialization discipline the raw table leaves to its callers:
//! every operation that inserts a key writes the mapped value in the same
//! call, so occupied cells always carry an initialized value. That single
//! invariant is what makes the safe accessors here sound.

use core::fmt::Debug;
use core::hash::BuildHasher;

use crate::DefaultHashBuilder;
use crate::allocator::HeapAllocator;
use crate::allocator::TableAllocator;
use crate::cell::HashedMapCell;
use crate::cell::MapCell;
use crate::cell::MappedCell;
use crate::grower::DefaultGrower;
use crate::grower::Grower;
use crate::hash_table::HashTable;

/// Hash map with plain cells: 8 bytes + payload per slot, rehash on resize.
pub type HashMap<K, V, S = DefaultHashBuilder, G = DefaultGrower, A = HeapAllocator> =
    HashMapTable<MapCell<K, V>, S, G, A>;

/// Hash map with hash-caching cells: 8 extra bytes per slot buy
/// hash-mismatch rejection on collisions and rehash-free resize.
pub type HashMapWithSavedHash<K, V, S = DefaultHashBuilder, G = DefaultGrower, A = HeapAllocator> =
    HashMapTable<HashedMapCell<K, V>, S, G, A>;

/// A keyed map over any [`MappedCell`] layout.
///
/// Use through the [`HashMap`] or [`HashMapWithSavedHash`] aliases unless
/// you are supplying a custom cell.
///
/// Keys are trivial-width `Copy` values (see
/// [`ZeroKey`](crate::cell::ZeroKey)); the zero key is fully supported and
/// stored in the table's dedicated sentinel slot. There is no per-key
/// removal, matching the aggregation workloads this serves.
///
/// ## Example
///
/// ```rust
/// use probe_hash::HashMap;
///
/// let mut sums: HashMap<u32, i64> = HashMap::new();
/// for (key, delta) in [(1, 10), (2, 5), (1, -3)] {
///     *sums.get_or_default(key) += delta;
/// }
/// assert_eq!(sums.get(1), Some(&7));
/// assert_eq!(sums.get(2), Some(&5));
/// ```
pub struct HashMapTable<C, S = DefaultHashBuilder, G = DefaultGrower, A = HeapAllocator>
where
    C: MappedCell,
    G: Grower,
    A: TableAllocator,
{
    table: HashTable<C, S, G, A>,
}

impl<C, S, G, A> HashMapTable<C, S, G, A>
where
    C: MappedCell,
    S: BuildHasher + Default,
    G: Grower,
    A: TableAllocator,
{
    /// Creates an empty map with the default capacity.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a map that holds at least `capacity` entries without
    /// resizing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<C, S, G, A> Default for HashMapTable<C, S, G, A>
where
    C: MappedCell,
    S: BuildHasher + Default,
    G: Grower,
    A: TableAllocator,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C, S, G, A> HashMapTable<C, S, G, A>
where
    C: MappedCell,
    S: BuildHasher,
    G: Grower,
    A: TableAllocator,
{
    /// Creates an empty map with the given hasher builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        HashMapTable {
            table: HashTable::with_hasher(hash_builder),
        }
    }

    /// Creates a map sized for `capacity` entries with the given hasher
    /// builder.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        HashMapTable {
            table: HashTable::with_capacity_and_hasher(capacity, hash_builder),
        }
    }

    /// Number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Maximum occupancy before the next insert triggers a resize.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all entries, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Reserves capacity for at least `additional` more entries.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Returns the value for `key`, inserting a default-constructed value
    /// first if the key is absent.
    ///
    /// On first touch the value is explicitly default-constructed rather
    /// than left as whatever bytes the slot held, so `*map.get_or_default(k) +=
    /// 1` is safe from uninitialized reads. Subsequent calls return the
    /// existing value untouched; default construction runs at most once per
    /// inserted key.
    pub fn get_or_default(&mut self, key: C::Key) -> &mut C::Mapped
    where
        C::Mapped: Default,
    {
        let (cell, inserted) = self.table.emplace(key);
        if inserted {
            cell.write_mapped(C::Mapped::default())
        } else {
            // SAFETY: occupied cells always carry an initialized value
            // (facade invariant).
            unsafe { cell.mapped_mut() }
        }
    }

    /// Inserts a key-value pair, returning the previous value if the key
    /// was present.
    pub fn insert(&mut self, key: C::Key, value: C::Mapped) -> Option<C::Mapped> {
        let (cell, inserted) = self.table.emplace(key);
        if inserted {
            cell.write_mapped(value);
            None
        } else {
            // SAFETY: occupied cells always carry an initialized value
            // (facade invariant).
            let slot = unsafe { cell.mapped_mut() };
            Some(core::mem::replace(slot, value))
        }
    }

    /// Returns a reference to the value for `key`.
    pub fn get(&self, key: C::Key) -> Option<&C::Mapped> {
        // SAFETY: occupied cells always carry an initialized value (facade
        // invariant).
        self.table.find(key).map(|cell| unsafe { cell.mapped() })
    }

    /// Returns a mutable reference to the value for `key`.
    pub fn get_mut(&mut self, key: C::Key) -> Option<&mut C::Mapped> {
        // SAFETY: occupied cells always carry an initialized value (facade
        // invariant).
        self.table
            .find_mut(key)
            .map(|cell| unsafe { cell.mapped_mut() })
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key(&self, key: C::Key) -> bool {
        self.table.find(key).is_some()
    }

    /// Calls `f` on every mapped value, the zero-key entry first, then in
    /// bucket order. The visitor may mutate values in place; it cannot
    /// insert or remove (the map is exclusively borrowed).
    ///
    /// This is the read-out path for aggregation: fill the map, then walk
    /// the states once.
    pub fn for_each_mapped(&mut self, mut f: impl FnMut(&mut C::Mapped)) {
        self.table.for_each_cell_mut(|cell| {
            // SAFETY: occupied cells always carry an initialized value
            // (facade invariant).
            f(unsafe { cell.mapped_mut() })
        });
    }

    /// Value storage reserved for the "absent key" of nullable-key map
    /// variants.
    ///
    /// This map layout has no such storage, so the result is always
    /// disengaged; callers fall back to normal key handling. Kept as a hook
    /// so nullable-key variants can share call sites with this one.
    pub fn null_key_data(&mut self) -> Option<&mut C::Mapped> {
        None
    }

    /// Whether a value is stored for the "absent key". Always `false` for
    /// this layout; see [`null_key_data`](HashMapTable::null_key_data).
    pub fn has_null_key_data(&self) -> bool {
        false
    }

    /// Returns an iterator over `(key, &value)` pairs.
    ///
    /// The zero-key entry comes first if present, then bucket order. Each
    /// call starts a fresh iteration.
    pub fn iter(&self) -> Iter<'_, C, S, G, A> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<'_, C, S, G, A> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> Values<'_, C, S, G, A> {
        Values { inner: self.iter() }
    }
}

impl<C, S, G, A> Debug for HashMapTable<C, S, G, A>
where
    C: MappedCell,
    C::Key: Debug,
    C::Mapped: Debug,
    S: BuildHasher,
    G: Grower,
    A: TableAllocator,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.iter() {
            map.entry(&k, v);
        }
        map.finish()
    }
}

/// An iterator over the `(key, &value)` pairs of a map.
pub struct Iter<'a, C, S, G, A>
where
    C: MappedCell,
    G: Grower,
    A: TableAllocator,
{
    inner: crate::hash_table::Iter<'a, C, S, G, A>,
}

impl<'a, C, S, G, A> Iterator for Iter<'a, C, S, G, A>
where
    C: MappedCell,
    S: BuildHasher,
    G: Grower,
    A: TableAllocator,
{
    type Item = (C::Key, &'a C::Mapped);

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: occupied cells always carry an initialized value (facade
        // invariant).
        self.inner
            .next()
            .map(|cell| (cell.key(), unsafe { cell.mapped() }))
    }
}

/// An iterator over the keys of a map.
pub struct Keys<'a, C, S, G, A>
where
    C: MappedCell,
    G: Grower,
    A: TableAllocator,
{
    inner: Iter<'a, C, S, G, A>,
}

impl<'a, C, S, G, A> Iterator for Keys<'a, C, S, G, A>
where
    C: MappedCell,
    S: BuildHasher,
    G: Grower,
    A: TableAllocator,
{
    type Item = C::Key;

    fn next(&mut self) -> Option<C::Key> {
        self.inner.next().map(|(k, _)| k)
    }
}

/// An iterator over the values of a map.
pub struct Values<'a, C, S, G, A>
where
    C: MappedCell,
    G: Grower,
    A: TableAllocator,
{
    inner: Iter<'a, C, S, G, A>,
}

impl<'a, C, S, G, A> Iterator for Values<'a, C, S, G, A>
where
    C: MappedCell,
    S: BuildHasher,
    G: Grower,
    A: TableAllocator,
{
    type Item = &'a C::Mapped;

    fn next(&mut self) -> Option<&'a C::Mapped> {
        self.inner.next().map(|(_, v)| v)
    }
}

impl<'a, C, S, G, A> IntoIterator for &'a HashMapTable<C, S, G, A>
where
    C: MappedCell,
    S: BuildHasher,
    G: Grower,
    A: TableAllocator,
{
    type Item = (C::Key, &'a C::Mapped);
    type IntoIter = Iter<'a, C, S, G, A>;

    fn into_iter(self) -> Iter<'a, C, S, G, A> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::cell::Cell as SharedCell;
    use core::hash::BuildHasher;

    use siphasher::sip::SipHasher;

    use super::*;

    #[derive(Clone, Default)]
    struct SipHashBuilder;

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(0xfeed, 0xface)
        }
    }

    type TestMap<K, V> = HashMap<K, V, SipHashBuilder>;
    type TestSavedHashMap<K, V> = HashMapWithSavedHash<K, V, SipHashBuilder>;

    #[test]
    fn insert_get_replace() {
        let mut map: TestMap<u64, String> = HashMap::new();
        assert_eq!(map.insert(37, "a".to_string()), None);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(37), Some(&"a".to_string()));

        assert_eq!(map.insert(37, "b".to_string()), Some("a".to_string()));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(37), Some(&"b".to_string()));
        assert_eq!(map.get(38), None);
    }

    #[test]
    fn zero_key_behaves_like_any_other() {
        // Keys 0, 5, 1_000_000 with values "a", "b", "c": the sentinel key
        // must be indistinguishable from the others to callers.
        let mut map: TestMap<u64, String> = HashMap::new();
        map.insert(0, "a".to_string());
        map.insert(5, "b".to_string());
        map.insert(1_000_000, "c".to_string());

        assert_eq!(map.get(0), Some(&"a".to_string()));
        assert_eq!(map.get(5), Some(&"b".to_string()));
        assert_eq!(map.get(1_000_000), Some(&"c".to_string()));

        let mut visited = Vec::new();
        map.for_each_mapped(|v| visited.push(v.clone()));
        visited.sort();
        assert_eq!(visited, ["a", "b", "c"]);
    }

    #[test]
    fn get_or_default_counts() {
        // `map[42] += 1` a hundred times: exactly one insertion event and a
        // final count of 100.
        let mut map: TestMap<u64, u64> = HashMap::new();
        for _ in 0..100 {
            *map.get_or_default(42) += 1;
        }
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(42), Some(&100));
    }

    #[test]
    fn get_or_default_runs_default_once() {
        use core::sync::atomic::AtomicUsize;
        use core::sync::atomic::Ordering;

        static DEFAULT_RUNS: AtomicUsize = AtomicUsize::new(0);

        struct CountedDefault;

        impl Default for CountedDefault {
            fn default() -> Self {
                DEFAULT_RUNS.fetch_add(1, Ordering::Relaxed);
                CountedDefault
            }
        }

        let mut map: TestMap<u32, CountedDefault> = HashMap::new();
        for _ in 0..10 {
            map.get_or_default(7);
        }
        assert_eq!(DEFAULT_RUNS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut map: TestMap<u32, String> = HashMap::new();
        map.insert(1, "hello".to_string());
        map.get_mut(1).unwrap().push_str(" world");
        assert_eq!(map.get(1), Some(&"hello world".to_string()));
        assert_eq!(map.get_mut(2), None);
    }

    #[test]
    fn for_each_mapped_can_mutate() {
        let mut map: TestMap<u64, u64> = HashMap::new();
        for k in 0..100u64 {
            map.insert(k, k);
        }
        map.for_each_mapped(|v| *v *= 2);
        for k in 0..100u64 {
            assert_eq!(map.get(k), Some(&(k * 2)));
        }
    }

    #[test]
    fn iteration_covers_every_entry_once() {
        let mut map: TestMap<u64, u64> = HashMap::new();
        for k in 0..1_000u64 {
            map.insert(k, !k);
        }
        let mut pairs: Vec<(u64, u64)> = map.iter().map(|(k, v)| (k, *v)).collect();
        pairs.sort_unstable();
        let expected: Vec<(u64, u64)> = (0..1_000u64).map(|k| (k, !k)).collect();
        assert_eq!(pairs, expected);

        assert_eq!(map.keys().count(), 1_000);
        assert_eq!(map.values().count(), 1_000);
    }

    #[test]
    fn values_survive_resize() {
        let mut map: TestMap<u64, String> = HashMap::new();
        let n = 2_000u64;
        for k in 0..n {
            map.insert(k, k.to_string());
        }
        for k in 0..n {
            assert_eq!(map.get(k), Some(&k.to_string()), "lost value for {k}");
        }
    }

    #[test]
    fn saved_hash_map_matches_plain_map() {
        let mut plain: TestMap<u64, u64> = HashMap::new();
        let mut saved: TestSavedHashMap<u64, u64> = HashMapWithSavedHash::new();
        for k in 0..3_000u64 {
            plain.insert(k, k * k);
            saved.insert(k, k * k);
        }
        assert_eq!(plain.len(), saved.len());
        for k in 0..3_000u64 {
            assert_eq!(plain.get(k), saved.get(k));
        }
    }

    #[test]
    fn null_key_data_is_disengaged() {
        let mut map: TestMap<u64, u64> = HashMap::new();
        assert!(map.null_key_data().is_none());
        assert!(!map.has_null_key_data());
    }

    #[test]
    fn drop_and_clear_release_values() {
        struct DropCounter(Rc<SharedCell<usize>>);

        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let drops = Rc::new(SharedCell::new(0));

        let mut map: TestMap<u64, DropCounter> = HashMap::new();
        for k in 0..50u64 {
            map.insert(k, DropCounter(drops.clone()));
        }
        map.clear();
        assert_eq!(drops.get(), 50);

        for k in 0..30u64 {
            map.insert(k, DropCounter(drops.clone()));
        }
        drop(map);
        assert_eq!(drops.get(), 80);
    }

    #[test]
    fn debug_output_lists_entries() {
        let mut map: TestMap<u64, u64> = HashMap::new();
        map.insert(1, 2);
        let rendered = alloc::format!("{map:?}");
        assert_eq!(rendered, "{1: 2}");
    }
}
