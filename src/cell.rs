//! Cell layouts stored in the bucket array.
//!
//! A cell bundles a key with optional per-slot metadata: a mapped value for
//! map cells, and a saved copy of the key's hash for the hash-caching
//! variants. The table core only talks to cells through the [`Cell`] and
//! [`MappedCell`] traits, so the same probe/resize logic serves sets, maps,
//! and hash-caching maps without duplication.
//!
//! Emptiness is encoded in the key bytes themselves: a slot whose key is the
//! reserved zero pattern is empty. This is what lets the table materialize
//! its bucket array from zeroed memory and skip a per-slot occupancy flag.

use core::hash::BuildHasher;
use core::hash::Hash;
use core::mem::MaybeUninit;

/// Keys that reserve their all-zero byte pattern as the empty-slot sentinel.
///
/// The table stores the genuine zero key in a dedicated slot outside the
/// bucket array, so from a caller's perspective zero is an ordinary key.
///
/// # Safety
///
/// Implementations must guarantee both of the following:
///
/// - The all-zero byte pattern is a valid value of the type, and
///   [`is_zero`](ZeroKey::is_zero) returns `true` for exactly that value.
/// - The type is plain data: relocatable by raw byte copy, with no drop
///   logic. This is implied by the `Copy` bound but spelled out because the
///   table moves cells with `ptr::copy_nonoverlapping` during resize.
pub unsafe trait ZeroKey: Copy + Eq {
    /// Returns `true` iff `self` is the reserved sentinel value.
    fn is_zero(&self) -> bool;

    /// Overwrites `self` with the sentinel pattern, marking a slot empty.
    fn set_zero(&mut self);
}

macro_rules! impl_zero_key {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: for primitive integers the all-zero pattern is the
            // literal `0`, which is a valid value, and the types are plain
            // data.
            unsafe impl ZeroKey for $ty {
                #[inline(always)]
                fn is_zero(&self) -> bool {
                    *self == 0
                }

                #[inline(always)]
                fn set_zero(&mut self) {
                    *self = 0;
                }
            }
        )*
    };
}

impl_zero_key!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

/// A unit of storage in the bucket array.
///
/// # Safety
///
/// Implementations must guarantee:
///
/// - The all-zero byte pattern is a valid instance in the empty state
///   (`is_zero` returns `true` for it), and an empty cell is safe to read,
///   compare, and hash.
/// - The cell is relocatable by raw byte copy: moving its bytes to a new
///   location and abandoning the old ones must be equivalent to a move.
/// - Any mapped payload lives behind `MaybeUninit`, so a cell whose payload
///   was never written is still a valid value of the cell type.
pub unsafe trait Cell: Sized {
    /// Key type stored in the cell.
    type Key: ZeroKey + Hash;

    /// Whether [`drop_mapped`](Cell::drop_mapped) does anything. Lets the
    /// table skip the teardown scan for plain-data payloads.
    const MAPPED_NEEDS_DROP: bool;

    /// Creates a cell holding `key`. The mapped payload, if any, is left
    /// uninitialized; writing it is the caller's responsibility.
    fn new(key: Self::Key) -> Self;

    /// The key stored in this cell.
    fn key(&self) -> Self::Key;

    /// Compares the stored key against a candidate.
    ///
    /// `hash` is the candidate's hash. Hash-caching cells short-circuit to
    /// `false` on a hash mismatch before touching the key; plain cells
    /// ignore it.
    fn key_equals(&self, key: Self::Key, hash: u64) -> bool;

    /// The hash of the stored key. Plain cells recompute it with
    /// `hash_builder`; hash-caching cells return the saved copy, which is
    /// what makes resize rehash-free for them.
    fn get_hash<S: BuildHasher>(&self, hash_builder: &S) -> u64;

    /// Saves `hash` into the cell. No-op for cells without a hash slot.
    fn set_hash(&mut self, hash: u64);

    /// Returns `true` iff the stored key is the zero sentinel.
    #[inline(always)]
    fn is_zero(&self) -> bool {
        self.key().is_zero()
    }

    /// Drops the mapped payload in place.
    ///
    /// # Safety
    ///
    /// The payload must have been initialized and not dropped since. Must
    /// not be called twice for the same payload.
    unsafe fn drop_mapped(&mut self);
}

/// Cells that carry a mapped value alongside the key.
///
/// The payload is stored as `MaybeUninit`: the table initializes only the
/// key on insert, and the map facade (or a raw-table caller) writes the
/// value immediately afterwards. See [`HashMapTable`] for the invariant that
/// makes the accessors here sound in facade code.
///
/// [`HashMapTable`]: crate::hash_map::HashMapTable
pub trait MappedCell: Cell {
    /// The mapped value type.
    type Mapped;

    /// Borrows the mapped value.
    ///
    /// # Safety
    ///
    /// The payload must have been initialized via
    /// [`write_mapped`](MappedCell::write_mapped).
    unsafe fn mapped(&self) -> &Self::Mapped;

    /// Mutably borrows the mapped value.
    ///
    /// # Safety
    ///
    /// The payload must have been initialized via
    /// [`write_mapped`](MappedCell::write_mapped).
    unsafe fn mapped_mut(&mut self) -> &mut Self::Mapped;

    /// Initializes the mapped payload, returning a reference to it.
    ///
    /// Overwrites without dropping; use
    /// [`mapped_mut`](MappedCell::mapped_mut) and `mem::replace` to swap an
    /// already-initialized value.
    fn write_mapped(&mut self, value: Self::Mapped) -> &mut Self::Mapped;
}

/// Key-only cell used by [`HashSet`](crate::hash_set::HashSet).
pub struct SetCell<K> {
    key: K,
}

// SAFETY: the only field is the key, and `ZeroKey` guarantees its zero
// pattern is valid plain data.
unsafe impl<K> Cell for SetCell<K>
where
    K: ZeroKey + Hash,
{
    type Key = K;

    const MAPPED_NEEDS_DROP: bool = false;

    #[inline(always)]
    fn new(key: K) -> Self {
        SetCell { key }
    }

    #[inline(always)]
    fn key(&self) -> K {
        self.key
    }

    #[inline(always)]
    fn key_equals(&self, key: K, _hash: u64) -> bool {
        self.key == key
    }

    #[inline(always)]
    fn get_hash<S: BuildHasher>(&self, hash_builder: &S) -> u64 {
        hash_builder.hash_one(self.key)
    }

    #[inline(always)]
    fn set_hash(&mut self, _hash: u64) {}

    #[inline(always)]
    unsafe fn drop_mapped(&mut self) {}
}

/// Plain key-value cell: no saved hash, minimal footprint.
///
/// Collision comparison touches the key bytes directly and resize rehashes
/// every key. The right default when hashing is cheap (integer keys) and
/// memory density matters.
pub struct MapCell<K, V> {
    key: K,
    value: MaybeUninit<V>,
}

// SAFETY: the key's zero pattern is valid per `ZeroKey`, and the value is
// behind `MaybeUninit`, so the all-zero cell is a valid empty cell. Both
// fields relocate by byte copy (the value is only ever moved while treated
// as raw storage).
unsafe impl<K, V> Cell for MapCell<K, V>
where
    K: ZeroKey + Hash,
{
    type Key = K;

    const MAPPED_NEEDS_DROP: bool = core::mem::needs_drop::<V>();

    #[inline(always)]
    fn new(key: K) -> Self {
        MapCell {
            key,
            value: MaybeUninit::uninit(),
        }
    }

    #[inline(always)]
    fn key(&self) -> K {
        self.key
    }

    #[inline(always)]
    fn key_equals(&self, key: K, _hash: u64) -> bool {
        self.key == key
    }

    #[inline(always)]
    fn get_hash<S: BuildHasher>(&self, hash_builder: &S) -> u64 {
        hash_builder.hash_one(self.key)
    }

    #[inline(always)]
    fn set_hash(&mut self, _hash: u64) {}

    #[inline(always)]
    unsafe fn drop_mapped(&mut self) {
        // SAFETY: caller guarantees the payload is initialized.
        unsafe { self.value.assume_init_drop() }
    }
}

impl<K, V> MappedCell for MapCell<K, V>
where
    K: ZeroKey + Hash,
{
    type Mapped = V;

    #[inline(always)]
    unsafe fn mapped(&self) -> &V {
        // SAFETY: caller guarantees the payload is initialized.
        unsafe { self.value.assume_init_ref() }
    }

    #[inline(always)]
    unsafe fn mapped_mut(&mut self) -> &mut V {
        // SAFETY: caller guarantees the payload is initialized.
        unsafe { self.value.assume_init_mut() }
    }

    #[inline(always)]
    fn write_mapped(&mut self, value: V) -> &mut V {
        self.value.write(value)
    }
}

/// Key-value cell that saves the key's hash next to the key.
///
/// Costs 8 bytes per slot and buys two things: collision comparisons reject
/// on the cached hash before reading the key, and resize relocates cells
/// without rehashing. Worth it when key comparison is expensive relative to
/// hashing, or when resize cost dominates.
pub struct HashedMapCell<K, V> {
    key: K,
    saved_hash: u64,
    value: MaybeUninit<V>,
}

// SAFETY: as for `MapCell`; the extra `u64` hash field is plain data and
// valid (if meaningless) when zero, which only occurs in empty cells.
unsafe impl<K, V> Cell for HashedMapCell<K, V>
where
    K: ZeroKey + Hash,
{
    type Key = K;

    const MAPPED_NEEDS_DROP: bool = core::mem::needs_drop::<V>();

    #[inline(always)]
    fn new(key: K) -> Self {
        HashedMapCell {
            key,
            saved_hash: 0,
            value: MaybeUninit::uninit(),
        }
    }

    #[inline(always)]
    fn key(&self) -> K {
        self.key
    }

    #[inline(always)]
    fn key_equals(&self, key: K, hash: u64) -> bool {
        self.saved_hash == hash && self.key == key
    }

    #[inline(always)]
    fn get_hash<S: BuildHasher>(&self, _hash_builder: &S) -> u64 {
        self.saved_hash
    }

    #[inline(always)]
    fn set_hash(&mut self, hash: u64) {
        self.saved_hash = hash;
    }

    #[inline(always)]
    unsafe fn drop_mapped(&mut self) {
        // SAFETY: caller guarantees the payload is initialized.
        unsafe { self.value.assume_init_drop() }
    }
}

impl<K, V> MappedCell for HashedMapCell<K, V>
where
    K: ZeroKey + Hash,
{
    type Mapped = V;

    #[inline(always)]
    unsafe fn mapped(&self) -> &V {
        // SAFETY: caller guarantees the payload is initialized.
        unsafe { self.value.assume_init_ref() }
    }

    #[inline(always)]
    unsafe fn mapped_mut(&mut self) -> &mut V {
        // SAFETY: caller guarantees the payload is initialized.
        unsafe { self.value.assume_init_mut() }
    }

    #[inline(always)]
    fn write_mapped(&mut self, value: V) -> &mut V {
        self.value.write(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneHashBuilder;

    impl BuildHasher for OneHashBuilder {
        type Hasher = OneHasher;

        fn build_hasher(&self) -> OneHasher {
            OneHasher
        }
    }

    struct OneHasher;

    impl core::hash::Hasher for OneHasher {
        fn finish(&self) -> u64 {
            1
        }

        fn write(&mut self, _bytes: &[u8]) {}
    }

    #[test]
    fn zero_key_primitives() {
        assert!(0u64.is_zero());
        assert!(!1u64.is_zero());
        assert!(0i32.is_zero());
        assert!(!(-1i32).is_zero());

        let mut k = 77u32;
        k.set_zero();
        assert!(k.is_zero());
    }

    #[test]
    fn plain_cell_ignores_hash_argument() {
        let cell: MapCell<u64, u32> = MapCell::new(42);
        assert!(cell.key_equals(42, 0xdead));
        assert!(cell.key_equals(42, 0xbeef));
        assert!(!cell.key_equals(43, 0xdead));
    }

    #[test]
    fn hashed_cell_short_circuits_on_hash() {
        let mut cell: HashedMapCell<u64, u32> = HashedMapCell::new(42);
        cell.set_hash(0xdead);
        assert!(cell.key_equals(42, 0xdead));
        // Same key, wrong hash: the cached-hash comparison rejects it.
        assert!(!cell.key_equals(42, 0xbeef));
        assert!(!cell.key_equals(43, 0xdead));
    }

    #[test]
    fn get_hash_recomputes_vs_saved() {
        let builder = OneHashBuilder;

        let plain: MapCell<u64, u32> = MapCell::new(9);
        assert_eq!(plain.get_hash(&builder), 1);

        let mut hashed: HashedMapCell<u64, u32> = HashedMapCell::new(9);
        hashed.set_hash(0x1234);
        // Saved hash wins over whatever the builder would produce.
        assert_eq!(hashed.get_hash(&builder), 0x1234);
    }

    #[test]
    fn mapped_needs_drop_tracks_payload() {
        assert!(!MapCell::<u64, u32>::MAPPED_NEEDS_DROP);
        assert!(MapCell::<u64, alloc::string::String>::MAPPED_NEEDS_DROP);
        assert!(!SetCell::<u64>::MAPPED_NEEDS_DROP);
        assert!(HashedMapCell::<u64, alloc::vec::Vec<u8>>::MAPPED_NEEDS_DROP);
    }

    #[test]
    fn write_then_read_mapped() {
        let mut cell: MapCell<u32, alloc::string::String> = MapCell::new(5);
        cell.write_mapped(alloc::string::String::from("agg"));
        // SAFETY: just initialized above.
        unsafe {
            assert_eq!(cell.mapped(), "agg");
            cell.mapped_mut().push_str("regate");
            assert_eq!(cell.mapped(), "aggregate");
            cell.drop_mapped();
        }
    }
}
