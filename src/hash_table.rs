//! The open-addressing table core.
//!
//! `HashTable` owns a power-of-two bucket array of [`Cell`]s and resolves
//! collisions by linear probing. Emptiness is the zero-key byte pattern, so
//! the array is materialized from zeroed memory and carries no per-slot
//! occupancy metadata. The genuine zero key is routed to a dedicated
//! one-slot storage outside the array, checked before the probe loop on
//! every operation.
//!
//! The cell layout, hash function, growth policy, and allocator are all type
//! parameters resolved at compile time; the probe loop contains no dynamic
//! dispatch.

use core::alloc::Layout;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

use crate::DefaultHashBuilder;
use crate::allocator::HeapAllocator;
use crate::allocator::TableAllocator;
use crate::cell::Cell;
use crate::cell::ZeroKey;
use crate::grower::DefaultGrower;
use crate::grower::Grower;

/// Handle to the slot returned by [`HashTable::emplace`].
///
/// This is a plain mutable borrow of the cell. Because it borrows the table,
/// the borrow checker rejects any use of a handle across a later insert,
/// the operation that could resize the array and move the cell out from
/// under it. The aliasing hazard of the underlying design is thereby a
/// compile error rather than a runtime rule.
pub type LookupResult<'a, C> = &'a mut C;

/// Dedicated storage for the zero key, which cannot live in the main array
/// because its byte pattern is the empty-slot sentinel.
struct ZeroStorage<C> {
    occupied: bool,
    cell: MaybeUninit<C>,
}

impl<C: Cell> ZeroStorage<C> {
    const fn new() -> Self {
        ZeroStorage {
            occupied: false,
            cell: MaybeUninit::uninit(),
        }
    }

    #[inline(always)]
    fn is_occupied(&self) -> bool {
        self.occupied
    }

    /// Stores a cell for `key`. Must only be called while unoccupied.
    #[inline]
    fn insert(&mut self, key: C::Key) -> &mut C {
        debug_assert!(!self.occupied);
        self.occupied = true;
        self.cell.write(C::new(key))
    }

    #[inline(always)]
    fn get(&self) -> Option<&C> {
        if self.occupied {
            // SAFETY: `occupied` implies the cell was written by `insert`.
            Some(unsafe { self.cell.assume_init_ref() })
        } else {
            None
        }
    }

    #[inline(always)]
    fn get_mut(&mut self) -> Option<&mut C> {
        if self.occupied {
            // SAFETY: `occupied` implies the cell was written by `insert`.
            Some(unsafe { self.cell.assume_init_mut() })
        } else {
            None
        }
    }

    /// Borrows the stored cell without checking occupancy.
    ///
    /// # Safety
    ///
    /// The storage must be occupied.
    #[inline(always)]
    unsafe fn cell_unchecked_mut(&mut self) -> &mut C {
        debug_assert!(self.occupied);
        // SAFETY: caller guarantees occupancy, which implies initialization.
        unsafe { self.cell.assume_init_mut() }
    }

    fn clear(&mut self) {
        if self.occupied {
            if C::MAPPED_NEEDS_DROP {
                // SAFETY: occupied map cells always carry an initialized
                // payload (facade invariant; raw-table callers must uphold
                // the same before dropping the table).
                unsafe { self.cell.assume_init_mut().drop_mapped() }
            }
            self.occupied = false;
        }
    }
}

/// An open-addressing hash table with zero-key sentinel storage.
///
/// `HashTable` is the low-level engine shared by
/// [`HashMapTable`](crate::hash_map::HashMapTable) and
/// [`HashSet`](crate::hash_set::HashSet). It manages keys and slots only:
/// [`emplace`](HashTable::emplace) writes nothing but the key (and, for
/// hash-caching cells, the hash) into a newly claimed slot. Initializing a
/// mapped payload is the caller's job, which the facades do in the same call
/// that inserts the key.
///
/// There is no per-key removal; the workloads this serves (aggregation
/// states, dedup, join build sides) fill a table, read it out, and drop or
/// [`clear`](HashTable::clear) it.
///
/// ## Example
///
/// ```rust
/// use probe_hash::cell::SetCell;
/// use probe_hash::hash_table::HashTable;
///
/// let mut table: HashTable<SetCell<u64>> = HashTable::new();
/// let (_, inserted) = table.emplace(7);
/// assert!(inserted);
/// let (_, inserted) = table.emplace(7);
/// assert!(!inserted);
/// assert!(table.find(7).is_some());
/// assert!(table.find(8).is_none());
/// ```
pub struct HashTable<C, S = DefaultHashBuilder, G = DefaultGrower, A = HeapAllocator>
where
    C: Cell,
    G: Grower,
    A: TableAllocator,
{
    buf: NonNull<C>,
    grower: G,
    len: usize,
    zero: ZeroStorage<C>,
    hash_builder: S,
    alloc: A,

    _phantom: core::marker::PhantomData<C>,
}

// SAFETY: the table exclusively owns its bucket array and zero slot; the raw
// pointer is not shared. Sending or sharing the table is sound whenever its
// components are sendable/shareable.
unsafe impl<C, S, G, A> Send for HashTable<C, S, G, A>
where
    C: Cell + Send,
    S: Send,
    G: Grower + Send,
    A: TableAllocator + Send,
{
}

// SAFETY: see the `Send` impl; `&HashTable` only exposes shared reads.
unsafe impl<C, S, G, A> Sync for HashTable<C, S, G, A>
where
    C: Cell + Sync,
    S: Sync,
    G: Grower + Sync,
    A: TableAllocator + Sync,
{
}

impl<C, S, G, A> Debug for HashTable<C, S, G, A>
where
    C: Cell,
    G: Grower,
    A: TableAllocator,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field("len", &self.len)
            .field("buckets", &self.grower.bucket_count())
            .field("max_fill", &self.grower.max_fill())
            .field("has_zero", &self.zero.is_occupied())
            .finish()
    }
}

impl<C, S, G, A> HashTable<C, S, G, A>
where
    C: Cell,
    S: BuildHasher + Default,
    G: Grower,
    A: TableAllocator,
{
    /// Creates an empty table with the default capacity.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a table that holds at least `capacity` elements without
    /// resizing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<C, S, G, A> Default for HashTable<C, S, G, A>
where
    C: Cell,
    S: BuildHasher + Default,
    G: Grower,
    A: TableAllocator,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C, S, G, A> HashTable<C, S, G, A>
where
    C: Cell,
    G: Grower,
    A: TableAllocator,
{
    fn buckets_layout(count: usize) -> Layout {
        Layout::array::<C>(count).expect("allocation size overflow")
    }
}

impl<C, S, G, A> HashTable<C, S, G, A>
where
    C: Cell,
    S: BuildHasher,
    G: Grower,
    A: TableAllocator,
{
    /// Creates an empty table with the given hasher builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates a table sized for `capacity` elements with the given hasher
    /// builder.
    ///
    /// Pre-sizing is the lever for smoothing latency: resize is the only
    /// operation here whose cost is proportional to occupancy, so hot loops
    /// with a known cardinality estimate should pay for the allocation up
    /// front.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let grower = G::from_capacity(capacity);
        let mut alloc = A::default();
        let buf = Self::alloc_buckets(&mut alloc, grower.bucket_count());
        HashTable {
            buf,
            grower,
            len: 0,
            zero: ZeroStorage::new(),
            hash_builder,
            alloc,
            _phantom: core::marker::PhantomData,
        }
    }

    fn alloc_buckets(alloc: &mut A, count: usize) -> NonNull<C> {
        alloc.alloc_zeroed(Self::buckets_layout(count)).cast()
    }

    /// Number of elements in the table, the zero key included.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum occupancy before the next insert triggers a resize.
    pub fn capacity(&self) -> usize {
        self.grower.max_fill()
    }

    /// Number of slots in the bucket array.
    pub fn bucket_count(&self) -> usize {
        self.grower.bucket_count()
    }

    /// Borrows the cell at `place`.
    ///
    /// # Safety
    ///
    /// `place` must be less than the current bucket count.
    #[inline(always)]
    unsafe fn cell_at(&self, place: usize) -> &C {
        debug_assert!(place < self.grower.bucket_count());
        // SAFETY: caller guarantees `place` is in bounds of the live array.
        unsafe { self.buf.add(place).as_ref() }
    }

    /// Mutably borrows the cell at `place`.
    ///
    /// # Safety
    ///
    /// `place` must be less than the current bucket count.
    #[inline(always)]
    unsafe fn cell_at_mut(&mut self, place: usize) -> &mut C {
        debug_assert!(place < self.grower.bucket_count());
        // SAFETY: caller guarantees `place` is in bounds of the live array.
        unsafe { self.buf.add(place).as_mut() }
    }

    /// Probes for the slot holding `key`, or the first empty slot on its
    /// probe chain. Terminates because occupancy is bounded below capacity.
    #[inline]
    fn find_place(&self, key: C::Key, hash: u64) -> usize {
        let mut place = self.grower.place(hash);
        loop {
            // SAFETY: `Grower::place`/`next` mask into the bucket array.
            let cell = unsafe { self.cell_at(place) };
            if cell.is_zero() || cell.key_equals(key, hash) {
                return place;
            }
            place = self.grower.next(place);
        }
    }

    /// Inserts `key` if absent, returning a handle to its cell and whether
    /// an insert happened.
    ///
    /// On insert, only the key (and for hash-caching cells the hash) is
    /// written; any mapped payload in the cell is uninitialized until the
    /// caller writes it. The facades initialize the payload before the
    /// handle escapes; raw-table callers must do the same before reading it
    /// back, and before the table is dropped or cleared if the payload type
    /// has drop glue.
    ///
    /// Crossing the growth threshold resizes before the handle is returned,
    /// so the handle always points into the live array.
    pub fn emplace(&mut self, key: C::Key) -> (LookupResult<'_, C>, bool) {
        if key.is_zero() {
            if !self.zero.is_occupied() {
                self.len += 1;
                return (self.zero.insert(key), true);
            }
            // SAFETY: occupancy was just checked.
            return (unsafe { self.zero.cell_unchecked_mut() }, false);
        }

        let hash = self.hash_builder.hash_one(key);
        let mut place = self.find_place(key, hash);
        // SAFETY: `find_place` returns an in-bounds slot.
        if unsafe { !self.cell_at(place).is_zero() } {
            // SAFETY: same bounds as above.
            return (unsafe { self.cell_at_mut(place) }, false);
        }

        // SAFETY: the slot is empty; a raw write avoids running drop glue
        // over the zeroed bytes, which are not a live value of `C`.
        unsafe {
            let slot = self.buf.add(place).as_ptr();
            core::ptr::write(slot, C::new(key));
            (*slot).set_hash(hash);
        }
        self.len += 1;

        if self.grower.overflow(self.len) {
            self.resize();
            place = self.find_place(key, hash);
        }

        // SAFETY: `place` addresses the cell that now holds `key`.
        (unsafe { self.cell_at_mut(place) }, true)
    }

    /// Looks up `key`, returning its cell if present. Never mutates and
    /// never resizes.
    pub fn find(&self, key: C::Key) -> Option<&C> {
        if key.is_zero() {
            return self.zero.get();
        }
        let hash = self.hash_builder.hash_one(key);
        let place = self.find_place(key, hash);
        // SAFETY: `find_place` returns an in-bounds slot.
        let cell = unsafe { self.cell_at(place) };
        if cell.is_zero() { None } else { Some(cell) }
    }

    /// Looks up `key`, returning a mutable borrow of its cell if present.
    pub fn find_mut(&mut self, key: C::Key) -> Option<&mut C> {
        if key.is_zero() {
            return self.zero.get_mut();
        }
        let hash = self.hash_builder.hash_one(key);
        let place = self.find_place(key, hash);
        // SAFETY: `find_place` returns an in-bounds slot.
        if unsafe { self.cell_at(place).is_zero() } {
            return None;
        }
        // SAFETY: same bounds as above.
        Some(unsafe { self.cell_at_mut(place) })
    }

    /// Grows to the next size chosen by the growth policy.
    #[cold]
    #[inline(never)]
    fn resize(&mut self) {
        let mut new_grower = self.grower;
        new_grower.increase_size();
        self.resize_to(new_grower);
    }

    /// Relocates every occupied cell into a fresh bucket array.
    ///
    /// The new array is fully allocated before any cell moves, so an
    /// allocation abort cannot leave the table half-migrated. Cells move by
    /// raw byte copy; the old array is released without running any per-cell
    /// logic.
    fn resize_to(&mut self, new_grower: G) {
        let old_count = self.grower.bucket_count();
        let old_layout = Self::buckets_layout(old_count);
        let old_buf = self.buf;

        let new_buf = Self::alloc_buckets(&mut self.alloc, new_grower.bucket_count());

        for index in 0..old_count {
            // SAFETY: `index` is within the old array, which is still live.
            let cell = unsafe { old_buf.add(index).as_ref() };
            if cell.is_zero() {
                continue;
            }

            let hash = cell.get_hash(&self.hash_builder);
            let mut place = new_grower.place(hash);
            // All keys in the old array are distinct, so probing only needs
            // to find the first empty slot in the new one.
            //
            // SAFETY: `place`/`next` mask into the new array, which was
            // zeroed on allocation; the byte copy relocates the cell without
            // invoking any move or drop logic, and the old bytes are
            // abandoned with the old array.
            unsafe {
                while !new_buf.add(place).as_ref().is_zero() {
                    place = new_grower.next(place);
                }
                core::ptr::copy_nonoverlapping(
                    old_buf.add(index).as_ptr(),
                    new_buf.add(place).as_ptr(),
                    1,
                );
            }
        }

        self.buf = new_buf;
        self.grower = new_grower;
        // SAFETY: the old array came from our allocator with this layout,
        // and nothing references it anymore.
        unsafe { self.alloc.dealloc(old_buf.cast(), old_layout) };
    }

    /// Reserves capacity for at least `additional` more elements, resizing
    /// at most once.
    pub fn reserve(&mut self, additional: usize) {
        let required = self.len.saturating_add(additional);
        let target = G::from_capacity(required);
        if target.bucket_count() > self.grower.bucket_count() {
            self.resize_to(target);
        }
    }

    /// Removes all elements, keeping the allocated capacity.
    pub fn clear(&mut self) {
        if C::MAPPED_NEEDS_DROP {
            for index in 0..self.grower.bucket_count() {
                // SAFETY: `index` is in bounds.
                let cell = unsafe { self.buf.add(index).as_mut() };
                if !cell.is_zero() {
                    // SAFETY: occupied cells carry initialized payloads
                    // (facade invariant).
                    unsafe { cell.drop_mapped() }
                }
            }
        }
        // SAFETY: rewriting the array with zero bytes restores the all-empty
        // state; the previous cell bytes are plain data once payloads are
        // dropped.
        unsafe {
            core::ptr::write_bytes(self.buf.as_ptr(), 0, self.grower.bucket_count());
        }
        self.zero.clear();
        self.len = 0;
    }

    /// Visits every occupied cell mutably, the zero slot first.
    pub fn for_each_cell_mut(&mut self, mut f: impl FnMut(&mut C)) {
        if let Some(cell) = self.zero.get_mut() {
            f(cell);
        }
        for index in 0..self.grower.bucket_count() {
            // SAFETY: `index` is in bounds; each iteration borrows a
            // distinct slot.
            let cell = unsafe { self.buf.add(index).as_mut() };
            if !cell.is_zero() {
                f(cell);
            }
        }
    }

    /// Returns an iterator over all occupied cells.
    ///
    /// The zero slot is yielded first, then the main array in bucket order.
    /// Each call starts a fresh iteration.
    pub fn iter(&self) -> Iter<'_, C, S, G, A> {
        Iter {
            table: self,
            place: 0,
            zero_done: false,
        }
    }
}

impl<C, S, G, A> Drop for HashTable<C, S, G, A>
where
    C: Cell,
    G: Grower,
    A: TableAllocator,
{
    fn drop(&mut self) {
        if C::MAPPED_NEEDS_DROP {
            for index in 0..self.grower.bucket_count() {
                // SAFETY: `index` is in bounds.
                let cell = unsafe { self.buf.add(index).as_mut() };
                if !cell.is_zero() {
                    // SAFETY: occupied cells carry initialized payloads
                    // (facade invariant).
                    unsafe { cell.drop_mapped() }
                }
            }
        }
        self.zero.clear();
        // SAFETY: the array came from our allocator with this layout.
        unsafe {
            self.alloc.dealloc(
                self.buf.cast(),
                Self::buckets_layout(self.grower.bucket_count()),
            );
        }
    }
}

/// Iterator over the occupied cells of a [`HashTable`].
pub struct Iter<'a, C, S, G, A>
where
    C: Cell,
    G: Grower,
    A: TableAllocator,
{
    table: &'a HashTable<C, S, G, A>,
    place: usize,
    zero_done: bool,
}

impl<'a, C, S, G, A> Iterator for Iter<'a, C, S, G, A>
where
    C: Cell,
    S: BuildHasher,
    G: Grower,
    A: TableAllocator,
{
    type Item = &'a C;

    fn next(&mut self) -> Option<&'a C> {
        if !self.zero_done {
            self.zero_done = true;
            if let Some(cell) = self.table.zero.get() {
                return Some(cell);
            }
        }
        while self.place < self.table.bucket_count() {
            // SAFETY: the loop condition bounds `place`.
            let cell = unsafe { self.table.cell_at(self.place) };
            self.place += 1;
            if !cell.is_zero() {
                return Some(cell);
            }
        }
        None
    }
}

impl<'a, C, S, G, A> IntoIterator for &'a HashTable<C, S, G, A>
where
    C: Cell,
    S: BuildHasher,
    G: Grower,
    A: TableAllocator,
{
    type Item = &'a C;
    type IntoIter = Iter<'a, C, S, G, A>;

    fn into_iter(self) -> Iter<'a, C, S, G, A> {
        self.iter()
    }
}
