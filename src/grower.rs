//! Growth policies: bucket-array sizing, index masking, and resize triggers.
//!
//! A [`Grower`] is a compile-time strategy consulted by the table core for
//! every placement and on every insert. Sizes are always powers of two so
//! that `hash & (size - 1)` replaces a modulo in the probe loop.

/// Decides bucket-array capacity, slot placement, and when to resize.
///
/// Contract: [`bucket_count`](Grower::bucket_count) is a power of two, and
/// [`max_fill`](Grower::max_fill) never exceeds it. Growth must be geometric
/// so that the total relocation cost over N inserts stays O(N).
pub trait Grower: Copy {
    /// Builds a grower whose [`max_fill`](Grower::max_fill) covers `hint`
    /// elements without resizing. A hint of zero yields the default size.
    fn from_capacity(hint: usize) -> Self;

    /// Number of slots in the bucket array.
    fn bucket_count(&self) -> usize;

    /// Occupancy at which the next insert must resize first.
    fn max_fill(&self) -> usize;

    /// Grows to the next size. Called only after
    /// [`overflow`](Grower::overflow) returns `true`.
    fn increase_size(&mut self);

    /// Bucket index for `hash`.
    #[inline(always)]
    fn place(&self, hash: u64) -> usize {
        hash as usize & (self.bucket_count() - 1)
    }

    /// Next slot in the probe sequence, wrapping at the end of the array.
    #[inline(always)]
    fn next(&self, place: usize) -> usize {
        (place + 1) & (self.bucket_count() - 1)
    }

    /// Whether an occupancy of `occupied` is past the resize threshold.
    #[inline(always)]
    fn overflow(&self, occupied: usize) -> bool {
        occupied > self.max_fill()
    }
}

/// Buckets for 2^8 slots: small enough to be cheap as a starting point,
/// large enough that short-lived tables never resize.
const INITIAL_SIZE_DEGREE: u8 = 8;

/// Size degree past which growth drops from 4x to 2x. Quadrupling small
/// tables keeps early resize counts down; doubling large ones bounds the
/// worst-case memory overshoot.
const QUADRUPLE_LIMIT_DEGREE: u8 = 23;

/// Default growth policy: power-of-two sizes, 0.5 maximum load factor,
/// quadrupling growth while small and doubling growth once large.
#[derive(Clone, Copy, Debug)]
pub struct DefaultGrower {
    size_degree: u8,
}

impl DefaultGrower {
    /// A grower with `1 << size_degree` buckets.
    pub fn with_size_degree(size_degree: u8) -> Self {
        DefaultGrower {
            size_degree: size_degree.max(1),
        }
    }
}

impl Default for DefaultGrower {
    fn default() -> Self {
        DefaultGrower {
            size_degree: INITIAL_SIZE_DEGREE,
        }
    }
}

impl Grower for DefaultGrower {
    fn from_capacity(hint: usize) -> Self {
        // Twice the hint keeps the load factor at or below 0.5 for `hint`
        // elements.
        let buckets = hint
            .max(1)
            .checked_mul(2)
            .expect("capacity hint overflow")
            .next_power_of_two();
        let size_degree = (buckets.trailing_zeros() as u8).max(INITIAL_SIZE_DEGREE);
        DefaultGrower { size_degree }
    }

    #[inline(always)]
    fn bucket_count(&self) -> usize {
        1 << self.size_degree
    }

    #[inline(always)]
    fn max_fill(&self) -> usize {
        1 << (self.size_degree - 1)
    }

    #[inline(always)]
    fn increase_size(&mut self) {
        self.size_degree += if self.size_degree >= QUADRUPLE_LIMIT_DEGREE {
            1
        } else {
            2
        };
    }
}

/// Fixed-size growth policy: `1 << DEGREE` buckets, never resizes.
///
/// For tables whose distinct-key cardinality is known and bounded (e.g. keys
/// narrower than `DEGREE` bits). Skips the overflow check on every insert
/// and guarantees slot handles are never invalidated by growth.
///
/// The caller must keep the number of distinct keys strictly below the
/// bucket count; the probe loop does not terminate on a full table.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedGrower<const DEGREE: u8>;

impl<const DEGREE: u8> Grower for FixedGrower<DEGREE> {
    fn from_capacity(_hint: usize) -> Self {
        FixedGrower
    }

    #[inline(always)]
    fn bucket_count(&self) -> usize {
        1 << DEGREE
    }

    #[inline(always)]
    fn max_fill(&self) -> usize {
        self.bucket_count()
    }

    #[inline(always)]
    fn increase_size(&mut self) {
        unreachable!("FixedGrower never grows");
    }

    #[inline(always)]
    fn overflow(&self, _occupied: usize) -> bool {
        false
    }
}
