//! Allocator policy for the bucket array.
//!
//! The table asks its allocator for zeroed memory because zeroed bytes are
//! exactly the empty-cell representation: a fresh bucket array is all empty
//! slots without a separate initialization pass.

use alloc::alloc::handle_alloc_error;
use core::alloc::Layout;
use core::ptr::NonNull;

/// Supplies raw zeroed memory for bucket arrays.
///
/// Allocation failure is fatal to the operation in progress and is reported
/// through [`handle_alloc_error`]; the table never observes a null pointer.
///
/// # Safety
///
/// Implementations must return memory that is valid for reads and writes of
/// `layout.size()` bytes, aligned to `layout.align()`, fully zeroed, and
/// exclusively owned by the caller until passed back to
/// [`dealloc`](TableAllocator::dealloc).
pub unsafe trait TableAllocator: Default {
    /// Allocates a zeroed block for `layout`. Aborts on exhaustion.
    fn alloc_zeroed(&mut self, layout: Layout) -> NonNull<u8>;

    /// Releases a block previously returned by
    /// [`alloc_zeroed`](TableAllocator::alloc_zeroed).
    ///
    /// # Safety
    ///
    /// `ptr` must come from this allocator with the same `layout`, and must
    /// not be used afterwards.
    unsafe fn dealloc(&mut self, ptr: NonNull<u8>, layout: Layout);
}

/// Bucket allocator backed by the global allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

// SAFETY: delegates to the global allocator's zeroed path and aborts on
// failure, so the returned pointer is always valid, aligned, and zeroed.
unsafe impl TableAllocator for HeapAllocator {
    fn alloc_zeroed(&mut self, layout: Layout) -> NonNull<u8> {
        debug_assert!(layout.size() != 0);
        // SAFETY: the layout is non-zero-sized; a null return is routed to
        // the allocation error handler.
        unsafe {
            let ptr = alloc::alloc::alloc_zeroed(layout);
            if ptr.is_null() {
                handle_alloc_error(layout);
            }
            NonNull::new_unchecked(ptr)
        }
    }

    unsafe fn dealloc(&mut self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: caller guarantees `ptr` and `layout` match the original
        // allocation.
        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}
