use core::{
    alloc::Layout,
    ptr::{
        self,
        NonNull,
    },
};

/// A provider of raw memory blocks that a registry can delegate to.
///
/// A registry only ever calls [`BlockSource::release`] for a block it previously reserved from
/// the same source with the same layout, and only once per block. Layouts passed to a source
/// always have a non-zero size.
///
/// # Safety
///
/// A block returned by [`BlockSource::reserve`] must be valid for reads and writes of
/// `layout.size()` bytes, aligned to `layout.align()`, and must not overlap any other block that
/// is still reserved. A block returned by [`BlockSource::reserve_zeroed`] must additionally be
/// filled with zero bytes.
pub unsafe trait BlockSource {
    /// Reserves a block of memory for the given layout.
    ///
    /// Returns [`None`] if the source is exhausted.
    fn reserve(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Reserves a zero-filled block of memory for the given layout.
    fn reserve_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        let block = self.reserve(layout)?;
        // SAFETY: The block was just reserved for `layout`.
        unsafe { ptr::write_bytes(block.as_ptr(), 0, layout.size()) };
        Some(block)
    }

    /// Releases a block back to the source.
    ///
    /// # Safety
    ///
    /// `block` must have been reserved from this source with `layout`, and must not have been
    /// released already.
    unsafe fn release(&self, block: NonNull<u8>, layout: Layout);
}

unsafe impl<S> BlockSource for &S
where
    S: BlockSource + ?Sized,
{
    fn reserve(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).reserve(layout)
    }

    fn reserve_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).reserve_zeroed(layout)
    }

    unsafe fn release(&self, block: NonNull<u8>, layout: Layout) {
        (**self).release(block, layout)
    }
}

/// The host system allocator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Heap;

unsafe impl BlockSource for Heap {
    fn reserve(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() != 0);
        // SAFETY: Registries never request zero-sized layouts.
        NonNull::new(unsafe { alloc::alloc::alloc(layout) })
    }

    fn reserve_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() != 0);
        // SAFETY: Registries never request zero-sized layouts.
        NonNull::new(unsafe { alloc::alloc::alloc_zeroed(layout) })
    }

    unsafe fn release(&self, block: NonNull<u8>, layout: Layout) {
        alloc::alloc::dealloc(block.as_ptr(), layout)
    }
}
