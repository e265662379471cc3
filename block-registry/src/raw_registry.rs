use core::{
    alloc::Layout,
    cell::RefCell,
    ptr::NonNull,
};

use log::{
    debug,
    trace,
};

use crate::{
    ledger::Ledger,
    source::BlockSource,
    Heap,
};

/// The alignment of blocks allocated by size alone with [`RawRegistry::allocate`].
///
/// This matches the largest fundamental alignment on common platforms, so a raw block can hold any
/// primitive value.
pub const MAX_ALIGN: usize = 16;

/// A registry of untyped memory blocks.
///
/// A raw registry works like [`BlockRegistry`][`crate::BlockRegistry`], but hands out raw byte
/// pointers of any size and alignment instead of typed blocks. Every block still live when the
/// registry is dropped (or when [`RawRegistry::release_all`] is called) is released then.
///
/// A raw registry is itself a [`BlockSource`], so a typed registry can be layered over a borrowed
/// raw registry:
///
/// ```
/// use block_registry::{
///     BlockRegistry,
///     RawRegistry,
/// };
///
/// let raw = RawRegistry::new();
/// let typed = BlockRegistry::<u32, _>::new_in(&raw);
/// let block = typed.allocate(4).unwrap();
/// assert!(raw.contains(block.as_ptr() as *const u8));
/// drop(typed);
/// assert!(raw.is_empty());
/// ```
///
/// This data type is not thread safe.
pub struct RawRegistry<S = Heap>
where
    S: BlockSource,
{
    ledger: RefCell<Ledger>,
    source: S,
}

impl RawRegistry<Heap> {
    /// Creates a new raw registry backed by the system allocator.
    pub fn new() -> Self {
        Self::new_in(Heap)
    }

    /// Creates a new raw registry backed by the system allocator, with space for `size` blocks.
    pub fn with_capacity(size: usize) -> Self {
        Self::with_capacity_in(size, Heap)
    }
}

impl<S> RawRegistry<S>
where
    S: BlockSource,
{
    /// Creates a new raw registry backed by the given source.
    pub fn new_in(source: S) -> Self {
        Self::with_capacity_in(0, source)
    }

    /// Creates a new raw registry backed by the given source, with space for `size` blocks.
    pub fn with_capacity_in(size: usize, source: S) -> Self {
        Self {
            ledger: RefCell::new(Ledger::with_capacity(size)),
            source,
        }
    }

    /// Checks if the registry owns no live blocks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of live blocks owned by the registry.
    pub fn len(&self) -> usize {
        self.ledger.borrow().len()
    }

    /// Allocates an uninitialized block of `size` bytes, aligned to [`MAX_ALIGN`].
    ///
    /// Returns [`None`] if `size` is zero or if the memory could not be allocated.
    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = Layout::from_size_align(size, MAX_ALIGN).ok()?;
        self.allocate_layout(layout)
    }

    /// Allocates an uninitialized block for the given layout.
    ///
    /// Returns [`None`] if the layout is zero-sized or if the memory could not be allocated.
    pub fn allocate_layout(&self, layout: Layout) -> Option<NonNull<u8>> {
        self.allocate_with(layout, |source| source.reserve(layout))
    }

    /// Allocates a zero-filled block for the given layout.
    ///
    /// Returns [`None`] if the layout is zero-sized or if the memory could not be allocated.
    pub fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        self.allocate_with(layout, |source| source.reserve_zeroed(layout))
    }

    fn allocate_with<F>(&self, layout: Layout, reserve: F) -> Option<NonNull<u8>>
    where
        F: FnOnce(&S) -> Option<NonNull<u8>>,
    {
        if layout.size() == 0 {
            return None;
        }
        let ptr = match reserve(&self.source) {
            Some(ptr) => ptr,
            None => {
                debug!("block source exhausted for {} bytes", layout.size());
                return None;
            }
        };
        self.ledger.borrow_mut().insert(ptr, layout);
        trace!("allocated raw block {:p} ({} bytes)", ptr, layout.size());
        Some(ptr)
    }

    /// Checks if `ptr` is the address of a live block in this registry.
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.ledger.borrow().find(ptr as usize, None).is_some()
    }

    /// Releases the block at `ptr` early.
    ///
    /// Returns `true` if `ptr` is null or the block was released, and `false` if `ptr` is not a
    /// live block of this registry. In the latter case nothing is released.
    ///
    /// # Safety
    ///
    /// No reference into the block may be live, and the block must not belong to a
    /// [`BlockRegistry`][`crate::BlockRegistry`] layered over this registry. Any pointer into a
    /// released block dangles afterwards.
    pub unsafe fn release(&self, ptr: *mut u8) -> bool {
        if ptr.is_null() {
            return true;
        }
        let entry = match self.ledger.borrow_mut().remove(ptr as usize, None) {
            Some(entry) => entry,
            None => {
                debug!("ignoring release of unknown raw block {:p}", ptr);
                return false;
            }
        };
        trace!("released raw block {:p}", entry.ptr);
        // SAFETY: The entry was live, so it was reserved from our source with this layout, and it
        // has now been cleared from the ledger.
        unsafe { self.source.release(entry.ptr, entry.layout) };
        true
    }

    /// Releases every live block.
    ///
    /// The registry remains usable afterwards.
    pub fn release_all(&mut self) {
        let ledger = self.ledger.get_mut();
        let live = ledger.len();
        for entry in ledger.drain() {
            // SAFETY: Each drained entry was live and is cleared from the ledger by draining.
            unsafe { self.source.release(entry.ptr, entry.layout) };
        }
        if live > 0 {
            trace!("released all {live} live raw blocks");
        }
    }
}

impl<S> Default for RawRegistry<S>
where
    S: BlockSource + Default,
{
    fn default() -> Self {
        Self::new_in(S::default())
    }
}

impl<S> Drop for RawRegistry<S>
where
    S: BlockSource,
{
    fn drop(&mut self) {
        self.release_all()
    }
}

unsafe impl<S> BlockSource for RawRegistry<S>
where
    S: BlockSource,
{
    fn reserve(&self, layout: Layout) -> Option<NonNull<u8>> {
        self.allocate_layout(layout)
    }

    fn reserve_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        self.allocate_zeroed(layout)
    }

    unsafe fn release(&self, block: NonNull<u8>, _: Layout) {
        let released = unsafe { RawRegistry::release(self, block.as_ptr()) };
        debug_assert!(released, "released a block this raw registry does not own");
    }
}

// SAFETY: The registry exclusively owns its blocks.
unsafe impl<S> Send for RawRegistry<S> where S: BlockSource + Send {}
