use core::{
    alloc::Layout,
    cell::RefCell,
    marker::PhantomData,
    mem,
    slice,
};

use log::{
    debug,
    trace,
};

use crate::{
    ledger::Ledger,
    source::BlockSource,
    Block,
    BlockError,
    Heap,
    Plain,
};

/// A registry of manually-managed memory blocks of a given element type.
///
/// A registry allocates zero-filled blocks of elements and keeps track of every block it hands
/// out. A block can be released early with [`BlockRegistry::release`]. Every block still live
/// when the registry is dropped (or when [`BlockRegistry::release_all`] is called) is released
/// then, all at once. A block is never released twice.
///
/// Blocks are described by a [`Block<T>`], a copyable reference that the registry validates on
/// every use. Releasing a block that is not live in this registry is silently ignored.
///
/// Memory comes from a [`BlockSource`], which is the system allocator ([`Heap`]) by default.
///
/// A registry cannot be cloned, since two registries would then release the same blocks. Its
/// blocks can be handed over to a new registry with [`BlockRegistry::relocate`].
///
/// This data type is not thread safe.
pub struct BlockRegistry<T, S = Heap>
where
    T: Plain,
    S: BlockSource,
{
    ledger: RefCell<Ledger>,
    source: S,
    phantom: PhantomData<T>,
}

impl<T> BlockRegistry<T, Heap>
where
    T: Plain,
{
    /// Creates a new registry backed by the system allocator.
    pub fn new() -> Self {
        Self::new_in(Heap)
    }

    /// Creates a new registry backed by the system allocator, with space for `size` blocks.
    pub fn with_capacity(size: usize) -> Self {
        Self::with_capacity_in(size, Heap)
    }
}

impl<T, S> BlockRegistry<T, S>
where
    T: Plain,
    S: BlockSource,
{
    /// Creates a new registry backed by the given source.
    pub fn new_in(source: S) -> Self {
        Self::with_capacity_in(0, source)
    }

    /// Creates a new registry backed by the given source, with space for `size` blocks.
    pub fn with_capacity_in(size: usize, source: S) -> Self {
        const {
            assert!(
                mem::size_of::<T>() != 0,
                "zero-sized element types cannot be allocated"
            )
        };
        Self {
            ledger: RefCell::new(Ledger::with_capacity(size)),
            source,
            phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying block source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Checks if the registry owns no live blocks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of live blocks owned by the registry.
    pub fn len(&self) -> usize {
        self.ledger.borrow().len()
    }

    /// Ensures there is space to track at least `additional` more blocks.
    pub fn reserve(&self, additional: usize) {
        self.ledger.borrow_mut().reserve(additional)
    }

    /// Allocates a block of `count` zero-filled elements.
    ///
    /// Returns [`None`] if `count` is zero or if the memory could not be allocated. No bookkeeping
    /// is done in either case.
    pub fn allocate(&self, count: usize) -> Option<Block<T>> {
        self.try_allocate(count).ok()
    }

    /// Tries to allocate a block of `count` zero-filled elements, reporting why it could not.
    pub fn try_allocate(&self, count: usize) -> Result<Block<T>, BlockError> {
        if count == 0 {
            return Err(BlockError::ZeroLength);
        }
        let layout = Layout::array::<T>(count).map_err(|_| BlockError::CapacityOverflow)?;
        let ptr = match self.source.reserve_zeroed(layout) {
            Some(ptr) => ptr,
            None => {
                debug!("block source exhausted for {} bytes", layout.size());
                return Err(BlockError::Exhausted {
                    bytes: layout.size(),
                });
            }
        };
        let entry = self.ledger.borrow_mut().insert(ptr, layout);
        trace!(
            "allocated block {:p} ({count} elements, serial {})",
            ptr,
            entry.serial
        );
        Ok(Block::new(ptr.cast(), count, entry.serial))
    }

    /// Returns the recorded element count of the live entry matching `block`.
    fn live_len(&self, block: Block<T>) -> Option<usize> {
        self.ledger
            .borrow()
            .find(block.address(), Some(block.serial()))
            .filter(|entry| entry.layout.size() == block.size_in_bytes())
            .map(|entry| entry.layout.size() / mem::size_of::<T>())
    }

    /// Checks if the block is live in this registry.
    pub fn contains(&self, block: Block<T>) -> bool {
        self.live_len(block).is_some()
    }

    /// Returns the elements of a live block.
    ///
    /// Returns [`None`] if the block is not live in this registry.
    pub fn get(&self, block: Block<T>) -> Option<&[T]> {
        let len = self.live_len(block)?;
        // SAFETY: The entry is live and was reserved for `len` initialized elements. Blocks are
        // only released through `&mut self` or on drop, which outlive this borrow.
        Some(unsafe { slice::from_raw_parts(block.as_ptr(), len) })
    }

    /// Returns the elements of a live block mutably.
    ///
    /// Returns [`None`] if the block is not live in this registry.
    pub fn get_mut(&mut self, block: Block<T>) -> Option<&mut [T]> {
        let len = self.live_len(block)?;
        // SAFETY: As in `get`, and `&mut self` guarantees no other slice of this block exists.
        Some(unsafe { slice::from_raw_parts_mut(block.as_ptr(), len) })
    }

    /// Returns an iterator that provides mutable access to all live blocks, in order of
    /// allocation.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut [T]> {
        self.ledger.get_mut().iter().map(|entry| {
            let len = entry.layout.size() / mem::size_of::<T>();
            // SAFETY: Every live entry was reserved for `len` elements of `T`, and entries never
            // overlap.
            unsafe { slice::from_raw_parts_mut(entry.ptr.cast::<T>().as_ptr(), len) }
        })
    }

    /// Releases a block early.
    ///
    /// If the block in `slot` is live in this registry, its memory is released and `slot` is set
    /// to [`None`]. Empty slots, blocks from other registries, and blocks that were already
    /// released are ignored, so releasing the same block twice is safe.
    pub fn release(&mut self, slot: &mut Option<Block<T>>) {
        if let Some(block) = *slot {
            if self.try_release(block).is_ok() {
                *slot = None;
            }
        }
    }

    /// Tries to release a block early.
    ///
    /// Fails with [`BlockError::UnknownBlock`] if the block is not live in this registry.
    pub fn try_release(&mut self, block: Block<T>) -> Result<(), BlockError> {
        let entry = match self
            .ledger
            .get_mut()
            .remove(block.address(), Some(block.serial()))
        {
            Some(entry) => entry,
            None => {
                debug!("ignoring release of unknown block {:p}", block.as_ptr());
                return Err(BlockError::UnknownBlock);
            }
        };
        trace!("released block {:p} (serial {})", entry.ptr, entry.serial);
        // SAFETY: The entry was live, so it was reserved from our source with this layout, and it
        // has now been cleared from the ledger.
        unsafe { self.source.release(entry.ptr, entry.layout) };
        Ok(())
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
            trace!("released all {live} live blocks");
        }
    }

    /// Moves every block into a new registry, leaving this registry empty.
    ///
    /// The new registry uses a clone of this registry's source, and releases exactly the blocks
    /// that were live in this registry. Blocks allocated before relocation remain valid for the
    /// new registry.
    pub fn relocate(&mut self) -> Self
    where
        S: Clone,
    {
        let ledger = self.ledger.get_mut().take();
        trace!("relocated {} live blocks", ledger.len());
        Self {
            ledger: RefCell::new(ledger),
            source: self.source.clone(),
            phantom: PhantomData,
        }
    }
}

impl<T, S> Default for BlockRegistry<T, S>
where
    T: Plain,
    S: BlockSource + Default,
{
    fn default() -> Self {
        Self::new_in(S::default())
    }
}

impl<T, S> Drop for BlockRegistry<T, S>
where
    T: Plain,
    S: BlockSource,
{
    fn drop(&mut self) {
        self.release_all()
    }
}

// SAFETY: The registry exclusively owns its blocks, so it can move across threads along with its
// elements and source.
unsafe impl<T, S> Send for BlockRegistry<T, S>
where
    T: Plain + Send,
    S: BlockSource + Send,
{
}
