//! Instrumented block sources for tests.

use core::{
    alloc::Layout,
    cell::{
        Cell,
        RefCell,
    },
    ptr::NonNull,
};

use hashbrown::HashMap;

use crate::{
    source::BlockSource,
    Heap,
};

/// A block source that counts reservations and releases, and panics on any release that does not
/// pair with an outstanding reservation of the same layout.
pub struct CountingSource {
    reserved: Cell<usize>,
    released: Cell<usize>,
    outstanding: RefCell<HashMap<usize, Layout>>,
    // Number of reservations that may still succeed. `None` means unlimited.
    remaining: Cell<Option<usize>>,
}

impl CountingSource {
    pub fn new() -> Self {
        Self {
            reserved: Cell::new(0),
            released: Cell::new(0),
            outstanding: RefCell::new(HashMap::new()),
            remaining: Cell::new(None),
        }
    }

    /// Creates a source that fails every reservation after the first `limit`.
    pub fn with_limit(limit: usize) -> Self {
        let source = Self::new();
        source.remaining.set(Some(limit));
        source
    }

    pub fn reserved(&self) -> usize {
        self.reserved.get()
    }

    pub fn released(&self) -> usize {
        self.released.get()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.borrow().len()
    }

    pub fn is_outstanding(&self, address: usize) -> bool {
        self.outstanding.borrow().contains_key(&address)
    }
}

unsafe impl BlockSource for CountingSource {
    fn reserve(&self, layout: Layout) -> Option<NonNull<u8>> {
        assert_ne!(layout.size(), 0, "zero-sized reservation");
        if let Some(remaining) = self.remaining.get() {
            if remaining == 0 {
                return None;
            }
            self.remaining.set(Some(remaining - 1));
        }
        let block = Heap.reserve(layout)?;
        self.reserved.set(self.reserved.get() + 1);
        let previous = self
            .outstanding
            .borrow_mut()
            .insert(block.as_ptr() as usize, layout);
        assert!(previous.is_none(), "address reserved twice");
        Some(block)
    }

    unsafe fn release(&self, block: NonNull<u8>, layout: Layout) {
        let reserved_layout = self
            .outstanding
            .borrow_mut()
            .remove(&(block.as_ptr() as usize))
            .expect("released a block that is not outstanding");
        assert_eq!(reserved_layout, layout, "released with a different layout");
        self.released.set(self.released.get() + 1);
        Heap.release(block, layout)
    }
}

const POOL_BYTES: usize = 4096;
const POOL_ALIGN: usize = 16;

/// A block source with a single slot, so every reservation made after a release lands at the same
/// address.
pub struct RecyclingSource {
    slot: NonNull<u8>,
    in_use: Cell<bool>,
}

impl RecyclingSource {
    pub fn new() -> Self {
        let slot = Heap
            .reserve(Self::pool_layout())
            .expect("failed to reserve the pool");
        Self {
            slot,
            in_use: Cell::new(false),
        }
    }

    fn pool_layout() -> Layout {
        Layout::from_size_align(POOL_BYTES, POOL_ALIGN).unwrap()
    }

    pub fn address(&self) -> usize {
        self.slot.as_ptr() as usize
    }
}

unsafe impl BlockSource for RecyclingSource {
    fn reserve(&self, layout: Layout) -> Option<NonNull<u8>> {
        assert!(layout.align() <= POOL_ALIGN, "alignment exceeds the pool");
        if self.in_use.get() || layout.size() > POOL_BYTES {
            return None;
        }
        self.in_use.set(true);
        Some(self.slot)
    }

    unsafe fn release(&self, block: NonNull<u8>, _: Layout) {
        assert_eq!(block, self.slot, "released a block outside the pool");
        assert!(self.in_use.replace(false), "released the pool slot twice");
    }
}

impl Drop for RecyclingSource {
    fn drop(&mut self) {
        unsafe { Heap.release(self.slot, Self::pool_layout()) }
    }
}
