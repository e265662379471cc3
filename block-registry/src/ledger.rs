#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
use core::{
    alloc::Layout,
    mem,
    ptr::NonNull,
    sync::atomic::{
        AtomicU64,
        Ordering,
    },
};

use hashbrown::HashMap;

// Serials are shared by every ledger in the process, so a serial names exactly one block ever.
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(0);

// Ledgers with fewer slots than this are never compacted.
const MIN_COMPACT_SLOTS: usize = 16;

/// A block owned by a [`Ledger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Entry {
    pub ptr: NonNull<u8>,
    pub layout: Layout,
    pub serial: u64,
}

impl Entry {
    fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

/// Bookkeeping shared by the typed and untyped registries.
///
/// A ledger records every block a registry has reserved, in order of reservation. Each slot is
/// either live (`Some`) or cleared (`None`). Cleared slots are never revived. Once cleared slots
/// outnumber live ones, they are compacted away, keeping the live slots in order.
///
/// The ledger does not own memory itself. It is up to the wrapping registry to release the entries
/// returned from [`Ledger::remove`] and [`Ledger::drain`] exactly once.
pub(crate) struct Ledger {
    slots: Vec<Option<Entry>>,
    // Maps the address of every live block to its slot.
    index: HashMap<usize, usize>,
}

impl Ledger {
    /// Creates a new, empty ledger.
    #[cfg(test)]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new ledger with space for `size` blocks.
    pub fn with_capacity(size: usize) -> Self {
        Self {
            slots: Vec::with_capacity(size),
            index: HashMap::with_capacity(size),
        }
    }

    /// Returns the number of live blocks.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns the number of slots, live or cleared.
    #[cfg(test)]
    pub fn slots(&self) -> usize {
        self.slots.len()
    }

    /// Ensures there is space for at least `additional` more blocks.
    pub fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
        self.index.reserve(additional);
    }

    /// Records a newly reserved block, returning its entry.
    pub fn insert(&mut self, ptr: NonNull<u8>, layout: Layout) -> Entry {
        let entry = Entry {
            ptr,
            layout,
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
        };
        let previous = self.index.insert(entry.address(), self.slots.len());
        debug_assert!(previous.is_none(), "block source returned a live address");
        self.slots.push(Some(entry));
        entry
    }

    /// Looks up the live entry at `address`.
    ///
    /// If `serial` is given, the entry must also carry that serial.
    pub fn find(&self, address: usize, serial: Option<u64>) -> Option<&Entry> {
        let slot = *self.index.get(&address)?;
        self.slots[slot]
            .as_ref()
            .filter(|entry| serial.map_or(true, |serial| entry.serial == serial))
    }

    /// Clears the live entry at `address`, returning it so that it can be released.
    ///
    /// Returns [`None`] and changes nothing if there is no matching live entry.
    pub fn remove(&mut self, address: usize, serial: Option<u64>) -> Option<Entry> {
        self.find(address, serial)?;
        let slot = self.index.remove(&address)?;
        let entry = self.slots[slot].take();
        if self.slots.len() >= MIN_COMPACT_SLOTS && self.slots.len() - self.len() > self.len() {
            self.compact();
        }
        entry
    }

    /// Drops every cleared slot and re-points the index at the remaining live slots.
    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        for (slot, entry) in self.slots.iter().flatten().enumerate() {
            self.index.insert(entry.address(), slot);
        }
    }

    /// Clears every slot, returning the live entries in order of reservation.
    pub fn drain(&mut self) -> impl Iterator<Item = Entry> + '_ {
        self.index.clear();
        self.slots.drain(..).flatten()
    }

    /// Moves every slot out into a new ledger, leaving this one empty.
    pub fn take(&mut self) -> Self {
        Self {
            slots: mem::take(&mut self.slots),
            index: mem::take(&mut self.index),
        }
    }

    /// Returns an iterator over the live entries in order of reservation.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.slots.iter().flatten()
    }
}

#[cfg(test)]
mod ledger_test {
    #[cfg(not(feature = "std"))]
    use alloc::{
        vec,
        vec::Vec,
    };
    use core::{
        alloc::Layout,
        ptr::NonNull,
    };

    use crate::ledger::{
        Ledger,
        MIN_COMPACT_SLOTS,
    };

    fn fake(address: usize) -> NonNull<u8> {
        NonNull::new(address as *mut u8).unwrap()
    }

    #[test]
    fn insert_assigns_increasing_serials() {
        let mut ledger = Ledger::new();
        let layout = Layout::new::<u64>();
        let a = ledger.insert(fake(0x1000), layout);
        let b = ledger.insert(fake(0x2000), layout);
        assert!(b.serial > a.serial);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.slots(), 2);
    }

    #[test]
    fn remove_clears_slot_once() {
        let mut ledger = Ledger::new();
        let layout = Layout::new::<u64>();
        let a = ledger.insert(fake(0x1000), layout);
        ledger.insert(fake(0x2000), layout);

        assert_eq!(ledger.remove(0x1000, Some(a.serial)), Some(a));
        assert_eq!(ledger.remove(0x1000, Some(a.serial)), None);
        assert_eq!(ledger.remove(0x1000, None), None);
        assert_eq!(ledger.len(), 1);
        // Cleared slots remain as tombstones.
        assert_eq!(ledger.slots(), 2);
    }

    #[test]
    fn remove_rejects_mismatched_serial() {
        let mut ledger = Ledger::new();
        let a = ledger.insert(fake(0x1000), Layout::new::<u8>());
        assert_eq!(ledger.remove(0x1000, Some(a.serial + 1)), None);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.find(0x1000, Some(a.serial)).is_some());
    }

    #[test]
    fn readdress_after_remove_is_a_new_entry() {
        let mut ledger = Ledger::new();
        let layout = Layout::new::<u8>();
        let first = ledger.insert(fake(0x1000), layout);
        ledger.remove(0x1000, None);
        let second = ledger.insert(fake(0x1000), layout);
        assert_ne!(first.serial, second.serial);
        assert!(ledger.find(0x1000, Some(first.serial)).is_none());
        assert!(ledger.find(0x1000, Some(second.serial)).is_some());
    }

    #[test]
    fn drain_yields_live_entries_in_order() {
        let mut ledger = Ledger::new();
        let layout = Layout::new::<u8>();
        ledger.insert(fake(0x1000), layout);
        ledger.insert(fake(0x2000), layout);
        ledger.insert(fake(0x3000), layout);
        ledger.remove(0x2000, None);

        let drained = ledger
            .drain()
            .map(|entry| entry.ptr.as_ptr() as usize)
            .collect::<Vec<_>>();
        assert_eq!(drained, vec![0x1000, 0x3000]);
        assert_eq!(ledger.len(), 0);
        assert_eq!(ledger.slots(), 0);
    }

    #[test]
    fn take_moves_entries_and_keeps_serials_unique() {
        let mut ledger = Ledger::new();
        let layout = Layout::new::<u8>();
        let a = ledger.insert(fake(0x1000), layout);

        let mut taken = ledger.take();
        assert_eq!(ledger.len(), 0);
        assert_eq!(taken.len(), 1);
        assert_eq!(taken.find(0x1000, Some(a.serial)), Some(&a));

        let b = ledger.insert(fake(0x2000), layout);
        let c = taken.insert(fake(0x3000), layout);
        assert_ne!(a.serial, b.serial);
        assert_ne!(a.serial, c.serial);
        assert_ne!(b.serial, c.serial);
    }

    #[test]
    fn serials_are_unique_across_ledgers() {
        let mut first = Ledger::new();
        let mut second = Ledger::new();
        let layout = Layout::new::<u8>();
        let a = first.insert(fake(0x1000), layout);
        first.remove(0x1000, None);
        let b = second.insert(fake(0x1000), layout);
        assert_ne!(a.serial, b.serial);
        assert!(second.find(0x1000, Some(a.serial)).is_none());
    }

    #[test]
    fn cleared_slots_stay_bounded() {
        let mut ledger = Ledger::new();
        let layout = Layout::new::<u64>();
        let kept = ledger.insert(fake(0x10), layout);
        for i in 0..100_000 {
            let address = 0x1000 + i * 8;
            ledger.insert(fake(address), layout);
            assert!(ledger.remove(address, None).is_some());
            assert!(ledger.slots() < 2 * MIN_COMPACT_SLOTS);
        }
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.find(0x10, Some(kept.serial)), Some(&kept));
    }

    #[test]
    fn compaction_keeps_live_entries_in_order() {
        let mut ledger = Ledger::new();
        let layout = Layout::new::<u8>();
        for i in 1..=40 {
            ledger.insert(fake(i * 0x100), layout);
        }
        // Release every block except multiples of five, forcing compaction along the way.
        for i in (1..=40).filter(|i| i % 5 != 0) {
            assert!(ledger.remove(i * 0x100, None).is_some());
        }
        assert!(ledger.slots() < 40);
        let live = ledger
            .iter()
            .map(|entry| entry.ptr.as_ptr() as usize)
            .collect::<Vec<_>>();
        assert_eq!(
            live,
            (1..=40)
                .filter(|i| i % 5 == 0)
                .map(|i| i * 0x100)
                .collect::<Vec<_>>()
        );
        for address in live {
            assert!(ledger.find(address, None).is_some());
        }
        assert!(ledger.remove(0x500, None).is_some());
        assert!(ledger.find(0xA00, None).is_some());
    }
}
