use core::{
    fmt,
    hash::{
        Hash,
        Hasher,
    },
    marker::PhantomData,
    mem,
    ptr::NonNull,
};

/// A reference to a block of elements allocated by a [`BlockRegistry`][`crate::BlockRegistry`].
///
/// A block is a borrowed reference: it records where the memory is and how many elements it
/// holds, but the registry that allocated it keeps sole authority to release it. Copies of a
/// block are cheap and carry no ownership.
///
/// Safe access goes through the registry ([`BlockRegistry::get`][`crate::BlockRegistry::get`] and
/// [`BlockRegistry::get_mut`][`crate::BlockRegistry::get_mut`]), which checks that the block is
/// still live. The raw pointer is available for interop; dereferencing it is only valid while the
/// block is live in its registry.
pub struct Block<T> {
    ptr: NonNull<T>,
    len: usize,
    serial: u64,
    phantom: PhantomData<T>,
}

impl<T> Block<T> {
    pub(crate) fn new(ptr: NonNull<T>, len: usize, serial: u64) -> Self {
        Self {
            ptr,
            len,
            serial,
            phantom: PhantomData,
        }
    }

    /// Returns the number of elements in the block.
    ///
    /// Blocks are never empty.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the size of the block in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.len * mem::size_of::<T>()
    }

    /// Returns a raw pointer to the first element.
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Returns a non-null pointer to the first element.
    pub fn as_non_null(&self) -> NonNull<T> {
        self.ptr
    }

    pub(crate) fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }
}

impl<T> Clone for Block<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Block<T> {}

impl<T> PartialEq for Block<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.len == other.len && self.serial == other.serial
    }
}

impl<T> Eq for Block<T> {}

impl<T> Hash for Block<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ptr.hash(state);
        self.len.hash(state);
        self.serial.hash(state);
    }
}

impl<T> fmt::Debug for Block<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("serial", &self.serial)
            .finish()
    }
}

// SAFETY: A block is only an address. Access to the memory behind it is mediated by the registry.
unsafe impl<T: Send> Send for Block<T> {}
unsafe impl<T: Sync> Sync for Block<T> {}
