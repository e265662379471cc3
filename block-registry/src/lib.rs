//! Registries for scoped, manually-managed memory blocks.
//!
//! A registry hands out blocks of memory and guarantees that each one is released exactly once:
//! either early, when the caller releases it explicitly, or in bulk, when the registry itself is
//! dropped. Code that works with manually-sized buffers (C-style arrays, interop buffers, structs
//! with raw fields) can treat that memory as scope-managed, without a tracing collector.
//!
//! # Examples
//!
//! ## Typed Blocks with [`BlockRegistry<T>`]
//! ```
//! use block_registry::BlockRegistry;
//!
//! fn main() {
//!     let mut registry = BlockRegistry::<u32>::new();
//!
//!     // Blocks are zero-filled.
//!     let mut single = registry.allocate(1);
//!     let many = registry.allocate(10).unwrap();
//!     assert_eq!(registry.get(many), Some(&[0; 10][..]));
//!
//!     registry.get_mut(single.unwrap()).unwrap()[0] = 123;
//!     registry.get_mut(many).unwrap()[9] = 456;
//!     assert_eq!(registry.get(many).unwrap()[9], 456);
//!
//!     // Releasing a block clears the caller's slot, so it cannot be released twice.
//!     registry.release(&mut single);
//!     assert!(single.is_none());
//!     registry.release(&mut single);
//!     assert_eq!(registry.len(), 1);
//!
//!     // The remaining block is released when the registry goes out of scope.
//! }
//! ```
//!
//! ## Zero-Sized and Failed Requests
//! ```
//! use block_registry::{
//!     BlockError,
//!     BlockRegistry,
//! };
//!
//! fn main() {
//!     let registry = BlockRegistry::<u64>::new();
//!     assert!(registry.allocate(0).is_none());
//!     assert_eq!(registry.try_allocate(0), Err(BlockError::ZeroLength));
//!     assert_eq!(
//!         registry.try_allocate(usize::MAX),
//!         Err(BlockError::CapacityOverflow)
//!     );
//!     assert!(registry.is_empty());
//! }
//! ```
//!
//! ## Handing Blocks to Another Registry
//! ```
//! use block_registry::BlockRegistry;
//!
//! fn main() {
//!     let mut registry = BlockRegistry::<f64>::new();
//!     let block = registry.allocate(4).unwrap();
//!
//!     let relocated = registry.relocate();
//!     assert!(registry.is_empty());
//!     assert!(!registry.contains(block));
//!     assert_eq!(relocated.get(block), Some(&[0.0; 4][..]));
//!
//!     // Dropping the old registry releases nothing. The block is released with `relocated`.
//!     drop(registry);
//!     assert!(relocated.contains(block));
//! }
//! ```
//!
//! Registries cannot be cloned, since both copies would release the same blocks.
//! ```compile_fail
//! use block_registry::BlockRegistry;
//!
//! let registry = BlockRegistry::<u8>::new();
//! let copy = registry.clone();
//! ```
//!
//! ## Element Types
//!
//! Elements must implement [`Plain`]: the zero bit pattern must be a valid value, and the type must
//! own nothing outside of its own bytes. Types that own other memory are rejected at compile time.
//! ```compile_fail
//! use block_registry::BlockRegistry;
//!
//! let registry = BlockRegistry::<String>::new();
//! ```
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod block;
mod block_error;
pub mod block_registry;
mod ledger;
mod plain;
pub mod raw_registry;
pub mod source;
#[cfg(test)]
mod test_util;

pub use block::Block;
pub use block_error::BlockError;
pub use block_registry::BlockRegistry;
pub use plain::Plain;
pub use raw_registry::{
    RawRegistry,
    MAX_ALIGN,
};
pub use source::{
    BlockSource,
    Heap,
};
