//! Persistent (immutable) integer-keyed map.
//!
//! This module provides [`PersistentIntMap`], a map from `i32` keys to
//! values built on a 32-way radix trie with structural sharing:
//!
//! - every update returns a new map and leaves the old one readable
//! - unchanged subtrees are shared between versions
//! - consecutive writes to the same 32-key block only copy one leaf
//!
//! The addressing arithmetic is exposed in [`bit_index`] for diagnostics.
//!
//! # Examples
//!
//! ```rust
//! use persistent_intmap::persistent::PersistentIntMap;
//!
//! let map: PersistentIntMap<&str> = [(0, "zero"), (1, "one"), (33, "thirty-three")]
//!     .into_iter()
//!     .collect();
//! assert_eq!(map.get(33), Some(&"thirty-three"));
//! assert_eq!(map.get(32), None);
//!
//! // Structural sharing: the original map is preserved
//! let smaller = map.remove(1);
//! assert_eq!(map.len(), 3);     // Original unchanged
//! assert_eq!(smaller.len(), 2); // New version
//! ```
//!
//! # Thread Safety
//!
//! Nodes are shared through `Rc` by default. Enable the `arc` feature to
//! share them through `Arc`, which makes maps `Send + Sync`.

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

pub mod bit_index;
mod int_map;
mod int_map_iterator;
mod node;

pub use int_map::PersistentIntMap;
pub use int_map::TreeDump;
pub use int_map_iterator::PersistentIntMapIterator;

// =============================================================================
// Tests
// =============================================================================
