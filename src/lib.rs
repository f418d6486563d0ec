//! # persistent-intmap
//!
//! A persistent (immutable) map from 32-bit integer keys to values, built on
//! a 32-way radix trie with structural sharing.
//!
//! ## Overview
//!
//! - **Persistent updates**: `insert`, `remove` and `remove_all_satisfying`
//!   return new maps; earlier versions stay valid and unchanged.
//! - **Clustered writes**: the leaf of the most recently written 32-key block
//!   is staged outside the trie, so runs of writes to nearby keys copy one
//!   small node per write.
//! - **Compact nodes**: nodes switch between single-slot, bitmap-indexed and
//!   full representations as they fill up.
//!
//! ## Feature Flags
//!
//! - `arc`: share nodes through `Arc` so maps are `Send + Sync`
//! - `serde`: `Serialize`/`Deserialize` for [`persistent::PersistentIntMap`]
//!
//! ## Logging
//!
//! Structural events (trie growth, staging merges, height collapse, bulk
//! removal summaries) are reported through the [`log`] facade at `trace` and
//! `debug` level.
//!
//! ## Example
//!
//! ```rust
//! use persistent_intmap::prelude::*;
//!
//! let map = PersistentIntMap::new().insert(7, "seven").insert(8, "eight");
//! assert_eq!(map.get(7), Some(&"seven"));
//! assert_eq!(map.len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Note: Disabling redundant_closure_for_method_calls due to clippy 0.1.92 panic bug
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types.
///
/// # Usage
///
/// ```rust
/// use persistent_intmap::prelude::*;
/// ```
pub mod prelude {
    pub use crate::persistent::{PersistentIntMap, PersistentIntMapIterator};
}

pub mod persistent;
