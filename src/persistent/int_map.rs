//! Persistent (immutable) map from `i32` keys to values.
//!
//! This module provides [`PersistentIntMap`], a 32-way radix trie keyed by
//! the bits of a 32-bit integer, tuned for workloads that write many keys
//! falling into the same 32-key block one after another.
//!
//! # Overview
//!
//! Each level of the trie consumes 5 bits of the key, lowest bits at the
//! bottom. The trie only grows as tall as the largest key requires, so a map
//! holding keys below 1024 is two levels deep.
//!
//! Besides the trie, a map keeps a *staging leaf*: the level-0 node of the
//! block that was written last. Writes that hit the same block only copy that
//! one leaf instead of the whole root-to-leaf path. The trie itself still
//! links the leaf as it was when the block was first entered (the *target*);
//! reads and traversals substitute the staging leaf for it, and the staging
//! leaf is spliced into the trie once a write moves to another block.
//!
//! # Examples
//!
//! ```rust
//! use persistent_intmap::persistent::PersistentIntMap;
//!
//! let map = PersistentIntMap::new()
//!     .insert(1, "one")
//!     .insert(2, "two")
//!     .insert(1_000_000, "million");
//!
//! assert_eq!(map.get(2), Some(&"two"));
//! assert_eq!(map.get(3), None);
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.remove(2);
//! assert_eq!(map.get(2), Some(&"two"));
//! assert_eq!(updated.get(2), None);
//! assert_eq!(updated.len(), 2);
//! ```

use std::fmt;
use std::iter::FromIterator;

use arrayvec::ArrayVec;

use super::ReferenceCounter;
use super::bit_index::{
    BRANCHING_FACTOR, MAX_LEVEL, block_mask, minimum_level_for_key, slot_at,
};
use super::int_map_iterator::PersistentIntMapIterator;
use super::node::{Child, Link, Node, Shadow};

/// Branch nodes visited on the way from the root to a leaf, with the slot
/// taken in each.
type Path<'a, V> = ArrayVec<(&'a Link<Child<V>>, u32), MAX_LEVEL>;

// =============================================================================
// Staging
// =============================================================================

/// The leaf of the most recently written block.
struct Staging<V> {
    /// `key | 0x1f` for every key of the block.
    mask: u32,
    /// Current contents of the block.
    node: Link<V>,
    /// Leaf linked into the trie for this block.
    target: Link<V>,
}

impl<V> Staging<V> {
    /// Staging state for a leaf that was just linked into the trie.
    fn settled(key: u32, leaf: Link<V>) -> Self {
        Self {
            mask: block_mask(key),
            node: ReferenceCounter::clone(&leaf),
            target: leaf,
        }
    }

    /// Whether the trie still links an outdated copy of the block.
    fn is_diverged(&self) -> bool {
        !ReferenceCounter::ptr_eq(&self.node, &self.target)
    }
}

impl<V> Clone for Staging<V> {
    fn clone(&self) -> Self {
        Self {
            mask: self.mask,
            node: ReferenceCounter::clone(&self.node),
            target: ReferenceCounter::clone(&self.target),
        }
    }
}

// =============================================================================
// PersistentIntMap Definition
// =============================================================================

/// A persistent (immutable) map from `i32` keys to values.
///
/// Every update returns a new map and leaves the receiver untouched; the two
/// versions share all nodes that the update did not change.
///
/// # Time Complexity
///
/// | Operation                     | Complexity                  |
/// |-------------------------------|-----------------------------|
/// | `new`                         | O(1)                        |
/// | `get`                         | O(1) (at most 7 levels)     |
/// | `insert` in the staged block  | O(1), copies one leaf       |
/// | `insert` in another block     | O(1), copies up to 7 nodes  |
/// | `remove`                      | O(1), copies up to 7 nodes  |
/// | `remove_all_satisfying`       | O(N)                        |
/// | `len`                         | O(1)                        |
///
/// # Examples
///
/// ```rust
/// use persistent_intmap::persistent::PersistentIntMap;
///
/// let map: PersistentIntMap<String> = (0..64).map(|key| (key, key.to_string())).collect();
/// assert_eq!(map.len(), 64);
/// assert_eq!(map.get(42).map(String::as_str), Some("42"));
/// ```
pub struct PersistentIntMap<V> {
    /// Number of entries
    size: usize,
    /// Level of the root node; level 0 means the root is a leaf
    root_level: usize,
    /// Root of the trie, absent only for the empty map
    root: Option<Child<V>>,
    /// Leaf of the most recently written block
    staging: Option<Staging<V>>,
}

impl<V> PersistentIntMap<V> {
    /// Creates a new empty map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_intmap::persistent::PersistentIntMap;
    ///
    /// let map: PersistentIntMap<i32> = PersistentIntMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            size: 0,
            root_level: 0,
            root: None,
            staging: None,
        }
    }

    /// Returns the number of entries in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns a reference to the value stored under `key`.
    ///
    /// Keys of the staged block are answered from the staging leaf without
    /// walking the trie.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_intmap::persistent::PersistentIntMap;
    ///
    /// let map = PersistentIntMap::new().insert(-7, 'a');
    /// assert_eq!(map.get(-7), Some(&'a'));
    /// assert_eq!(map.get(7), None);
    /// ```
    #[must_use]
    pub fn get(&self, key: i32) -> Option<&V> {
        let bits = key.cast_unsigned();
        if let Some(staging) = &self.staging
            && staging.mask == block_mask(bits)
        {
            return staging.node.get(slot_at(bits, 0));
        }
        if minimum_level_for_key(bits) > self.root_level {
            return None;
        }

        let mut current = self.root.as_ref()?;
        let mut level = self.root_level;
        loop {
            match current {
                Child::Branch(branch) => {
                    current = branch.get(slot_at(bits, level))?;
                    level -= 1;
                }
                Child::Leaf(leaf) => return leaf.get(slot_at(bits, 0)),
            }
        }
    }

    /// Returns `true` if the map contains a value for `key`.
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: i32) -> bool {
        self.get(key).is_some()
    }

    /// Returns an iterator over the values of the map.
    ///
    /// Values come out in trie order, which is not key order for maps
    /// containing negative keys. The iterator yields exactly [`len`] values.
    ///
    /// [`len`]: Self::len
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_intmap::persistent::PersistentIntMap;
    ///
    /// let map: PersistentIntMap<i32> = (1..=4).map(|key| (key, key * 10)).collect();
    /// assert_eq!(map.iter().sum::<i32>(), 100);
    /// ```
    #[must_use]
    pub fn iter(&self) -> PersistentIntMapIterator<'_, V> {
        PersistentIntMapIterator::new(self.root.as_ref(), self.shadow(), self.size)
    }

    /// Calls `visitor` with every value of the map.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&V),
    {
        self.for_each_entry(|_, value| visitor(value));
    }

    /// Calls `visitor` with every key and value of the map.
    ///
    /// Keys are rebuilt from the trie path; the order is unspecified.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_intmap::persistent::PersistentIntMap;
    ///
    /// let map = PersistentIntMap::new().insert(40, "a").insert(-3, "b");
    /// let mut entries = Vec::new();
    /// map.for_each_entry(|key, value| entries.push((key, *value)));
    /// entries.sort_unstable();
    /// assert_eq!(entries, vec![(-3, "b"), (40, "a")]);
    /// ```
    pub fn for_each_entry<'a, F>(&'a self, mut visitor: F)
    where
        F: FnMut(i32, &'a V),
    {
        if let Some(root) = &self.root {
            root.visit(self.root_level, 0, self.shadow(), &mut visitor);
        }
    }

    /// Returns a printable dump of the internal trie.
    ///
    /// Meant for debugging; the layout is not a stable format.
    #[must_use]
    pub const fn tree(&self) -> TreeDump<'_, V> {
        TreeDump { map: self }
    }

    /// The staging leaf to read in place of its stale target, if any.
    fn shadow(&self) -> Option<Shadow<'_, V>> {
        self.staging
            .as_ref()
            .filter(|staging| staging.is_diverged())
            .map(|staging| Shadow {
                target: &staging.target,
                staging: &staging.node,
            })
    }

    /// Walks from `top` (a node at `top_level`) along `key` for as long as
    /// branches exist, recording every branch and the slot taken.
    fn walk<'a>(top: &'a Child<V>, top_level: usize, key: u32) -> (Path<'a, V>, WalkEnd<'a, V>) {
        let mut path = Path::new();
        let mut current = top;
        let mut level = top_level;
        loop {
            match current {
                Child::Branch(branch) => {
                    let slot = slot_at(key, level);
                    match branch.get(slot) {
                        Some(child) => {
                            path.push((branch, slot));
                            current = child;
                            level -= 1;
                        }
                        None => return (path, WalkEnd::Missing { branch, slot, level }),
                    }
                }
                Child::Leaf(leaf) => return (path, WalkEnd::Leaf(leaf)),
            }
        }
    }

    /// Rebuilds the recorded path bottom-up with `bottom` as the new child of
    /// the deepest branch.
    fn rebuild_path(path: Path<'_, V>, bottom: Child<V>) -> Child<V> {
        path.into_iter().rev().fold(bottom, |child, (branch, slot)| {
            Child::Branch(ReferenceCounter::new(branch.with_replaced(slot, child)))
        })
    }

    /// Builds the chain of single-slot branches for `key` from level 1 up to
    /// `top_level - 1`, ending in `leaf`.
    ///
    /// The result is the child a node at `top_level` stores for `key`.
    fn single_path(key: u32, top_level: usize, leaf: Link<V>) -> Child<V> {
        (1..top_level).fold(Child::Leaf(leaf), |child, level| {
            Child::Branch(ReferenceCounter::new(Node::one(slot_at(key, level), child)))
        })
    }

    /// Copies the path from `top` down to the stale target and links the
    /// staging leaf at its bottom.
    fn splice_staging(top: &Child<V>, top_level: usize, staging: &Staging<V>) -> Child<V> {
        let (path, end) = Self::walk(top, top_level, staging.mask);
        debug_assert!(
            matches!(end, WalkEnd::Leaf(leaf) if ReferenceCounter::ptr_eq(leaf, &staging.target)),
            "staging target is not linked into the trie"
        );
        Self::rebuild_path(path, Child::Leaf(ReferenceCounter::clone(&staging.node)))
    }

    /// Returns the root with the staging leaf spliced in.
    fn canonical_root(&self) -> Option<Child<V>> {
        let root = self.root.as_ref()?;
        match &self.staging {
            Some(staging) if staging.is_diverged() => {
                log::trace!(
                    "merging staging block {:#x} into root at level {}",
                    staging.mask,
                    self.root_level
                );
                Some(Self::splice_staging(root, self.root_level, staging))
            }
            _ => Some(root.clone()),
        }
    }

    /// Links the diverged staging leaf into `root`, a trie of height
    /// `root_level` that was just rebuilt along the path of `key`.
    ///
    /// The node where the paths of `key` and the staging block part ways is
    /// part of that rebuild, so it is updated in place.
    fn merge_staging_into(&self, key: u32, root_level: usize, root: &mut Child<V>) {
        let Some(staging) = self.staging.as_ref().filter(|staging| staging.is_diverged()) else {
            return;
        };
        let merge_level = minimum_level_for_key(key ^ staging.mask);
        debug_assert!(
            (1..=root_level).contains(&merge_level),
            "keys {key:#x} and {:#x} cannot part at level {merge_level}",
            staging.mask
        );
        log::trace!(
            "merging staging block {:#x} at level {merge_level} while writing {key:#x}",
            staging.mask
        );

        let Child::Branch(root_branch) = root else {
            return;
        };
        let mut merge_node = ReferenceCounter::make_mut(root_branch);
        for level in (merge_level + 1..=root_level).rev() {
            match merge_node.get_mut(slot_at(staging.mask, level)) {
                Some(Child::Branch(branch)) => merge_node = ReferenceCounter::make_mut(branch),
                _ => return,
            }
        }

        let merge_slot = slot_at(staging.mask, merge_level);
        if let Some(existing) = merge_node.get(merge_slot) {
            let spliced = Self::splice_staging(existing, merge_level - 1, staging);
            merge_node.set_in_place(merge_slot, spliced);
        }
    }

    /// Strips single-child nodes at slot 0 off the top of the trie.
    fn collapse_root(mut root: Child<V>, mut root_level: usize) -> (Child<V>, usize) {
        let original_level = root_level;
        while root_level > 0 {
            let lowered = match &root {
                Child::Branch(branch) => branch.sole_element_at_origin().cloned(),
                Child::Leaf(_) => None,
            };
            match lowered {
                Some(child) => {
                    root = child;
                    root_level -= 1;
                }
                None => break,
            }
        }
        if root_level != original_level {
            log::trace!("collapsed root from level {original_level} to {root_level}");
        }
        (root, root_level)
    }
}

/// Where a walk along a key stopped.
enum WalkEnd<'a, V> {
    /// The leaf of the key's block.
    Leaf(&'a Link<V>),
    /// `branch` at `level` has no child at `slot`.
    Missing {
        branch: &'a Link<Child<V>>,
        slot: u32,
        level: usize,
    },
}

impl<V: Clone> PersistentIntMap<V> {
    /// Creates a map containing a single entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_intmap::persistent::PersistentIntMap;
    ///
    /// let map = PersistentIntMap::singleton(5, "five");
    /// assert_eq!(map.len(), 1);
    /// assert_eq!(map.get(5), Some(&"five"));
    /// ```
    #[inline]
    #[must_use]
    pub fn singleton(key: i32, value: V) -> Self {
        Self::new().insert(key, value)
    }

    /// Returns a new map with `key` set to `value`, or with `key` removed when
    /// `value` is `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_intmap::persistent::PersistentIntMap;
    ///
    /// let map = PersistentIntMap::new().set(3, Some("three"));
    /// assert_eq!(map.get(3), Some(&"three"));
    ///
    /// let cleared = map.set(3, None);
    /// assert!(cleared.is_empty());
    /// ```
    #[must_use]
    pub fn set(&self, key: i32, value: Option<V>) -> Self {
        match value {
            Some(value) => self.insert(key, value),
            None => self.remove(key),
        }
    }

    /// Returns a new map with `key` mapped to `value`.
    ///
    /// Replaces the value if `key` is already present.
    ///
    /// # Complexity
    ///
    /// O(1): one leaf copy when `key` falls in the block written last,
    /// otherwise one copy per trie level.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_intmap::persistent::PersistentIntMap;
    ///
    /// let map = PersistentIntMap::new().insert(1, 'a');
    /// let updated = map.insert(1, 'b').insert(2, 'c');
    ///
    /// assert_eq!(map.get(1), Some(&'a'));
    /// assert_eq!(updated.get(1), Some(&'b'));
    /// assert_eq!(updated.len(), 2);
    /// ```
    #[must_use]
    pub fn insert(&self, key: i32, value: V) -> Self {
        let bits = key.cast_unsigned();
        if let Some(staging) = &self.staging
            && staging.mask == block_mask(bits)
        {
            let slot = slot_at(bits, 0);
            let (node, added) = if staging.node.get(slot).is_some() {
                (staging.node.with_replaced(slot, value), false)
            } else {
                (staging.node.with_added(slot, value), true)
            };
            return Self {
                size: self.size + usize::from(added),
                root_level: self.root_level,
                root: self.root.clone(),
                staging: Some(Staging {
                    mask: staging.mask,
                    node: ReferenceCounter::new(node),
                    target: ReferenceCounter::clone(&staging.target),
                }),
            };
        }

        let new_root_level = minimum_level_for_key(bits);
        if new_root_level > self.root_level {
            self.insert_in_new_root_level(bits, value, new_root_level)
        } else {
            self.insert_in_current_root_level(bits, value)
        }
    }

    /// Grows the trie to `new_root_level` and adds `key` in the new top slot.
    fn insert_in_new_root_level(&self, key: u32, value: V, new_root_level: usize) -> Self {
        log::trace!(
            "growing trie from level {} to {new_root_level} for key {key:#x}",
            self.root_level
        );
        let leaf = ReferenceCounter::new(Node::one(slot_at(key, 0), value));
        let chain = Self::single_path(key, new_root_level, ReferenceCounter::clone(&leaf));
        let top_slot = slot_at(key, new_root_level);

        let root_node = match self.canonical_root() {
            Some(old_root) => {
                let lifted = (self.root_level + 1..new_root_level).fold(old_root, |child, _| {
                    Child::Branch(ReferenceCounter::new(Node::one(0, child)))
                });
                Node::one(0, lifted).with_added(top_slot, chain)
            }
            None => Node::one(top_slot, chain),
        };

        Self {
            size: self.size + 1,
            root_level: new_root_level,
            root: Some(Child::Branch(ReferenceCounter::new(root_node))),
            staging: Some(Staging::settled(key, leaf)),
        }
    }

    /// Adds or replaces `key` in a trie that is already tall enough.
    fn insert_in_current_root_level(&self, key: u32, value: V) -> Self {
        let Some(root) = &self.root else {
            let leaf = ReferenceCounter::new(Node::one(slot_at(key, 0), value));
            return Self {
                size: 1,
                root_level: 0,
                root: Some(Child::Leaf(ReferenceCounter::clone(&leaf))),
                staging: Some(Staging::settled(key, leaf)),
            };
        };

        let (path, end) = Self::walk(root, self.root_level, key);
        let (bottom, leaf, added) = match end {
            WalkEnd::Missing {
                branch,
                slot,
                level,
            } => {
                let leaf = ReferenceCounter::new(Node::one(slot_at(key, 0), value));
                let chain = Self::single_path(key, level, ReferenceCounter::clone(&leaf));
                let grown = ReferenceCounter::new(branch.with_added(slot, chain));
                (Self::rebuild_path(path, Child::Branch(grown)), leaf, true)
            }
            WalkEnd::Leaf(existing) => {
                let slot = slot_at(key, 0);
                let (node, added) = if existing.get(slot).is_some() {
                    (existing.with_replaced(slot, value), false)
                } else {
                    (existing.with_added(slot, value), true)
                };
                let leaf = ReferenceCounter::new(node);
                let bottom = Child::Leaf(ReferenceCounter::clone(&leaf));
                (Self::rebuild_path(path, bottom), leaf, added)
            }
        };

        let mut new_root = bottom;
        self.merge_staging_into(key, self.root_level, &mut new_root);

        Self {
            size: self.size + usize::from(added),
            root_level: self.root_level,
            root: Some(new_root),
            staging: Some(Staging::settled(key, leaf)),
        }
    }

    /// Returns a new map without `key`.
    ///
    /// Returns an identical map if `key` is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_intmap::persistent::PersistentIntMap;
    ///
    /// let map = PersistentIntMap::new().insert(1, "one").insert(2, "two");
    /// let removed = map.remove(1);
    ///
    /// assert_eq!(removed.get(1), None);
    /// assert_eq!(removed.len(), 1);
    /// assert_eq!(map.len(), 2);
    /// assert_eq!(removed.remove(1), removed);
    /// ```
    #[must_use]
    pub fn remove(&self, key: i32) -> Self {
        let bits = key.cast_unsigned();
        if let Some(staging) = &self.staging
            && staging.mask == block_mask(bits)
        {
            let slot = slot_at(bits, 0);
            if staging.node.get(slot).is_none() {
                return self.clone();
            }
            return match staging.node.with_removed(slot) {
                Some(node) => Self {
                    size: self.size - 1,
                    root_level: self.root_level,
                    root: self.root.clone(),
                    staging: Some(Staging {
                        mask: staging.mask,
                        node: ReferenceCounter::new(node),
                        target: ReferenceCounter::clone(&staging.target),
                    }),
                },
                None => self.remove_from_trie(bits, true),
            };
        }
        self.remove_from_trie(bits, false)
    }

    /// Removes `key` from the trie.
    ///
    /// With `drop_block` the whole leaf of `key` is unlinked; this is how the
    /// staged block disappears once its last key is removed.
    fn remove_from_trie(&self, key: u32, drop_block: bool) -> Self {
        if minimum_level_for_key(key) > self.root_level {
            return self.clone();
        }
        let Some(root) = &self.root else {
            return self.clone();
        };

        let (path, end) = Self::walk(root, self.root_level, key);
        let WalkEnd::Leaf(leaf) = end else {
            return self.clone();
        };
        let remaining_leaf = if drop_block {
            None
        } else {
            let slot = slot_at(key, 0);
            if leaf.get(slot).is_none() {
                return self.clone();
            }
            leaf.with_removed(slot).map(ReferenceCounter::new)
        };

        let rebuilt = path.into_iter().rev().fold(
            remaining_leaf.clone().map(Child::Leaf),
            |child, (branch, slot)| {
                let node = match child {
                    Some(child) => Some(branch.with_replaced(slot, child)),
                    None => branch.with_removed(slot),
                };
                node.map(|node| Child::Branch(ReferenceCounter::new(node)))
            },
        );
        let Some(mut new_root) = rebuilt else {
            return Self::new();
        };

        if !drop_block {
            self.merge_staging_into(key, self.root_level, &mut new_root);
        }
        let (new_root, root_level) = Self::collapse_root(new_root, self.root_level);

        Self {
            size: self.size - 1,
            root_level,
            root: Some(new_root),
            staging: remaining_leaf.map(|leaf| Staging::settled(key, leaf)),
        }
    }

    /// Returns a new map without the entries whose value satisfies
    /// `predicate`.
    ///
    /// Subtrees without a matching value are shared with the receiver. The
    /// returned map has no staged block.
    ///
    /// # Complexity
    ///
    /// O(N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_intmap::persistent::PersistentIntMap;
    ///
    /// let map: PersistentIntMap<i32> = (0..100).map(|key| (key, key)).collect();
    /// let odd = map.remove_all_satisfying(|value| value % 2 == 0);
    ///
    /// assert_eq!(odd.len(), 50);
    /// assert_eq!(odd.get(3), Some(&3));
    /// assert_eq!(odd.get(4), None);
    /// ```
    #[must_use]
    pub fn remove_all_satisfying<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&V) -> bool,
    {
        let Some(root) = self.canonical_root() else {
            return Self::new();
        };
        let Some(survivor) = Self::remove_all_from(&root, &mut predicate) else {
            log::debug!("bulk removal dropped all {} values", self.size);
            return Self::new();
        };

        let (root, root_level) = Self::collapse_root(survivor, self.root_level);
        let size = root.count_values();
        log::debug!("bulk removal kept {size} of {} values", self.size);
        Self {
            size,
            root_level,
            root: Some(root),
            staging: None,
        }
    }

    /// Removes matching values below `child`, sharing it when nothing
    /// matched.
    fn remove_all_from<P>(child: &Child<V>, predicate: &mut P) -> Option<Child<V>>
    where
        P: FnMut(&V) -> bool,
    {
        match child {
            Child::Leaf(leaf) => Node::remove_all_satisfying(leaf, predicate).map(Child::Leaf),
            Child::Branch(branch) => {
                let mut changed = false;
                let mut survivor_bitmap = 0u32;
                let mut survivors: ArrayVec<Child<V>, BRANCHING_FACTOR> = ArrayVec::new();
                for (slot, grandchild) in branch.entries() {
                    match Self::remove_all_from(grandchild, predicate) {
                        Some(survivor) => {
                            changed |= !survivor.ptr_eq(grandchild);
                            survivor_bitmap |= 1 << slot;
                            survivors.push(survivor);
                        }
                        None => changed = true,
                    }
                }

                if !changed {
                    return Some(child.clone());
                }
                Node::from_survivors(survivor_bitmap, survivors)
                    .map(|node| Child::Branch(ReferenceCounter::new(node)))
            }
        }
    }

    /// Returns a snapshot of all values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_intmap::persistent::PersistentIntMap;
    ///
    /// let map = PersistentIntMap::new().insert(2, 'b').insert(1, 'a');
    /// let mut values = map.values();
    /// values.sort_unstable();
    /// assert_eq!(values, vec!['a', 'b']);
    /// ```
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.iter().cloned().collect()
    }
}

// =============================================================================
// Tree Dump
// =============================================================================

/// Display adapter printing the trie of a [`PersistentIntMap`].
///
/// Created by [`PersistentIntMap::tree`].
pub struct TreeDump<'a, V> {
    map: &'a PersistentIntMap<V>,
}

impl<V: fmt::Display> fmt::Display for TreeDump<'_, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self.map.staging.as_ref().map(|staging| &staging.target);
        match &self.map.root {
            Some(root) => {
                root.write_node_info(formatter, target)?;
                writeln!(formatter)?;
                root.write_tree(formatter, 1, target)?;
            }
            None => writeln!(formatter, "empty")?,
        }
        if let Some(staging) = &self.map.staging {
            writeln!(formatter, "--------------- staging")?;
            let leaf = Child::Leaf(ReferenceCounter::clone(&staging.node));
            leaf.write_node_info(formatter, None)?;
            writeln!(formatter)?;
            leaf.write_tree(formatter, 1, None)?;
        }
        Ok(())
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<V> Clone for PersistentIntMap<V> {
    fn clone(&self) -> Self {
        Self {
            size: self.size,
            root_level: self.root_level,
            root: self.root.clone(),
            staging: self.staging.clone(),
        }
    }
}

impl<V> Default for PersistentIntMap<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> FromIterator<(i32, V)> for PersistentIntMap<V> {
    fn from_iter<I: IntoIterator<Item = (i32, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |map, (key, value)| map.insert(key, value))
    }
}

impl<V: Clone> Extend<(i32, V)> for PersistentIntMap<V> {
    fn extend<I: IntoIterator<Item = (i32, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            *self = self.insert(key, value);
        }
    }
}

impl<'a, V> IntoIterator for &'a PersistentIntMap<V> {
    type Item = &'a V;
    type IntoIter = PersistentIntMapIterator<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: PartialEq> PartialEq for PersistentIntMap<V> {
    fn eq(&self, other: &Self) -> bool {
        if self.size != other.size {
            return false;
        }

        let mut equal = true;
        self.for_each_entry(|key, value| {
            if equal && other.get(key) != Some(value) {
                equal = false;
            }
        });
        equal
    }
}

impl<V: Eq> Eq for PersistentIntMap<V> {}

impl<V: fmt::Debug> fmt::Debug for PersistentIntMap<V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries = Vec::with_capacity(self.size);
        self.for_each_entry(|key, value| entries.push((key, value)));
        entries.sort_unstable_by_key(|(key, _)| *key);
        formatter.debug_map().entries(entries).finish()
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<V: serde::Serialize> serde::Serialize for PersistentIntMap<V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut entries = Vec::with_capacity(self.size);
        self.for_each_entry(|key, value| entries.push((key, value)));
        entries.sort_unstable_by_key(|(key, _)| *key);

        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(&key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentIntMapVisitor<V> {
    marker: std::marker::PhantomData<V>,
}

#[cfg(feature = "serde")]
impl<V> PersistentIntMapVisitor<V> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, V> serde::de::Visitor<'de> for PersistentIntMapVisitor<V>
where
    V: serde::Deserialize<'de> + Clone,
{
    type Value = PersistentIntMap<V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map with integer keys")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut map = PersistentIntMap::new();
        while let Some((key, value)) = access.next_entry::<i32, V>()? {
            map = map.insert(key, value);
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, V> serde::Deserialize<'de> for PersistentIntMap<V>
where
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentIntMapVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================
