//! Trie nodes shared by every level of [`PersistentIntMap`].
//!
//! A [`Node`] holds 1 to 32 elements addressed by a slot index `0..32`.
//! The same node type is used at every level: level-0 nodes hold the stored
//! values, every other level holds [`Child`] links to the level below.
//!
//! Three representations are chosen by occupancy:
//!
//! | Variant  | Elements | Storage index of a slot                  |
//! |----------|----------|------------------------------------------|
//! | `One`    | 1        | always 0                                 |
//! | `Bitmap` | 2..=31   | population count of the bitmap below it  |
//! | `Full`   | 32       | the slot itself                          |
//!
//! No node is ever empty. Nodes are immutable once shared through a
//! [`ReferenceCounter`]; the `with_*` operations build a new node and leave
//! the receiver untouched. [`Node::set_in_place`] is only used on nodes that
//! were built by the operation currently running and are not yet reachable
//! from a returned map.
//!
//! [`PersistentIntMap`]: super::PersistentIntMap

use std::fmt;

use arrayvec::ArrayVec;

use super::ReferenceCounter;
use super::bit_index::{BITS_PER_LEVEL, BRANCHING_FACTOR, SetBits, population_count_below};

/// A shared node.
pub(crate) type Link<E> = ReferenceCounter<Node<E>>;

// =============================================================================
// Node Definition
// =============================================================================

/// One level of the trie.
#[derive(Clone)]
pub(crate) enum Node<E> {
    /// Exactly one occupied slot.
    One { slot: u32, element: E },
    /// 2 to 31 occupied slots, stored compactly in slot order.
    Bitmap { bitmap: u32, elements: Box<[E]> },
    /// All 32 slots occupied; `elements[slot]` is the element of `slot`.
    Full { elements: Box<[E]> },
}

impl<E> Node<E> {
    /// Creates a node with a single occupied slot.
    #[inline]
    pub(crate) const fn one(slot: u32, element: E) -> Self {
        Self::One { slot, element }
    }

    /// Returns the number of occupied slots.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::One { .. } => 1,
            Self::Bitmap { elements, .. } => elements.len(),
            Self::Full { .. } => BRANCHING_FACTOR,
        }
    }

    /// Returns the bitmap of occupied slots.
    #[inline]
    pub(crate) const fn occupancy(&self) -> u32 {
        match self {
            Self::One { slot, .. } => 1 << *slot,
            Self::Bitmap { bitmap, .. } => *bitmap,
            Self::Full { .. } => u32::MAX,
        }
    }

    /// Returns the elements in storage order.
    #[inline]
    pub(crate) fn elements(&self) -> &[E] {
        match self {
            Self::One { element, .. } => std::slice::from_ref(element),
            Self::Bitmap { elements, .. } | Self::Full { elements } => elements,
        }
    }

    /// Returns the element stored at `slot`, if any.
    #[inline]
    pub(crate) fn get(&self, slot: u32) -> Option<&E> {
        match self {
            Self::One {
                slot: occupied,
                element,
            } => (*occupied == slot).then_some(element),
            Self::Bitmap { bitmap, elements } => {
                if bitmap & (1 << slot) == 0 {
                    None
                } else {
                    Some(&elements[population_count_below(*bitmap, slot)])
                }
            }
            Self::Full { elements } => Some(&elements[slot as usize]),
        }
    }

    /// Mutable access to the element at `slot`, for nodes not yet shared.
    #[inline]
    pub(crate) fn get_mut(&mut self, slot: u32) -> Option<&mut E> {
        match self {
            Self::One {
                slot: occupied,
                element,
            } => (*occupied == slot).then_some(element),
            Self::Bitmap { bitmap, elements } => {
                if *bitmap & (1 << slot) == 0 {
                    None
                } else {
                    Some(&mut elements[population_count_below(*bitmap, slot)])
                }
            }
            Self::Full { elements } => Some(&mut elements[slot as usize]),
        }
    }

    /// Returns `(slot, element)` pairs in storage order.
    #[inline]
    pub(crate) fn entries(&self) -> Entries<'_, E> {
        Entries {
            slots: SetBits::new(self.occupancy()),
            elements: self.elements().iter(),
        }
    }

    /// Returns the element of a node whose only occupied slot is slot 0.
    ///
    /// Such a node at the top of the trie adds a level without adding any
    /// addressing information, so the root can drop it.
    #[inline]
    pub(crate) const fn sole_element_at_origin(&self) -> Option<&E> {
        match self {
            Self::One { slot: 0, element } => Some(element),
            _ => None,
        }
    }

    /// Overwrites the element at an occupied `slot`.
    ///
    /// Only legal on nodes that are still private to the running operation.
    pub(crate) fn set_in_place(&mut self, slot: u32, element: E) {
        let occupied = self.get_mut(slot);
        debug_assert!(occupied.is_some(), "slot {slot} is not occupied");
        if let Some(existing) = occupied {
            *existing = element;
        }
    }

    /// Short name of the representation, used by the tree printer.
    pub(crate) const fn kind_name(&self) -> &'static str {
        match self {
            Self::One { .. } => "OneNode",
            Self::Bitmap { .. } => "BitmapNode",
            Self::Full { .. } => "FullNode",
        }
    }
}

impl<E: Clone> Node<E> {
    /// Returns a copy with `element` added at the free `slot`.
    ///
    /// A `One` node becomes a `Bitmap` node; a `Bitmap` node with 31
    /// elements becomes a `Full` node.
    ///
    /// # Panics
    ///
    /// A `Full` node has no free slot; adding to one is a caller bug and
    /// panics.
    pub(crate) fn with_added(&self, slot: u32, element: E) -> Self {
        debug_assert!(self.get(slot).is_none(), "slot {slot} is already occupied");
        debug_assert!(!matches!(self, Self::Full { .. }), "cannot add slot {slot} to a full node");
        match self {
            Self::One {
                slot: occupied,
                element: existing,
            } => {
                let elements = if slot < *occupied {
                    vec![element, existing.clone()]
                } else {
                    vec![existing.clone(), element]
                };
                Self::Bitmap {
                    bitmap: (1 << *occupied) | (1 << slot),
                    elements: elements.into_boxed_slice(),
                }
            }
            Self::Bitmap { bitmap, elements } => {
                let index = population_count_below(*bitmap, slot);
                let mut added = Vec::with_capacity(elements.len() + 1);
                added.extend_from_slice(&elements[..index]);
                added.push(element);
                added.extend_from_slice(&elements[index..]);

                if added.len() == BRANCHING_FACTOR {
                    Self::Full {
                        elements: added.into_boxed_slice(),
                    }
                } else {
                    Self::Bitmap {
                        bitmap: bitmap | (1 << slot),
                        elements: added.into_boxed_slice(),
                    }
                }
            }
            Self::Full { .. } => unreachable!("cannot add slot {slot} to a full node"),
        }
    }

    /// Returns a copy of the same shape with the element at the occupied
    /// `slot` replaced.
    pub(crate) fn with_replaced(&self, slot: u32, element: E) -> Self {
        debug_assert!(self.get(slot).is_some(), "slot {slot} is not occupied");
        match self {
            Self::One { .. } => Self::One { slot, element },
            Self::Bitmap { bitmap, elements } => {
                let mut replaced = elements.clone();
                replaced[population_count_below(*bitmap, slot)] = element;
                Self::Bitmap {
                    bitmap: *bitmap,
                    elements: replaced,
                }
            }
            Self::Full { elements } => {
                let mut replaced = elements.clone();
                replaced[slot as usize] = element;
                Self::Full { elements: replaced }
            }
        }
    }

    /// Returns a copy without the element at the occupied `slot`, or `None`
    /// when that was the last element.
    ///
    /// A `Bitmap` node with two elements becomes a `One` node; a `Full` node
    /// becomes a `Bitmap` node.
    pub(crate) fn with_removed(&self, slot: u32) -> Option<Self> {
        debug_assert!(self.get(slot).is_some(), "slot {slot} is not occupied");
        match self {
            Self::One { .. } => None,
            Self::Bitmap { bitmap, elements } => {
                let bit = 1 << slot;
                let index = population_count_below(*bitmap, slot);
                let remaining_bitmap = bitmap ^ bit;

                if elements.len() == 2 {
                    Some(Self::One {
                        slot: remaining_bitmap.trailing_zeros(),
                        element: elements[1 - index].clone(),
                    })
                } else {
                    Some(Self::Bitmap {
                        bitmap: remaining_bitmap,
                        elements: Self::without_index(elements, index),
                    })
                }
            }
            Self::Full { elements } => Some(Self::Bitmap {
                bitmap: u32::MAX ^ (1 << slot),
                elements: Self::without_index(elements, slot as usize),
            }),
        }
    }

    fn without_index(elements: &[E], index: usize) -> Box<[E]> {
        elements[..index]
            .iter()
            .chain(&elements[index + 1..])
            .cloned()
            .collect()
    }

    /// Builds the smallest node holding `survivors`, whose slots are the set
    /// bits of `bitmap` in ascending order.
    ///
    /// Zero survivors yield `None`, one yields a `One` node and all 32 yield
    /// a `Full` node.
    pub(crate) fn from_survivors(
        bitmap: u32,
        mut survivors: ArrayVec<E, BRANCHING_FACTOR>,
    ) -> Option<Self> {
        debug_assert_eq!(bitmap.count_ones() as usize, survivors.len());
        match survivors.len() {
            0 => None,
            1 => survivors.pop().map(|element| Self::One {
                slot: bitmap.trailing_zeros(),
                element,
            }),
            BRANCHING_FACTOR => Some(Self::Full {
                elements: survivors.into_iter().collect(),
            }),
            _ => Some(Self::Bitmap {
                bitmap,
                elements: survivors.into_iter().collect(),
            }),
        }
    }

    /// Removes every element matching `predicate`.
    ///
    /// Returns `None` if nothing survives and the very same link if nothing
    /// was removed, so unchanged subtrees stay shared.
    pub(crate) fn remove_all_satisfying<P>(node: &Link<E>, predicate: &mut P) -> Option<Link<E>>
    where
        P: FnMut(&E) -> bool,
    {
        let survivor_bitmap = node
            .entries()
            .filter(|(_, element)| !predicate(*element))
            .fold(0u32, |bitmap, (slot, _)| bitmap | (1 << slot));

        if survivor_bitmap == node.occupancy() {
            return Some(ReferenceCounter::clone(node));
        }

        let survivors: ArrayVec<E, BRANCHING_FACTOR> = node
            .entries()
            .filter(|(slot, _)| survivor_bitmap & (1 << *slot) != 0)
            .map(|(_, element)| element.clone())
            .collect();
        Self::from_survivors(survivor_bitmap, survivors).map(ReferenceCounter::new)
    }
}

// =============================================================================
// Entries Iterator
// =============================================================================

/// Iterator over the `(slot, element)` pairs of a node.
pub(crate) struct Entries<'a, E> {
    slots: SetBits,
    elements: std::slice::Iter<'a, E>,
}

impl<'a, E> Iterator for Entries<'a, E> {
    type Item = (u32, &'a E);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        Some((self.slots.next()?, self.elements.next()?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.elements.size_hint()
    }
}

// =============================================================================
// Child Definition
// =============================================================================

/// Element type of every node above level 0.
///
/// Level-1 nodes hold `Leaf` links, higher levels hold `Branch` links.
pub(crate) enum Child<V> {
    /// A level-0 node whose elements are values.
    Leaf(Link<V>),
    /// A node one level further from the values.
    Branch(Link<Child<V>>),
}

impl<V> Clone for Child<V> {
    fn clone(&self) -> Self {
        match self {
            Self::Leaf(leaf) => Self::Leaf(ReferenceCounter::clone(leaf)),
            Self::Branch(branch) => Self::Branch(ReferenceCounter::clone(branch)),
        }
    }
}

/// The staging leaf that replaces a stale leaf still linked into the trie.
pub(crate) struct Shadow<'a, V> {
    /// Leaf object linked into the trie at the staging block.
    pub(crate) target: &'a Link<V>,
    /// Leaf holding the current contents of that block.
    pub(crate) staging: &'a Link<V>,
}

impl<V> Clone for Shadow<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Shadow<'_, V> {}

impl<'a, V> Shadow<'a, V> {
    /// Returns the leaf to read in place of `leaf`.
    #[inline]
    pub(crate) fn resolve(shadow: Option<Self>, leaf: &'a Link<V>) -> &'a Link<V> {
        match shadow {
            Some(shadow) if ReferenceCounter::ptr_eq(shadow.target, leaf) => shadow.staging,
            _ => leaf,
        }
    }
}

impl<V> Child<V> {
    /// Returns `true` if both children are the same shared node.
    #[inline]
    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Leaf(left), Self::Leaf(right)) => ReferenceCounter::ptr_eq(left, right),
            (Self::Branch(left), Self::Branch(right)) => ReferenceCounter::ptr_eq(left, right),
            _ => false,
        }
    }

    /// Counts the values stored below this child.
    pub(crate) fn count_values(&self) -> usize {
        match self {
            Self::Leaf(leaf) => leaf.len(),
            Self::Branch(branch) => branch.elements().iter().map(Self::count_values).sum(),
        }
    }

    /// Calls `visitor` with every key and value below this child.
    ///
    /// `level` is the level of the node this child points to and `prefix`
    /// holds the key bits above it. A leaf matching the shadow target is
    /// replaced by the staging leaf.
    pub(crate) fn visit<'a, F>(&'a self, level: usize, prefix: u32, shadow: Option<Shadow<'a, V>>, visitor: &mut F)
    where
        F: FnMut(i32, &'a V),
    {
        match self {
            Self::Leaf(leaf) => {
                debug_assert_eq!(level, 0);
                for (slot, value) in Shadow::resolve(shadow, leaf).entries() {
                    visitor((prefix | slot).cast_signed(), value);
                }
            }
            Self::Branch(branch) => {
                let shift = level as u32 * BITS_PER_LEVEL;
                for (slot, child) in branch.entries() {
                    child.visit(level - 1, prefix | (slot << shift), shadow, visitor);
                }
            }
        }
    }

    /// Writes one line per occupied slot below this child, indented by depth.
    pub(crate) fn write_tree<W>(&self, out: &mut W, depth: usize, target: Option<&Link<V>>) -> fmt::Result
    where
        W: fmt::Write,
        V: fmt::Display,
    {
        match self {
            Self::Leaf(leaf) => {
                for (slot, value) in leaf.entries() {
                    writeln!(out, "{:indent$}{slot:2}: value={value}", "", indent = depth * 4)?;
                }
            }
            Self::Branch(branch) => {
                for (slot, child) in branch.entries() {
                    write!(out, "{:indent$}{slot:2}: ", "", indent = depth * 4)?;
                    child.write_node_info(out, target)?;
                    writeln!(out)?;
                    child.write_tree(out, depth + 1, target)?;
                }
            }
        }
        Ok(())
    }

    /// Writes the representation name, marking the shadowed leaf.
    pub(crate) fn write_node_info<W: fmt::Write>(&self, out: &mut W, target: Option<&Link<V>>) -> fmt::Result {
        match self {
            Self::Leaf(leaf) => {
                out.write_str(leaf.kind_name())?;
                if target.is_some_and(|target| ReferenceCounter::ptr_eq(target, leaf)) {
                    out.write_str(" (target)")?;
                }
                Ok(())
            }
            Self::Branch(branch) => out.write_str(branch.kind_name()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
