//! Pull-based iteration over the values of a [`PersistentIntMap`].
//!
//! The iterator walks the trie with an explicit stack of branch cursors.
//! The trie is at most seven levels tall, so the stack lives inline in an
//! [`ArrayVec`] and iteration never allocates.
//!
//! [`PersistentIntMap`]: super::PersistentIntMap

use std::iter::FusedIterator;

use arrayvec::ArrayVec;

use super::bit_index::MAX_LEVEL;
use super::node::{Child, Entries, Shadow};

/// An iterator over the values of a [`PersistentIntMap`].
///
/// Values are produced in trie order. The iterator knows its exact length
/// up front.
///
/// [`PersistentIntMap`]: super::PersistentIntMap
///
/// # Examples
///
/// ```rust
/// use persistent_intmap::persistent::PersistentIntMap;
///
/// let map = PersistentIntMap::new().insert(1, 'a').insert(100, 'b');
/// let mut iterator = map.iter();
/// assert_eq!(iterator.len(), 2);
/// assert!(iterator.next().is_some());
/// assert!(iterator.next().is_some());
/// assert_eq!(iterator.next(), None);
/// ```
pub struct PersistentIntMapIterator<'a, V> {
    /// Cursors over the branches between the root and the current leaf
    branches: ArrayVec<Entries<'a, Child<V>>, MAX_LEVEL>,
    /// Remaining values of the current leaf
    values: std::slice::Iter<'a, V>,
    /// Staging leaf read in place of its stale target
    shadow: Option<Shadow<'a, V>>,
    /// Values not yet yielded
    remaining: usize,
}

impl<'a, V> PersistentIntMapIterator<'a, V> {
    pub(crate) fn new(root: Option<&'a Child<V>>, shadow: Option<Shadow<'a, V>>, size: usize) -> Self {
        let mut iterator = Self {
            branches: ArrayVec::new(),
            values: std::slice::Iter::default(),
            shadow,
            remaining: size,
        };
        if let Some(root) = root {
            iterator.enter(root);
        }
        iterator
    }

    fn enter(&mut self, child: &'a Child<V>) {
        match child {
            Child::Leaf(leaf) => {
                self.values = Shadow::resolve(self.shadow, leaf).elements().iter();
            }
            Child::Branch(branch) => self.branches.push(branch.entries()),
        }
    }
}

impl<'a, V> Iterator for PersistentIntMapIterator<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.values.next() {
                self.remaining = self.remaining.saturating_sub(1);
                return Some(value);
            }
            let cursor = self.branches.last_mut()?;
            match cursor.next() {
                Some((_, child)) => self.enter(child),
                None => {
                    self.branches.pop();
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for PersistentIntMapIterator<'_, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<V> FusedIterator for PersistentIntMapIterator<'_, V> {}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::persistent::PersistentIntMap;
    use rstest::rstest;

    #[rstest]
    fn test_empty_map_iterates_nothing() {
        let map: PersistentIntMap<i32> = PersistentIntMap::new();
        let mut iterator = map.iter();
        assert_eq!(iterator.len(), 0);
        assert_eq!(iterator.next(), None);
        assert_eq!(iterator.next(), None);
    }

    #[rstest]
    fn test_iterator_counts_down() {
        let map: PersistentIntMap<i32> = (0..50).map(|key| (key * 7, key)).collect();
        let mut iterator = map.iter();
        assert_eq!(iterator.size_hint(), (50, Some(50)));
        iterator.next();
        iterator.next();
        assert_eq!(iterator.len(), 48);
        assert_eq!(iterator.count(), 48);
    }

    #[rstest]
    fn test_iterator_visits_every_value_once() {
        let keys = [0, 31, 32, 1023, 1024, 1 << 20, i32::MAX, -1, i32::MIN];
        let map: PersistentIntMap<i32> = keys.iter().map(|&key| (key, key)).collect();

        let mut seen: Vec<i32> = map.iter().copied().collect();
        seen.sort_unstable();
        let mut expected = keys.to_vec();
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[rstest]
    fn test_iterator_reads_diverged_staging_leaf() {
        let map = PersistentIntMap::new()
            .insert(5000, 'a')
            .insert(1, 'b')
            .insert(2, 'c')
            .insert(3, 'd');

        let mut seen: Vec<char> = map.iter().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, vec!['a', 'b', 'c', 'd']);
    }

    #[rstest]
    fn test_iterator_is_fused() {
        let map = PersistentIntMap::singleton(9, 9);
        let mut iterator = map.iter();
        assert_eq!(iterator.next(), Some(&9));
        assert_eq!(iterator.next(), None);
        assert_eq!(iterator.next(), None);
        assert_eq!(iterator.len(), 0);
    }

    #[rstest]
    fn test_into_iterator_for_reference() {
        let map: PersistentIntMap<u64> = (0..10).map(|key| (key, 1)).collect();
        let mut total = 0;
        for value in &map {
            total += value;
        }
        assert_eq!(total, 10);
    }
}
