//! Bit-level helpers for addressing the 32-way integer trie.
//!
//! A key is split into 5-bit groups. Level 0 addresses bits `[0, 5)`,
//! level `L` addresses bits `[5L, 5L + 5)`, so a 32-bit key needs at most
//! seven levels (`0..=6`); the group at level 6 only has two significant bits.
//!
//! All helpers are pure and branch-light. The two De Bruijn tables give a
//! constant-time bit position without looping over the bitmap.

// =============================================================================
// Constants
// =============================================================================

/// Bits consumed per trie level.
pub const BITS_PER_LEVEL: u32 = 5;

/// Number of slots in a node (2^5 = 32).
pub const BRANCHING_FACTOR: usize = 32;

/// Mask extracting a slot index from a shifted key.
pub const SLOT_MASK: u32 = 0x1f;

/// Highest level a 32-bit key can require.
pub const MAX_LEVEL: usize = 6;

/// Bit position of an isolated bit, indexed by `(bit * 0x077C_B531) >> 27`.
const TRAILING_BIT_POSITION: [u8; 32] = [
    0, 1, 28, 2, 29, 14, 24, 3, 30, 22, 20, 15, 25, 17, 4, 8, 31, 27, 13, 23, 21, 19, 16, 7, 26,
    12, 18, 6, 11, 5, 10, 9,
];

/// Trie level of the highest set bit, indexed by `(smeared * 0x07C4_ACDD) >> 27`.
///
/// This is the classic integer log2 table with every entry divided by
/// [`BITS_PER_LEVEL`].
const LEADING_BIT_LEVEL: [u8; 32] = [
    0, 1, 0, 2, 2, 4, 0, 5, 2, 2, 3, 3, 4, 5, 0, 6, 1, 2, 4, 5, 3, 3, 4, 1, 3, 5, 4, 1, 5, 1, 0, 6,
];

static_assertions::const_assert_eq!(BRANCHING_FACTOR, 1 << BITS_PER_LEVEL);
static_assertions::const_assert_eq!(SLOT_MASK as usize, BRANCHING_FACTOR - 1);

// =============================================================================
// Bitmap helpers
// =============================================================================

/// Returns the number of set bits in `bitmap` strictly below `slot`.
///
/// For a bitmap node this is the storage index of `slot`.
#[inline]
#[must_use]
pub const fn population_count_below(bitmap: u32, slot: u32) -> usize {
    (bitmap & ((1u32 << slot).wrapping_sub(1))).count_ones() as usize
}

/// Returns the slot of the `n`-th (zero based) set bit in `bitmap`.
///
/// Inverse of [`population_count_below`]: for a bitmap node this maps a
/// storage index back to its logical slot. `bitmap` must have more than `n`
/// bits set.
#[inline]
#[must_use]
pub fn nth_set_bit_position(bitmap: u32, n: usize) -> u32 {
    debug_assert!(
        (bitmap.count_ones() as usize) > n,
        "bitmap {bitmap:#034b} has no set bit with index {n}"
    );
    let mut remaining = bitmap;
    for _ in 0..n {
        remaining &= remaining.wrapping_sub(1);
    }
    lowest_set_bit_position(remaining)
}

/// Returns the position of the lowest set bit of a non-zero value.
#[inline]
const fn lowest_set_bit_position(value: u32) -> u32 {
    let isolated = value & value.wrapping_neg();
    TRAILING_BIT_POSITION[(isolated.wrapping_mul(0x077C_B531) >> 27) as usize] as u32
}

/// Returns the smallest root level whose trie can address `key`.
///
/// `0` for keys below 32, `6` for keys with bit 30 or 31 set.
#[inline]
#[must_use]
pub const fn minimum_level_for_key(key: u32) -> usize {
    let mut smeared = key;
    smeared |= smeared >> 1;
    smeared |= smeared >> 2;
    smeared |= smeared >> 4;
    smeared |= smeared >> 8;
    smeared |= smeared >> 16;
    LEADING_BIT_LEVEL[(smeared.wrapping_mul(0x07C4_ACDD) >> 27) as usize] as usize
}

// =============================================================================
// Key helpers
// =============================================================================

/// Returns the slot `key` routes through at `level`.
#[inline]
#[must_use]
pub const fn slot_at(key: u32, level: usize) -> u32 {
    (key >> (level as u32 * BITS_PER_LEVEL)) & SLOT_MASK
}

/// Returns the identifier of the 32-key block containing `key`.
///
/// Never zero, so zero is free to mean "no block".
#[inline]
#[must_use]
pub const fn block_mask(key: u32) -> u32 {
    key | SLOT_MASK
}

/// Renders `key` together with its slot path, highest level first.
///
/// # Examples
///
/// ```rust
/// use persistent_intmap::persistent::bit_index::describe_key;
///
/// assert_eq!(describe_key(33), "33 (0x21) => 1.1");
/// assert_eq!(describe_key(7), "7 (0x7) => 7");
/// ```
#[must_use]
pub fn describe_key(key: i32) -> String {
    let bits = key.cast_unsigned();
    let path: Vec<String> = (0..=minimum_level_for_key(bits))
        .rev()
        .map(|level| slot_at(bits, level).to_string())
        .collect();
    format!("{key} ({bits:#x}) => {}", path.join("."))
}

// =============================================================================
// SetBits
// =============================================================================

/// Iterator over the positions of the set bits of a bitmap, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetBits(u32);

impl SetBits {
    /// Creates an iterator over the set bits of `bitmap`.
    #[inline]
    #[must_use]
    pub const fn new(bitmap: u32) -> Self {
        Self(bitmap)
    }
}

impl Iterator for SetBits {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            return None;
        }
        let position = lowest_set_bit_position(self.0);
        self.0 &= self.0 - 1;
        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.0.count_ones() as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SetBits {}

impl std::iter::FusedIterator for SetBits {}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0b0000, 0, 0)]
    #[case(0b1011, 0, 0)]
    #[case(0b1011, 1, 1)]
    #[case(0b1011, 3, 2)]
    #[case(0b1011, 4, 3)]
    #[case(u32::MAX, 31, 31)]
    #[case(u32::MAX, 0, 0)]
    fn test_population_count_below(#[case] bitmap: u32, #[case] slot: u32, #[case] expected: usize) {
        assert_eq!(population_count_below(bitmap, slot), expected);
    }

    #[rstest]
    #[case(0b1, 0, 0)]
    #[case(0b1010_0100, 0, 2)]
    #[case(0b1010_0100, 1, 5)]
    #[case(0b1010_0100, 2, 7)]
    #[case(0x8000_0001, 1, 31)]
    #[case(u32::MAX, 30, 30)]
    #[case(u32::MAX, 31, 31)]
    fn test_nth_set_bit_position(#[case] bitmap: u32, #[case] n: usize, #[case] expected: u32) {
        assert_eq!(nth_set_bit_position(bitmap, n), expected);
    }

    #[rstest]
    fn test_nth_set_bit_position_inverts_population_count() {
        let bitmaps = [0x8000_0001_u32, 0xdead_beef, 0x0f0f_0f0f, u32::MAX, 0x4000_0000];
        for bitmap in bitmaps {
            for (storage_index, slot) in SetBits::new(bitmap).enumerate() {
                assert_eq!(nth_set_bit_position(bitmap, storage_index), slot);
                assert_eq!(population_count_below(bitmap, slot), storage_index);
            }
        }
    }

    #[rstest]
    #[case(0, 0)]
    #[case(31, 0)]
    #[case(32, 1)]
    #[case(1023, 1)]
    #[case(1024, 2)]
    #[case(1 << 15, 3)]
    #[case(1 << 20, 4)]
    #[case(1 << 25, 5)]
    #[case((1 << 30) - 1, 5)]
    #[case(1 << 30, 6)]
    #[case(u32::MAX, 6)]
    fn test_minimum_level_for_key(#[case] key: u32, #[case] expected: usize) {
        assert_eq!(minimum_level_for_key(key), expected);
    }

    #[rstest]
    fn test_minimum_level_for_key_matches_leading_zeros() {
        for bit in 0..32 {
            let single = 1u32 << bit;
            let filled = single | (single - 1);
            let expected = ((31 - single.leading_zeros()) / BITS_PER_LEVEL) as usize;
            assert_eq!(minimum_level_for_key(single), expected);
            assert_eq!(minimum_level_for_key(filled), expected);
        }
    }

    #[rstest]
    fn test_slot_at_splits_key_into_groups() {
        let key = (3 << 30) | (17 << 25) | (9 << 5) | 4;
        assert_eq!(slot_at(key, 0), 4);
        assert_eq!(slot_at(key, 1), 9);
        assert_eq!(slot_at(key, 2), 0);
        assert_eq!(slot_at(key, 5), 17);
        assert_eq!(slot_at(key, 6), 3);
    }

    #[rstest]
    fn test_block_mask_identifies_block() {
        assert_eq!(block_mask(0), 0x1f);
        assert_eq!(block_mask(31), 0x1f);
        assert_eq!(block_mask(32), 0x3f);
        assert_ne!(block_mask(31), block_mask(32));
        assert_eq!(block_mask(u32::MAX), u32::MAX);
    }

    #[rstest]
    #[case(0, "0 (0x0) => 0")]
    #[case(33, "33 (0x21) => 1.1")]
    #[case(1024, "1024 (0x400) => 1.0.0")]
    #[case(-1, "-1 (0xffffffff) => 3.31.31.31.31.31.31")]
    fn test_describe_key(#[case] key: i32, #[case] expected: &str) {
        assert_eq!(describe_key(key), expected);
    }

    #[rstest]
    fn test_set_bits_yields_positions_in_order() {
        let positions: Vec<u32> = SetBits::new(0x8000_0105).collect();
        assert_eq!(positions, vec![0, 2, 8, 31]);
        assert_eq!(SetBits::new(0).next(), None);
        assert_eq!(SetBits::new(0xff).len(), 8);
    }
}
