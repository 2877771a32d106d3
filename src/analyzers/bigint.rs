//! Filepath: src/analyzers/bigint.rs
//!
//! Arbitrary-precision integer key analyzer.

use std::cmp::Ordering;

use num_bigint::BigUint;

use crate::analyzer::{DiffBit, KeyAnalyzer};

// ============================================================================
//  BigUintKeyAnalyzer
// ============================================================================

/// Analyzer for [`BigUint`] keys.
///
/// Bit order is defined explicitly: bit 0 is the least significant bit of
/// the magnitude, so the trie discriminates on low bits first. A prefix
/// over the first `n` bits therefore selects all keys sharing the same `n`
/// low-order bits (e.g. a one-bit prefix of `1` selects the odd keys).
///
/// `compare` follows the same order — the lowest differing bit decides —
/// so iteration order and `compare` agree. Zero has no set bits and reports
/// [`DiffBit::AllZero`]; it is stored at the trie root.
///
/// Offsets handed to [`bit_index`] must be 0.
///
/// # Panics
///
/// [`bit_index`] panics when either offset is nonzero.
///
/// [`bit_index`]: KeyAnalyzer::bit_index
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BigUintKeyAnalyzer;

impl KeyAnalyzer<BigUint> for BigUintKeyAnalyzer {
    fn length_in_bits(&self, key: &BigUint) -> usize {
        key.bits() as usize
    }

    fn bits_per_element(&self) -> usize {
        1
    }

    fn is_bit_set(&self, key: &BigUint, bit_index: usize, length_in_bits: usize) -> bool {
        bit_index < length_in_bits && key.bit(bit_index as u64)
    }

    fn bit_index(
        &self,
        key: &BigUint,
        offset: usize,
        _length: usize,
        other: Option<&BigUint>,
        other_offset: usize,
        _other_length: usize,
    ) -> DiffBit {
        assert!(
            offset == 0 && other_offset == 0,
            "offsets must be 0 for integer keys"
        );

        if key.bits() == 0 {
            return DiffBit::AllZero;
        }

        let x = match other {
            Some(o) => key ^ o,

            None => key.clone(),
        };

        match x.trailing_zeros() {
            Some(i) => DiffBit::At(i as usize),

            // No set bit in the xor: the keys are identical.
            None => DiffBit::Equal,
        }
    }

    fn compare(&self, a: &BigUint, b: &BigUint) -> Ordering {
        let x = a ^ b;

        match x.trailing_zeros() {
            None => Ordering::Equal,

            Some(i) => {
                if a.bit(i) {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
        }
    }

    fn is_prefix(&self, prefix: &BigUint, offset: usize, length: usize, key: &BigUint) -> bool {
        let prefix_bits = self.length_in_bits(prefix);
        let key_bits = self.length_in_bits(key);

        (0..length).all(|i| {
            self.is_bit_set(prefix, offset + i, prefix_bits) == self.is_bit_set(key, i, key_bits)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use num_bigint::BigUint;

    use super::BigUintKeyAnalyzer;
    use crate::analyzer::{DiffBit, KeyAnalyzer};

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn test_lsb_first_layout() {
        let a = BigUintKeyAnalyzer;

        assert!(a.is_bit_set(&big(1), 0, 1));
        assert!(!a.is_bit_set(&big(2), 0, 2));
        assert!(a.is_bit_set(&big(2), 1, 2));
        // Past the declared length reads zero.
        assert!(!a.is_bit_set(&big(5), 3, 3));
    }

    #[test]
    fn test_zero_is_all_zero() {
        let a = BigUintKeyAnalyzer;

        assert_eq!(a.length_in_bits(&big(0)), 0);
        assert_eq!(a.bit_index(&big(0), 0, 0, Some(&big(9)), 0, 4), DiffBit::AllZero);
    }

    #[test]
    fn test_first_difference_is_lowest_bit() {
        let a = BigUintKeyAnalyzer;

        // 6 = 110, 5 = 101: xor = 011, lowest differing bit is 0.
        assert_eq!(a.bit_index(&big(6), 0, 3, Some(&big(5)), 0, 3), DiffBit::At(0));
        assert_eq!(a.bit_index(&big(4), 0, 3, Some(&big(12)), 0, 4), DiffBit::At(3));
        assert_eq!(a.bit_index(&big(7), 0, 3, Some(&big(7)), 0, 3), DiffBit::Equal);
    }

    #[test]
    fn test_compare_matches_bit_order() {
        let a = BigUintKeyAnalyzer;

        // 5 = 101 and 3 = 011 first differ at bit 1, where 3 has the bit.
        assert_eq!(a.compare(&big(5), &big(3)), Ordering::Less);
        assert_eq!(a.compare(&big(3), &big(5)), Ordering::Greater);
        assert_eq!(a.compare(&big(8), &big(8)), Ordering::Equal);
        // Even vs odd: bit 0 decides.
        assert_eq!(a.compare(&big(2), &big(1)), Ordering::Less);
    }

    #[test]
    fn test_odd_prefix() {
        let a = BigUintKeyAnalyzer;
        let one = big(1);

        for n in [1u64, 3, 5, 7, 19] {
            assert!(a.is_prefix(&one, 0, 1, &big(n)), "{n} is odd");
        }

        for n in [0u64, 2, 4, 18] {
            assert!(!a.is_prefix(&one, 0, 1, &big(n)), "{n} is even");
        }
    }
}
