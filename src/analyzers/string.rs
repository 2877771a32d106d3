//! Filepath: src/analyzers/string.rs
//!
//! String key analyzer over UTF-16 code units.

use std::cmp::Ordering;

use crate::analyzer::{DiffBit, KeyAnalyzer};

/// Width of a UTF-16 code unit in bits.
const UNIT_BITS: usize = 16;

/// Mask with only the `bit`-th bit of a code unit set, counting from the
/// MSB.
#[inline]
const fn mask(bit: usize) -> u16 {
    0x8000 >> bit
}

/// Number of UTF-16 code units in `key`.
fn unit_len(key: &str) -> usize {
    if key.is_ascii() {
        key.len()
    } else {
        key.encode_utf16().count()
    }
}

/// The `index`-th UTF-16 code unit of `key`, or 0 past the end.
///
/// ASCII strings are indexed directly; for anything else the unit is found
/// by walking the UTF-8 encoding, so bit access is O(n) there.
fn unit_at(key: &str, index: usize) -> u16 {
    if key.is_ascii() {
        key.as_bytes().get(index).copied().map_or(0, u16::from)
    } else {
        key.encode_utf16().nth(index).unwrap_or(0)
    }
}

/// Panic unless `value` sits on a 16-bit boundary.
fn check_aligned(what: &str, value: usize) {
    assert!(
        value % UNIT_BITS == 0,
        "string keys are addressed in 16-bit code units: {what} = {value} is not on a unit boundary"
    );
}

// ============================================================================
//  StringKeyAnalyzer
// ============================================================================

/// Analyzer for `String` keys addressed as UTF-16 code units, 16 bits per
/// element, most significant bit first within each unit.
///
/// Offsets and lengths handed to [`bit_index`] and [`is_prefix`] must be
/// multiples of 16.
///
/// `compare` orders by code units (not by Rust's native byte order), so it
/// stays consistent with the induced bit order for supplementary-plane
/// text.
///
/// # Panics
///
/// [`bit_index`] and [`is_prefix`] panic when an offset or length is not on
/// a 16-bit boundary.
///
/// [`bit_index`]: KeyAnalyzer::bit_index
/// [`is_prefix`]: KeyAnalyzer::is_prefix
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StringKeyAnalyzer;

impl KeyAnalyzer<String> for StringKeyAnalyzer {
    fn length_in_bits(&self, key: &String) -> usize {
        unit_len(key) * UNIT_BITS
    }

    fn bits_per_element(&self) -> usize {
        UNIT_BITS
    }

    fn is_bit_set(&self, key: &String, bit_index: usize, length_in_bits: usize) -> bool {
        if bit_index >= length_in_bits {
            return false;
        }

        let unit = unit_at(key, bit_index / UNIT_BITS);
        unit & mask(bit_index % UNIT_BITS) != 0
    }

    fn bit_index(
        &self,
        key: &String,
        offset: usize,
        length: usize,
        other: Option<&String>,
        other_offset: usize,
        other_length: usize,
    ) -> DiffBit {
        check_aligned("offset", offset);
        check_aligned("length", length);
        check_aligned("other_offset", other_offset);
        check_aligned("other_length", other_length);

        let off1 = offset / UNIT_BITS;
        let off2 = other_offset / UNIT_BITS;
        let n1 = length / UNIT_BITS;
        let n2 = other_length / UNIT_BITS;

        if (0..n1).all(|i| unit_at(key, off1 + i) == 0) {
            return DiffBit::AllZero;
        }

        for i in 0..n1.max(n2) {
            let k = if i < n1 { unit_at(key, off1 + i) } else { 0 };
            let f = match other {
                Some(o) if i < n2 => unit_at(o, off2 + i),

                _ => 0,
            };

            if k != f {
                let x = k ^ f;
                return DiffBit::At(i * UNIT_BITS + x.leading_zeros() as usize);
            }
        }

        DiffBit::Equal
    }

    fn compare(&self, a: &String, b: &String) -> Ordering {
        a.encode_utf16().cmp(b.encode_utf16())
    }

    fn is_prefix(&self, prefix: &String, offset: usize, length: usize, key: &String) -> bool {
        check_aligned("offset", offset);
        check_aligned("length", length);

        let off = offset / UNIT_BITS;
        let n = length / UNIT_BITS;
        let key_units = unit_len(key);

        (0..n).all(|i| {
            let p = unit_at(prefix, off + i);
            let k = if i < key_units { unit_at(key, i) } else { 0 };
            p == k
        })
    }
}
