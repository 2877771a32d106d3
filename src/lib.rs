//! # PATRICIA Trie
//!
//! An ordered map keyed by arbitrary bit strings, implemented as a PATRICIA
//! trie (Practical Algorithm To Retrieve Information Coded In Alphanumeric).
//!
//! Every node stores a key; there are no empty internal nodes. Branching is
//! governed by a single discriminating bit per node, and descent terminates
//! by following "uplink" edges that point back at an ancestor. All
//! operations run in O(K) where K is the bit length of the largest key in
//! the trie.
//!
//! Beyond the usual ordered-map surface the trie supports operations a
//! comparison-based map cannot express:
//!
//! - [`PatriciaTrie::select`]: the stored entry closest to a query key under
//!   a bitwise XOR metric.
//! - [`PatriciaTrie::prefix_view`]: a live sub-mapping of the entries whose
//!   key bits match a prefix over a given bit range.
//! - [`PatriciaTrie::traverse`]: cursor-driven traversal where the caller
//!   decides, per entry, whether to continue, stop, remove and continue, or
//!   remove and stop.
//!
//! Bit-level key inspection is delegated to a [`KeyAnalyzer`], a stateless
//! capability implemented per key type. Reference analyzers for byte
//! arrays, strings (UTF-16 code units), fixed-width integers and
//! arbitrary-precision integers live in [`analyzers`].
//!
//! ## Example
//!
//! ```rust
//! use patricia_trie::{PatriciaTrie, analyzers::BytesKeyAnalyzer};
//!
//! let mut trie = PatriciaTrie::new(BytesKeyAnalyzer);
//! trie.insert(vec![0x01], "one");
//! trie.insert(vec![0x80], "high");
//!
//! assert_eq!(trie.get(&vec![0x01]), Some(&"one"));
//!
//! // Entries iterate in lexicographic bit order.
//! let keys: Vec<_> = trie.keys().cloned().collect();
//! assert_eq!(keys, vec![vec![0x01], vec![0x80]]);
//! ```
//!
//! ## Concurrency
//!
//! The trie is a single-owner mutable structure. It never blocks, never
//! spawns and performs no I/O; sharing across threads requires external
//! synchronization.

pub mod analyzer;
pub mod analyzers;
pub mod cursor;
pub mod node;
pub mod trie;

mod tracing_helpers;

pub use crate::analyzer::{DiffBit, KeyAnalyzer};
pub use crate::cursor::Decision;
pub use crate::trie::iter::{Iter, Keys, Values};
pub use crate::trie::prefix::PrefixView;
pub use crate::trie::range::RangeView;
pub use crate::trie::{CursorError, PatriciaTrie, Selected, ViewError};
