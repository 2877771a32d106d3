//! Filepath: src/trie.rs
//!
//! The PATRICIA trie core: insertion, lookup, removal, XOR-metric
//! selection, cursor traversal and the ordered-neighbor operations.
//!
//! # Structure
//!
//! Nodes live in an index-addressed arena ([`crate::node`]). The root is a
//! sentinel that discriminates on no bit; its sole child hangs off its left
//! slot, and it stores a key only when a zero-bit or all-zero-bit key is
//! inserted. Every edge whose target discriminates on a bit index less
//! than or equal to its source is an *uplink* back at an ancestor (or a
//! self-loop); descent terminates by traversing an uplink, and the uplink
//! target is the nearest stored neighbor of the query by tested bits.

use std::cmp::Ordering;
use std::fmt as StdFmt;

use crate::analyzer::{DiffBit, KeyAnalyzer};
use crate::cursor::Decision;
use crate::node::{Arena, BitIndex, NodeId};
use crate::tracing_helpers::{debug_log, trace_log};

pub mod iter;
pub mod prefix;
pub mod range;

use prefix::PrefixView;
use range::RangeView;

// ============================================================================
//  Errors
// ============================================================================

/// Errors raised when constructing or writing through a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewError {
    /// A prefix view was requested over bits the prefix key does not have.
    OffsetOutOfRange {
        /// Requested starting bit.
        offset: usize,
        /// Requested bit count.
        length: usize,
        /// Bits actually available in the prefix key.
        key_bits: usize,
    },

    /// A range view needs at least one endpoint.
    MissingBounds,

    /// The lower endpoint of a range view sorts above the upper one.
    InvertedBounds,

    /// An insert through a view used a key outside the view's bounds.
    KeyOutsideView,
}

impl StdFmt::Display for ViewError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::OffsetOutOfRange {
                offset,
                length,
                key_bits,
            } => write!(
                f,
                "prefix range {offset}+{length} exceeds the key's {key_bits} bits"
            ),

            Self::MissingBounds => write!(f, "a range view needs at least one endpoint"),

            Self::InvertedBounds => write!(f, "range lower bound sorts above its upper bound"),

            Self::KeyOutsideView => write!(f, "key lies outside the view's bounds"),
        }
    }
}

impl std::error::Error for ViewError {}

/// Errors raised by cursor-driven operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorError {
    /// The cursor returned [`Decision::Remove`] during an XOR-metric
    /// selection, which is read-only. Use
    /// [`PatriciaTrie::traverse`] to remove while walking.
    RemoveDuringSelect,
}

impl StdFmt::Display for CursorError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::RemoveDuringSelect => write!(f, "cannot remove entries during select"),
        }
    }
}

impl std::error::Error for CursorError {}

// ============================================================================
//  Selected
// ============================================================================

/// Outcome of a cursor-driven operation that ended on an entry.
#[derive(Debug)]
pub enum Selected<'a, K, V> {
    /// The cursor exited on this live entry.
    Found(&'a K, &'a V),

    /// The cursor removed this entry and exited; the pair is handed back
    /// by value.
    Removed(K, V),
}

impl<K, V> Selected<'_, K, V> {
    /// The key of the selected entry.
    #[must_use]
    pub fn key(&self) -> &K {
        match self {
            Self::Found(k, _) => k,

            Self::Removed(k, _) => k,
        }
    }

    /// The value of the selected entry.
    #[must_use]
    pub fn value(&self) -> &V {
        match self {
            Self::Found(_, v) => v,

            Self::Removed(_, v) => v,
        }
    }
}

/// Cursor outcome while the structure is still borrowed mutably.
enum RawSelected<K, V> {
    Live(NodeId),
    Removed(K, V),
}

// ============================================================================
//  PatriciaTrie
// ============================================================================

/// An ordered map from bit-string keys to values.
///
/// All bit-level decisions are delegated to the [`KeyAnalyzer`] the trie
/// was built with; the analyzer's `compare` is the map's ordering.
///
/// # Example
///
/// ```rust
/// use patricia_trie::{PatriciaTrie, analyzers::StringKeyAnalyzer};
///
/// let mut trie = PatriciaTrie::new(StringKeyAnalyzer);
/// for name in ["Anna", "Alex", "Emma"] {
///     trie.insert(String::from(name), name.len());
/// }
///
/// assert_eq!(trie.len(), 3);
/// assert_eq!(trie.get(&String::from("Alex")), Some(&4));
///
/// // Proximity selection under the XOR metric:
/// let (key, _) = trie.select(&String::from("Al")).unwrap();
/// assert_eq!(key, "Alex");
/// ```
pub struct PatriciaTrie<K, V, A> {
    pub(crate) arena: Arena<K, V>,
    pub(crate) root: NodeId,
    pub(crate) size: usize,
    pub(crate) mod_count: u64,
    pub(crate) analyzer: A,
}

impl<K, V, A> PatriciaTrie<K, V, A>
where
    A: KeyAnalyzer<K>,
{
    /// An empty trie using the given analyzer.
    #[must_use]
    pub fn new(analyzer: A) -> Self {
        Self {
            arena: Arena::with_root(),
            root: NodeId::ROOT,
            size: 0,
            mod_count: 0,
            analyzer,
        }
    }

    /// The analyzer this trie consults for every bit-level decision. Its
    /// `compare` is the map's ordering.
    #[inline]
    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    /// Number of stored entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the trie stores no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    // ------------------------------------------------------------------
    //  Insertion
    // ------------------------------------------------------------------

    /// Insert a key/value pair, returning the previous value stored under
    /// a bit-equal key.
    ///
    /// Keys whose meaningful bits are all zero (including zero-length
    /// keys) are stored at the root sentinel; keys that are bit-equal up
    /// to trailing zero bits collapse into a single entry, which takes the
    /// most recently inserted key.
    ///
    /// # Panics
    ///
    /// Panics if the analyzer reports a discriminating-bit result that is
    /// impossible for a well-behaved analyzer (e.g. `Equal` against the
    /// empty root, or an out-of-bounds sentinel for an accepted key).
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let length_in_bits = self.analyzer.length_in_bits(&key);

        // The only place to store a zero-bit key is the root.
        if length_in_bits == 0 {
            return self.store_at_root(key, value);
        }

        let found = self.nearest(&key, length_in_bits);
        if self.key_matches(found, &key) {
            self.increment_mod_count();
            return self.arena[found].set_key_value(Some(key), Some(value));
        }

        let diff = self.diff_with_node(&key, length_in_bits, found);
        match diff {
            DiffBit::At(bit) => {
                let id = self.arena.alloc(Some(key), Some(value), bit_of(bit));
                self.add_entry(id, length_in_bits);
                self.increment_size();
                trace_log!(bit, size = self.size, "trie: entry spliced");
                None
            }

            DiffBit::AllZero => self.store_at_root(key, value),

            DiffBit::Equal => {
                // Bit-equal but not compare-equal: the keys differ only in
                // trailing zero bits and collapse into one entry, which
                // takes the newly inserted key.
                if found != self.root {
                    self.increment_mod_count();
                    return self.arena[found].set_key_value(Some(key), Some(value));
                }

                panic!("key analyzer reported EQUAL against the empty root")
            }

            DiffBit::OutOfBounds => {
                panic!("key analyzer rejected an accepted {length_in_bits}-bit key as out of bounds")
            }
        }
    }

    /// Store (or replace) the root sentinel's key/value.
    fn store_at_root(&mut self, key: K, value: V) -> Option<V> {
        if self.arena[self.root].is_empty() {
            self.increment_size();
        } else {
            self.increment_mod_count();
        }

        let root = self.root;
        self.arena[root].set_key_value(Some(key), Some(value))
    }

    /// Splice a freshly allocated node into the tree.
    ///
    /// Descends until it would overshoot the new node's discriminating bit
    /// or traverse an uplink; at that point the new node absorbs the
    /// displaced subtree on one side and self-loops on the other, forming
    /// the uplink it owns.
    fn add_entry(&mut self, to_add: NodeId, length_in_bits: usize) {
        let mut current = self.arena[self.root].left;
        let mut path = self.root;

        loop {
            if self.arena[current].bit_index >= self.arena[to_add].bit_index
                || self.arena[current].bit_index <= self.arena[path].bit_index
            {
                break;
            }

            path = current;
            current = if self.node_bit(to_add, self.arena[current].bit_index, length_in_bits) {
                self.right_of(current)
            } else {
                self.arena[current].left
            };
        }

        let to_add_bit = self.arena[to_add].bit_index;

        self.arena[to_add].predecessor = to_add;

        if self.node_bit(to_add, to_add_bit, length_in_bits) {
            self.arena[to_add].left = current;
            self.arena[to_add].right = Some(to_add);
        } else {
            self.arena[to_add].left = to_add;
            self.arena[to_add].right = Some(current);
        }

        self.arena[to_add].parent = Some(path);

        if self.arena[current].bit_index >= to_add_bit {
            self.arena[current].parent = Some(to_add);
        }

        // The displaced edge was an uplink; it now terminates at the new
        // node.
        if self.arena[current].bit_index <= self.arena[path].bit_index {
            self.arena[current].predecessor = to_add;
        }

        if path == self.root || !self.node_bit(to_add, self.arena[path].bit_index, length_in_bits)
        {
            self.arena[path].left = to_add;
        } else {
            self.arena[path].right = Some(to_add);
        }
    }

    // ------------------------------------------------------------------
    //  Lookup
    // ------------------------------------------------------------------

    /// The stored value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entry_id(key)
            .and_then(|id| self.arena[id].value.as_ref())
    }

    /// The stored key/value pair for `key`, if present. The returned key
    /// is the one stored in the trie, which may differ from the query in
    /// trailing zero bits.
    #[must_use]
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.entry_id(key).and_then(|id| self.entry_pair(id))
    }

    /// Whether a compare-equal key is stored.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entry_id(key).is_some()
    }

    /// Locate the node holding a compare-equal key.
    fn entry_id(&self, key: &K) -> Option<NodeId> {
        let length_in_bits = self.analyzer.length_in_bits(key);
        let id = self.nearest(key, length_in_bits);

        self.key_matches(id, key).then_some(id)
    }

    /// Descend from the root following `key`'s bits until an uplink is
    /// traversed. The uplink target is the nearest stored neighbor by
    /// tested bits: either the exact entry or the candidate against which
    /// the discriminating bit is computed.
    fn nearest(&self, key: &K, length_in_bits: usize) -> NodeId {
        let mut current = self.arena[self.root].left;
        let mut path = self.root;

        loop {
            if self.arena[current].bit_index <= self.arena[path].bit_index {
                return current;
            }

            path = current;
            current = if self.query_bit(key, self.arena[current].bit_index, length_in_bits) {
                self.right_of(current)
            } else {
                self.arena[current].left
            };
        }
    }

    // ------------------------------------------------------------------
    //  Removal
    // ------------------------------------------------------------------

    /// Remove the entry stored under a compare-equal key, returning its
    /// value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.entry_id(key)?;
        let (_, value) = self.remove_entry(id);
        value
    }

    /// Remove every entry. Keeps the arena's root slot.
    pub fn clear(&mut self) {
        self.arena.reset();

        let root = self.root;
        let node = &mut self.arena[root];
        node.key = None;
        node.value = None;
        node.bit_index = BitIndex::Root;
        node.parent = None;
        node.left = root;
        node.right = None;
        node.predecessor = root;

        self.size = 0;
        self.increment_mod_count();
        debug_log!("trie: cleared");
    }

    /// Unsplice a node and release its slot, returning its key and value.
    pub(crate) fn remove_entry(&mut self, h: NodeId) -> (Option<K>, Option<V>) {
        if h != self.root {
            if self.arena[h].is_internal(h) {
                self.remove_internal_entry(h);
            } else {
                self.remove_external_entry(h);
            }
        }

        self.decrement_size();

        let node = &mut self.arena[h];
        let key = node.key.take();
        let value = node.value.take();

        if h != self.root {
            self.arena.free(h);
        }

        trace_log!(size = self.size, "trie: entry removed");
        (key, value)
    }

    /// Remove a node with at least one self-loop: its parent adopts the
    /// other child directly.
    fn remove_external_entry(&mut self, h: NodeId) {
        debug_assert!(!self.arena[h].is_internal(h));

        let parent = self.parent_of(h);
        let child = if self.arena[h].left == h {
            self.right_of(h)
        } else {
            self.arena[h].left
        };

        if self.arena[parent].left == h {
            self.arena[parent].left = child;
        } else {
            self.arena[parent].right = Some(child);
        }

        // Either the child keeps a real parent, or the edge became an
        // uplink and the child records its new predecessor.
        if self.arena[child].bit_index > self.arena[parent].bit_index {
            self.arena[child].parent = Some(parent);
        } else {
            self.arena[child].predecessor = parent;
        }
    }

    /// Remove a node with two real children. Its predecessor `p` (the
    /// node whose uplink terminates at `h`) takes `h`'s place in the
    /// tree, which requires unsplicing `p` from its own spot first.
    fn remove_internal_entry(&mut self, h: NodeId) {
        debug_assert!(self.arena[h].is_internal(h));

        let p = self.arena[h].predecessor;
        debug_assert_ne!(p, h, "an internal node is never its own predecessor");

        self.arena[p].bit_index = self.arena[h].bit_index;

        // Unhook p from its current parent and children.
        {
            let parent = self.parent_of(p);
            let child = if self.arena[p].left == h {
                self.right_of(p)
            } else {
                self.arena[p].left
            };

            // A self-predecessor is re-anchored to p's parent, unless that
            // parent is the node being removed (then the self-loop moves
            // with p).
            if self.arena[p].predecessor == p && self.arena[p].parent != Some(h) {
                self.arena[p].predecessor = parent;
            }

            if self.arena[parent].left == p {
                self.arena[parent].left = child;
            } else {
                self.arena[parent].right = Some(child);
            }

            if self.arena[child].bit_index > self.arena[parent].bit_index {
                self.arena[child].parent = Some(parent);
            }
        }

        // Point h's children and parent at p.
        {
            let h_left = self.arena[h].left;
            let h_right = self.right_of(h);

            if self.arena[h_left].parent == Some(h) {
                self.arena[h_left].parent = Some(p);
            }

            if self.arena[h_right].parent == Some(h) {
                self.arena[h_right].parent = Some(p);
            }

            let h_parent = self.parent_of(h);
            if self.arena[h_parent].left == h {
                self.arena[h_parent].left = p;
            } else {
                self.arena[h_parent].right = Some(p);
            }
        }

        // p assumes h's links.
        self.arena[p].parent = self.arena[h].parent;
        self.arena[p].left = self.arena[h].left;
        self.arena[p].right = self.arena[h].right;

        // Any uplink that terminated at h now terminates at p.
        if self.is_valid_uplink(Some(self.arena[p].left), p) {
            let left = self.arena[p].left;
            self.arena[left].predecessor = p;
        }

        if self.is_valid_uplink(self.arena[p].right, p) {
            let right = self.right_of(p);
            self.arena[right].predecessor = p;
        }
    }

    // ------------------------------------------------------------------
    //  XOR-metric selection
    // ------------------------------------------------------------------

    /// The stored entry whose key is closest to `key` under the trie's
    /// XOR metric: maximal agreement on the bits tested while walking
    /// down. Returns `None` only on an empty trie.
    ///
    /// This is a proximity operator, not a prefix match: with only
    /// `"Xavier"` stored, selecting `"Al"` yields `"Xavier"`.
    #[must_use]
    pub fn select(&self, key: &K) -> Option<(&K, &V)> {
        let length_in_bits = self.analyzer.length_in_bits(key);
        let mut reference = None;

        let start = self.arena[self.root].left;
        if !self.select_r(start, BitIndex::Root, key, length_in_bits, &mut reference) {
            if let Some(id) = reference {
                return self.entry_pair(id);
            }
        }

        None
    }

    /// Recursive XOR-descent. Returns `true` while the search must
    /// continue into the sibling subtree.
    fn select_r(
        &self,
        h: NodeId,
        bit_index: BitIndex,
        key: &K,
        length_in_bits: usize,
        reference: &mut Option<NodeId>,
    ) -> bool {
        if self.arena[h].bit_index <= bit_index {
            // An empty root is no match; keep looking elsewhere.
            if !self.arena[h].is_empty() {
                *reference = Some(h);
                return false;
            }

            return true;
        }

        let hb = self.arena[h].bit_index;
        let (near, far) = if self.query_bit(key, hb, length_in_bits) {
            (self.right_of(h), self.arena[h].left)
        } else {
            (self.arena[h].left, self.right_of(h))
        };

        if self.select_r(near, hb, key, length_in_bits, reference) {
            return self.select_r(far, hb, key, length_in_bits, reference);
        }

        false
    }

    /// XOR-metric selection steered by a cursor: the cursor sees each
    /// candidate in closeness order and decides whether to accept it,
    /// keep looking, or remove it and stop.
    ///
    /// # Errors
    ///
    /// [`CursorError::RemoveDuringSelect`] when the cursor answers
    /// [`Decision::Remove`]; selection is read-only, use
    /// [`traverse`](Self::traverse) for removal during a walk.
    pub fn select_with<F>(
        &mut self,
        key: &K,
        mut cursor: F,
    ) -> Result<Option<Selected<'_, K, V>>, CursorError>
    where
        F: FnMut(&K, &V) -> Decision,
    {
        let length_in_bits = self.analyzer.length_in_bits(key);
        let mut outcome = None;

        let start = self.arena[self.root].left;
        self.select_with_r(
            start,
            BitIndex::Root,
            key,
            length_in_bits,
            &mut cursor,
            &mut outcome,
        )?;

        Ok(match outcome {
            Some(RawSelected::Live(id)) => {
                self.entry_pair(id).map(|(k, v)| Selected::Found(k, v))
            }

            Some(RawSelected::Removed(k, v)) => Some(Selected::Removed(k, v)),

            None => None,
        })
    }

    fn select_with_r<F>(
        &mut self,
        h: NodeId,
        bit_index: BitIndex,
        key: &K,
        length_in_bits: usize,
        cursor: &mut F,
        outcome: &mut Option<RawSelected<K, V>>,
    ) -> Result<bool, CursorError>
    where
        F: FnMut(&K, &V) -> Decision,
    {
        if self.arena[h].bit_index <= bit_index {
            if !self.arena[h].is_empty() {
                let decision = match self.entry_pair(h) {
                    Some((k, v)) => cursor(k, v),

                    None => unreachable!("non-empty entries carry a key and a value"),
                };

                match decision {
                    Decision::Remove => return Err(CursorError::RemoveDuringSelect),

                    Decision::Exit => {
                        *outcome = Some(RawSelected::Live(h));
                        return Ok(false);
                    }

                    Decision::RemoveAndExit => {
                        let (k, v) = into_removed(self.remove_entry(h));
                        *outcome = Some(RawSelected::Removed(k, v));
                        return Ok(false);
                    }

                    Decision::Continue => {}
                }
            }

            return Ok(true);
        }

        let hb = self.arena[h].bit_index;
        let (near, far) = if self.query_bit(key, hb, length_in_bits) {
            (self.right_of(h), self.arena[h].left)
        } else {
            (self.arena[h].left, self.right_of(h))
        };

        if self.select_with_r(near, hb, key, length_in_bits, cursor, outcome)? {
            return self.select_with_r(far, hb, key, length_in_bits, cursor, outcome);
        }

        Ok(false)
    }

    // ------------------------------------------------------------------
    //  Cursor traversal
    // ------------------------------------------------------------------

    /// Walk every entry in bit order, letting the cursor decide per entry
    /// whether to continue, stop, remove and continue, or remove and
    /// stop. Returns the entry the cursor stopped on, or `None` when the
    /// walk ran to completion.
    pub fn traverse<F>(&mut self, mut cursor: F) -> Option<Selected<'_, K, V>>
    where
        F: FnMut(&K, &V) -> Decision,
    {
        let mut entry = self.first_entry_id();

        while let Some(current) = entry {
            let decision = match self.entry_pair(current) {
                Some((k, v)) => cursor(k, v),

                None => unreachable!("the walk only yields non-empty entries"),
            };

            // The successor is computed before any removal disturbs the
            // links around the current entry.
            entry = self.next_entry_id(current);

            match decision {
                Decision::Exit => {
                    return self.entry_pair(current).map(|(k, v)| Selected::Found(k, v));
                }

                Decision::Remove => {
                    self.remove_entry(current);
                }

                Decision::RemoveAndExit => {
                    let (k, v) = into_removed(self.remove_entry(current));
                    return Some(Selected::Removed(k, v));
                }

                Decision::Continue => {}
            }
        }

        None
    }

    // ------------------------------------------------------------------
    //  Ordered neighbors
    // ------------------------------------------------------------------

    /// The least stored entry whose key is `>= key`.
    ///
    /// Like the other neighbor operations this briefly splices a
    /// placeholder node carrying the query key into the tree, reads off
    /// its ordered neighbor, removes the placeholder again and rolls the
    /// modification counter back, leaving the trie externally untouched —
    /// hence the `&mut` receiver and the `Clone` bound.
    pub fn ceiling(&mut self, key: &K) -> Option<(&K, &V)>
    where
        K: Clone,
    {
        self.ceiling_id(key).and_then(|id| self.entry_pair(id))
    }

    /// The least stored entry whose key is strictly `> key`.
    pub fn higher(&mut self, key: &K) -> Option<(&K, &V)>
    where
        K: Clone,
    {
        self.higher_id(key).and_then(|id| self.entry_pair(id))
    }

    /// The greatest stored entry whose key is `<= key`.
    pub fn floor(&mut self, key: &K) -> Option<(&K, &V)>
    where
        K: Clone,
    {
        self.floor_id(key).and_then(|id| self.entry_pair(id))
    }

    /// The greatest stored entry whose key is strictly `< key`.
    pub fn lower(&mut self, key: &K) -> Option<(&K, &V)>
    where
        K: Clone,
    {
        self.lower_id(key).and_then(|id| self.entry_pair(id))
    }

    pub(crate) fn ceiling_id(&mut self, key: &K) -> Option<NodeId>
    where
        K: Clone,
    {
        let length_in_bits = self.analyzer.length_in_bits(key);

        if length_in_bits == 0 {
            if !self.arena[self.root].is_empty() {
                return Some(self.root);
            }

            return self.first_entry_id();
        }

        let found = self.nearest(key, length_in_bits);
        if self.key_matches(found, key) {
            return Some(found);
        }

        match self.diff_with_node(key, length_in_bits, found) {
            DiffBit::At(bit) => self.neighbor_via_placeholder(key, length_in_bits, bit, true),

            DiffBit::AllZero => {
                if !self.arena[self.root].is_empty() {
                    return Some(self.root);
                }

                self.first_entry_id()
            }

            DiffBit::Equal => Some(found),

            DiffBit::OutOfBounds => panic!("key analyzer rejected an accepted key"),
        }
    }

    pub(crate) fn higher_id(&mut self, key: &K) -> Option<NodeId>
    where
        K: Clone,
    {
        let length_in_bits = self.analyzer.length_in_bits(key);

        if length_in_bits == 0 {
            if !self.arena[self.root].is_empty() {
                return self.next_entry_id(self.root);
            }

            return self.first_entry_id();
        }

        let found = self.nearest(key, length_in_bits);
        if self.key_matches(found, key) {
            return self.next_entry_id(found);
        }

        match self.diff_with_node(key, length_in_bits, found) {
            DiffBit::At(bit) => self.neighbor_via_placeholder(key, length_in_bits, bit, true),

            DiffBit::AllZero => {
                if !self.arena[self.root].is_empty() {
                    return self.next_entry_id(self.root);
                }

                self.first_entry_id()
            }

            DiffBit::Equal => self.next_entry_id(found),

            DiffBit::OutOfBounds => panic!("key analyzer rejected an accepted key"),
        }
    }

    pub(crate) fn floor_id(&mut self, key: &K) -> Option<NodeId>
    where
        K: Clone,
    {
        let length_in_bits = self.analyzer.length_in_bits(key);

        if length_in_bits == 0 {
            if !self.arena[self.root].is_empty() {
                return Some(self.root);
            }

            return None;
        }

        let found = self.nearest(key, length_in_bits);
        if self.key_matches(found, key) {
            return Some(found);
        }

        match self.diff_with_node(key, length_in_bits, found) {
            DiffBit::At(bit) => self.neighbor_via_placeholder(key, length_in_bits, bit, false),

            DiffBit::AllZero => {
                if !self.arena[self.root].is_empty() {
                    return Some(self.root);
                }

                None
            }

            DiffBit::Equal => Some(found),

            DiffBit::OutOfBounds => panic!("key analyzer rejected an accepted key"),
        }
    }

    pub(crate) fn lower_id(&mut self, key: &K) -> Option<NodeId>
    where
        K: Clone,
    {
        let length_in_bits = self.analyzer.length_in_bits(key);

        // Nothing sorts before the zero-bit key.
        if length_in_bits == 0 {
            return None;
        }

        let found = self.nearest(key, length_in_bits);
        if self.key_matches(found, key) {
            return self.previous_entry_id(found);
        }

        match self.diff_with_node(key, length_in_bits, found) {
            DiffBit::At(bit) => self.neighbor_via_placeholder(key, length_in_bits, bit, false),

            DiffBit::AllZero => None,

            DiffBit::Equal => self.previous_entry_id(found),

            DiffBit::OutOfBounds => panic!("key analyzer rejected an accepted key"),
        }
    }

    /// Splice a key-only placeholder for `key` at its discriminating bit,
    /// read its bit-order neighbor, unsplice the placeholder, and roll
    /// the modification counter back so the round trip is externally
    /// invisible.
    fn neighbor_via_placeholder(
        &mut self,
        key: &K,
        length_in_bits: usize,
        bit: usize,
        forward: bool,
    ) -> Option<NodeId>
    where
        K: Clone,
    {
        let added = self.arena.alloc(Some(key.clone()), None, bit_of(bit));
        self.add_entry(added, length_in_bits);
        self.increment_size();

        let neighbor = if forward {
            self.next_entry_id(added)
        } else {
            self.previous_entry_id(added)
        };

        self.remove_entry(added);
        self.mod_count -= 2;

        neighbor
    }

    // ------------------------------------------------------------------
    //  Extremes
    // ------------------------------------------------------------------

    /// The entry with the bit-order smallest key.
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.first_entry_id().and_then(|id| self.entry_pair(id))
    }

    /// The entry with the bit-order largest key.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.last_entry_id().and_then(|id| self.entry_pair(id))
    }

    // ------------------------------------------------------------------
    //  Views
    // ------------------------------------------------------------------

    /// A live sub-mapping over the entries whose key bits match
    /// `prefix[offset..offset + length)`.
    ///
    /// A zero-length range denotes the whole trie.
    ///
    /// # Errors
    ///
    /// [`ViewError::OffsetOutOfRange`] when the requested range extends
    /// past the prefix key's bits.
    pub fn prefix_view(
        &mut self,
        prefix: K,
        offset: usize,
        length: usize,
    ) -> Result<PrefixView<'_, K, V, A>, ViewError> {
        let key_bits = self.analyzer.length_in_bits(&prefix);
        if offset + length > key_bits {
            return Err(ViewError::OffsetOutOfRange {
                offset,
                length,
                key_bits,
            });
        }

        Ok(PrefixView::new(self, prefix, offset, length))
    }

    /// A live sub-mapping bounded by two optional key endpoints, each
    /// independently inclusive or exclusive.
    ///
    /// # Errors
    ///
    /// [`ViewError::MissingBounds`] when both endpoints are absent,
    /// [`ViewError::InvertedBounds`] when `from` sorts above `to`.
    pub fn range_view(
        &mut self,
        from: Option<K>,
        from_inclusive: bool,
        to: Option<K>,
        to_inclusive: bool,
    ) -> Result<RangeView<'_, K, V, A>, ViewError> {
        if from.is_none() && to.is_none() {
            return Err(ViewError::MissingBounds);
        }

        if let (Some(f), Some(t)) = (&from, &to) {
            if self.analyzer.compare(f, t) == Ordering::Greater {
                return Err(ViewError::InvertedBounds);
            }
        }

        Ok(RangeView::new(self, from, from_inclusive, to, to_inclusive))
    }

    // ------------------------------------------------------------------
    //  Shared plumbing
    // ------------------------------------------------------------------

    /// Whether the node holds a key that compares equal to `key`.
    pub(crate) fn key_matches(&self, id: NodeId, key: &K) -> bool {
        self.arena[id]
            .key
            .as_ref()
            .is_some_and(|k| self.analyzer.compare(key, k) == Ordering::Equal)
    }

    /// Both borrows of a live entry; `None` for the empty root.
    pub(crate) fn entry_pair(&self, id: NodeId) -> Option<(&K, &V)> {
        let node = &self.arena[id];

        match (node.key.as_ref(), node.value.as_ref()) {
            (Some(k), Some(v)) => Some((k, v)),

            _ => None,
        }
    }

    /// First differing bit between `key` and the key stored at `id` (the
    /// empty root compares as an absent key).
    fn diff_with_node(&self, key: &K, length_in_bits: usize, id: NodeId) -> DiffBit {
        let found_key = self.arena[id].key.as_ref();
        let found_bits = found_key.map_or(0, |k| self.analyzer.length_in_bits(k));

        self.analyzer
            .bit_index(key, 0, length_in_bits, found_key, 0, found_bits)
    }

    /// Test a bit of a query key; the root's pseudo-index reads as zero.
    pub(crate) fn query_bit(&self, key: &K, at: BitIndex, length_in_bits: usize) -> bool {
        match at {
            BitIndex::Root => false,

            BitIndex::Bit(b) => self.analyzer.is_bit_set(key, b as usize, length_in_bits),
        }
    }

    /// Test a bit of the key stored at `id` (absent keys read as zero).
    fn node_bit(&self, id: NodeId, at: BitIndex, length_in_bits: usize) -> bool {
        match (at, self.arena[id].key.as_ref()) {
            (BitIndex::Bit(b), Some(k)) => self.analyzer.is_bit_set(k, b as usize, length_in_bits),

            _ => false,
        }
    }

    /// Right child of a node below the root.
    pub(crate) fn right_of(&self, id: NodeId) -> NodeId {
        match self.arena[id].right {
            Some(r) => r,

            //  INVARIANT: only the root lacks a right child, and the root
            //  is never dereferenced through this accessor.
            None => unreachable!("only the root lacks a right child"),
        }
    }

    /// Parent of a node below the root.
    fn parent_of(&self, id: NodeId) -> NodeId {
        match self.arena[id].parent {
            Some(p) => p,

            None => unreachable!("only the root lacks a parent"),
        }
    }

    fn increment_size(&mut self) {
        self.size += 1;
        self.increment_mod_count();
    }

    fn decrement_size(&mut self) {
        self.size -= 1;
        self.increment_mod_count();
    }

    fn increment_mod_count(&mut self) {
        self.mod_count += 1;
    }

    // ------------------------------------------------------------------
    //  Prefix subtree location
    // ------------------------------------------------------------------

    /// Locate the node anchoring the subtree of all keys matching
    /// `prefix[offset..offset + length)`, or `None` when no stored key
    /// matches.
    ///
    /// Descends by prefix bits until an uplink is traversed or the next
    /// discriminating bit lies beyond the prefix, then validates that the
    /// candidate actually agrees with the prefix over the full range.
    pub(crate) fn subtree_id(&self, prefix: &K, offset: usize, length: usize) -> Option<NodeId> {
        debug_assert!(length > 0, "zero-length prefixes denote the whole trie");

        let mut current = self.arena[self.root].left;
        let mut path = self.root;

        loop {
            if self.arena[current].bit_index <= self.arena[path].bit_index
                || self.arena[current].bit_index.reaches(length)
            {
                break;
            }

            path = current;

            let bit = match self.arena[current].bit_index {
                BitIndex::Bit(b) => b as usize,

                BitIndex::Root => unreachable!("the descent never re-enters the root"),
            };

            current = if self
                .analyzer
                .is_bit_set(prefix, offset + bit, offset + length)
            {
                self.right_of(current)
            } else {
                self.arena[current].left
            };
        }

        let entry = if self.arena[current].is_empty() {
            path
        } else {
            current
        };

        let entry_key = self.arena[entry].key.as_ref()?;
        let entry_bits = self.analyzer.length_in_bits(entry_key);
        let end = offset + length;

        // A root key shorter than the probe cannot anchor the subtree.
        if entry == self.root && entry_bits < end {
            return None;
        }

        // The final bit of the prefix range must agree with the
        // candidate's corresponding bit.
        if self.analyzer.is_bit_set(prefix, end - 1, end)
            != self.analyzer.is_bit_set(entry_key, length - 1, entry_bits)
        {
            return None;
        }

        // And no earlier bit of the range may differ.
        match self
            .analyzer
            .bit_index(prefix, offset, length, Some(entry_key), 0, entry_bits)
        {
            DiffBit::At(i) if i < length => None,

            _ => Some(entry),
        }
    }
}

// ============================================================================
//  Trait impls
// ============================================================================

impl<K, V, A> Extend<(K, V)> for PatriciaTrie<K, V, A>
where
    A: KeyAnalyzer<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, pairs: I) {
        for (key, value) in pairs {
            self.insert(key, value);
        }
    }
}

impl<K, V, A> StdFmt::Debug for PatriciaTrie<K, V, A>
where
    K: StdFmt::Debug,
    V: StdFmt::Debug,
    A: KeyAnalyzer<K>,
{
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// ============================================================================
//  Helpers
// ============================================================================

/// Wrap a discriminating-bit index reported by an analyzer.
fn bit_of(bit: usize) -> BitIndex {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "key widths beyond u32::MAX bits are not representable in an arena this size"
    )]
    let bit = bit as u32;

    BitIndex::Bit(bit)
}

/// A removed live entry always carries both halves of its pair.
pub(crate) fn into_removed<K, V>(pair: (Option<K>, Option<V>)) -> (K, V) {
    match pair {
        (Some(key), Some(value)) => (key, value),

        _ => unreachable!("live entries always carry a key and a value"),
    }
}

#[cfg(test)]
mod tests {
    use crate::analyzers::BytesKeyAnalyzer;
    use crate::cursor::Decision;
    use crate::trie::{CursorError, PatriciaTrie, Selected};

    fn trie_of(keys: &[&[u8]]) -> PatriciaTrie<Vec<u8>, usize, BytesKeyAnalyzer> {
        let mut trie = PatriciaTrie::new(BytesKeyAnalyzer);
        for (i, key) in keys.iter().enumerate() {
            trie.insert(key.to_vec(), i);
        }
        trie
    }

    /// Every reachable entry holds a key, every non-root entry has a
    /// parent, and every entry is the target of exactly the uplink its
    /// `predecessor` records.
    fn assert_structure(trie: &PatriciaTrie<Vec<u8>, usize, BytesKeyAnalyzer>) {
        let mut count = 0;
        let mut id = trie.first_entry_id();

        while let Some(e) = id {
            count += 1;
            let node = &trie.arena[e];
            assert!(node.key.is_some(), "reachable entries carry a key");

            if e != trie.root {
                assert!(node.parent.is_some(), "non-root entries have a parent");

                let p = node.predecessor;
                let pred = &trie.arena[p];
                assert!(
                    pred.left == e || pred.right == Some(e),
                    "the predecessor's uplink points here"
                );
                assert!(
                    node.bit_index <= pred.bit_index,
                    "the predecessor edge is an uplink"
                );
            }

            id = trie.next_entry_id(e);
        }

        assert_eq!(count, trie.len(), "the walk covers every entry once");
    }

    #[test]
    fn test_insert_then_get() {
        let mut trie = PatriciaTrie::new(BytesKeyAnalyzer);

        assert_eq!(trie.insert(vec![0x42], 1), None);
        assert_eq!(trie.get(&vec![0x42]), Some(&1));
        assert!(trie.contains_key(&vec![0x42]));
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_insert_replaces_value() {
        let mut trie = PatriciaTrie::new(BytesKeyAnalyzer);

        trie.insert(vec![0x42], 1);
        assert_eq!(trie.insert(vec![0x42], 2), Some(1));
        assert_eq!(trie.get(&vec![0x42]), Some(&2));
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_zero_length_key_lives_at_root() {
        let mut trie = PatriciaTrie::new(BytesKeyAnalyzer);

        trie.insert(vec![], 0);
        trie.insert(vec![0x01], 1);
        trie.insert(vec![0x80], 2);

        assert_eq!(trie.len(), 3);
        assert_eq!(trie.get(&vec![]), Some(&0));
        assert_eq!(trie.first_key_value(), Some((&vec![], &0)));

        assert_eq!(trie.remove(&vec![]), Some(0));
        assert_eq!(trie.len(), 2);
        assert_eq!(trie.get(&vec![]), None);
        assert_eq!(trie.get(&vec![0x01]), Some(&1));
    }

    #[test]
    fn test_all_zero_key_lives_at_root() {
        let mut trie = PatriciaTrie::new(BytesKeyAnalyzer);

        trie.insert(vec![0x80], 1);
        trie.insert(vec![0x00], 0);

        assert_eq!(trie.len(), 2);
        assert_eq!(trie.first_key_value(), Some((&vec![0x00], &0)));
    }

    #[test]
    fn test_trailing_zero_bits_collapse() {
        let mut trie = PatriciaTrie::new(BytesKeyAnalyzer);

        trie.insert(vec![0x80], 1);
        // Bit-equal up to trailing zeros: one entry survives, under the
        // newly inserted key.
        assert_eq!(trie.insert(vec![0x80, 0x00], 2), Some(1));

        assert_eq!(trie.len(), 1);
        assert_eq!(trie.get(&vec![0x80]), None);
        assert_eq!(
            trie.get_key_value(&vec![0x80, 0x00]),
            Some((&vec![0x80, 0x00], &2))
        );
    }

    #[test]
    fn test_remove_external_and_internal() {
        let keys: &[&[u8]] = &[&[0x10], &[0x20], &[0x30], &[0x40], &[0x50], &[0x60]];
        let mut trie = trie_of(keys);
        assert_structure(&trie);

        // Remove in an order that exercises both removal shapes.
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(trie.remove(&key.to_vec()), Some(i));
            assert_eq!(trie.len(), keys.len() - i - 1);
            assert_structure(&trie);

            for (j, other) in keys.iter().enumerate().skip(i + 1) {
                assert_eq!(trie.get(&other.to_vec()), Some(&j), "survivor {j} intact");
            }
        }

        assert!(trie.is_empty());
    }

    #[test]
    fn test_structure_after_scattered_inserts() {
        let mut trie = PatriciaTrie::new(BytesKeyAnalyzer);

        for b in [0x55u8, 0x01, 0xFE, 0x80, 0x2A, 0x7F, 0xC3, 0x11] {
            trie.insert(vec![b, b.wrapping_mul(3)], b as usize);
            assert_structure(&trie);
        }

        trie.insert(vec![], 0);
        assert_structure(&trie);
    }

    #[test]
    fn test_remove_missing_returns_none() {
        let mut trie = trie_of(&[&[0x10], &[0x20]]);

        assert_eq!(trie.remove(&vec![0x15]), None);
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut trie = trie_of(&[&[0x01], &[0x02], &[0x03]]);

        trie.clear();
        assert!(trie.is_empty());
        assert_eq!(trie.get(&vec![0x01]), None);

        trie.insert(vec![0x01], 9);
        assert_eq!(trie.get(&vec![0x01]), Some(&9));
    }

    #[test]
    fn test_select_never_misses() {
        let trie = trie_of(&[&[0x24], &[0x80]]);

        for probe in [vec![0x00], vec![0x24], vec![0xFF], vec![0x42, 0x42]] {
            assert!(trie.select(&probe).is_some());
        }
    }

    #[test]
    fn test_select_exact_key_wins() {
        let trie = trie_of(&[&[0x24], &[0x25], &[0x80]]);

        let (key, _) = trie.select(&vec![0x25]).unwrap();
        assert_eq!(key, &vec![0x25]);
    }

    #[test]
    fn test_select_with_rejects_remove() {
        let mut trie = trie_of(&[&[0x24]]);

        let result = trie.select_with(&vec![0x24], |_, _| Decision::Remove);
        assert_eq!(result.unwrap_err(), CursorError::RemoveDuringSelect);
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_traverse_visits_in_order() {
        let mut trie = trie_of(&[&[0x30], &[0x10], &[0x20]]);

        let mut seen = Vec::new();
        let outcome = trie.traverse(|k, _| {
            seen.push(k.clone());
            Decision::Continue
        });

        assert!(outcome.is_none());
        assert_eq!(seen, vec![vec![0x10], vec![0x20], vec![0x30]]);
    }

    #[test]
    fn test_traverse_remove_and_exit() {
        let mut trie = trie_of(&[&[0x10], &[0x20], &[0x30]]);

        let outcome = trie.traverse(|_, _| Decision::RemoveAndExit);
        match outcome {
            Some(Selected::Removed(key, _)) => assert_eq!(key, vec![0x10]),

            other => panic!("expected a removed entry, got {other:?}"),
        }

        assert_eq!(trie.len(), 2);
        assert_eq!(trie.get(&vec![0x10]), None);
    }

    #[test]
    fn test_traverse_remove_filters() {
        let mut trie = trie_of(&[&[0x10], &[0x20], &[0x30], &[0x40]]);

        // Drop every entry with an even second nibble.
        trie.traverse(|k, _| {
            if k[0] % 0x20 == 0 {
                Decision::Remove
            } else {
                Decision::Continue
            }
        });

        let keys: Vec<_> = trie.keys().cloned().collect();
        assert_eq!(keys, vec![vec![0x10], vec![0x30]]);
    }

    #[test]
    fn test_neighbors_roundtrip_is_invisible() {
        let mut trie = trie_of(&[&[0x10], &[0x20], &[0x30]]);
        let before = trie.mod_count;

        assert_eq!(trie.ceiling(&vec![0x15]).map(|(k, _)| k.clone()), Some(vec![0x20]));
        assert_eq!(trie.mod_count, before, "neighbor walk leaves no trace");
        assert_eq!(trie.len(), 3);
    }

    #[test]
    fn test_neighbor_short_circuits() {
        let mut trie = trie_of(&[&[0x10], &[0x20]]);

        // Exact hits.
        assert_eq!(trie.ceiling(&vec![0x10]).map(|(k, _)| k.clone()), Some(vec![0x10]));
        assert_eq!(trie.higher(&vec![0x10]).map(|(k, _)| k.clone()), Some(vec![0x20]));
        assert_eq!(trie.floor(&vec![0x20]).map(|(k, _)| k.clone()), Some(vec![0x20]));
        assert_eq!(trie.lower(&vec![0x20]).map(|(k, _)| k.clone()), Some(vec![0x10]));

        // Off both ends.
        assert_eq!(trie.lower(&vec![0x10]), None);
        assert_eq!(trie.higher(&vec![0x20]), None);
        assert_eq!(trie.floor(&vec![0x01]), None);
        assert_eq!(trie.ceiling(&vec![0xF0]), None);
    }

    #[test]
    fn test_neighbors_around_root_key() {
        let mut trie = PatriciaTrie::new(BytesKeyAnalyzer);
        trie.insert(vec![], 0);
        trie.insert(vec![0x10], 1);

        assert_eq!(trie.ceiling(&vec![]).map(|(k, _)| k.clone()), Some(vec![]));
        assert_eq!(trie.higher(&vec![]).map(|(k, _)| k.clone()), Some(vec![0x10]));
        assert_eq!(trie.floor(&vec![]).map(|(k, _)| k.clone()), Some(vec![]));
        assert_eq!(trie.lower(&vec![]), None);
        assert_eq!(trie.lower(&vec![0x10]).map(|(k, _)| k.clone()), Some(vec![]));
    }

    #[test]
    fn test_extend() {
        let mut trie = PatriciaTrie::new(BytesKeyAnalyzer);
        trie.extend([(vec![0x02], 2), (vec![0x01], 1)]);

        assert_eq!(trie.len(), 2);
        assert_eq!(trie.first_key_value(), Some((&vec![0x01], &1)));
    }
}
