//! Filepath: src/trie/prefix.rs
//!
//! Live prefix views.
//!
//! A [`PrefixView`] is a sub-mapping over exactly the entries whose key
//! bits match `prefix[offset..offset + length)`. It copies nothing: reads
//! check prefix containment and delegate, iteration is confined to the
//! subtree anchoring the matching keys, and writes flow through to the
//! underlying trie.

use crate::analyzer::KeyAnalyzer;
use crate::cursor::Decision;
use crate::node::NodeId;
use crate::tracing_helpers::trace_log;
use crate::trie::{into_removed, PatriciaTrie, Selected, ViewError};
use std::fmt as StdFmt;

/// Where a prefix walk starts and how far it may roam.
#[derive(Clone, Copy)]
enum Bound {
    /// Zero-length prefix: every entry matches.
    Whole,

    /// Walk confined to this subtree.
    Subtree(NodeId),

    /// Exactly one entry matches.
    Single,
}

/// A live sub-mapping over the entries matching a bit prefix.
///
/// Created by [`PatriciaTrie::prefix_view`]. The view caches its size and
/// boundary entries; the cache is rebuilt whenever the underlying trie's
/// modification counter moves (including through the view's own writes).
///
/// # Example
///
/// ```rust
/// use patricia_trie::{PatriciaTrie, analyzers::StringKeyAnalyzer};
///
/// let mut trie = PatriciaTrie::new(StringKeyAnalyzer);
/// for name in ["Lime", "LimeWire", "LimeRadio", "Lax"] {
///     trie.insert(String::from(name), ());
/// }
///
/// let mut view = trie.prefix_view(String::from("Lime"), 0, 64).unwrap();
/// assert_eq!(view.len(), 3);
/// assert!(view.contains_key(&String::from("LimeWire")));
/// assert!(!view.contains_key(&String::from("Lax")));
/// ```
pub struct PrefixView<'t, K, V, A> {
    trie: &'t mut PatriciaTrie<K, V, A>,
    prefix: K,
    offset: usize,
    length: usize,

    // Boundary cache, keyed on the trie's modification counter: the entry
    // one step before the first match and one step past the last.
    cached_at: Option<u64>,
    cached_size: usize,
    before_first: Option<NodeId>,
    past_last: Option<NodeId>,
}

impl<'t, K, V, A> StdFmt::Debug for PrefixView<'t, K, V, A>
where
    K: StdFmt::Debug,
    V: StdFmt::Debug,
    A: KeyAnalyzer<K>,
{
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("PrefixView")
            .field("prefix", &self.prefix)
            .field("offset", &self.offset)
            .field("length", &self.length)
            .finish()
    }
}

impl<'t, K, V, A> PrefixView<'t, K, V, A>
where
    A: KeyAnalyzer<K>,
{
    pub(crate) fn new(
        trie: &'t mut PatriciaTrie<K, V, A>,
        prefix: K,
        offset: usize,
        length: usize,
    ) -> Self {
        Self {
            trie,
            prefix,
            offset,
            length,
            cached_at: None,
            cached_size: 0,
            before_first: None,
            past_last: None,
        }
    }

    /// The prefix key this view filters by.
    #[inline]
    pub fn prefix(&self) -> &K {
        &self.prefix
    }

    /// Whether `key` belongs to this view.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.in_range(key) && self.trie.contains_key(key)
    }

    /// The stored value for `key`, if `key` belongs to this view.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        if !self.in_range(key) {
            return None;
        }

        self.trie.get(key)
    }

    /// Insert through the view.
    ///
    /// # Errors
    ///
    /// [`ViewError::KeyOutsideView`] when `key` does not match the
    /// prefix.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, ViewError> {
        if !self.in_range(&key) {
            return Err(ViewError::KeyOutsideView);
        }

        Ok(self.trie.insert(key, value))
    }

    /// Remove through the view. Keys outside the prefix report absent.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        if !self.in_range(key) {
            return None;
        }

        self.trie.remove(key)
    }

    /// Number of matching entries.
    pub fn len(&mut self) -> usize {
        self.fixup()
    }

    /// Whether no stored key matches the prefix.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// The bit-order smallest matching entry.
    pub fn first_key_value(&mut self) -> Option<(&K, &V)> {
        self.fixup();

        let id = match self.before_first {
            None => self.trie.first_entry_id(),

            Some(before) => self.trie.next_entry_id(before),
        }?;

        let (k, v) = self.trie.entry_pair(id)?;
        self.matches_prefix(k).then_some((k, v))
    }

    /// The bit-order largest matching entry.
    pub fn last_key_value(&mut self) -> Option<(&K, &V)> {
        self.fixup();

        let id = match self.past_last {
            None => self.trie.last_entry_id(),

            Some(past) => self.trie.previous_entry_id(past),
        }?;

        let (k, v) = self.trie.entry_pair(id)?;
        self.matches_prefix(k).then_some((k, v))
    }

    /// Iterate the matching entries in bit order.
    #[must_use]
    pub fn iter(&self) -> PrefixIter<'_, K, V, A> {
        let (next, bound) = self.start_state();

        PrefixIter {
            trie: &*self.trie,
            next,
            bound,
        }
    }

    /// Walk the matching entries, letting the cursor decide per entry
    /// whether to continue, stop, remove and continue, or remove and
    /// stop.
    ///
    /// When a removal unsplices the subtree anchor itself, or rewires its
    /// discriminating bit, the subtree is located afresh before the walk
    /// continues.
    pub fn traverse<F>(&mut self, mut cursor: F) -> Option<Selected<'_, K, V>>
    where
        F: FnMut(&K, &V) -> Decision,
    {
        if self.length == 0 {
            return self.trie.traverse(cursor);
        }

        let mut subtree = self.trie.subtree_id(&self.prefix, self.offset, self.length)?;
        let mut last_one = false;

        let mut next_id = if self.trie.arena[subtree].bit_index.reaches(self.length) {
            Some(self.trie.follow_left(subtree))
        } else {
            // The anchor discriminates inside the prefix: it is the only
            // matching entry.
            last_one = true;
            Some(subtree)
        };

        while let Some(current) = next_id {
            let decision = match self.trie.entry_pair(current) {
                Some((k, v)) => cursor(k, v),

                None => unreachable!("the walk only yields non-empty entries"),
            };

            // Compute the successor before any removal disturbs the links.
            next_id = if last_one {
                None
            } else {
                self.trie.next_entry_in_subtree(current, subtree)
            };

            match decision {
                Decision::Continue => {}

                Decision::Exit => {
                    return self.trie.entry_pair(current).map(|(k, v)| Selected::Found(k, v));
                }

                Decision::Remove | Decision::RemoveAndExit => {
                    let anchor_removed = current == subtree;
                    let anchor_bit = self.trie.arena[subtree].bit_index;

                    let removed = self.trie.remove_entry(current);

                    if decision == Decision::RemoveAndExit {
                        let (k, v) = into_removed(removed);
                        return Some(Selected::Removed(k, v));
                    }

                    // Relocate when the anchor vanished or its bit index
                    // changed under internal rewiring.
                    if anchor_removed || self.trie.arena[subtree].bit_index != anchor_bit {
                        match self.trie.subtree_id(&self.prefix, self.offset, self.length) {
                            Some(s) => {
                                trace_log!("prefix view: subtree relocated");
                                subtree = s;
                            }

                            None => break,
                        }
                    }

                    if !self.trie.arena[subtree].bit_index.reaches(self.length) {
                        last_one = true;
                    }
                }
            }
        }

        None
    }

    // ------------------------------------------------------------------
    //  Internals
    // ------------------------------------------------------------------

    fn in_range(&self, key: &K) -> bool {
        self.matches_prefix(key)
    }

    fn matches_prefix(&self, key: &K) -> bool {
        self.trie
            .analyzer
            .is_prefix(&self.prefix, self.offset, self.length, key)
    }

    /// Starting entry and bound for a fresh walk over the matches.
    fn start_state(&self) -> (Option<NodeId>, Bound) {
        if self.length == 0 {
            return (self.trie.first_entry_id(), Bound::Whole);
        }

        match self.trie.subtree_id(&self.prefix, self.offset, self.length) {
            None => (None, Bound::Whole),

            Some(subtree) => {
                if self.trie.arena[subtree].bit_index.reaches(self.length) {
                    (Some(self.trie.follow_left(subtree)), Bound::Subtree(subtree))
                } else {
                    (Some(subtree), Bound::Single)
                }
            }
        }
    }

    /// Rebuild the size and boundary cache if the trie changed since it
    /// was last computed.
    fn fixup(&mut self) -> usize {
        if self.cached_at == Some(self.trie.mod_count) {
            return self.cached_size;
        }

        let (mut walk, bound) = self.start_state();
        let mut size = 0;
        let mut first = None;
        let mut last = None;

        while let Some(id) = walk {
            size += 1;
            if first.is_none() {
                first = Some(id);
            }
            last = Some(id);

            walk = match bound {
                Bound::Single => None,

                Bound::Whole => self.trie.next_entry_id(id),

                Bound::Subtree(root) => self.trie.next_entry_in_subtree(id, root),
            };
        }

        self.before_first = first.and_then(|id| self.trie.previous_entry_id(id));
        self.past_last = last.and_then(|id| self.trie.next_entry_id(id));
        self.cached_size = size;
        self.cached_at = Some(self.trie.mod_count);

        size
    }
}

/// Bit-order iterator over the entries matching a prefix.
pub struct PrefixIter<'a, K, V, A> {
    trie: &'a PatriciaTrie<K, V, A>,
    next: Option<NodeId>,
    bound: Bound,
}

impl<'a, K, V, A> Iterator for PrefixIter<'a, K, V, A>
where
    A: KeyAnalyzer<K>,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;

        self.next = match self.bound {
            Bound::Single => None,

            Bound::Whole => self.trie.next_entry_id(id),

            Bound::Subtree(root) => self.trie.next_entry_in_subtree(id, root),
        };

        self.trie.entry_pair(id)
    }
}

impl<K, V, A> std::iter::FusedIterator for PrefixIter<'_, K, V, A> where A: KeyAnalyzer<K> {}

#[cfg(test)]
mod tests {
    use crate::analyzers::{BytesKeyAnalyzer, StringKeyAnalyzer};
    use crate::cursor::Decision;
    use crate::trie::{PatriciaTrie, ViewError};

    fn string_trie(names: &[&str]) -> PatriciaTrie<String, usize, StringKeyAnalyzer> {
        let mut trie = PatriciaTrie::new(StringKeyAnalyzer);
        for (i, name) in names.iter().enumerate() {
            trie.insert(String::from(*name), i);
        }
        trie
    }

    #[test]
    fn test_prefix_view_membership() {
        let mut trie = string_trie(&["Lime", "LimeWire", "LimeRadio", "Lax", "Later", "Lake"]);

        let mut view = trie.prefix_view(String::from("Lime"), 0, 64).unwrap();

        assert_eq!(view.len(), 3);
        assert!(view.contains_key(&String::from("Lime")));
        assert!(view.contains_key(&String::from("LimeRadio")));
        assert!(!view.contains_key(&String::from("Lake")));
        assert_eq!(view.get(&String::from("Lake")), None);
    }

    #[test]
    fn test_prefix_view_iterates_in_order() {
        let mut trie = string_trie(&["Lovely", "Lime", "LimeWire", "LimeRadio", "Lax"]);

        let view = trie.prefix_view(String::from("Lime"), 0, 64).unwrap();
        let keys: Vec<_> = view.iter().map(|(k, _)| k.clone()).collect();

        assert_eq!(keys, vec!["Lime", "LimeRadio", "LimeWire"]);
    }

    #[test]
    fn test_prefix_view_first_last() {
        let mut trie = string_trie(&["Lime", "LimeWire", "LimeRadio", "Lax", "Lovely"]);

        let mut view = trie.prefix_view(String::from("Lime"), 0, 64).unwrap();

        assert_eq!(
            view.first_key_value().map(|(k, _)| k.clone()),
            Some(String::from("Lime"))
        );
        assert_eq!(
            view.last_key_value().map(|(k, _)| k.clone()),
            Some(String::from("LimeWire"))
        );
    }

    #[test]
    fn test_empty_prefix_view() {
        let mut trie = string_trie(&["Alpha", "Beta"]);

        let mut view = trie.prefix_view(String::from("Zz"), 0, 32).unwrap();

        assert_eq!(view.len(), 0);
        assert!(view.is_empty());
        assert!(view.first_key_value().is_none());
        assert!(view.last_key_value().is_none());
    }

    #[test]
    fn test_zero_length_prefix_is_whole_trie() {
        let mut trie = string_trie(&["a", "b", "c"]);

        let mut view = trie.prefix_view(String::new(), 0, 0).unwrap();
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn test_prefix_view_rejects_out_of_range_offsets() {
        let mut trie = string_trie(&["abc"]);

        let err = trie.prefix_view(String::from("ab"), 16, 32).unwrap_err();
        assert!(matches!(err, ViewError::OffsetOutOfRange { .. }));
    }

    #[test]
    fn test_insert_through_view() {
        let mut trie = string_trie(&["Lime"]);

        let mut view = trie.prefix_view(String::from("Lime"), 0, 64).unwrap();

        assert_eq!(view.insert(String::from("LimeJuice"), 9), Ok(None));
        assert_eq!(
            view.insert(String::from("Lemon"), 9),
            Err(ViewError::KeyOutsideView)
        );

        assert_eq!(view.len(), 2);
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn test_remove_through_view() {
        let mut trie = string_trie(&["Lime", "LimeWire", "Lax"]);

        let mut view = trie.prefix_view(String::from("Lime"), 0, 64).unwrap();

        assert_eq!(view.remove(&String::from("LimeWire")), Some(1));
        // Outside the prefix: untouched, reported absent.
        assert_eq!(view.remove(&String::from("Lax")), None);

        assert_eq!(view.len(), 1);
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn test_view_is_live() {
        let mut trie = string_trie(&["Lime"]);

        let mut view = trie.prefix_view(String::from("Lime"), 0, 64).unwrap();
        assert_eq!(view.len(), 1);

        view.insert(String::from("LimeRadio"), 7).unwrap();
        assert_eq!(view.len(), 2, "cache refreshes after a write");
    }

    #[test]
    fn test_traverse_removes_within_prefix() {
        let mut trie = string_trie(&["Lime", "LimeWire", "LimeRadio", "Lax"]);

        {
            let mut view = trie.prefix_view(String::from("Lime"), 0, 64).unwrap();
            let outcome = view.traverse(|_, _| Decision::Remove);
            assert!(outcome.is_none());
        }

        // Everything under the prefix is gone, the rest survives.
        assert_eq!(trie.len(), 1);
        assert!(trie.contains_key(&String::from("Lax")));
    }

    #[test]
    fn test_traverse_exit_on_match() {
        let mut trie = string_trie(&["Lime", "LimeWire", "LimeRadio"]);

        let mut view = trie.prefix_view(String::from("Lime"), 0, 64).unwrap();
        let found = view.traverse(|k, _| {
            if k.ends_with("Radio") {
                Decision::Exit
            } else {
                Decision::Continue
            }
        });

        assert_eq!(found.map(|s| s.key().clone()), Some(String::from("LimeRadio")));
    }

    #[test]
    fn test_singleton_subtree() {
        let mut trie = string_trie(&["Lime", "Lax"]);

        let mut view = trie.prefix_view(String::from("Lime"), 0, 64).unwrap();
        assert_eq!(view.len(), 1);

        let keys: Vec<_> = view.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec!["Lime"]);
    }

    #[test]
    fn test_bigint_style_bit_range_prefix() {
        // A low-bits prefix over byte keys: all keys sharing their first
        // four bits.
        let mut trie = PatriciaTrie::new(BytesKeyAnalyzer);
        for b in [0x10u8, 0x1F, 0x17, 0x20, 0x80] {
            trie.insert(vec![b], b);
        }

        let mut view = trie.prefix_view(vec![0x10], 0, 4).unwrap();
        let keys: Vec<_> = view.iter().map(|(k, _)| k[0]).collect();
        assert_eq!(keys, vec![0x10, 0x17, 0x1F]);
        assert_eq!(view.len(), 3);
    }
}
