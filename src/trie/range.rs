//! Filepath: src/trie/range.rs
//!
//! Live key-range views.
//!
//! A [`RangeView`] is a sub-mapping bounded by two optional key endpoints,
//! each independently inclusive or exclusive. Reads outside the range
//! report absent, writes outside fail, and iteration runs from the range's
//! ceiling entry up to (never including) the first entry past the upper
//! bound.

use std::cmp::Ordering;

use crate::analyzer::KeyAnalyzer;
use crate::node::NodeId;
use crate::trie::{PatriciaTrie, ViewError};

/// A live sub-mapping bounded by `[from, to]` with independently
/// inclusive or exclusive endpoints.
///
/// Created by [`PatriciaTrie::range_view`]. At least one endpoint is
/// always present.
///
/// # Example
///
/// ```rust
/// use patricia_trie::{PatriciaTrie, analyzers::BytesKeyAnalyzer};
///
/// let mut trie = PatriciaTrie::new(BytesKeyAnalyzer);
/// for b in 0u8..100 {
///     trie.insert(vec![b], b);
/// }
///
/// let mut view = trie
///     .range_view(Some(vec![0x0A]), true, Some(vec![0x14]), false)
///     .unwrap();
///
/// let keys: Vec<u8> = view.iter().map(|(k, _)| k[0]).collect();
/// assert_eq!(keys, (0x0A..0x14).collect::<Vec<u8>>());
/// ```
pub struct RangeView<'t, K, V, A> {
    trie: &'t mut PatriciaTrie<K, V, A>,
    from: Option<K>,
    from_inclusive: bool,
    to: Option<K>,
    to_inclusive: bool,

    // Entry count cache, keyed on the trie's modification counter.
    cached_at: Option<u64>,
    cached_size: usize,
}

impl<'t, K, V, A> RangeView<'t, K, V, A>
where
    A: KeyAnalyzer<K>,
{
    pub(crate) fn new(
        trie: &'t mut PatriciaTrie<K, V, A>,
        from: Option<K>,
        from_inclusive: bool,
        to: Option<K>,
        to_inclusive: bool,
    ) -> Self {
        Self {
            trie,
            from,
            from_inclusive,
            to,
            to_inclusive,
            cached_at: None,
            cached_size: 0,
        }
    }

    /// Lower endpoint, if bounded below.
    #[inline]
    pub fn from_key(&self) -> Option<&K> {
        self.from.as_ref()
    }

    /// Upper endpoint, if bounded above.
    #[inline]
    pub fn to_key(&self) -> Option<&K> {
        self.to.as_ref()
    }

    /// Whether the lower endpoint belongs to the range.
    #[inline]
    #[must_use]
    pub const fn from_inclusive(&self) -> bool {
        self.from_inclusive
    }

    /// Whether the upper endpoint belongs to the range.
    #[inline]
    #[must_use]
    pub const fn to_inclusive(&self) -> bool {
        self.to_inclusive
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
    /// [`ViewError::KeyOutsideView`] when `key` lies outside the range.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, ViewError> {
        if !self.in_range(&key) {
            return Err(ViewError::KeyOutsideView);
        }

        Ok(self.trie.insert(key, value))
    }

    /// Remove through the view. Keys outside the range report absent.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        if !self.in_range(key) {
            return None;
        }

        self.trie.remove(key)
    }

    /// Number of entries inside the range.
    pub fn len(&mut self) -> usize
    where
        K: Clone,
    {
        if self.cached_at == Some(self.trie.mod_count) {
            return self.cached_size;
        }

        let size = self.iter().count();
        self.cached_size = size;
        self.cached_at = Some(self.trie.mod_count);

        size
    }

    /// Whether the range holds no entries.
    pub fn is_empty(&mut self) -> bool
    where
        K: Clone,
    {
        self.iter().next().is_none()
    }

    /// The smallest entry inside the range.
    pub fn first_key_value(&mut self) -> Option<(&K, &V)>
    where
        K: Clone,
    {
        let id = match &self.from {
            None => self.trie.first_entry_id(),

            Some(from) => {
                if self.from_inclusive {
                    self.trie.ceiling_id(from)
                } else {
                    self.trie.higher_id(from)
                }
            }
        }?;

        let (k, v) = self.trie.entry_pair(id)?;
        self.in_to_range(k, false).then_some((k, v))
    }

    /// The largest entry inside the range.
    pub fn last_key_value(&mut self) -> Option<(&K, &V)>
    where
        K: Clone,
    {
        let id = match &self.to {
            None => self.trie.last_entry_id(),

            Some(to) => {
                if self.to_inclusive {
                    self.trie.floor_id(to)
                } else {
                    self.trie.lower_id(to)
                }
            }
        }?;

        let (k, v) = self.trie.entry_pair(id)?;
        self.in_from_range(k, false).then_some((k, v))
    }

    /// Iterate the entries inside the range in bit order.
    ///
    /// The walk starts at the range's first entry and stops at an
    /// excluded sentinel: the first stored entry past the upper bound.
    pub fn iter(&mut self) -> RangeIter<'_, K, V, A>
    where
        K: Clone,
    {
        let first = match &self.from {
            None => self.trie.first_entry_id(),

            Some(from) => {
                if self.from_inclusive {
                    self.trie.ceiling_id(from)
                } else {
                    self.trie.higher_id(from)
                }
            }
        };

        let excluded = match &self.to {
            None => None,

            Some(to) => {
                if self.to_inclusive {
                    self.trie.higher_id(to)
                } else {
                    self.trie.ceiling_id(to)
                }
            }
        };

        RangeIter {
            trie: &*self.trie,
            next: first,
            excluded,
        }
    }

    /// A narrower view inside this one.
    ///
    /// Absent endpoints inherit this view's bounds.
    ///
    /// # Errors
    ///
    /// [`ViewError::KeyOutsideView`] when an endpoint lies outside this
    /// view, [`ViewError::InvertedBounds`] when the endpoints cross,
    /// [`ViewError::MissingBounds`] when the narrowed view would be
    /// unbounded on both sides.
    pub fn sub_view(
        &mut self,
        from: Option<K>,
        from_inclusive: bool,
        to: Option<K>,
        to_inclusive: bool,
    ) -> Result<RangeView<'_, K, V, A>, ViewError>
    where
        K: Clone,
    {
        if let Some(f) = &from {
            if !self.in_range_extended(f) {
                return Err(ViewError::KeyOutsideView);
            }
        }

        if let Some(t) = &to {
            if !self.in_range_extended(t) {
                return Err(ViewError::KeyOutsideView);
            }
        }

        let from = from.or_else(|| self.from.clone());
        let from_inclusive = if from.is_some() { from_inclusive } else { self.from_inclusive };
        let to = to.or_else(|| self.to.clone());
        let to_inclusive = if to.is_some() { to_inclusive } else { self.to_inclusive };

        if from.is_none() && to.is_none() {
            return Err(ViewError::MissingBounds);
        }

        if let (Some(f), Some(t)) = (&from, &to) {
            if self.trie.analyzer.compare(f, t) == Ordering::Greater {
                return Err(ViewError::InvertedBounds);
            }
        }

        Ok(RangeView::new(
            &mut *self.trie,
            from,
            from_inclusive,
            to,
            to_inclusive,
        ))
    }

    // ------------------------------------------------------------------
    //  Bounds
    // ------------------------------------------------------------------

    fn in_range(&self, key: &K) -> bool {
        self.in_from_range(key, false) && self.in_to_range(key, false)
    }

    /// Like [`in_range`](Self::in_range) but admitting the upper endpoint
    /// itself, so sub-view endpoints may sit on the boundary.
    fn in_range_extended(&self, key: &K) -> bool {
        self.in_from_range(key, false) && self.in_to_range(key, true)
    }

    fn in_from_range(&self, key: &K, force_inclusive: bool) -> bool {
        match &self.from {
            None => true,

            Some(from) => {
                let ord = self.trie.analyzer.compare(key, from);
                if self.from_inclusive || force_inclusive {
                    ord != Ordering::Less
                } else {
                    ord == Ordering::Greater
                }
            }
        }
    }

    fn in_to_range(&self, key: &K, force_inclusive: bool) -> bool {
        match &self.to {
            None => true,

            Some(to) => {
                let ord = self.trie.analyzer.compare(key, to);
                if self.to_inclusive || force_inclusive {
                    ord != Ordering::Greater
                } else {
                    ord == Ordering::Less
                }
            }
        }
    }
}

/// Bit-order iterator over the entries inside a range.
pub struct RangeIter<'a, K, V, A> {
    trie: &'a PatriciaTrie<K, V, A>,
    next: Option<NodeId>,
    excluded: Option<NodeId>,
}

impl<'a, K, V, A> Iterator for RangeIter<'a, K, V, A>
where
    A: KeyAnalyzer<K>,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;

        if Some(id) == self.excluded {
            self.next = None;
            return None;
        }

        self.next = self.trie.next_entry_id(id);
        self.trie.entry_pair(id)
    }
}

impl<K, V, A> std::iter::FusedIterator for RangeIter<'_, K, V, A> where A: KeyAnalyzer<K> {}
