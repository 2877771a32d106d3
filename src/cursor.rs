//! Filepath: src/cursor.rs
//!
//! Cursor decisions for step-wise trie traversal.
//!
//! Operations that accept a cursor call it once per visited entry; the
//! returned [`Decision`] steers the traversal. Cursors are plain closures:
//! `FnMut(&K, &V) -> Decision`.
//!
//! Not every operation supports every decision:
//! [`PatriciaTrie::select_with`] rejects [`Decision::Remove`] because
//! XOR-selection is read-only, while [`PatriciaTrie::traverse`] accepts all
//! four.
//!
//! [`PatriciaTrie::select_with`]: crate::trie::PatriciaTrie::select_with
//! [`PatriciaTrie::traverse`]: crate::trie::PatriciaTrie::traverse

/// What to do with the entry a cursor was just shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Proceed to the next entry.
    Continue,

    /// Stop; the current entry is the result.
    Exit,

    /// Remove the current entry and continue.
    Remove,

    /// Remove the current entry, stop, and hand the removed pair back to
    /// the caller.
    RemoveAndExit,
}
