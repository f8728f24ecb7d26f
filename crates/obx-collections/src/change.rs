#![forbid(unsafe_code)]

//! Change records: the atomic description of one logical list mutation.
//!
//! # Design
//!
//! A [`ListChange`] is an ordered, finite sequence of [`SubChange`]s,
//! consumed once, in order. Sub-changes carry their removed and added
//! elements by value, so a record is self-contained: replaying it against a
//! mirror of the pre-mutation list reproduces the post-mutation list exactly
//! without ever touching the source (the round-trip law, exercised by the
//! `proptest_change_replay_invariants` suite).
//!
//! Indices in a sub-change are positions in the *post-mutation* index space,
//! and sub-changes are ordered by non-decreasing position, so a single
//! left-to-right pass applies cleanly.

/// One step of a [`ListChange`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubChange<T> {
    /// `added` elements were inserted at `from`.
    Add { from: usize, added: Vec<T> },
    /// `removed` elements were removed at `at`.
    Remove { at: usize, removed: Vec<T> },
    /// `removed` elements at `from` were replaced by `added`.
    Replace {
        from: usize,
        removed: Vec<T>,
        added: Vec<T>,
    },
    /// Elements in `[from, to)` kept their identity but were reinterpreted
    /// in place.
    Update { from: usize, to: usize },
    /// Elements in `[from, to)` were reordered; `permutation[i]` is the new
    /// index of the element previously at `from + i`.
    Permute {
        from: usize,
        to: usize,
        permutation: Vec<usize>,
    },
}

impl<T> SubChange<T> {
    /// First affected post-mutation index.
    pub fn from(&self) -> usize {
        match self {
            SubChange::Add { from, .. }
            | SubChange::Replace { from, .. }
            | SubChange::Update { from, .. }
            | SubChange::Permute { from, .. } => *from,
            SubChange::Remove { at, .. } => *at,
        }
    }

    /// One past the last affected post-mutation index.
    pub fn to(&self) -> usize {
        match self {
            SubChange::Add { from, added } => from + added.len(),
            SubChange::Remove { at, .. } => *at,
            SubChange::Replace { from, added, .. } => from + added.len(),
            SubChange::Update { to, .. } | SubChange::Permute { to, .. } => *to,
        }
    }

    pub fn was_added(&self) -> bool {
        matches!(
            self,
            SubChange::Add { .. } | SubChange::Replace { .. }
        )
    }

    pub fn was_removed(&self) -> bool {
        matches!(
            self,
            SubChange::Remove { .. } | SubChange::Replace { .. }
        )
    }

    /// Elements this sub-change removed, in pre-mutation order.
    pub fn removed(&self) -> &[T] {
        match self {
            SubChange::Remove { removed, .. } | SubChange::Replace { removed, .. } => removed,
            _ => &[],
        }
    }

    /// Elements this sub-change added, in post-mutation order.
    pub fn added(&self) -> &[T] {
        match self {
            SubChange::Add { added, .. } | SubChange::Replace { added, .. } => added,
            _ => &[],
        }
    }
}

/// An ordered, single-logical-mutation change record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListChange<T> {
    changes: Vec<SubChange<T>>,
}

/// List-change observer callback.
pub type ListChangeCallback<T> = dyn Fn(&ListChange<T>);

impl<T> ListChange<T> {
    pub(crate) fn new(changes: Vec<SubChange<T>>) -> Self {
        Self { changes }
    }

    /// Iterate the sub-changes in emission order.
    pub fn iter(&self) -> std::slice::Iter<'_, SubChange<T>> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl<'a, T> IntoIterator for &'a ListChange<T> {
    type Item = &'a SubChange<T>;
    type IntoIter = std::slice::Iter<'a, SubChange<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

impl<T> IntoIterator for ListChange<T> {
    type Item = SubChange<T>;
    type IntoIter = std::vec::IntoIter<SubChange<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<T: Clone> ListChange<T> {
    /// Replay this record against a mirror of the pre-mutation list.
    ///
    /// After the call the mirror equals the post-mutation list. Panics if
    /// the record does not fit the mirror (a corrupt record, which the
    /// round-trip law forbids).
    pub fn apply_to(&self, mirror: &mut Vec<T>) {
        for change in &self.changes {
            match change {
                SubChange::Add { from, added } => {
                    mirror.splice(*from..*from, added.iter().cloned());
                }
                SubChange::Remove { at, removed } => {
                    mirror.drain(*at..*at + removed.len());
                }
                SubChange::Replace {
                    from,
                    removed,
                    added,
                } => {
                    mirror.splice(*from..*from + removed.len(), added.iter().cloned());
                }
                SubChange::Update { .. } => {}
                SubChange::Permute {
                    from,
                    to,
                    permutation,
                } => {
                    let slice = mirror[*from..*to].to_vec();
                    for (i, element) in slice.into_iter().enumerate() {
                        mirror[permutation[i]] = element;
                    }
                }
            }
        }
    }
}
