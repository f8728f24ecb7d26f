#![forbid(unsafe_code)]

//! The change builder: turns a stream of primitive edits into one coalesced
//! [`ListChange`].
//!
//! # Design
//!
//! One builder instance lives inside each observable list and is reused
//! across mutations. A logical mutation is bracketed by
//! [`begin_change`](ChangeBuilder::begin_change) /
//! [`end_change`](ChangeBuilder::end_change); scopes nest, and only the
//! outermost `end_change` finalizes the buffered edits into a record.
//!
//! Primitive edits are buffered as ranged `Edit`s (removed + added element
//! runs) kept sorted by position, plus disjoint update ranges and at most one
//! composed permutation. Buffering works in *current* list coordinates: each
//! incoming single-index edit locates the buffered edit it touches, splices
//! into it, and shifts everything to its right. An element added and then
//! removed inside the same scope cancels out and never appears in the
//! finalized record.
//!
//! # Protocol
//!
//! Calling any `next_*` method outside an open scope is a programming error
//! and panics immediately; the buffer for later scopes is not corrupted.
//! A permutation may open a scope (source `sort` does this) and further
//! add/remove/update edits may follow it, but issuing a permutation *after*
//! add/remove/update edits in the same scope is unsupported and panics.

use smallvec::SmallVec;

use crate::change::{ListChange, SubChange};

/// A buffered replace-shaped edit: `removed` elements at `from` became
/// `added` elements at `[from, from + added.len())`, in current coordinates.
#[derive(Debug)]
struct Edit<T> {
    from: usize,
    removed: Vec<T>,
    added: Vec<T>,
}

impl<T> Edit<T> {
    /// One past the end of the added span, in current coordinates.
    fn added_end(&self) -> usize {
        self.from + self.added.len()
    }
}

/// Accumulates primitive edits for one logical mutation and coalesces them
/// into a single [`ListChange`].
///
/// # Invariants
///
/// 1. `edits` is sorted by `from`, spans non-overlapping.
/// 2. `updates` is a sorted list of disjoint, non-empty ranges.
/// 3. Replaying the finalized record has the same net effect as applying
///    every submitted primitive edit in call order.
/// Most mutations buffer one or two edits; the inline capacity keeps the
/// per-mutation path allocation-free until a scope grows past that.
type EditBuf<T> = SmallVec<[Edit<T>; 2]>;

#[derive(Debug)]
pub struct ChangeBuilder<T> {
    depth: usize,
    recording: bool,
    edits: EditBuf<T>,
    updates: Vec<(usize, usize)>,
    permutation: Option<(usize, usize, Vec<usize>)>,
}

impl<T> Default for ChangeBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChangeBuilder<T> {
    pub fn new() -> Self {
        Self {
            depth: 0,
            recording: false,
            edits: SmallVec::new(),
            updates: Vec::new(),
            permutation: None,
        }
    }

    /// Open a (possibly nested) change scope.
    ///
    /// `record` is consulted only for the outermost scope: when false (no
    /// list-change observers), primitive edits are accepted but discarded,
    /// so mutation stays cheap on unobserved lists.
    pub fn begin_change(&mut self, record: bool) {
        if self.depth == 0 {
            self.recording = record;
        }
        self.depth += 1;
    }

    /// Close one scope level. Only the outermost close finalizes; it returns
    /// the coalesced record, or `None` if nothing was recorded.
    ///
    /// # Panics
    ///
    /// If no scope is open.
    pub fn end_change(&mut self) -> Option<ListChange<T>> {
        assert!(self.depth > 0, "end_change called without begin_change");
        self.depth -= 1;
        if self.depth > 0 {
            return None;
        }
        self.finalize()
    }

    /// Whether a change scope is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.depth > 0
    }

    /// Whether an open scope is materializing a record. Callers use this to
    /// skip cloning elements for edits that would be discarded anyway.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.depth > 0 && self.recording
    }

    fn check_open(&self, op: &str) {
        assert!(
            self.depth > 0,
            "{op} called outside a begin_change/end_change scope"
        );
    }

    /// Record an insertion of `added` at `from` (current coordinates).
    pub fn next_add(&mut self, from: usize, added: Vec<T>) {
        self.check_open("next_add");
        if !self.recording || added.is_empty() {
            return;
        }
        let count = added.len();
        let idx = self.edit_at_or_before(from);
        match idx {
            // Insertion lands inside (or exactly at the end of) an existing
            // added span: splice in and grow that edit.
            Some(i) if from <= self.edits[i].added_end() => {
                let offset = from - self.edits[i].from;
                self.edits[i].added.splice(offset..offset, added);
                self.shift_edits(i + 1, count as isize);
            }
            _ => {
                let insert_at = idx.map_or(0, |i| i + 1);
                self.edits.insert(
                    insert_at,
                    Edit {
                        from,
                        removed: Vec::new(),
                        added,
                    },
                );
                self.shift_edits(insert_at + 1, count as isize);
            }
        }
        self.insert_into_updates(from, count);
    }

    /// Record removal of the elements currently at `[at, at + removed.len())`.
    pub fn next_remove(&mut self, at: usize, removed: Vec<T>) {
        self.check_open("next_remove");
        if !self.recording {
            return;
        }
        for element in removed {
            self.remove_one(at, element);
        }
    }

    /// Record that the element at `at` kept its identity but changed content.
    pub fn next_update(&mut self, at: usize) {
        self.check_open("next_update");
        if !self.recording {
            return;
        }
        // First range that ends at or after `at`; everything before it is
        // strictly left of `at` and cannot touch it.
        let pos = self.updates.partition_point(|&(_, to)| to < at);
        if pos < self.updates.len() {
            let (from, to) = self.updates[pos];
            if to == at {
                // Adjacent on the left: extend, then merge a now-touching
                // successor.
                self.updates[pos].1 = at + 1;
                if pos + 1 < self.updates.len() && self.updates[pos + 1].0 == at + 1 {
                    self.updates[pos].1 = self.updates[pos + 1].1;
                    self.updates.remove(pos + 1);
                }
                return;
            }
            if from <= at {
                return; // already covered
            }
            if from == at + 1 {
                self.updates[pos].0 = at;
                return;
            }
        }
        self.updates.insert(pos, (at, at + 1));
    }

    /// Record replacement of `removed` at `from` by `added` (sugar for
    /// remove-then-add at the same position).
    pub fn next_replace(&mut self, from: usize, removed: Vec<T>, added: Vec<T>) {
        self.check_open("next_replace");
        if !self.recording {
            return;
        }
        for element in removed {
            self.remove_one(from, element);
        }
        self.next_add(from, added);
    }

    /// Record replacement of the single element at `at`.
    pub fn next_set(&mut self, at: usize, old: T, new: T) {
        self.next_replace(at, vec![old], vec![new]);
    }

    /// Record a permutation of `[from, to)`: `permutation[i]` is the new
    /// absolute index of the element previously at `from + i`.
    ///
    /// # Panics
    ///
    /// If add/remove/update edits were already issued in this scope.
    pub fn next_permutation(&mut self, from: usize, to: usize, permutation: Vec<usize>) {
        self.check_open("next_permutation");
        if !self.recording {
            return;
        }
        assert_eq!(to - from, permutation.len(), "permutation must cover [from, to)");
        assert!(
            self.edits.is_empty() && self.updates.is_empty(),
            "next_permutation after add/remove/update edits in the same scope is unsupported"
        );
        self.permutation = Some(match self.permutation.take() {
            None => (from, to, permutation),
            Some(previous) => compose_permutations(previous, (from, to, permutation)),
        });
    }

    // ── buffering internals ─────────────────────────────────────────────

    /// Index of the last edit with `edit.from <= pos`, if any.
    fn edit_at_or_before(&self, pos: usize) -> Option<usize> {
        let upper = self.edits.partition_point(|e| e.from <= pos);
        upper.checked_sub(1)
    }

    /// Shift `from` of every edit in `self.edits[start..]` by `delta`.
    fn shift_edits(&mut self, start: usize, delta: isize) {
        for edit in &mut self.edits[start..] {
            edit.from = (edit.from as isize + delta) as usize;
        }
    }

    fn remove_one(&mut self, at: usize, element: T) {
        let idx = self.edit_at_or_before(at);
        match idx {
            // Removing an element this same scope added: it vanishes.
            Some(i) if at < self.edits[i].added_end() => {
                let offset = at - self.edits[i].from;
                self.edits[i].added.remove(offset);
                if self.edits[i].added.is_empty() && self.edits[i].removed.is_empty() {
                    self.edits.remove(i);
                    self.shift_edits(i, -1);
                } else {
                    self.shift_edits(i + 1, -1);
                }
            }
            // Removing the element right after an edit's added span: extend
            // that edit's removed run.
            Some(i) if at == self.edits[i].added_end() => {
                self.edits[i].removed.push(element);
                self.shift_edits(i + 1, -1);
            }
            _ => {
                let insert_at = idx.map_or(0, |i| i + 1);
                self.edits.insert(
                    insert_at,
                    Edit {
                        from: at,
                        removed: vec![element],
                        added: Vec::new(),
                    },
                );
                self.shift_edits(insert_at + 1, -1);
            }
        }
        self.remove_from_updates(at);
    }

    /// Adjust update ranges for an insertion of `count` at `pos`: ranges
    /// right of the insertion shift, a straddled range splits around it.
    fn insert_into_updates(&mut self, pos: usize, count: usize) {
        if self.updates.is_empty() {
            return;
        }
        let mut adjusted = Vec::with_capacity(self.updates.len() + 1);
        for &(from, to) in &self.updates {
            if to <= pos {
                adjusted.push((from, to));
            } else if from >= pos {
                adjusted.push((from + count, to + count));
            } else {
                adjusted.push((from, pos));
                adjusted.push((pos + count, to + count));
            }
        }
        self.updates = adjusted;
    }

    /// Adjust update ranges for a single removal at `pos`: removal wins over
    /// update, so a covering range shrinks by one.
    fn remove_from_updates(&mut self, pos: usize) {
        let mut adjusted = Vec::with_capacity(self.updates.len());
        for &(from, to) in &self.updates {
            let range = if to <= pos {
                (from, to)
            } else if from > pos {
                (from - 1, to - 1)
            } else {
                (from, to - 1)
            };
            if range.0 < range.1 {
                adjusted.push(range);
            }
        }
        self.updates = adjusted;
    }

    // ── finalization ────────────────────────────────────────────────────

    fn finalize(&mut self) -> Option<ListChange<T>> {
        let edits = std::mem::take(&mut self.edits);
        let updates = std::mem::take(&mut self.updates);
        let permutation = self.permutation.take();
        self.recording = false;

        let mut changes: Vec<SubChange<T>> = Vec::new();
        if let Some((from, to, permutation)) = permutation {
            changes.push(SubChange::Permute {
                from,
                to,
                permutation,
            });
        }

        // Merge exactly-touching edits, then interleave with update ranges
        // in ascending position order.
        let edits = coalesce_touching(edits);
        let mut edit_iter = edits.into_iter().peekable();
        let mut update_iter = updates.into_iter().peekable();
        loop {
            let take_edit = match (edit_iter.peek(), update_iter.peek()) {
                (Some(e), Some(&(ufrom, _))) => e.from <= ufrom,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            if take_edit {
                let edit = edit_iter.next().expect("peeked edit");
                changes.push(edit_to_sub_change(edit));
            } else {
                let (from, to) = update_iter.next().expect("peeked update");
                changes.push(SubChange::Update { from, to });
            }
        }

        if changes.is_empty() {
            None
        } else {
            #[cfg(feature = "tracing")]
            tracing::trace!(sub_changes = changes.len(), "finalized change record");
            Some(ListChange::new(changes))
        }
    }
}

fn edit_to_sub_change<T>(edit: Edit<T>) -> SubChange<T> {
    let Edit {
        from,
        removed,
        added,
    } = edit;
    match (removed.is_empty(), added.is_empty()) {
        (true, false) => SubChange::Add { from, added },
        (false, true) => SubChange::Remove { at: from, removed },
        _ => SubChange::Replace {
            from,
            removed,
            added,
        },
    }
}

/// Merge edits whose added span exactly touches the next edit's position.
fn coalesce_touching<T>(edits: EditBuf<T>) -> EditBuf<T> {
    let mut merged: EditBuf<T> = SmallVec::with_capacity(edits.len());
    for edit in edits {
        match merged.last_mut() {
            Some(last) if last.added_end() == edit.from => {
                last.removed.extend(edit.removed);
                last.added.extend(edit.added);
            }
            _ => merged.push(edit),
        }
    }
    merged
}

/// Compose two permutations issued in one scope into a single sub-change.
fn compose_permutations(
    first: (usize, usize, Vec<usize>),
    second: (usize, usize, Vec<usize>),
) -> (usize, usize, Vec<usize>) {
    let (f1, t1, p1) = first;
    let (f2, t2, p2) = second;
    let from = f1.min(f2);
    let to = t1.max(t2);
    let widen = |f: usize, t: usize, p: &[usize]| -> Vec<usize> {
        (from..to)
            .map(|j| if j >= f && j < t { p[j - f] } else { j })
            .collect()
    };
    let q1 = widen(f1, t1, &p1);
    let q2 = widen(f2, t2, &p2);
    let combined = (0..to - from).map(|i| q2[q1[i] - from]).collect();
    (from, to, combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open<T>() -> ChangeBuilder<T> {
        let mut b = ChangeBuilder::new();
        b.begin_change(true);
        b
    }

    fn finish<T>(mut b: ChangeBuilder<T>) -> Vec<SubChange<T>> {
        b.end_change().map_or_else(Vec::new, |c| c.into_iter().collect())
    }

    #[test]
    fn single_add() {
        let mut b = open();
        b.next_add(2, vec!['x', 'y']);
        assert_eq!(
            finish(b),
            vec![SubChange::Add {
                from: 2,
                added: vec!['x', 'y']
            }]
        );
    }

    #[test]
    fn adjacent_adds_merge() {
        let mut b = open();
        b.next_add(2, vec!['x']);
        b.next_add(3, vec!['y']);
        assert_eq!(
            finish(b),
            vec![SubChange::Add {
                from: 2,
                added: vec!['x', 'y']
            }]
        );
    }

    #[test]
    fn add_inside_added_span_splices() {
        let mut b = open();
        b.next_add(2, vec!['x', 'z']);
        b.next_add(3, vec!['y']);
        assert_eq!(
            finish(b),
            vec![SubChange::Add {
                from: 2,
                added: vec!['x', 'y', 'z']
            }]
        );
    }

    #[test]
    fn add_then_remove_cancels() {
        let mut b = open();
        b.next_add(2, vec!['x']);
        b.next_remove(2, vec!['x']);
        assert!(finish(b).is_empty());
    }

    #[test]
    fn add_two_remove_one_leaves_one() {
        let mut b = open();
        b.next_add(2, vec!['x', 'y']);
        b.next_remove(2, vec!['x']);
        assert_eq!(
            finish(b),
            vec![SubChange::Add {
                from: 2,
                added: vec!['y']
            }]
        );
    }

    #[test]
    fn remove_then_add_becomes_replace() {
        let mut b = open();
        b.next_remove(1, vec!['a']);
        b.next_add(1, vec!['b']);
        assert_eq!(
            finish(b),
            vec![SubChange::Replace {
                from: 1,
                removed: vec!['a'],
                added: vec!['b']
            }]
        );
    }

    #[test]
    fn remove_after_added_span_extends_removed_run() {
        let mut b = open();
        b.next_add(1, vec!['n']);
        b.next_remove(2, vec!['o']);
        assert_eq!(
            finish(b),
            vec![SubChange::Replace {
                from: 1,
                removed: vec!['o'],
                added: vec!['n']
            }]
        );
    }

    #[test]
    fn consecutive_removes_at_same_index_coalesce() {
        let mut b = open();
        b.next_remove(3, vec!['a']);
        b.next_remove(3, vec!['b']);
        assert_eq!(
            finish(b),
            vec![SubChange::Remove {
                at: 3,
                removed: vec!['a', 'b']
            }]
        );
    }

    #[test]
    fn disjoint_edits_stay_ordered() {
        let mut b = open();
        b.next_remove(5, vec!['z']);
        b.next_add(1, vec!['a']);
        assert_eq!(
            finish(b),
            vec![
                SubChange::Add {
                    from: 1,
                    added: vec!['a']
                },
                SubChange::Remove {
                    at: 6,
                    removed: vec!['z']
                },
            ]
        );
    }

    #[test]
    fn edit_buffer_spills_past_inline_capacity() {
        // Five disjoint removals, issued right-to-left so none touch: the
        // buffer outgrows its inline slots and must keep position order.
        let mut b = open();
        for at in (0..10).step_by(2).rev() {
            b.next_remove(at, vec![(b'a' + at as u8) as char]);
        }
        assert_eq!(
            finish(b),
            vec![
                SubChange::Remove { at: 0, removed: vec!['a'] },
                SubChange::Remove { at: 1, removed: vec!['c'] },
                SubChange::Remove { at: 2, removed: vec!['e'] },
                SubChange::Remove { at: 3, removed: vec!['g'] },
                SubChange::Remove { at: 4, removed: vec!['i'] },
            ]
        );
    }

    #[test]
    fn adjacent_updates_merge() {
        let mut b: ChangeBuilder<char> = open();
        b.next_update(4);
        b.next_update(2);
        b.next_update(3);
        assert_eq!(finish(b), vec![SubChange::Update { from: 2, to: 5 }]);
    }

    #[test]
    fn removal_wins_over_update() {
        let mut b = open();
        b.next_update(2);
        b.next_update(3);
        b.next_remove(2, vec!['x']);
        assert_eq!(
            finish(b),
            vec![
                SubChange::Remove {
                    at: 2,
                    removed: vec!['x']
                },
                SubChange::Update { from: 2, to: 3 },
            ]
        );
    }

    #[test]
    fn update_shifts_around_insertion() {
        let mut b = open();
        b.next_update(4);
        b.next_add(1, vec!['a', 'b']);
        assert_eq!(
            finish(b),
            vec![
                SubChange::Add {
                    from: 1,
                    added: vec!['a', 'b']
                },
                SubChange::Update { from: 6, to: 7 },
            ]
        );
    }

    #[test]
    fn permutation_stands_alone() {
        let mut b: ChangeBuilder<char> = open();
        b.next_permutation(0, 3, vec![2, 0, 1]);
        assert_eq!(
            finish(b),
            vec![SubChange::Permute {
                from: 0,
                to: 3,
                permutation: vec![2, 0, 1]
            }]
        );
    }

    #[test]
    fn permutations_compose() {
        let mut b: ChangeBuilder<char> = open();
        // Rotate left then swap the last two of [0, 3).
        b.next_permutation(0, 3, vec![2, 0, 1]);
        b.next_permutation(1, 3, vec![2, 1]);
        // Element 0: first to 2, then 2 → 1. Element 1: to 0, unchanged.
        // Element 2: to 1, then 1 → 2.
        assert_eq!(
            finish(b),
            vec![SubChange::Permute {
                from: 0,
                to: 3,
                permutation: vec![1, 0, 2]
            }]
        );
    }

    #[test]
    fn edits_after_permutation_are_emitted_after_it() {
        let mut b = open();
        b.next_permutation(0, 2, vec![1, 0]);
        b.next_add(2, vec!['c']);
        assert_eq!(
            finish(b),
            vec![
                SubChange::Permute {
                    from: 0,
                    to: 2,
                    permutation: vec![1, 0]
                },
                SubChange::Add {
                    from: 2,
                    added: vec!['c']
                },
            ]
        );
    }

    #[test]
    #[should_panic(expected = "next_permutation after add/remove/update")]
    fn permutation_after_edits_panics() {
        let mut b = open();
        b.next_add(0, vec!['a']);
        b.next_permutation(0, 1, vec![0]);
    }

    #[test]
    #[should_panic(expected = "outside a begin_change/end_change scope")]
    fn edit_outside_scope_panics() {
        let mut b: ChangeBuilder<char> = ChangeBuilder::new();
        b.next_add(0, vec!['a']);
    }

    #[test]
    #[should_panic(expected = "end_change called without begin_change")]
    fn unbalanced_end_panics() {
        let mut b: ChangeBuilder<char> = ChangeBuilder::new();
        b.end_change();
    }

    #[test]
    fn nested_scopes_finalize_once() {
        let mut b = ChangeBuilder::new();
        b.begin_change(true);
        b.next_add(0, vec!['a']);
        b.begin_change(true);
        b.next_add(1, vec!['b']);
        assert!(b.end_change().is_none());
        let record = b.end_change().expect("outermost end finalizes");
        assert_eq!(
            record.iter().collect::<Vec<_>>(),
            vec![&SubChange::Add {
                from: 0,
                added: vec!['a', 'b']
            }]
        );
    }

    #[test]
    fn non_recording_scope_discards_edits() {
        let mut b = ChangeBuilder::new();
        b.begin_change(false);
        b.next_add(0, vec!['a']);
        b.next_remove(5, vec!['b']);
        assert!(b.end_change().is_none());
        // A later recording scope starts clean.
        b.begin_change(true);
        b.next_add(0, vec!['c']);
        let record = b.end_change().expect("recorded");
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn empty_scope_yields_nothing() {
        let mut b: ChangeBuilder<char> = ChangeBuilder::new();
        b.begin_change(true);
        assert!(b.end_change().is_none());
    }

    #[test]
    fn set_is_single_element_replace() {
        let mut b = open();
        b.next_set(3, 'o', 'n');
        assert_eq!(
            finish(b),
            vec![SubChange::Replace {
                from: 3,
                removed: vec!['o'],
                added: vec!['n']
            }]
        );
    }
}
