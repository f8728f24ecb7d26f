#![forbid(unsafe_code)]

//! The filtered transformation view.
//!
//! # Design
//!
//! [`FilteredView`] observes a source [`ObservableVec`] and maintains
//! `index_map`: a strictly increasing array where `index_map[i]` is the
//! source index of the view's `i`-th visible element. Upstream change
//! records are consumed sub-change by sub-change and the map is patched
//! incrementally; a source edit costs work proportional to the affected
//! range, not the whole list. Only a predicate swap
//! ([`set_predicate`](FilteredView::set_predicate)) pays for a full rebuild.
//!
//! The view registers on its source through a weak listener adapter: it does
//! not keep itself alive through the source, so dropping every view handle
//! detaches it at the next source delivery. [`release`](FilteredView::release)
//! detaches immediately.
//!
//! # Invariants
//!
//! After any operation:
//!
//! 1. `index_map` is strictly increasing.
//! 2. `predicate(source[index_map[i]])` holds for every `i`.
//! 3. The visible elements are exactly the predicate-passing source
//!    elements, in source order.
//! 4. All upstream sub-changes of one record are reflected downstream as one
//!    atomic record.

use std::cell::RefCell;
use std::rc::Rc;

use obx_core::listener::{InvalidationCallback, Observable, WeakListener};
use obx_core::registry::ListenerList;

use crate::builder::ChangeBuilder;
use crate::change::{ListChange, ListChangeCallback, SubChange};
use crate::list::ObservableVec;
use crate::sort::stable_sort_range;

type Predicate<T> = dyn Fn(&T) -> bool;

struct ViewState<T> {
    /// `index_map[i]` = source index of the view's i-th element. Strictly
    /// increasing.
    index_map: Vec<usize>,
    /// `None` means accept-all.
    predicate: Option<Rc<Predicate<T>>>,
    builder: ChangeBuilder<T>,
}

impl<T> ViewState<T> {
    fn accepts(&self, element: &T) -> bool {
        self.predicate.as_ref().is_none_or(|p| p(element))
    }

    /// First view position whose mapped source index is >= `source_index`;
    /// `index_map.len()` if none. O(log n).
    fn find_position(&self, source_index: usize) -> usize {
        self.index_map.partition_point(|&s| s < source_index)
    }

    /// Amortized growth: capacity jumps to `desired * 3 / 2 + 1` when the
    /// source outgrows it; never shrinks.
    fn ensure_capacity(&mut self, desired: usize) {
        if desired > self.index_map.capacity() {
            let target = desired * 3 / 2 + 1;
            self.index_map.reserve_exact(target - self.index_map.len());
        }
    }
}

/// Source indices accepted by `predicate` (accept-all when `None`), in order.
fn scan<T>(data: &[T], predicate: Option<&Predicate<T>>) -> Vec<usize> {
    data.iter()
        .enumerate()
        .filter(|&(_, e)| predicate.is_none_or(|p| p(e)))
        .map(|(i, _)| i)
        .collect()
}

struct ViewShared<T> {
    state: RefCell<ViewState<T>>,
    source: ObservableVec<T>,
    invalidation: ListenerList<InvalidationCallback>,
    list_listeners: ListenerList<ListChangeCallback<T>>,
}

/// A derived, read-only view of an [`ObservableVec`] under a predicate,
/// kept incrementally synchronized.
///
/// Cloning a `FilteredView` creates a new handle to the **same** view.
pub struct FilteredView<T> {
    shared: Rc<ViewShared<T>>,
    /// The source-side listener; kept alive by this handle only, so the
    /// weak registration on the source dies with the view.
    handler: Rc<ListChangeCallback<T>>,
    adapter: Rc<WeakListener<ListChangeCallback<T>>>,
}

impl<T> Clone for FilteredView<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            handler: Rc::clone(&self.handler),
            adapter: Rc::clone(&self.adapter),
        }
    }
}

impl<T: std::fmt::Debug + Clone + 'static> std::fmt::Debug for FilteredView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteredView")
            .field("visible", &self.to_vec())
            .finish()
    }
}

impl<T: Clone + 'static> FilteredView<T> {
    /// A view that accepts every source element.
    pub fn new(source: &ObservableVec<T>) -> Self {
        Self::build(source, None)
    }

    /// A view showing only the source elements matching `predicate`.
    pub fn with_predicate(source: &ObservableVec<T>, predicate: impl Fn(&T) -> bool + 'static) -> Self {
        Self::build(source, Some(Rc::new(predicate)))
    }

    fn build(source: &ObservableVec<T>, predicate: Option<Rc<Predicate<T>>>) -> Self {
        let index_map = source.with(|data| scan(data, predicate.as_deref()));
        let state = ViewState {
            index_map,
            predicate,
            builder: ChangeBuilder::new(),
        };
        let shared = Rc::new(ViewShared {
            state: RefCell::new(state),
            source: source.clone(),
            invalidation: ListenerList::new(),
            list_listeners: ListenerList::new(),
        });

        let shared2 = Rc::clone(&shared);
        let handler: Rc<ListChangeCallback<T>> =
            Rc::new(move |change| Self::source_changed(&shared2, change));
        let adapter = source.add_list_listener_weak(&handler);
        Self {
            shared,
            handler,
            adapter,
        }
    }

    /// Stop tracking the source. The view keeps its current index map but no
    /// longer updates; reads still resolve through the source, so later
    /// source mutations can leave the map stale.
    pub fn release(&self) {
        self.adapter.clear();
        self.shared.source.remove_list_adapter(&self.adapter);
    }

    // ── read surface ────────────────────────────────────────────────────

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.borrow().index_map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.state.borrow().index_map.is_empty()
    }

    /// The view's `i`-th visible element, cloned from the source.
    ///
    /// # Panics
    ///
    /// If `i >= len()`.
    #[must_use]
    pub fn get(&self, i: usize) -> T {
        let src = self.source_index(i);
        self.shared.source.get(src)
    }

    #[must_use]
    pub fn try_get(&self, i: usize) -> Option<T> {
        let state = self.shared.state.borrow();
        let src = *state.index_map.get(i)?;
        drop(state);
        self.shared.source.try_get(src)
    }

    /// Source index of the view's `i`-th element.
    ///
    /// # Panics
    ///
    /// If `i >= len()`.
    #[must_use]
    pub fn source_index(&self, i: usize) -> usize {
        let state = self.shared.state.borrow();
        assert!(
            i < state.index_map.len(),
            "index {i} out of range (len {})",
            state.index_map.len()
        );
        state.index_map[i]
    }

    /// Visit the visible elements by reference, in view order, without
    /// cloning.
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        let map = self.shared.state.borrow().index_map.clone();
        self.shared.source.with(|data| {
            for &i in &map {
                f(&data[i]);
            }
        });
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        let map = self.shared.state.borrow().index_map.clone();
        self.shared
            .source
            .with(|data| map.iter().map(|&i| data[i].clone()).collect())
    }

    /// Replace the predicate and rebuild the view in one full pass.
    ///
    /// Observers see the whole view replaced by a single
    /// [`SubChange::Replace`].
    pub fn set_predicate(&self, predicate: impl Fn(&T) -> bool + 'static) {
        self.refilter(Some(Rc::new(predicate)));
    }

    /// Drop the predicate (accept-all) and rebuild.
    pub fn clear_predicate(&self) {
        self.refilter(None);
    }

    // ── change propagation ──────────────────────────────────────────────

    fn source_changed(shared: &Rc<ViewShared<T>>, change: &ListChange<T>) {
        let (record, changed) = {
            let mut state = shared.state.borrow_mut();
            state.ensure_capacity(shared.source.len());
            state.builder.begin_change(!shared.list_listeners.is_empty());
            let mut changed = false;
            for sub in change {
                changed |= match sub {
                    SubChange::Permute {
                        from,
                        to,
                        permutation,
                    } => Self::apply_permute(&mut state, *from, *to, permutation),
                    SubChange::Update { from, to } => {
                        Self::apply_update(&mut state, &shared.source, *from, *to)
                    }
                    SubChange::Add { from, added } => {
                        Self::apply_add_remove(&mut state, *from, &[], added)
                    }
                    SubChange::Remove { at, removed } => {
                        Self::apply_add_remove(&mut state, *at, removed, &[])
                    }
                    SubChange::Replace {
                        from,
                        removed,
                        added,
                    } => Self::apply_add_remove(&mut state, *from, removed, added),
                };
            }
            (state.builder.end_change(), changed)
        };
        if changed {
            Self::notify(shared, record);
        }
    }

    /// Remap the affected slice of `index_map` through the source
    /// permutation, then re-sort it (entries must stay ascending) and emit
    /// the permutation actually applied.
    fn apply_permute(
        state: &mut ViewState<T>,
        source_from: usize,
        _source_to: usize,
        permutation: &[usize],
    ) -> bool {
        let vfrom = state.find_position(source_from);
        let vto = state.find_position(source_from + permutation.len());
        if vfrom >= vto {
            return false;
        }
        for slot in &mut state.index_map[vfrom..vto] {
            *slot = permutation[*slot - source_from];
        }
        let view_perm = stable_sort_range(&mut state.index_map, vfrom, vto);
        state.builder.next_permutation(vfrom, vto, view_perm);
        true
    }

    /// Re-test every updated source element: pass→fail leaves, fail→pass
    /// enters, stable pass re-announces as an update, stable fail is silent.
    fn apply_update(
        state: &mut ViewState<T>,
        source: &ObservableVec<T>,
        from: usize,
        to: usize,
    ) -> bool {
        let mut changed = false;
        for src_idx in from..to {
            let element = source.get(src_idx);
            let passes = state.accepts(&element);
            let pos = state.find_position(src_idx);
            let mapped = state.index_map.get(pos) == Some(&src_idx);
            match (mapped, passes) {
                (true, true) => {
                    state.builder.next_update(pos);
                    changed = true;
                }
                (true, false) => {
                    state.index_map.remove(pos);
                    state.builder.next_remove(pos, vec![element]);
                    changed = true;
                }
                (false, true) => {
                    state.index_map.insert(pos, src_idx);
                    state.builder.next_add(pos, vec![element]);
                    changed = true;
                }
                (false, false) => {}
            }
        }
        changed
    }

    /// The general add/remove/replace path: drop mapped entries inside the
    /// removed span, shift the tail, then re-test the added span and splice
    /// survivors in.
    fn apply_add_remove(
        state: &mut ViewState<T>,
        source_from: usize,
        removed: &[T],
        added: &[T],
    ) -> bool {
        let vfrom = state.find_position(source_from);
        let vto = state.find_position(source_from + removed.len());
        let mut changed = false;

        // Mapped entries falling inside the removed span leave the view, in
        // view order; the emission position stays `vfrom` as they collapse.
        for i in vfrom..vto {
            let src_idx = state.index_map[i];
            let element = removed[src_idx - source_from].clone();
            state.builder.next_remove(vfrom, vec![element]);
            changed = true;
        }

        // Entries after the affected range shift by the net size delta.
        let delta = added.len() as isize - removed.len() as isize;
        if delta != 0 {
            for slot in &mut state.index_map[vto..] {
                *slot = (*slot as isize + delta) as usize;
            }
        }

        // Walk the added span: survivors overwrite vacated slots first, then
        // splice in; leftovers of the vacated range compact away.
        let mut fpos = vfrom;
        for (k, element) in added.iter().enumerate() {
            if state.accepts(element) {
                let src_idx = source_from + k;
                if fpos < vto {
                    state.index_map[fpos] = src_idx;
                } else {
                    state.index_map.insert(fpos, src_idx);
                }
                state.builder.next_add(fpos, vec![element.clone()]);
                fpos += 1;
                changed = true;
            }
        }
        if fpos < vto {
            state.index_map.drain(fpos..vto);
        }
        changed
    }

    /// Full rebuild, used only when the predicate itself changes.
    fn refilter(&self, predicate: Option<Rc<Predicate<T>>>) {
        let shared = &self.shared;
        let has_observers =
            !shared.list_listeners.is_empty() || !shared.invalidation.is_empty();

        let old_map = shared.state.borrow().index_map.clone();
        let (new_map, old_visible, new_visible) = shared.source.with(|data| {
            let new_map = scan(data, predicate.as_deref());
            if has_observers {
                let old: Vec<T> = old_map.iter().map(|&i| data[i].clone()).collect();
                let new: Vec<T> = new_map.iter().map(|&i| data[i].clone()).collect();
                (new_map, old, new)
            } else {
                (new_map, Vec::new(), Vec::new())
            }
        });

        let record = {
            let mut state = shared.state.borrow_mut();
            state.predicate = predicate;
            state.index_map = new_map;
            #[cfg(feature = "tracing")]
            tracing::debug!(visible = state.index_map.len(), "refiltered view");
            if has_observers {
                state
                    .builder
                    .begin_change(!shared.list_listeners.is_empty());
                state.builder.next_replace(0, old_visible, new_visible);
                state.builder.end_change()
            } else {
                None
            }
        };
        if has_observers {
            Self::notify(shared, record);
        }
    }

    // No state borrows are held here; listeners may re-enter the view (and
    // the source) freely.
    fn notify(shared: &Rc<ViewShared<T>>, record: Option<ListChange<T>>) {
        let proxy = ViewHandleProxy {
            shared: Rc::clone(shared),
        };
        for listener in shared.invalidation.snapshot_for_notify() {
            listener(&proxy);
        }
        if let Some(record) = record {
            for listener in shared.list_listeners.snapshot_for_notify() {
                listener(&record);
            }
        }
    }

    // ── listener surface ────────────────────────────────────────────────

    /// Register a list-change listener for the view's own records.
    pub fn add_list_listener(&self, listener: Rc<ListChangeCallback<T>>) {
        self.shared.list_listeners.add(listener);
    }

    pub fn add_list_listener_weak(
        &self,
        listener: &Rc<ListChangeCallback<T>>,
    ) -> Rc<WeakListener<ListChangeCallback<T>>> {
        self.shared.list_listeners.add_weak(listener)
    }

    pub fn remove_list_listener(&self, listener: &Rc<ListChangeCallback<T>>) {
        self.shared.list_listeners.remove(listener);
    }

    #[must_use]
    pub fn has_list_listener(&self, listener: &Rc<ListChangeCallback<T>>) -> bool {
        self.shared.list_listeners.contains(listener)
    }
}

/// Invalidation callbacks receive `&dyn Observable`; this proxy carries the
/// view's registration surface into the callback without exposing `ViewShared`.
struct ViewHandleProxy<T> {
    shared: Rc<ViewShared<T>>,
}

impl<T: Clone + 'static> Observable for ViewHandleProxy<T> {
    fn add_listener(&self, listener: Rc<InvalidationCallback>) {
        self.shared.invalidation.add(listener);
    }

    fn add_listener_weak(
        &self,
        listener: &Rc<InvalidationCallback>,
    ) -> Rc<WeakListener<InvalidationCallback>> {
        self.shared.invalidation.add_weak(listener)
    }

    fn remove_listener(&self, listener: &Rc<InvalidationCallback>) {
        self.shared.invalidation.remove(listener);
    }

    fn has_listener(&self, listener: &Rc<InvalidationCallback>) -> bool {
        self.shared.invalidation.contains(listener)
    }
}

impl<T: Clone + 'static> Observable for FilteredView<T> {
    fn add_listener(&self, listener: Rc<InvalidationCallback>) {
        self.shared.invalidation.add(listener);
    }

    fn add_listener_weak(
        &self,
        listener: &Rc<InvalidationCallback>,
    ) -> Rc<WeakListener<InvalidationCallback>> {
        self.shared.invalidation.add_weak(listener)
    }

    fn remove_listener(&self, listener: &Rc<InvalidationCallback>) {
        self.shared.invalidation.remove(listener);
    }

    fn has_listener(&self, listener: &Rc<InvalidationCallback>) -> bool {
        self.shared.invalidation.contains(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_even(n: &i32) -> bool {
        n % 2 == 0
    }

    fn recording_listener<T: Clone + 'static>(
        view: &FilteredView<T>,
    ) -> (Rc<ListChangeCallback<T>>, Rc<RefCell<Vec<ListChange<T>>>>) {
        let records: Rc<RefCell<Vec<ListChange<T>>>> = Rc::new(RefCell::new(Vec::new()));
        let records2 = Rc::clone(&records);
        let listener: Rc<ListChangeCallback<T>> =
            Rc::new(move |change| records2.borrow_mut().push(change.clone()));
        view.add_list_listener(Rc::clone(&listener));
        (listener, records)
    }

    #[test]
    fn initial_filter() {
        let source = ObservableVec::from_vec(vec![1, 2, 3, 4, 5]);
        let view = FilteredView::with_predicate(&source, is_even);
        assert_eq!(view.to_vec(), vec![2, 4]);
        assert_eq!(view.len(), 2);
        assert_eq!(view.get(0), 2);
        assert_eq!(view.source_index(1), 3);
    }

    #[test]
    fn for_each_visits_in_view_order() {
        let source = ObservableVec::from_vec(vec![1, 2, 3, 4, 5]);
        let view = FilteredView::with_predicate(&source, is_even);
        let mut seen = Vec::new();
        view.for_each(|&e| seen.push(e));
        assert_eq!(seen, vec![2, 4]);
    }

    #[test]
    fn accept_all_mirrors_source() {
        let source = ObservableVec::from_vec(vec![1, 2, 3]);
        let view = FilteredView::new(&source);
        assert_eq!(view.to_vec(), vec![1, 2, 3]);
        source.push(4);
        assert_eq!(view.to_vec(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn append_emits_add_of_survivors() {
        let source = ObservableVec::from_vec(vec![1, 2, 3, 4, 5]);
        let view = FilteredView::with_predicate(&source, is_even);
        let (_l, records) = recording_listener(&view);

        source.extend([6, 7, 8]);
        assert_eq!(view.to_vec(), vec![2, 4, 6, 8]);
        let records = records.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].iter().collect::<Vec<_>>(),
            vec![&SubChange::Add {
                from: 2,
                added: vec![6, 8]
            }]
        );
    }

    #[test]
    fn removing_filtered_out_element_is_silent() {
        let source = ObservableVec::from_vec(vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let view = FilteredView::with_predicate(&source, is_even);
        let (_l, records) = recording_listener(&view);

        source.remove(0); // 1 was never visible
        assert!(records.borrow().is_empty());
        assert_eq!(view.to_vec(), vec![2, 4, 6, 8]);
    }

    #[test]
    fn removing_visible_element_emits_remove() {
        let source = ObservableVec::from_vec(vec![2, 3, 4, 5, 6, 7, 8]);
        let view = FilteredView::with_predicate(&source, is_even);
        let (_l, records) = recording_listener(&view);

        source.remove(0); // 2 was visible at view index 0
        assert_eq!(view.to_vec(), vec![4, 6, 8]);
        assert_eq!(
            records.borrow()[0].iter().collect::<Vec<_>>(),
            vec![&SubChange::Remove {
                at: 0,
                removed: vec![2]
            }]
        );
    }

    #[test]
    fn replace_retests_predicate() {
        let source = ObservableVec::from_vec(vec![1, 2, 3]);
        let view = FilteredView::with_predicate(&source, is_even);
        let (_l, records) = recording_listener(&view);

        // 2 -> 7: visible element replaced by a non-matching one.
        source.set(1, 7);
        assert_eq!(view.to_vec(), Vec::<i32>::new());
        assert_eq!(
            records.borrow()[0].iter().collect::<Vec<_>>(),
            vec![&SubChange::Remove {
                at: 0,
                removed: vec![2]
            }]
        );

        // 7 -> 6: non-matching replaced by a matching one.
        source.set(1, 6);
        assert_eq!(view.to_vec(), vec![6]);
        assert_eq!(
            records.borrow()[1].iter().collect::<Vec<_>>(),
            vec![&SubChange::Add {
                from: 0,
                added: vec![6]
            }]
        );
    }

    #[test]
    fn visible_replaced_by_visible_is_one_replace() {
        let source = ObservableVec::from_vec(vec![1, 2, 3]);
        let view = FilteredView::with_predicate(&source, is_even);
        let (_l, records) = recording_listener(&view);

        source.set(1, 4);
        assert_eq!(view.to_vec(), vec![4]);
        assert_eq!(
            records.borrow()[0].iter().collect::<Vec<_>>(),
            vec![&SubChange::Replace {
                from: 0,
                removed: vec![2],
                added: vec![4]
            }]
        );
    }

    #[test]
    fn set_predicate_is_one_replace() {
        let source = ObservableVec::from_vec(vec![1, 2, 3, 4, 5]);
        let view = FilteredView::with_predicate(&source, is_even);
        let (_l, records) = recording_listener(&view);

        view.clear_predicate();
        assert_eq!(view.to_vec(), vec![1, 2, 3, 4, 5]);
        let records = records.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].iter().collect::<Vec<_>>(),
            vec![&SubChange::Replace {
                from: 0,
                removed: vec![2, 4],
                added: vec![1, 2, 3, 4, 5]
            }]
        );
    }

    #[test]
    fn source_sort_emits_view_permutation() {
        let source = ObservableVec::from_vec(vec![5, 4, 3, 2, 1]);
        let view = FilteredView::with_predicate(&source, is_even);
        assert_eq!(view.to_vec(), vec![4, 2]);
        let (_l, records) = recording_listener(&view);

        source.sort();
        assert_eq!(source.to_vec(), vec![1, 2, 3, 4, 5]);
        assert_eq!(view.to_vec(), vec![2, 4]);
        let records = records.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].iter().collect::<Vec<_>>(),
            vec![&SubChange::Permute {
                from: 0,
                to: 2,
                permutation: vec![1, 0]
            }]
        );
    }

    #[test]
    fn batched_source_edits_deliver_one_view_record() {
        let source = ObservableVec::from_vec(vec![1, 2, 3, 4, 5]);
        let view = FilteredView::with_predicate(&source, is_even);
        let (_l, records) = recording_listener(&view);

        source.begin_change();
        source.push(6);
        source.remove(1); // removes 2
        source.end_change();

        assert_eq!(view.to_vec(), vec![4, 6]);
        let records = records.borrow();
        assert_eq!(records.len(), 1);
        // Replay against the previous view contents reproduces the new view.
        let mut mirror = vec![2, 4];
        records[0].apply_to(&mut mirror);
        assert_eq!(mirror, vec![4, 6]);
    }

    #[test]
    fn dropped_view_detaches_from_source() {
        let source = ObservableVec::from_vec(vec![1, 2]);
        let view = FilteredView::with_predicate(&source, is_even);
        drop(view);
        // Next mutation purges the dead weak registration; after that the
        // source has no list listeners left.
        source.push(3);
        source.push(4);
        assert_eq!(source.to_vec(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn released_view_stops_tracking_but_keeps_contents() {
        let source = ObservableVec::from_vec(vec![1, 2, 3, 4]);
        let view = FilteredView::with_predicate(&source, is_even);
        assert_eq!(view.to_vec(), vec![2, 4]);
        view.release();
        source.push(6);
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn index_map_stays_consistent_under_mixed_edits() {
        let source = ObservableVec::from_vec(vec![10, 15, 20, 25, 30]);
        let view = FilteredView::with_predicate(&source, |n| n % 10 == 0);
        assert_eq!(view.to_vec(), vec![10, 20, 30]);

        source.insert(2, 40); // [10, 15, 40, 20, 25, 30]
        assert_eq!(view.to_vec(), vec![10, 40, 20, 30]);

        source.remove(3); // removes 20
        assert_eq!(view.to_vec(), vec![10, 40, 30]);

        source.set(1, 50); // 15 -> 50 enters the view
        assert_eq!(view.to_vec(), vec![10, 50, 40, 30]);

        for i in 0..view.len() {
            assert_eq!(source.get(view.source_index(i)), view.get(i));
        }
    }

    #[test]
    fn source_update_of_visible_element_propagates() {
        let source = ObservableVec::from_vec(vec![1, 2, 3, 4]);
        let view = FilteredView::with_predicate(&source, is_even);
        let (_l, records) = recording_listener(&view);

        source.mark_updated(3); // 4 is visible at view index 1
        let records = records.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].iter().collect::<Vec<_>>(),
            vec![&SubChange::Update { from: 1, to: 2 }]
        );
    }

    #[test]
    fn source_update_of_filtered_out_element_is_silent() {
        let source = ObservableVec::from_vec(vec![1, 2, 3, 4]);
        let view = FilteredView::with_predicate(&source, is_even);
        let (_l, records) = recording_listener(&view);

        source.mark_updated(2); // 3 was never visible
        assert!(records.borrow().is_empty());
        assert_eq!(view.to_vec(), vec![2, 4]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn get_out_of_range_panics() {
        let source = ObservableVec::from_vec(vec![1, 2]);
        let view = FilteredView::with_predicate(&source, is_even);
        let _ = view.get(1);
    }
}
