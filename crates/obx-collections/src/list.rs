#![forbid(unsafe_code)]

//! The shared observable list.
//!
//! # Design
//!
//! `ObservableVec<T>` is a cloneable handle over `Rc<..>` shared state: a
//! backing `Vec<T>`, one reusable [`ChangeBuilder`], and the two listener
//! registries (invalidation, list-change). Every mutation runs inside a
//! builder scope; the outermost scope close finalizes one [`ListChange`] and
//! delivers it: invalidation listeners first, then list-change listeners.
//!
//! Change records are only materialized while list-change listeners are
//! registered, so mutation on an unobserved list never clones elements.
//!
//! All `RefCell` borrows are released before callbacks run: listeners may
//! re-enter any part of this surface (including further mutation, which
//! opens a fresh scope and delivers its own record before the outer
//! delivery loop continues).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use obx_core::listener::{InvalidationCallback, Observable, WeakListener};
use obx_core::registry::ListenerList;

use crate::bitset::BitSet;
use crate::builder::ChangeBuilder;
use crate::change::{ListChange, ListChangeCallback};
use crate::sort::stable_sort_by_permutation;

struct VecInner<T> {
    data: RefCell<Vec<T>>,
    builder: RefCell<ChangeBuilder<T>>,
    version: Cell<u64>,
    /// Set by any primitive mutation inside the current scope; decides
    /// whether the outermost scope close fires invalidation.
    dirty: Cell<bool>,
    invalidation: ListenerList<InvalidationCallback>,
    list_listeners: ListenerList<ListChangeCallback<T>>,
}

/// A shared, mutable, ordered sequence with change notification.
///
/// Cloning an `ObservableVec` creates a new handle to the **same** list and
/// listener set.
pub struct ObservableVec<T> {
    inner: Rc<VecInner<T>>,
}

impl<T> Clone for ObservableVec<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableVec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableVec")
            .field("data", &self.inner.data.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Clone + 'static> Default for ObservableVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> ObservableVec<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            inner: Rc::new(VecInner {
                data: RefCell::new(data),
                builder: RefCell::new(ChangeBuilder::new()),
                version: Cell::new(0),
                dirty: Cell::new(false),
                invalidation: ListenerList::new(),
                list_listeners: ListenerList::new(),
            }),
        }
    }

    // ── read surface ────────────────────────────────────────────────────

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.data.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.data.borrow().is_empty()
    }

    /// Element at `i`, cloned.
    ///
    /// # Panics
    ///
    /// If `i >= len()`.
    #[must_use]
    pub fn get(&self, i: usize) -> T {
        let data = self.inner.data.borrow();
        assert!(i < data.len(), "index {i} out of range (len {})", data.len());
        data[i].clone()
    }

    #[must_use]
    pub fn try_get(&self, i: usize) -> Option<T> {
        self.inner.data.borrow().get(i).cloned()
    }

    /// Access the elements by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.data.borrow())
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.data.borrow().clone()
    }

    /// Mutation counter: +1 per logical (outermost-scope) mutation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    // ── mutation surface ────────────────────────────────────────────────

    pub fn push(&self, value: T) {
        self.insert(self.len(), value);
    }

    /// Insert `value` at `i`.
    ///
    /// # Panics
    ///
    /// If `i > len()`.
    pub fn insert(&self, i: usize, value: T) {
        self.begin_change();
        {
            let mut data = self.inner.data.borrow_mut();
            assert!(i <= data.len(), "insert index {i} out of range (len {})", data.len());
            let mut builder = self.inner.builder.borrow_mut();
            if builder.is_recording() {
                builder.next_add(i, vec![value.clone()]);
            }
            data.insert(i, value);
        }
        self.mark_dirty();
        self.end_change();
    }

    /// Remove and return the element at `i`.
    ///
    /// # Panics
    ///
    /// If `i >= len()`.
    pub fn remove(&self, i: usize) -> T {
        self.begin_change();
        let removed = {
            let mut data = self.inner.data.borrow_mut();
            assert!(i < data.len(), "remove index {i} out of range (len {})", data.len());
            let removed = data.remove(i);
            let mut builder = self.inner.builder.borrow_mut();
            if builder.is_recording() {
                builder.next_remove(i, vec![removed.clone()]);
            }
            removed
        };
        self.mark_dirty();
        self.end_change();
        removed
    }

    /// Replace the element at `i`, returning the previous one.
    ///
    /// # Panics
    ///
    /// If `i >= len()`.
    pub fn set(&self, i: usize, value: T) -> T {
        self.begin_change();
        let old = {
            let mut data = self.inner.data.borrow_mut();
            assert!(i < data.len(), "set index {i} out of range (len {})", data.len());
            let mut builder = self.inner.builder.borrow_mut();
            if builder.is_recording() {
                builder.next_set(i, data[i].clone(), value.clone());
            }
            std::mem::replace(&mut data[i], value)
        };
        self.mark_dirty();
        self.end_change();
        old
    }

    /// Atomically replace all contents; observers see a single
    /// [`SubChange::Replace`](crate::SubChange::Replace) covering the whole
    /// list.
    pub fn set_all(&self, elements: impl IntoIterator<Item = T>) {
        let new: Vec<T> = elements.into_iter().collect();
        self.begin_change();
        {
            let mut data = self.inner.data.borrow_mut();
            let mut builder = self.inner.builder.borrow_mut();
            if builder.is_recording() {
                let old = std::mem::replace(&mut *data, new.clone());
                builder.next_replace(0, old, new);
            } else {
                *data = new;
            }
        }
        self.mark_dirty();
        self.end_change();
    }

    /// Append every element of `values`.
    pub fn extend(&self, values: impl IntoIterator<Item = T>) {
        let added: Vec<T> = values.into_iter().collect();
        if added.is_empty() {
            return;
        }
        self.insert_all(self.len(), added);
    }

    /// Insert every element of `values` at `i`, as one sub-change.
    ///
    /// # Panics
    ///
    /// If `i > len()`.
    pub fn insert_all(&self, i: usize, values: impl IntoIterator<Item = T>) {
        let added: Vec<T> = values.into_iter().collect();
        if added.is_empty() {
            return;
        }
        self.begin_change();
        {
            let mut data = self.inner.data.borrow_mut();
            assert!(i <= data.len(), "insert index {i} out of range (len {})", data.len());
            let mut builder = self.inner.builder.borrow_mut();
            if builder.is_recording() {
                builder.next_add(i, added.clone());
            }
            data.splice(i..i, added);
        }
        self.mark_dirty();
        self.end_change();
    }

    /// Remove all elements.
    pub fn clear(&self) {
        if self.is_empty() {
            return;
        }
        self.begin_change();
        {
            let mut data = self.inner.data.borrow_mut();
            let mut builder = self.inner.builder.borrow_mut();
            let old = std::mem::take(&mut *data);
            if builder.is_recording() {
                builder.next_remove(0, old);
            }
        }
        self.mark_dirty();
        self.end_change();
    }

    /// Remove every element matching `pred`, as one atomic change.
    /// Returns the number removed.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> usize {
        // Mark first, then sweep highest-first so earlier removals never
        // shift later marked indices.
        let mut marks = BitSet::new();
        let mut count = 0usize;
        self.with(|data| {
            for (i, element) in data.iter().enumerate() {
                if pred(element) {
                    marks.set(i);
                    count += 1;
                }
            }
        });
        if count == 0 {
            return 0;
        }
        self.begin_change();
        {
            let mut data = self.inner.data.borrow_mut();
            let mut builder = self.inner.builder.borrow_mut();
            let mut next = marks.prev_set_bit(data.len().saturating_sub(1));
            while let Some(i) = next {
                let removed = data.remove(i);
                if builder.is_recording() {
                    builder.next_remove(i, vec![removed]);
                }
                next = if i == 0 { None } else { marks.prev_set_bit(i - 1) };
            }
        }
        self.mark_dirty();
        self.end_change();
        count
    }

    /// Keep only elements matching `pred`; the inverse of
    /// [`remove_where`](Self::remove_where).
    pub fn retain(&self, pred: impl Fn(&T) -> bool) -> usize {
        self.remove_where(|e| !pred(e))
    }

    /// Stably sort with `cmp`, emitting a single
    /// [`SubChange::Permute`](crate::SubChange::Permute) if any element
    /// moved.
    pub fn sort_by(&self, cmp: impl FnMut(&T, &T) -> std::cmp::Ordering) {
        self.begin_change();
        let moved = {
            let mut data = self.inner.data.borrow_mut();
            let len = data.len();
            let perm = stable_sort_by_permutation(&mut *data, cmp);
            let moved = perm.iter().enumerate().any(|(i, &p)| i != p);
            if moved {
                let mut builder = self.inner.builder.borrow_mut();
                if builder.is_recording() {
                    builder.next_permutation(0, len, perm);
                }
            }
            moved
        };
        if moved {
            self.mark_dirty();
        }
        self.end_change();
    }

    /// Announce that the element at `i` changed in place (element types
    /// with interior mutability never trip the list's own recording).
    /// Observers receive a [`SubChange::Update`](crate::SubChange::Update);
    /// the element itself is not touched. Protected-surface primitive for
    /// view implementers.
    ///
    /// # Panics
    ///
    /// If `i >= len()`.
    pub fn mark_updated(&self, i: usize) {
        self.begin_change();
        {
            let data = self.inner.data.borrow();
            assert!(i < data.len(), "update index {i} out of range (len {})", data.len());
            let mut builder = self.inner.builder.borrow_mut();
            if builder.is_recording() {
                builder.next_update(i);
            }
        }
        self.mark_dirty();
        self.end_change();
    }

    /// Apply a caller-computed permutation of `[from, to)`:
    /// `permutation[i]` is the new absolute index of the element at
    /// `from + i`. Protected-surface primitive for view implementers.
    ///
    /// # Panics
    ///
    /// If the range is out of bounds or `permutation` does not cover it.
    pub fn permute(&self, from: usize, to: usize, permutation: Vec<usize>) {
        self.begin_change();
        {
            let mut data = self.inner.data.borrow_mut();
            assert!(to <= data.len() && from <= to, "permute range out of bounds");
            assert_eq!(to - from, permutation.len(), "permutation must cover [from, to)");
            let slice: Vec<T> = data[from..to].to_vec();
            for (i, element) in slice.into_iter().enumerate() {
                data[permutation[i]] = element;
            }
            let mut builder = self.inner.builder.borrow_mut();
            if builder.is_recording() {
                builder.next_permutation(from, to, permutation);
            }
        }
        self.mark_dirty();
        self.end_change();
    }

    // ── bracketed-mutation surface ──────────────────────────────────────

    /// Open a change scope so several mutations deliver as one atomic
    /// record. Scopes nest; every `begin_change` needs a matching
    /// [`end_change`](Self::end_change).
    pub fn begin_change(&self) {
        let record = {
            let builder = self.inner.builder.borrow();
            builder.is_open() || !self.inner.list_listeners.is_empty()
        };
        self.inner.builder.borrow_mut().begin_change(record);
    }

    /// Close one scope level; the outermost close finalizes and notifies.
    ///
    /// # Panics
    ///
    /// If no scope is open.
    pub fn end_change(&self) {
        let record = self.inner.builder.borrow_mut().end_change();
        if self.inner.builder.borrow().is_open() {
            return;
        }
        let dirty = self.inner.dirty.replace(false);
        if !dirty {
            return;
        }
        self.inner.version.set(self.inner.version.get() + 1);
        self.notify(record);
    }

    fn mark_dirty(&self) {
        self.inner.dirty.set(true);
    }

    // No borrows are held here; listeners may re-enter freely.
    fn notify(&self, record: Option<ListChange<T>>) {
        for listener in self.inner.invalidation.snapshot_for_notify() {
            listener(self as &dyn Observable);
        }
        if let Some(record) = record {
            for listener in self.inner.list_listeners.snapshot_for_notify() {
                listener(&record);
            }
        }
    }

    // ── listener surface ────────────────────────────────────────────────

    /// Register a list-change listener. Idempotent per `Rc` identity.
    pub fn add_list_listener(&self, listener: Rc<ListChangeCallback<T>>) {
        self.inner.list_listeners.add(listener);
    }

    /// Register a non-owning list-change listener; the returned adapter can
    /// be cleared by the owner during teardown.
    pub fn add_list_listener_weak(
        &self,
        listener: &Rc<ListChangeCallback<T>>,
    ) -> Rc<WeakListener<ListChangeCallback<T>>> {
        self.inner.list_listeners.add_weak(listener)
    }

    pub fn remove_list_listener(&self, listener: &Rc<ListChangeCallback<T>>) {
        self.inner.list_listeners.remove(listener);
    }

    #[must_use]
    pub fn has_list_listener(&self, listener: &Rc<ListChangeCallback<T>>) -> bool {
        self.inner.list_listeners.contains(listener)
    }

    pub(crate) fn remove_list_adapter(
        &self,
        adapter: &Rc<WeakListener<ListChangeCallback<T>>>,
    ) {
        self.inner.list_listeners.remove_adapter(adapter);
    }
}

impl<T: Clone + PartialEq + 'static> ObservableVec<T> {
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.inner.data.borrow().contains(value)
    }

    #[must_use]
    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.inner.data.borrow().iter().position(|e| e == value)
    }
}

impl<T: Clone + Ord + 'static> ObservableVec<T> {
    /// Stably sort ascending, emitting a single permutation.
    pub fn sort(&self) {
        self.sort_by(T::cmp);
    }
}

impl<T: Clone + 'static> Observable for ObservableVec<T> {
    fn add_listener(&self, listener: Rc<InvalidationCallback>) {
        self.inner.invalidation.add(listener);
    }

    fn add_listener_weak(
        &self,
        listener: &Rc<InvalidationCallback>,
    ) -> Rc<WeakListener<InvalidationCallback>> {
        self.inner.invalidation.add_weak(listener)
    }

    fn remove_listener(&self, listener: &Rc<InvalidationCallback>) {
        self.inner.invalidation.remove(listener);
    }

    fn has_listener(&self, listener: &Rc<InvalidationCallback>) -> bool {
        self.inner.invalidation.contains(listener)
    }
}
