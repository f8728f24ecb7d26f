#![forbid(unsafe_code)]

//! The per-observable listener registry.
//!
//! # Design
//!
//! [`ListenerList`] stores listener entries in a
//! `SmallVec<[Option<Entry>; 1]>`: the overwhelmingly common single-listener
//! case lives inline with no heap allocation, and an out-of-line array is
//! only materialized on the second registration. Removal blanks a slot
//! (`None`) instead of shifting; blank slots and reclaimed weak entries are
//! compacted lazily, on the next mutation or the next notification snapshot,
//! never during an in-progress pass.
//!
//! # Mutation during notification
//!
//! [`snapshot_for_notify`](ListenerList::snapshot_for_notify) captures the
//! live callbacks present at pass start and the caller iterates that
//! snapshot. Listeners added during the pass are therefore not notified until
//! the next pass; listeners removed during the pass still receive the current
//! one. This mirrors the captured-array iteration the rest of the crate
//! relies on for re-entrancy safety.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::listener::WeakListener;

enum Entry<L: ?Sized> {
    Strong(Rc<L>),
    Weak(Rc<WeakListener<L>>),
}

impl<L: ?Sized> Entry<L> {
    fn matches(&self, listener: &Rc<L>) -> bool {
        match self {
            Entry::Strong(l) => std::ptr::addr_eq(Rc::as_ptr(l), Rc::as_ptr(listener)),
            Entry::Weak(w) => w.refers_to(listener),
        }
    }
}

/// Registry of listeners of one kind for one observable.
///
/// # Invariants
///
/// 1. No listener appears twice (identity-checked on insert).
/// 2. Registration order is preserved across compaction.
/// 3. A reclaimed weak entry is dropped at most once, and never forwarded to
///    after the pass that discovers it dead.
pub struct ListenerList<L: ?Sized> {
    slots: RefCell<SmallVec<[Option<Entry<L>>; 1]>>,
}

impl<L: ?Sized> Default for ListenerList<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> ListenerList<L> {
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(SmallVec::new()),
        }
    }

    /// Register `listener`. Idempotent: a second add of the same `Rc` is a
    /// no-op.
    pub fn add(&self, listener: Rc<L>) {
        if self.contains(&listener) {
            return;
        }
        self.trim();
        self.slots.borrow_mut().push(Some(Entry::Strong(listener)));
    }

    /// Register a non-owning entry for `listener`, returning the adapter so
    /// the caller can [`clear`](WeakListener::clear) it during teardown.
    pub fn add_weak(&self, listener: &Rc<L>) -> Rc<WeakListener<L>> {
        let adapter = WeakListener::new(listener);
        self.add_adapter(Rc::clone(&adapter));
        adapter
    }

    /// Register a caller-constructed weak adapter.
    pub fn add_adapter(&self, adapter: Rc<WeakListener<L>>) {
        {
            let slots = self.slots.borrow();
            let already = slots.iter().flatten().any(|e| match e {
                Entry::Weak(w) => Rc::ptr_eq(w, &adapter),
                Entry::Strong(_) => false,
            });
            if already {
                return;
            }
        }
        self.trim();
        self.slots.borrow_mut().push(Some(Entry::Weak(adapter)));
    }

    /// Remove `listener`, matching strong entries by identity and weak
    /// entries by referent identity. Blanks the slot; compaction is lazy.
    pub fn remove(&self, listener: &Rc<L>) {
        let mut slots = self.slots.borrow_mut();
        for slot in slots.iter_mut() {
            if slot.as_ref().is_some_and(|e| e.matches(listener)) {
                *slot = None;
                return;
            }
        }
    }

    /// Remove a weak entry by adapter identity.
    pub fn remove_adapter(&self, adapter: &Rc<WeakListener<L>>) {
        let mut slots = self.slots.borrow_mut();
        for slot in slots.iter_mut() {
            let hit = matches!(slot, Some(Entry::Weak(w)) if Rc::ptr_eq(w, adapter));
            if hit {
                *slot = None;
                return;
            }
        }
    }

    /// Whether `listener` is registered (strong, or weakly with a live
    /// referent).
    pub fn contains(&self, listener: &Rc<L>) -> bool {
        self.slots
            .borrow()
            .iter()
            .flatten()
            .any(|e| e.matches(listener))
    }

    /// Number of live entries (blank slots and reclaimed weaks excluded).
    pub fn len(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .flatten()
            .filter(|e| match e {
                Entry::Strong(_) => true,
                Entry::Weak(w) => !w.was_reclaimed(),
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capture the callbacks to notify in this pass.
    ///
    /// Reclaimed weak entries discovered here are purged in the same scan
    /// (their single `removeListener` equivalent) and excluded from the
    /// snapshot. The returned snapshot is stable: mutations performed by the
    /// callbacks affect only later passes.
    pub fn snapshot_for_notify(&self) -> SmallVec<[Rc<L>; 2]> {
        let mut snapshot: SmallVec<[Rc<L>; 2]> = SmallVec::new();
        let mut slots = self.slots.borrow_mut();
        let mut purged = 0usize;
        slots.retain(|slot| match slot {
            None => false,
            Some(Entry::Strong(l)) => {
                snapshot.push(Rc::clone(l));
                true
            }
            Some(Entry::Weak(w)) => match w.upgrade() {
                Some(l) => {
                    snapshot.push(l);
                    true
                }
                None => {
                    purged += 1;
                    false
                }
            },
        });
        if purged > 0 {
            #[cfg(feature = "tracing")]
            tracing::trace!(purged, "purged reclaimed weak listeners");
        }
        snapshot
    }

    /// Compact blank slots and purge reclaimed weak entries, preserving
    /// order. Run opportunistically before inserts and notification scans.
    pub fn trim(&self) {
        self.slots.borrow_mut().retain(|slot| match slot {
            None => false,
            Some(Entry::Strong(_)) => true,
            Some(Entry::Weak(w)) => !w.was_reclaimed(),
        });
    }
}

impl<L: ?Sized> std::fmt::Debug for ListenerList<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerList")
            .field("len", &self.len())
            .finish()
    }
}
