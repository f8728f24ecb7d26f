#![forbid(unsafe_code)]

//! The generic observable value.
//!
//! One `Property<T>` replaces the whole parallel family of per-scalar
//! property types: any `Clone + PartialEq` value gets invalidation and
//! change notification through the same machinery.
//!
//! # Invariants
//!
//! 1. `version` increments exactly once per mutation that changes the value.
//! 2. Setting a value equal to the current value is a no-op (no version
//!    bump, no notifications).
//! 3. Invalidation listeners fire before change listeners.
//! 4. Listener registration/removal and re-entrant `set` from inside a
//!    callback are legal; they take effect on the next pass.

use std::cell::RefCell;
use std::rc::Rc;

use crate::listener::{ChangeCallback, InvalidationCallback, Observable, WeakListener};
use crate::registry::ListenerList;

struct State<T> {
    value: T,
    version: u64,
}

struct PropertyInner<T> {
    state: RefCell<State<T>>,
    invalidation: ListenerList<InvalidationCallback>,
    change: ListenerList<ChangeCallback<T>>,
}

/// A shared observable value.
///
/// Cloning a `Property` creates a new handle to the **same** value and
/// listener set.
pub struct Property<T> {
    inner: Rc<PropertyInner<T>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Property")
            .field("value", &state.value)
            .field("version", &state.version)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(PropertyInner {
                state: RefCell::new(State { value, version: 0 }),
                invalidation: ListenerList::new(),
                change: ListenerList::new(),
            }),
        }
    }

    /// Current value, cloned.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.state.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.state.borrow().value)
    }

    /// Mutation counter: +1 per effective `set`/`update`.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.state.borrow().version
    }

    /// Replace the value, notifying listeners if it actually changed.
    pub fn set(&self, value: T) {
        let old = {
            let mut state = self.inner.state.borrow_mut();
            if state.value == value {
                return;
            }
            state.version += 1;
            std::mem::replace(&mut state.value, value)
        };
        self.fire(&old);
    }

    /// Mutate the value in place; listeners fire if the result differs.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let old = {
            let state = self.inner.state.borrow();
            state.value.clone()
        };
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            f(&mut state.value);
            if state.value == old {
                false
            } else {
                state.version += 1;
                true
            }
        };
        if changed {
            self.fire(&old);
        }
    }

    // All RefCell borrows are released before any callback runs, so
    // listeners may re-enter `set`, `get`, or the registration surface.
    fn fire(&self, old: &T) {
        for listener in self.inner.invalidation.snapshot_for_notify() {
            listener(self as &dyn Observable);
        }
        if self.inner.change.is_empty() {
            return;
        }
        let new = self.get();
        for listener in self.inner.change.snapshot_for_notify() {
            listener(old, &new);
        }
    }

    /// Register a change listener invoked with `(old, new)`.
    pub fn add_change_listener(&self, listener: Rc<ChangeCallback<T>>) {
        self.inner.change.add(listener);
    }

    /// Register a non-owning change listener; the returned adapter can be
    /// [`clear`](WeakListener::clear)ed by the owner during teardown.
    pub fn add_change_listener_weak(
        &self,
        listener: &Rc<ChangeCallback<T>>,
    ) -> Rc<WeakListener<ChangeCallback<T>>> {
        self.inner.change.add_weak(listener)
    }

    pub fn remove_change_listener(&self, listener: &Rc<ChangeCallback<T>>) {
        self.inner.change.remove(listener);
    }

    #[must_use]
    pub fn has_change_listener(&self, listener: &Rc<ChangeCallback<T>>) -> bool {
        self.inner.change.contains(listener)
    }
}

impl<T: Clone + PartialEq + 'static> Observable for Property<T> {
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
