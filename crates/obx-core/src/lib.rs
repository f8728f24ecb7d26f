#![forbid(unsafe_code)]

//! Observable values and listener plumbing for obx.
//!
//! This crate provides the change-notification core that the collection
//! crates build on:
//!
//! - [`Property`]: a shared, version-tracked value wrapper with invalidation
//!   and change notification.
//! - [`ListenerList`]: the per-observable listener registry, safe to mutate
//!   from inside a notification pass.
//! - [`WeakListener`]: a non-owning listener adapter that self-detaches once
//!   its referent is gone.
//!
//! # Architecture
//!
//! Everything here is single-threaded by design. Shared ownership is
//! `Rc<RefCell<..>>`; there are no locks and no suspension points, so
//! re-entrancy (mutating an observable, or its listener set, from inside a
//! callback) is legal and has defined semantics: a notification pass iterates
//! a snapshot captured at pass start, and mutations become visible on the
//! next pass.
//!
//! # Invariants
//!
//! 1. A listener is registered at most once per registry (identity check).
//! 2. Listeners are notified in registration order.
//! 3. Setting a [`Property`] to a value equal to the current one is a no-op
//!    (no version bump, no notifications).
//! 4. A reclaimed [`WeakListener`] receives at most one further delivery
//!    attempt and is removed from its registry exactly once.

pub mod listener;
pub mod registry;
pub mod value;

pub use listener::{ChangeCallback, InvalidationCallback, Observable, WeakListener};
pub use registry::ListenerList;
pub use value::Property;
