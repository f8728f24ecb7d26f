#![forbid(unsafe_code)]

//! Observable lists and derived views for obx.
//!
//! This crate is the collection half of the change-propagation engine:
//!
//! - [`ListChange`] / [`SubChange`]: the atomic, replayable description of
//!   one logical list mutation.
//! - [`ChangeBuilder`]: accumulates primitive edits issued inside a
//!   `begin_change`/`end_change` scope and coalesces them into one record.
//! - [`ObservableVec`]: a shared, mutable, ordered sequence that emits one
//!   [`ListChange`] per logical mutation.
//! - [`FilteredView`]: a derived view that mirrors a source list under a
//!   predicate and stays incrementally synchronized, without recomputing
//!   from scratch on ordinary edits.
//! - [`BitSet`] and the [`sort`] helpers: supporting utilities for grouped
//!   removal and permutation normalization.
//!
//! # Propagation
//!
//! A mutation on an [`ObservableVec`] runs inside a builder scope; the
//! outermost scope close finalizes one [`ListChange`], then invalidation
//! listeners fire, then list-change listeners receive the record. A
//! [`FilteredView`] registered on the source consumes that record sub-change
//! by sub-change, patches its index map, and emits its own single record to
//! its own listeners.

pub mod bitset;
pub mod builder;
pub mod change;
pub mod filtered;
pub mod list;
pub mod sort;

pub use bitset::BitSet;
pub use builder::ChangeBuilder;
pub use change::{ListChange, ListChangeCallback, SubChange};
pub use filtered::FilteredView;
pub use list::ObservableVec;
