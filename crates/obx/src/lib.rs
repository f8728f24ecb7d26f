#![forbid(unsafe_code)]

//! obx public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub use obx_collections as collections;
pub use obx_core as core;

pub mod prelude {
    pub use obx_collections::{
        BitSet, ChangeBuilder, FilteredView, ListChange, ListChangeCallback, ObservableVec,
        SubChange,
    };
    pub use obx_core::{
        ChangeCallback, InvalidationCallback, ListenerList, Observable, Property, WeakListener,
    };
}
