//! # spark-view
//!
//! Live filtered and sorted views over reactive lists.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals); each
//! view exposes a revision signal that effects can depend on.
//!
//! ## Architecture
//!
//! A [`FilteredView`] keeps a derived list in step with a source [`List`].
//! Elements are shared handles, never copies, so both sides see in-place
//! edits. Each collection gives its elements stable `#<n>` keys, and the view
//! keeps a link table from derived positions to source positions.
//!
//! Changes arrive as [`Notification`]s and are applied incrementally:
//! ```text
//! items.splices        → translate the splice batch
//! items.#3             → swap the slot, or re-place old and new occupants
//! items.#3.rank        → re-evaluate one element (if `rank` is observed)
//! items                → full recompute, debounced to once per turn
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Element handle and callback types
//! - [`engine`] - Keys, projection, links, splice translation, repositioning
//! - [`list`] - Reactive source list that reports its own splices
//! - [`options`] - Filter/sort callbacks, observed paths, view options
//! - [`pipeline`] - Router, scheduler and the view itself
//! - [`error`] - Error type

pub mod engine;
pub mod error;
pub mod list;
pub mod options;
pub mod pipeline;
pub mod types;

// Re-export commonly used items
pub use types::{Cleanup, FilterFn, Item, ItemId, SortFn};

pub use engine::{
    compute, Collection, IndexSplice, Key, Link, LinkTable, Reposition, ViewSplice,
};

pub use error::{Result, ViewError};

pub use list::List;

pub use options::{
    filter_fn, sort_by_key, sort_fn, Callback, NamedCallbacks, ObservedPaths, Resolver,
    ViewOptions,
};

pub use pipeline::{
    ChangeValue, FilteredView, Notification, Scheduler, TurnQueue, ViewEvent, ViewStats,
};
