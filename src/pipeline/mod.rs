//! View Pipeline
//!
//! Connects the observation layer to the engine.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Notification → router::classify → FilteredView → engine → observers + revision
//! ```
//!
//! ## Data Flow
//!
//! 1. **router** - Parses the notification path and picks a route
//! 2. **view** - Applies the route to its state through the engine, relinks
//! 3. **scheduler** - Coalesces wholesale recomputes into one per turn
//!
//! ## Key Design Principles
//!
//! - **One job at a time**: notifications raised while processing are queued
//! - **Incremental by default**: only source replacement and callback swaps
//!   rebuild the view
//! - **Publish after commit**: observers never see a half-applied change

pub mod router;
pub mod scheduler;
pub mod view;

// Re-exports
pub use router::{classify, ChangeValue, Dependencies, Ignored, Notification, Route, Selector};
pub use scheduler::{Scheduler, TurnQueue};
pub use view::{FilteredView, ViewEvent, ViewStats};
