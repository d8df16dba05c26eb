//! View Engine - Identity, projection, links and incremental edits.
//!
//! The engine holds the pure building blocks the pipeline drives:
//! - Registry: stable `#<n>` keys per collection
//! - Compute: filter + stable sort projection
//! - Links: derived index ↔ source index correspondence
//! - Splice: batch translation of source edits into view edits
//! - Reposition: single-element re-evaluation
//!
//! # Architecture
//!
//! None of these modules own state beyond what they are handed. The view in
//! [`crate::pipeline`] owns the collections and calls into them:
//!
//! ```text
//! wholesale change  → compute  → links
//! structural edit   → splice   ─┐
//!                               ├─ reconcile → links
//! attribute change  → reposition ┘
//! ```

mod registry;
mod compute;
mod links;
mod splice;
mod reposition;

pub use registry::{Collection, Key};
pub use compute::compute;
pub use links::{Link, LinkTable};
pub use splice::{IndexSplice, ViewSplice};
pub use reposition::Reposition;

pub(crate) use reposition::reposition;
pub(crate) use splice::{translate_splices, ViewParts};
