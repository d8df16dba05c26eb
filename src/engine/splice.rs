//! Splice Translator - Source edits → minimal derived-view edits.
//!
//! A batch of source splices is applied to the view in three steps:
//! 1. Project the post-edit source once (the local view of the edited list)
//! 2. Remove every occurrence of the re-placed elements (the removed ones,
//!    the ones whose occurrence count changed, and duplicates), highest
//!    index first
//! 3. Insert every projected occurrence of those elements in ascending
//!    target order so earlier insertions never shift later targets
//!
//! The same reconciliation backs single-element repositioning.
//!
//! Relinking is left to the caller, once per batch.

use std::collections::HashSet;
use std::fmt;

use super::compute::{compute, occurrence_counts};
use super::registry::Collection;
use crate::error::{Result, ViewError};
use crate::list::List;
use crate::types::{FilterFn, Item, ItemId, SortFn};

// =============================================================================
// Descriptors
// =============================================================================

/// A contiguous edit applied to a list: `removed` went out at `index`, and
/// `added_count` elements now start at `index` in `object`.
pub struct IndexSplice<T> {
    /// The list the edit was applied to (post-edit state).
    pub object: List<T>,
    pub index: usize,
    pub removed: Vec<Item<T>>,
    pub added_count: usize,
}

impl<T> IndexSplice<T> {
    /// Elements inserted by this edit, read from the list's current contents.
    pub fn added(&self) -> Vec<Item<T>> {
        self.object.with_items(|items| {
            let end = (self.index + self.added_count).min(items.len());
            items.get(self.index..end).map(<[_]>::to_vec).unwrap_or_default()
        })
    }
}

impl<T> Clone for IndexSplice<T> {
    fn clone(&self) -> Self {
        Self {
            object: self.object.clone(),
            index: self.index,
            removed: self.removed.clone(),
            added_count: self.added_count,
        }
    }
}

impl<T> fmt::Debug for IndexSplice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSplice")
            .field("index", &self.index)
            .field("removed", &self.removed.len())
            .field("added_count", &self.added_count)
            .finish()
    }
}

/// One edit applied to the derived view, in splice form.
pub struct ViewSplice<T> {
    pub index: usize,
    pub removed: Vec<Item<T>>,
    pub added: Vec<Item<T>>,
}

impl<T> ViewSplice<T> {
    pub fn removal(index: usize, item: Item<T>) -> Self {
        Self {
            index,
            removed: vec![item],
            added: Vec::new(),
        }
    }

    pub fn insertion(index: usize, item: Item<T>) -> Self {
        Self {
            index,
            removed: Vec::new(),
            added: vec![item],
        }
    }
}

impl<T> Clone for ViewSplice<T> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            removed: self.removed.clone(),
            added: self.added.clone(),
        }
    }
}

impl<T> fmt::Debug for ViewSplice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewSplice")
            .field("index", &self.index)
            .field("removed", &self.removed.len())
            .field("added", &self.added.len())
            .finish()
    }
}

// =============================================================================
// Translation
// =============================================================================

/// Derived view state the translator edits in place.
pub(crate) struct ViewParts<'a, T> {
    pub items: &'a mut Vec<Item<T>>,
    pub keys: &'a mut Collection<T>,
}

/// Check a batch of splices against the final length of the list they
/// report on. Walks the batch backwards, so each splice is checked against
/// the length right after it was applied.
fn validate<T>(splices: &[IndexSplice<T>], len: usize) -> Result<()> {
    let mut len = len;
    for splice in splices.iter().rev() {
        if splice.index + splice.added_count > len {
            return Err(ViewError::SpliceOutOfRange {
                index: splice.index,
                added: splice.added_count,
                len,
            });
        }
        len = len - splice.added_count + splice.removed.len();
    }
    Ok(())
}

/// Apply a batch of splices reported against `source` to the view.
///
/// `source` is the post-edit contents of the list all splices refer to.
/// Every splice is validated before anything is touched; an invalid batch
/// leaves the view unchanged. Returns the derived-side edits in the order
/// they were applied.
#[tracing::instrument(skip_all, fields(splices = splices.len()))]
pub(crate) fn translate_splices<T>(
    view: ViewParts<'_, T>,
    source: &[Item<T>],
    splices: &[IndexSplice<T>],
    filter: Option<&FilterFn<T>>,
    sort: Option<&SortFn<T>>,
) -> Result<Vec<ViewSplice<T>>> {
    validate(splices, source.len())?;

    let local_view = compute(source, filter, sort);
    let touched = splices
        .iter()
        .flat_map(|splice| splice.removed.iter())
        .map(Item::id)
        .collect();

    let edits = reconcile(view, source, &local_view, touched);
    tracing::debug!(edits = edits.len(), "translated splices");
    Ok(edits)
}

/// Move every occurrence of the re-placed elements to where `projected`
/// puts them.
///
/// Re-placed are the `touched` elements, elements whose occurrence count
/// differs between the view and `projected` (arrivals and departures), and
/// elements placed more than once in `source`. Every other element must
/// already sit in `projected` order; ranges reported by earlier splices of a
/// batch may have shifted, so nothing here trusts splice indices.
pub(crate) fn reconcile<T>(
    view: ViewParts<'_, T>,
    source: &[Item<T>],
    projected: &[Item<T>],
    mut touched: HashSet<ItemId>,
) -> Vec<ViewSplice<T>> {
    let derived_counts = occurrence_counts(view.items.as_slice());
    let projected_counts = occurrence_counts(projected);

    for (id, &count) in &derived_counts {
        if count > 1 || projected_counts.get(id) != Some(&count) {
            touched.insert(*id);
        }
    }
    for (id, &count) in &projected_counts {
        if derived_counts.get(id) != Some(&count) {
            touched.insert(*id);
        }
    }
    for (id, count) in occurrence_counts(source) {
        if count > 1 {
            touched.insert(id);
        }
    }

    let placed = |items: &[Item<T>]| -> Vec<(usize, ItemId)> {
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| touched.contains(&item.id()))
            .map(|(index, item)| (index, item.id()))
            .collect()
    };
    if placed(view.items.as_slice()) == placed(projected) {
        return Vec::new();
    }

    let mut edits = Vec::new();
    let mut removed = Vec::new();
    let mut added = Vec::new();

    // Highest index first so lower indices stay valid.
    for index in (0..view.items.len()).rev() {
        if touched.contains(&view.items[index].id()) {
            let item = view.items.remove(index);
            edits.push(ViewSplice::removal(index, item.clone()));
            removed.push(item);
        }
    }

    // Ascending target, so earlier insertions never shift later targets.
    for (target, item) in projected.iter().enumerate() {
        if touched.contains(&item.id()) {
            let index = target.min(view.items.len());
            view.items.insert(index, item.clone());
            edits.push(ViewSplice::insertion(index, item.clone()));
            added.push(item.clone());
        }
    }

    view.keys.apply_delta(&removed, &added);
    edits
}
