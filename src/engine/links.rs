//! Link Manager - Derived ↔ Source index correspondence.
//!
//! One [`Link`] per position of the derived view. Links are rebuilt in a
//! single pass by [`LinkTable::relink`] after every recompute, splice batch
//! and reposition.
//!
//! An element placed more than once gets one link per occurrence: the n-th
//! derived occurrence pairs with the n-th source occurrence. Item and key
//! lookups answer with the first occurrence.

use std::collections::{BTreeMap, HashMap, VecDeque};

use super::registry::{Collection, Key};
use crate::types::{Item, ItemId};

/// "Derived position `derived` is Source position `source`" for one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub derived: usize,
    pub source: usize,
    pub derived_key: Key,
    pub source_key: Key,
}

/// All live links of one view.
#[derive(Debug, Default)]
pub struct LinkTable {
    by_derived: BTreeMap<usize, Link>,
    /// Source index → derived index.
    by_source: HashMap<usize, usize>,
    /// Element → derived index of its first occurrence.
    by_item: HashMap<ItemId, usize>,
    by_source_key: HashMap<Key, usize>,
    by_derived_key: HashMap<Key, usize>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile links with the current collections.
    ///
    /// Every position of `derived` gets a link to a source position holding
    /// the same element, keys resolved through the keyspaces. Positions whose
    /// element has no key or no unclaimed source occurrence are skipped.
    /// Returns the number of links established.
    pub fn relink<T>(
        &mut self,
        source: &[Item<T>],
        source_keys: &Collection<T>,
        derived: &[Item<T>],
        derived_keys: &Collection<T>,
    ) -> usize {
        let mut unclaimed: HashMap<ItemId, VecDeque<usize>> = HashMap::new();
        for (index, item) in source.iter().enumerate() {
            unclaimed.entry(item.id()).or_default().push_back(index);
        }

        let previous = self.by_derived.len();
        self.clear();

        for (derived_index, item) in derived.iter().enumerate() {
            let id = item.id();
            let resolved = (
                derived_keys.key_of(item),
                source_keys.key_of(item),
                unclaimed.get_mut(&id).and_then(VecDeque::pop_front),
            );
            let (Some(derived_key), Some(source_key), Some(source_index)) = resolved else {
                tracing::trace!(derived_index, "element not linkable, skipping");
                continue;
            };

            self.insert(
                id,
                Link {
                    derived: derived_index,
                    source: source_index,
                    derived_key,
                    source_key,
                },
            );
        }

        let linked = self.by_derived.len();
        tracing::trace!(previous, linked, "relinked view");
        linked
    }

    fn insert(&mut self, id: ItemId, link: Link) {
        self.by_source.insert(link.source, link.derived);
        self.by_item.entry(id).or_insert(link.derived);
        self.by_source_key.entry(link.source_key).or_insert(link.derived);
        self.by_derived_key.entry(link.derived_key).or_insert(link.derived);
        self.by_derived.insert(link.derived, link);
    }

    pub fn clear(&mut self) {
        self.by_derived.clear();
        self.by_source.clear();
        self.by_item.clear();
        self.by_source_key.clear();
        self.by_derived_key.clear();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Link of the first occurrence of an element.
    pub fn link_for(&self, id: ItemId) -> Option<Link> {
        self.by_item.get(&id).and_then(|&derived| self.at_derived(derived))
    }

    pub fn at_derived(&self, derived: usize) -> Option<Link> {
        self.by_derived.get(&derived).copied()
    }

    pub fn at_source(&self, source: usize) -> Option<Link> {
        self.by_source.get(&source).and_then(|&derived| self.at_derived(derived))
    }

    pub fn for_source_key(&self, key: Key) -> Option<Link> {
        self.by_source_key.get(&key).and_then(|&derived| self.at_derived(derived))
    }

    pub fn for_derived_key(&self, key: Key) -> Option<Link> {
        self.by_derived_key.get(&key).and_then(|&derived| self.at_derived(derived))
    }

    pub fn source_index_of(&self, derived: usize) -> Option<usize> {
        self.at_derived(derived).map(|link| link.source)
    }

    pub fn derived_index_of(&self, source: usize) -> Option<usize> {
        self.by_source.get(&source).copied()
    }

    pub fn len(&self) -> usize {
        self.by_derived.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_derived.is_empty()
    }

    /// All links, ordered by derived index.
    pub fn links(&self) -> Vec<Link> {
        self.by_derived.values().copied().collect()
    }
}
