//! Identity Registry - Stable keys for collection members.
//!
//! Each collection owns one [`Collection`] keyspace:
//! - Key ↔ element bidirectional mapping
//! - Free key pool for O(1) reuse once an element is untracked
//! - Occurrence counts, so one element placed twice shares one key
//!
//! Keys are not indices. Inserting or removing elsewhere in the collection
//! never changes the key of an element that stays.

use std::collections::HashMap;
use std::fmt;

use crate::types::{Item, ItemId};

// =============================================================================
// Key
// =============================================================================

/// Opaque, stable token for one element within one keyspace.
///
/// Renders as `#<n>`, which is also the member-selector form used in
/// notification paths (`items.#3.rank`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(usize);

impl Key {
    /// Parse the `#<n>` form. Anything else yields `None`.
    pub fn parse(s: &str) -> Option<Key> {
        let digits = s.strip_prefix('#')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Key)
    }

    /// Raw slot number.
    pub fn slot(self) -> usize {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Collection
// =============================================================================

/// Key table for one collection instance.
pub struct Collection<T> {
    /// Key → element.
    key_to_item: HashMap<Key, Item<T>>,
    /// Element identity → key.
    item_to_key: HashMap<ItemId, Key>,
    /// Key → number of occurrences in the owning collection.
    occurrences: HashMap<Key, usize>,
    /// Released keys, reused LIFO.
    free_keys: Vec<Key>,
    /// Next key if the pool is empty.
    next_key: usize,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            key_to_item: HashMap::new(),
            item_to_key: HashMap::new(),
            occurrences: HashMap::new(),
            free_keys: Vec::new(),
            next_key: 0,
        }
    }
}

impl<T> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a keyspace for every element of `items`.
    pub fn from_items(items: &[Item<T>]) -> Self {
        let mut keys = Self::new();
        for item in items {
            keys.add(item);
        }
        keys
    }

    /// Track one occurrence of `item`.
    ///
    /// Returns the existing key if the element is already tracked.
    pub fn add(&mut self, item: &Item<T>) -> Key {
        if let Some(&key) = self.item_to_key.get(&item.id()) {
            *self.occurrences.entry(key).or_insert(0) += 1;
            return key;
        }

        let key = self.free_keys.pop().unwrap_or_else(|| {
            let key = Key(self.next_key);
            self.next_key += 1;
            key
        });

        self.key_to_item.insert(key, item.clone());
        self.item_to_key.insert(item.id(), key);
        self.occurrences.insert(key, 1);
        key
    }

    /// Drop one occurrence of `item`.
    ///
    /// The key is released back to the pool when the last occurrence goes.
    /// Returns the key the element had, or `None` if it was not tracked.
    pub fn remove(&mut self, item: &Item<T>) -> Option<Key> {
        let key = *self.item_to_key.get(&item.id())?;

        let remaining = self.occurrences.get_mut(&key).map(|count| {
            *count = count.saturating_sub(1);
            *count
        });

        if remaining.unwrap_or(0) == 0 {
            self.release(key, item.id());
        }
        Some(key)
    }

    /// Swap the element behind `old`'s key for `new`, keeping the key.
    ///
    /// Falls back to remove + add when `old` occurs more than once or `new`
    /// is already tracked. Returns the key now denoting `new`.
    pub fn replace(&mut self, old: &Item<T>, new: &Item<T>) -> Key {
        if let Some(&key) = self.item_to_key.get(&old.id()) {
            let single = self.occurrences.get(&key).copied().unwrap_or(0) <= 1;
            if single && !self.contains(new) {
                self.item_to_key.remove(&old.id());
                self.item_to_key.insert(new.id(), key);
                self.key_to_item.insert(key, new.clone());
                return key;
            }
        }

        self.remove(old);
        self.add(new)
    }

    /// Track `added` and untrack `removed`, one call per occurrence, netted
    /// per element so an element on both sides keeps its key.
    ///
    /// Net removals run first, so keys they free go to net additions.
    pub fn apply_delta(&mut self, removed: &[Item<T>], added: &[Item<T>]) {
        let mut net: HashMap<ItemId, isize> = HashMap::new();
        for item in added {
            *net.entry(item.id()).or_default() += 1;
        }
        for item in removed {
            *net.entry(item.id()).or_default() -= 1;
        }

        for item in removed {
            let Some(count) = net.get_mut(&item.id()) else {
                continue;
            };
            if *count < 0 {
                *count += 1;
                self.remove(item);
            }
        }
        for item in added {
            let Some(count) = net.get_mut(&item.id()) else {
                continue;
            };
            if *count > 0 {
                *count -= 1;
                self.add(item);
            }
        }
    }

    fn release(&mut self, key: Key, id: ItemId) {
        self.key_to_item.remove(&key);
        self.item_to_key.remove(&id);
        self.occurrences.remove(&key);
        self.free_keys.push(key);
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Key for a tracked element.
    pub fn key_of(&self, item: &Item<T>) -> Option<Key> {
        self.item_to_key.get(&item.id()).copied()
    }

    /// Element behind a key. `None` means "no longer a member".
    pub fn element_at(&self, key: Key) -> Option<Item<T>> {
        self.key_to_item.get(&key).cloned()
    }

    pub fn contains(&self, item: &Item<T>) -> bool {
        self.item_to_key.contains_key(&item.id())
    }

    /// Number of distinct tracked elements.
    pub fn len(&self) -> usize {
        self.key_to_item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_to_item.is_empty()
    }

    /// Forget every element and restart key numbering.
    pub fn clear(&mut self) {
        self.key_to_item.clear();
        self.item_to_key.clear();
        self.occurrences.clear();
        self.free_keys.clear();
        self.next_key = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format_round_trip() {
        let key = Key(12);
        assert_eq!(key.to_string(), "#12");
        assert_eq!(Key::parse("#12"), Some(key));
        assert_eq!(Key::parse("12"), None);
        assert_eq!(Key::parse("#"), None);
        assert_eq!(Key::parse("#1a"), None);
        assert_eq!(Key::parse("#+1"), None);
    }

    #[test]
    fn test_add_and_lookup() {
        let a = Item::new("a");
        let b = Item::new("b");
        let mut keys = Collection::new();

        let ka = keys.add(&a);
        let kb = keys.add(&b);

        assert_ne!(ka, kb);
        assert_eq!(keys.key_of(&a), Some(ka));
        assert!(keys.element_at(kb).is_some_and(|item| item.ptr_eq(&b)));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_keys_survive_removal_elsewhere() {
        let items: Vec<Item<i32>> = (0..4).map(Item::new).collect();
        let mut keys = Collection::from_items(&items);
        let k3 = keys.key_of(&items[3]);

        keys.remove(&items[0]);
        keys.remove(&items[1]);

        assert_eq!(keys.key_of(&items[3]), k3, "key must not shift like an index");
    }

    #[test]
    fn test_released_key_is_reused() {
        let a = Item::new(1);
        let b = Item::new(2);
        let mut keys = Collection::new();

        let ka = keys.add(&a);
        keys.remove(&a);
        assert_eq!(keys.element_at(ka), None, "released key must miss");

        let kb = keys.add(&b);
        assert_eq!(kb, ka, "free pool should hand the key back");
    }

    #[test]
    fn test_duplicate_occurrences_share_key() {
        let a = Item::new(1);
        let mut keys = Collection::new();

        let k1 = keys.add(&a);
        let k2 = keys.add(&a);
        assert_eq!(k1, k2);
        assert_eq!(keys.len(), 1);

        keys.remove(&a);
        assert_eq!(keys.key_of(&a), Some(k1), "one occurrence still tracked");

        keys.remove(&a);
        assert_eq!(keys.key_of(&a), None);
    }

    #[test]
    fn test_remove_untracked_misses() {
        let mut keys: Collection<i32> = Collection::new();
        assert_eq!(keys.remove(&Item::new(0)), None);
    }

    #[test]
    fn test_replace_keeps_key() {
        let a = Item::new(1);
        let b = Item::new(2);
        let mut keys = Collection::new();
        let k = keys.add(&a);

        assert_eq!(keys.replace(&a, &b), k);
        assert_eq!(keys.key_of(&a), None);
        assert!(keys.element_at(k).is_some_and(|item| item.ptr_eq(&b)));
    }

    #[test]
    fn test_apply_delta_nets_occurrences() {
        let a = Item::new(1);
        let b = Item::new(2);
        let c = Item::new(3);
        let mut keys = Collection::from_items(&[a.clone(), b.clone()]);
        let ka = keys.key_of(&a);
        let kb = keys.key_of(&b);

        // a stays (out once, in twice), b leaves, c arrives.
        keys.apply_delta(&[a.clone(), b.clone()], &[a.clone(), c.clone(), a.clone()]);

        assert_eq!(keys.key_of(&a), ka, "element on both sides keeps its key");
        assert_eq!(keys.key_of(&b), None);
        assert_eq!(keys.key_of(&c), kb, "freed key goes to the newcomer");

        keys.remove(&a);
        assert_eq!(keys.key_of(&a), ka, "a holds two occurrences");
        keys.remove(&a);
        assert_eq!(keys.key_of(&a), None);
    }

    #[test]
    fn test_clear_restarts_numbering() {
        let mut keys = Collection::new();
        keys.add(&Item::new(1));
        keys.add(&Item::new(2));
        keys.clear();

        assert!(keys.is_empty());
        assert_eq!(keys.add(&Item::new(3)), Key(0));
    }
}
