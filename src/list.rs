//! Source List - Caller-owned observed collection.
//!
//! [`List`] is a cheap-clone shared handle. It owns the source keyspace, so
//! the `#<n>` selectors in notification paths resolve against it.
//!
//! Mutation helpers apply the edit and return the descriptor an observation
//! layer would emit. They never notify anyone themselves:
//!
//! ```ignore
//! let splice = list.splice(1, 0, vec![Item::new("d")])?;
//! view.notify(Notification::splices("items", vec![splice]))?;
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::engine::{Collection, IndexSplice, Key};
use crate::error::{Result, ViewError};
use crate::types::Item;

struct ListInner<T> {
    items: Vec<Item<T>>,
    keys: Collection<T>,
}

/// Shared handle to an ordered list of [`Item`]s.
pub struct List<T> {
    inner: Rc<RefCell<ListInner<T>>>,
}

impl<T> Clone for List<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::from_items(Vec::new())
    }
}

impl<T> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List").field("len", &self.len()).finish()
    }
}

impl<T> List<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<Item<T>>) -> Self {
        let keys = Collection::from_items(&items);
        Self {
            inner: Rc::new(RefCell::new(ListInner { items, keys })),
        }
    }

    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        Self::from_items(values.into_iter().map(Item::new).collect())
    }

    /// Whether both handles denote the same list.
    pub fn ptr_eq(&self, other: &List<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Item<T>> {
        self.inner.borrow().items.get(index).cloned()
    }

    /// Copy of the current element handles.
    pub fn snapshot(&self) -> Vec<Item<T>> {
        self.inner.borrow().items.clone()
    }

    pub fn key_of(&self, item: &Item<T>) -> Option<Key> {
        self.inner.borrow().keys.key_of(item)
    }

    pub fn element_at(&self, key: Key) -> Option<Item<T>> {
        self.inner.borrow().keys.element_at(key)
    }

    pub fn index_of(&self, item: &Item<T>) -> Option<usize> {
        self.inner.borrow().items.iter().position(|i| i.ptr_eq(item))
    }

    /// Borrow the contents without cloning.
    pub fn with_items<R>(&self, f: impl FnOnce(&[Item<T>]) -> R) -> R {
        f(&self.inner.borrow().items)
    }

    /// Borrow the contents together with the keyspace.
    pub fn with<R>(&self, f: impl FnOnce(&[Item<T>], &Collection<T>) -> R) -> R {
        let inner = self.inner.borrow();
        f(&inner.items, &inner.keys)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Remove `delete_count` elements at `index` and insert `items` there.
    ///
    /// `delete_count` is clamped to the end of the list. An `index` past the
    /// end is rejected and the list is left untouched.
    pub fn splice(
        &self,
        index: usize,
        delete_count: usize,
        items: Vec<Item<T>>,
    ) -> Result<IndexSplice<T>> {
        let mut inner = self.inner.borrow_mut();
        let len = inner.items.len();
        if index > len {
            return Err(ViewError::SpliceOutOfRange {
                index,
                added: items.len(),
                len,
            });
        }

        let end = index + delete_count.min(len - index);
        let added_count = items.len();
        let ListInner { items: contents, keys } = &mut *inner;

        let removed: Vec<Item<T>> = contents.splice(index..end, items).collect();
        for item in &removed {
            keys.remove(item);
        }
        for item in &contents[index..index + added_count] {
            keys.add(item);
        }

        Ok(IndexSplice {
            object: self.clone(),
            index,
            removed,
            added_count,
        })
    }

    pub fn push(&self, item: Item<T>) -> IndexSplice<T> {
        let mut inner = self.inner.borrow_mut();
        let index = inner.items.len();
        inner.keys.add(&item);
        inner.items.push(item);
        IndexSplice {
            object: self.clone(),
            index,
            removed: Vec::new(),
            added_count: 1,
        }
    }

    pub fn insert(&self, index: usize, item: Item<T>) -> Result<IndexSplice<T>> {
        self.splice(index, 0, vec![item])
    }

    pub fn remove(&self, index: usize) -> Result<IndexSplice<T>> {
        let len = self.len();
        if index >= len {
            return Err(ViewError::IndexOutOfRange { index, len });
        }
        self.splice(index, 1, Vec::new())
    }

    /// Replace the element at `index`, keeping its key when possible.
    ///
    /// Returns the key now denoting the slot and the previous occupant.
    pub fn set(&self, index: usize, item: Item<T>) -> Result<(Key, Item<T>)> {
        let mut inner = self.inner.borrow_mut();
        let len = inner.items.len();
        let ListInner { items, keys } = &mut *inner;
        let slot = items
            .get_mut(index)
            .ok_or(ViewError::IndexOutOfRange { index, len })?;

        let key = keys.replace(slot, &item);
        let previous = std::mem::replace(slot, item);
        Ok((key, previous))
    }
}
