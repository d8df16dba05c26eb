//! Core types shared by every module.
//!
//! Elements are never copied between collections. An [`Item`] is a shared
//! handle, so the Source list and the derived view hold the *same* allocation
//! and an in-place edit is visible through both.

use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

// =============================================================================
// Item - Shared element handle
// =============================================================================

/// Shared, interior-mutable handle to one collection element.
///
/// Equality and hashing are by identity: two `Item`s are equal only if they
/// point at the same allocation, regardless of the values inside.
pub struct Item<T>(Rc<RefCell<T>>);

impl<T> Item<T> {
    /// Wrap a value in a new handle.
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Identity of this element (stable while any handle is alive).
    pub fn id(&self) -> ItemId {
        ItemId(Rc::as_ptr(&self.0) as usize)
    }

    /// Check whether both handles denote the same element.
    pub fn ptr_eq(&self, other: &Item<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Borrow the element immutably.
    ///
    /// Panics if the element is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Borrow the element mutably.
    ///
    /// Panics if the element is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Run `f` against the element in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}

impl<T: Clone> Item<T> {
    /// Copy the current value out of the handle.
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<T> Clone for Item<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> PartialEq for Item<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for Item<T> {}

impl<T> Hash for Item<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl<T> From<T> for Item<T> {
    fn from(value: T) -> Self {
        Item::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Item<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(value) => f.debug_tuple("Item").field(&*value).finish(),
            Err(_) => f.debug_tuple("Item").field(&"<borrowed>").finish(),
        }
    }
}

/// Identity of an [`Item`] allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(usize);

// =============================================================================
// Callbacks
// =============================================================================

/// Membership predicate: `(element, source index, source array) -> keep?`
pub type FilterFn<T> = Rc<dyn Fn(&T, usize, &[Item<T>]) -> bool>;

/// Ordering among selected elements.
pub type SortFn<T> = Rc<dyn Fn(&T, &T) -> Ordering>;

/// Cleanup function returned by subscriptions.
pub type Cleanup = Box<dyn FnOnce()>;
