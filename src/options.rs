//! View Options - Filter, sort and observed-path configuration.
//!
//! Construct with struct update syntax:
//!
//! ```ignore
//! let options = ViewOptions {
//!     filter: Some(filter_fn(|row: &Row, _, _| row.rank > 3)),
//!     sort: Some(sort_by_key(|row: &Row| row.rank)),
//!     observe: ObservedPaths::parse("rank"),
//!     ..Default::default()
//! };
//! ```
//!
//! Callbacks can also be given by name and resolved once, when the options
//! are applied, against an injected [`Resolver`]:
//!
//! ```ignore
//! let names = NamedCallbacks::new().with_sort("byRank", sort_by_key(|r: &Row| r.rank));
//! let options = ViewOptions {
//!     sort: Some(Callback::named("byRank")),
//!     resolver: Some(Rc::new(names)),
//!     ..Default::default()
//! };
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{Result, ViewError};
use crate::types::{FilterFn, Item, SortFn};

// =============================================================================
// Callbacks
// =============================================================================

/// A predicate or comparator, given directly or by name.
#[derive(Clone)]
pub enum Callback<F> {
    /// Callable supplied by value.
    Direct(F),
    /// Name looked up through the view's [`Resolver`].
    Named(String),
}

impl<F> Callback<F> {
    pub fn named(name: impl Into<String>) -> Self {
        Callback::Named(name.into())
    }
}

impl<F> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Direct(_) => f.write_str("Direct(..)"),
            Callback::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

/// Wrap a closure as a direct filter callback.
pub fn filter_fn<T>(f: impl Fn(&T, usize, &[Item<T>]) -> bool + 'static) -> Callback<FilterFn<T>> {
    Callback::Direct(Rc::new(f))
}

/// Wrap a closure as a direct sort callback.
pub fn sort_fn<T>(f: impl Fn(&T, &T) -> std::cmp::Ordering + 'static) -> Callback<SortFn<T>> {
    Callback::Direct(Rc::new(f))
}

/// Ascending order of a derived key.
pub fn sort_by_key<T: 'static, K: Ord + 'static>(key: impl Fn(&T) -> K + 'static) -> Callback<SortFn<T>> {
    Callback::Direct(Rc::new(move |a: &T, b: &T| key(a).cmp(&key(b))))
}

/// Namespace that named callbacks resolve against.
pub trait Resolver<T> {
    fn resolve_filter(&self, _name: &str) -> Option<FilterFn<T>> {
        None
    }

    fn resolve_sort(&self, _name: &str) -> Option<SortFn<T>> {
        None
    }
}

/// Map-backed [`Resolver`].
pub struct NamedCallbacks<T> {
    filters: HashMap<String, FilterFn<T>>,
    sorts: HashMap<String, SortFn<T>>,
}

impl<T> Default for NamedCallbacks<T> {
    fn default() -> Self {
        Self {
            filters: HashMap::new(),
            sorts: HashMap::new(),
        }
    }
}

impl<T> NamedCallbacks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter. Named entries in `callback` are ignored.
    pub fn with_filter(mut self, name: impl Into<String>, callback: Callback<FilterFn<T>>) -> Self {
        if let Callback::Direct(f) = callback {
            self.filters.insert(name.into(), f);
        }
        self
    }

    /// Register a comparator. Named entries in `callback` are ignored.
    pub fn with_sort(mut self, name: impl Into<String>, callback: Callback<SortFn<T>>) -> Self {
        if let Callback::Direct(f) = callback {
            self.sorts.insert(name.into(), f);
        }
        self
    }
}

impl<T> Resolver<T> for NamedCallbacks<T> {
    fn resolve_filter(&self, name: &str) -> Option<FilterFn<T>> {
        self.filters.get(name).cloned()
    }

    fn resolve_sort(&self, name: &str) -> Option<SortFn<T>> {
        self.sorts.get(name).cloned()
    }
}

pub(crate) fn resolve_filter<T>(
    callback: Option<Callback<FilterFn<T>>>,
    resolver: Option<&dyn Resolver<T>>,
) -> Result<Option<FilterFn<T>>> {
    match callback {
        None => Ok(None),
        Some(Callback::Direct(f)) => Ok(Some(f)),
        Some(Callback::Named(name)) => {
            let resolver = resolver.ok_or_else(|| ViewError::NoResolver(name.clone()))?;
            resolver
                .resolve_filter(&name)
                .map(Some)
                .ok_or(ViewError::UnresolvedCallback(name))
        }
    }
}

pub(crate) fn resolve_sort<T>(
    callback: Option<Callback<SortFn<T>>>,
    resolver: Option<&dyn Resolver<T>>,
) -> Result<Option<SortFn<T>>> {
    match callback {
        None => Ok(None),
        Some(Callback::Direct(f)) => Ok(Some(f)),
        Some(Callback::Named(name)) => {
            let resolver = resolver.ok_or_else(|| ViewError::NoResolver(name.clone()))?;
            resolver
                .resolve_sort(&name)
                .map(Some)
                .ok_or(ViewError::UnresolvedCallback(name))
        }
    }
}

// =============================================================================
// Observed Paths
// =============================================================================

/// Attribute paths whose change can move an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedPaths(Vec<String>);

impl ObservedPaths {
    /// Parse a comma and/or whitespace separated list (`"rank, address.city"`).
    pub fn parse(spec: &str) -> Self {
        let mut paths = Self::default();
        for path in spec.split(|c: char| c == ',' || c.is_whitespace()) {
            paths.push(path);
        }
        paths
    }

    /// Add a path. Empty and duplicate paths are ignored.
    pub fn push(&mut self, path: &str) {
        let path = path.trim().trim_matches('.');
        if !path.is_empty() && !self.0.iter().any(|p| p == path) {
            self.0.push(path.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Whether a change at `changed` (member selector already stripped)
    /// affects an observed path.
    ///
    /// Matches on whole segments when one path is a prefix of the other:
    /// `address` matches `address.city` both ways, `rank` does not match
    /// `ranking`. An empty path (whole member) matches everything.
    pub fn matches(&self, changed: &str) -> bool {
        self.0.iter().any(|observed| {
            observed
                .split('.')
                .zip(changed.split('.').filter(|s| !s.is_empty()))
                .all(|(a, b)| a == b)
        })
    }
}

impl From<&str> for ObservedPaths {
    fn from(spec: &str) -> Self {
        Self::parse(spec)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ObservedPaths {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut paths = Self::default();
        for path in iter {
            paths.push(path.as_ref());
        }
        paths
    }
}

// =============================================================================
// View Options
// =============================================================================

/// Configuration of one [`crate::FilteredView`].
pub struct ViewOptions<T> {
    /// Path name of the source list in notifications.
    pub source_name: String,
    /// Path name of the derived view, used when translating paths.
    pub view_name: String,
    pub filter: Option<Callback<FilterFn<T>>>,
    pub sort: Option<Callback<SortFn<T>>>,
    pub observe: ObservedPaths,
    pub resolver: Option<Rc<dyn Resolver<T>>>,
}

impl<T> Default for ViewOptions<T> {
    fn default() -> Self {
        Self {
            source_name: "items".to_string(),
            view_name: "filtered".to_string(),
            filter: None,
            sort: None,
            observe: ObservedPaths::default(),
            resolver: None,
        }
    }
}
