//! Change Router - Classify incoming notifications.
//!
//! Path grammar, `<name>` being the configured source name:
//!
//! ```text
//! <name>                    whole list replaced      → recompute (debounced)
//! <name>.length             length only              → ignored
//! <name>.splices            structural edit          → splice translation
//! <name>.<sel>              member slot replaced     → swap or reposition
//! <name>.<sel>.<subpath>    member attribute changed → reposition, if observed;
//!                                                      forwarded either way
//! ```
//!
//! `<sel>` is a key (`#3`) or a plain source index (`3`).

use std::fmt;

use crate::engine::{IndexSplice, Key};
use crate::list::List;
use crate::options::ObservedPaths;
use crate::types::Item;

// =============================================================================
// Notification
// =============================================================================

/// Payload of a change notification.
pub enum ChangeValue<T> {
    /// New source list (or none).
    List(Option<List<T>>),
    /// New length.
    Length(usize),
    /// Structural edits, all against the list they name.
    Splices(Vec<IndexSplice<T>>),
    /// New occupant of a member slot.
    Member(Option<Item<T>>),
    /// An attribute changed; the element itself carries the new value.
    Attribute,
}

impl<T> Clone for ChangeValue<T> {
    fn clone(&self) -> Self {
        match self {
            ChangeValue::List(list) => ChangeValue::List(list.clone()),
            ChangeValue::Length(len) => ChangeValue::Length(*len),
            ChangeValue::Splices(splices) => ChangeValue::Splices(splices.clone()),
            ChangeValue::Member(item) => ChangeValue::Member(item.clone()),
            ChangeValue::Attribute => ChangeValue::Attribute,
        }
    }
}

/// One change reported by the observation layer.
pub struct Notification<T> {
    pub path: String,
    pub value: ChangeValue<T>,
}

impl<T> Clone for Notification<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            value: self.value.clone(),
        }
    }
}

impl<T> fmt::Debug for Notification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.value {
            ChangeValue::List(_) => "list",
            ChangeValue::Length(_) => "length",
            ChangeValue::Splices(_) => "splices",
            ChangeValue::Member(_) => "member",
            ChangeValue::Attribute => "attribute",
        };
        f.debug_struct("Notification")
            .field("path", &self.path)
            .field("value", &kind)
            .finish()
    }
}

impl<T> Notification<T> {
    pub fn new(path: impl Into<String>, value: ChangeValue<T>) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }

    /// `<name>` was reassigned.
    pub fn replaced(name: &str, list: Option<List<T>>) -> Self {
        Self::new(name, ChangeValue::List(list))
    }

    /// `<name>.length` changed.
    pub fn length(name: &str, len: usize) -> Self {
        Self::new(format!("{name}.length"), ChangeValue::Length(len))
    }

    /// `<name>.splices` with the given edits.
    pub fn splices(name: &str, splices: Vec<IndexSplice<T>>) -> Self {
        Self::new(format!("{name}.splices"), ChangeValue::Splices(splices))
    }

    /// `<name>.<key>` slot now holds `item`.
    pub fn member(name: &str, key: Key, item: Option<Item<T>>) -> Self {
        Self::new(format!("{name}.{key}"), ChangeValue::Member(item))
    }

    /// `<name>.<key>.<subpath>` changed.
    pub fn attribute(name: &str, key: Key, subpath: &str) -> Self {
        Self::new(format!("{name}.{key}.{subpath}"), ChangeValue::Attribute)
    }
}

// =============================================================================
// Classification
// =============================================================================

bitflags::bitflags! {
    /// What the current projection depends on besides list structure.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Dependencies: u8 {
        const FILTER = 1 << 0;
        const SORT = 1 << 1;
        const OBSERVED = 1 << 2;
    }
}

impl Dependencies {
    /// Whether an attribute change can move an element.
    pub fn attribute_sensitive(self) -> bool {
        self.intersects(Dependencies::FILTER | Dependencies::SORT)
            && self.contains(Dependencies::OBSERVED)
    }

    /// Whether the view is anything but the source in source order.
    pub fn projects(self) -> bool {
        self.intersects(Dependencies::FILTER | Dependencies::SORT)
    }
}

/// Member selector segment of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Key(Key),
    Index(usize),
}

impl Selector {
    pub fn parse(segment: &str) -> Option<Selector> {
        if let Some(key) = Key::parse(segment) {
            return Some(Selector::Key(key));
        }
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            return segment.parse().ok().map(Selector::Index);
        }
        None
    }
}

/// Why a notification was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    /// Path does not belong to the source list.
    Unrelated,
    /// Length-only change; the splice notification carries the detail.
    Length,
    /// Member segment is neither a key nor an index.
    BadSelector,
}

/// Where a notification goes.
pub enum Route<T> {
    /// Source reassigned.
    Replace(Option<List<T>>),
    /// Something changed at the root without a new list.
    Recompute,
    Splices(Vec<IndexSplice<T>>),
    /// A member slot now holds a different element.
    Member {
        selector: Selector,
        item: Option<Item<T>>,
    },
    /// An attribute of one member changed. `reposition` is set when the
    /// change can move the element.
    Attribute {
        selector: Selector,
        subpath: String,
        reposition: bool,
    },
    Ignore(Ignored),
}

/// Classify a notification against the source name and dependencies.
pub fn classify<T>(
    notification: Notification<T>,
    source_name: &str,
    observe: &ObservedPaths,
    dependencies: Dependencies,
) -> Route<T> {
    let Notification { path, value } = notification;

    if path == source_name {
        return match value {
            ChangeValue::List(list) => Route::Replace(list),
            _ => Route::Recompute,
        };
    }

    let Some(rest) = path
        .strip_prefix(source_name)
        .and_then(|rest| rest.strip_prefix('.'))
    else {
        return Route::Ignore(Ignored::Unrelated);
    };

    match rest {
        "length" => return Route::Ignore(Ignored::Length),
        "splices" => {
            return match value {
                ChangeValue::Splices(splices) => Route::Splices(splices),
                _ => {
                    tracing::debug!(path = %path, "splices path without splice detail");
                    Route::Recompute
                }
            };
        }
        _ => {}
    }

    let (segment, subpath) = rest.split_once('.').unwrap_or((rest, ""));
    let Some(selector) = Selector::parse(segment) else {
        return Route::Ignore(Ignored::BadSelector);
    };

    if subpath.is_empty() {
        let item = match value {
            ChangeValue::Member(item) => item,
            _ => None,
        };
        return Route::Member { selector, item };
    }

    Route::Attribute {
        selector,
        subpath: subpath.to_owned(),
        reposition: dependencies.attribute_sensitive() && observe.matches(subpath),
    }
}
