//! Filtered View - Live filtered and sorted projection of a source list.
//!
//! The view owns its derived items, its own keyspace and the link table to
//! the source. Notifications are queued and processed one at a time; a
//! notification raised while another is being processed (for example from an
//! observer) waits in the queue instead of interleaving.
//!
//! ```text
//! notify ─► inbox ─► classify ─┬─ Replace/Recompute ─► debounce ─► flush ─► compute
//!                              ├─ Splices ──────────► translate_splices
//!                              ├─ Member ───────────► swap | reposition
//!                              └─ Attribute ────────► reposition (if observed) + path
//!                                                         │
//!                                                    relink ─► observers ─► revision
//! ```
//!
//! Filter and sort callbacks run while the view is borrowed. They must not
//! call back into the view.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use spark_signals::{signal, Signal};

use super::router::{classify, Notification, Route, Selector, Dependencies};
use super::scheduler::{Debounce, Scheduler};
use crate::engine::{
    compute, reposition, translate_splices, Collection, IndexSplice, Key, Link, LinkTable,
    ViewParts, ViewSplice,
};
use crate::error::{Result, ViewError};
use crate::list::List;
use crate::options::{
    resolve_filter, resolve_sort, Callback, ObservedPaths, Resolver, ViewOptions,
};
use crate::types::{Cleanup, FilterFn, Item, SortFn};

// =============================================================================
// Events
// =============================================================================

/// Change published to view observers.
pub enum ViewEvent<T> {
    /// The view was rebuilt; carries the full new contents.
    Reset(Vec<Item<T>>),
    /// One incremental edit, in application order.
    Splice(ViewSplice<T>),
    /// An attribute of a linked member changed, as a view path
    /// (`filtered.2.name`). One event per derived occurrence.
    Path(String),
}

impl<T> Clone for ViewEvent<T> {
    fn clone(&self) -> Self {
        match self {
            ViewEvent::Reset(items) => ViewEvent::Reset(items.clone()),
            ViewEvent::Splice(splice) => ViewEvent::Splice(splice.clone()),
            ViewEvent::Path(path) => ViewEvent::Path(path.clone()),
        }
    }
}

impl<T> fmt::Debug for ViewEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewEvent::Reset(items) => f.debug_tuple("Reset").field(&items.len()).finish(),
            ViewEvent::Splice(splice) => f.debug_tuple("Splice").field(splice).finish(),
            ViewEvent::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

/// Work counters, mostly for tests and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewStats {
    /// Full recomputes, including the initial one.
    pub recomputes: u64,
    /// Splice batches translated incrementally.
    pub splice_batches: u64,
    /// Single-element re-evaluations.
    pub repositions: u64,
    /// Link table rebuilds.
    pub relinks: u64,
}

// =============================================================================
// State
// =============================================================================

enum Job<T> {
    Notify(Notification<T>),
    /// Deferred debounced recompute.
    Flush,
    /// Unconditional recompute.
    Recompute,
}

struct ViewState<T> {
    source: Option<List<T>>,
    items: Vec<Item<T>>,
    keys: Collection<T>,
    links: LinkTable,
    filter: Option<FilterFn<T>>,
    sort: Option<SortFn<T>>,
    observe: ObservedPaths,
    source_name: String,
    view_name: String,
    resolver: Option<Rc<dyn Resolver<T>>>,
    stats: ViewStats,
}

impl<T> ViewState<T> {
    fn dependencies(&self) -> Dependencies {
        let mut deps = Dependencies::empty();
        deps.set(Dependencies::FILTER, self.filter.is_some());
        deps.set(Dependencies::SORT, self.sort.is_some());
        deps.set(Dependencies::OBSERVED, !self.observe.is_empty());
        deps
    }

    fn relink(&mut self) {
        let Self {
            source,
            items,
            keys,
            links,
            stats,
            ..
        } = self;
        match source {
            Some(list) => {
                list.with(|src, src_keys| links.relink(src, src_keys, items, keys));
            }
            None => links.clear(),
        }
        stats.relinks += 1;
    }

    /// Rebuild from scratch. Elements that stay keep their derived keys.
    #[tracing::instrument(skip_all)]
    fn recompute(&mut self) -> ViewEvent<T> {
        let next = match &self.source {
            Some(list) => list.with_items(|src| compute(src, self.filter.as_ref(), self.sort.as_ref())),
            None => Vec::new(),
        };

        self.keys.apply_delta(&self.items, &next);
        self.items = next.clone();
        self.stats.recomputes += 1;
        self.relink();
        tracing::debug!(len = self.items.len(), "recomputed view");
        ViewEvent::Reset(next)
    }

    /// Translate splices against the current source. The flag reports
    /// splices that named another list and need a recompute instead.
    fn apply_splices(&mut self, splices: Vec<IndexSplice<T>>) -> Result<(Vec<ViewEvent<T>>, bool)> {
        let Some(source) = self.source.clone() else {
            tracing::debug!("splices without a source, ignoring");
            return Ok((Vec::new(), false));
        };

        let (own, foreign): (Vec<_>, Vec<_>) =
            splices.into_iter().partition(|splice| splice.object.ptr_eq(&source));
        let stale = !foreign.is_empty();
        if stale {
            tracing::debug!(count = foreign.len(), "splices against another list");
        }
        if own.is_empty() {
            return Ok((Vec::new(), stale));
        }

        let Self {
            items,
            keys,
            filter,
            sort,
            stats,
            ..
        } = self;
        let edits = source.with_items(|src| {
            translate_splices(
                ViewParts { items, keys },
                src,
                &own,
                filter.as_ref(),
                sort.as_ref(),
            )
        })?;
        stats.splice_batches += 1;

        self.relink();
        Ok((edits.into_iter().map(ViewEvent::Splice).collect(), stale))
    }

    /// Source key and current occupant of a member selector.
    fn resolve(&self, selector: Selector) -> Option<(Key, Item<T>)> {
        let list = self.source.as_ref()?;
        match selector {
            Selector::Key(key) => list.element_at(key).map(|item| (key, item)),
            Selector::Index(index) => {
                let item = list.get(index)?;
                let key = list.key_of(&item)?;
                Some((key, item))
            }
        }
    }

    /// Re-place every occurrence of `members` and anything whose count
    /// drifted from the source.
    fn reposition_members(&mut self, members: &[Item<T>]) -> Vec<ViewEvent<T>> {
        let Some(source) = self.source.clone() else {
            return Vec::new();
        };

        let Self {
            items,
            keys,
            filter,
            sort,
            stats,
            ..
        } = self;
        let (_, edits) = source.with_items(|src| {
            reposition(
                members,
                src,
                ViewParts { items, keys },
                filter.as_ref(),
                sort.as_ref(),
            )
        });
        stats.repositions += 1;

        self.relink();
        edits.into_iter().map(ViewEvent::Splice).collect()
    }

    /// An attribute of a source member changed.
    fn change_attribute(
        &mut self,
        selector: Selector,
        subpath: &str,
        moves: bool,
    ) -> Vec<ViewEvent<T>> {
        let Some((key, item)) = self.resolve(selector) else {
            tracing::debug!(?selector, "attribute change for unknown member");
            return Vec::new();
        };

        let mut events = if moves {
            self.reposition_members(&[item])
        } else {
            Vec::new()
        };
        events.extend(
            self.links
                .links()
                .into_iter()
                .filter(|link| link.source_key == key)
                .map(|link| ViewEvent::Path(format!("{}.{}.{subpath}", self.view_name, link.derived))),
        );
        events
    }

    /// A source slot now holds a different element.
    fn replace_member(&mut self, selector: Selector, hint: Option<Item<T>>) -> Vec<ViewEvent<T>> {
        let Some((key, current)) = self.resolve(selector) else {
            tracing::debug!(?selector, "member replaced in unknown slot");
            return Vec::new();
        };
        if hint.is_some_and(|hint| !hint.ptr_eq(&current)) {
            tracing::debug!(%key, "member payload differs from the slot, using the slot");
        }

        // The link table still describes the slot's previous occupant.
        let previous = self.links.for_source_key(key).and_then(|link| {
            self.items
                .get(link.derived)
                .filter(|old| !old.ptr_eq(&current))
                .map(|old| (link.derived, old.clone()))
        });

        match previous {
            Some((index, old)) if !self.dependencies().projects() => {
                self.keys.replace(&old, &current);
                self.items[index] = current.clone();
                self.relink();
                vec![ViewEvent::Splice(ViewSplice {
                    index,
                    removed: vec![old],
                    added: vec![current],
                })]
            }
            Some((_, old)) => self.reposition_members(&[old, current]),
            None => self.reposition_members(&[current]),
        }
    }
}

// =============================================================================
// Shared
// =============================================================================

type Observer<T> = Rc<dyn Fn(&ViewEvent<T>)>;

struct Shared<T> {
    state: RefCell<ViewState<T>>,
    inbox: RefCell<VecDeque<Job<T>>>,
    dispatching: Cell<bool>,
    debounce: Debounce,
    scheduler: Rc<dyn Scheduler>,
    observers: RefCell<Vec<(usize, Observer<T>)>>,
    next_observer: Cell<usize>,
    revision: Signal<u64>,
    revision_count: Cell<u64>,
}

/// Marks the view as dispatching; cleared on drop, unwinding included.
struct DispatchGuard<'a>(&'a Cell<bool>);

impl<'a> DispatchGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

// =============================================================================
// FilteredView
// =============================================================================

/// Live filtered and sorted view of a [`List`].
///
/// Cloning yields another handle to the same view.
pub struct FilteredView<T> {
    shared: Rc<Shared<T>>,
}

impl<T> Clone for FilteredView<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for FilteredView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.state.try_borrow() {
            Ok(state) => f
                .debug_struct("FilteredView")
                .field("source_name", &state.source_name)
                .field("view_name", &state.view_name)
                .field("len", &state.items.len())
                .field("stats", &state.stats)
                .finish(),
            Err(_) => f.write_str("FilteredView { <busy> }"),
        }
    }
}

impl<T: 'static> FilteredView<T> {
    /// Create a view over `source` and compute its initial contents.
    ///
    /// Named callbacks are resolved here; an unknown name is an error.
    pub fn new(
        source: Option<List<T>>,
        options: ViewOptions<T>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Result<Self> {
        let ViewOptions {
            source_name,
            view_name,
            filter,
            sort,
            observe,
            resolver,
        } = options;
        let filter = resolve_filter(filter, resolver.as_deref())?;
        let sort = resolve_sort(sort, resolver.as_deref())?;

        let mut state = ViewState {
            source,
            items: Vec::new(),
            keys: Collection::new(),
            links: LinkTable::new(),
            filter,
            sort,
            observe,
            source_name,
            view_name,
            resolver,
            stats: ViewStats::default(),
        };
        state.recompute();
        tracing::debug!(
            source = %state.source_name,
            view = %state.view_name,
            len = state.items.len(),
            "created view"
        );

        Ok(Self {
            shared: Rc::new(Shared {
                state: RefCell::new(state),
                inbox: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
                debounce: Debounce::default(),
                scheduler,
                observers: RefCell::new(Vec::new()),
                next_observer: Cell::new(0),
                revision: signal(0u64),
                revision_count: Cell::new(0),
            }),
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current contents.
    pub fn items(&self) -> Vec<Item<T>> {
        self.shared.state.borrow().items.clone()
    }

    pub fn len(&self) -> usize {
        self.shared.state.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Item<T>> {
        self.shared.state.borrow().items.get(index).cloned()
    }

    pub fn source(&self) -> Option<List<T>> {
        self.shared.state.borrow().source.clone()
    }

    /// Key of `item` in the view's own keyspace.
    pub fn key_of(&self, item: &Item<T>) -> Option<Key> {
        self.shared.state.borrow().keys.key_of(item)
    }

    pub fn element_at(&self, key: Key) -> Option<Item<T>> {
        self.shared.state.borrow().keys.element_at(key)
    }

    pub fn stats(&self) -> ViewStats {
        self.shared.state.borrow().stats
    }

    /// Whether a debounced recompute is waiting for its turn.
    pub fn is_pending(&self) -> bool {
        self.shared.debounce.is_pending()
    }

    /// Signal bumped once per published change.
    ///
    /// Read it inside an effect to re-run whenever the view changes.
    pub fn revision(&self) -> Signal<u64> {
        self.shared.revision.clone()
    }

    /// Register an observer. Call the returned cleanup to unsubscribe.
    ///
    /// Observers run after the view is consistent and may read it or feed
    /// it further notifications; those are processed after the current one.
    pub fn subscribe(&self, observer: impl Fn(&ViewEvent<T>) + 'static) -> Cleanup {
        let id = self.shared.next_observer.get();
        self.shared.next_observer.set(id + 1);
        self.shared
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));

        let weak = Rc::downgrade(&self.shared);
        Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.observers.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }

    // =========================================================================
    // Links
    // =========================================================================

    pub fn links(&self) -> Vec<Link> {
        self.shared.state.borrow().links.links()
    }

    pub fn link_at(&self, derived_index: usize) -> Option<Link> {
        self.shared.state.borrow().links.at_derived(derived_index)
    }

    pub fn source_index_of(&self, derived_index: usize) -> Option<usize> {
        self.shared.state.borrow().links.source_index_of(derived_index)
    }

    pub fn derived_index_of(&self, source_index: usize) -> Option<usize> {
        self.shared.state.borrow().links.derived_index_of(source_index)
    }

    /// Rewrite a path between the view and its source.
    ///
    /// `filtered.3.name` becomes `items.7.name` when derived index 3 links to
    /// source index 7; key selectors map to keys (`items.#5` ↔ `filtered.#1`).
    /// Returns `None` for foreign paths and unlinked members.
    pub fn translate_path(&self, path: &str) -> Option<String> {
        let state = self.shared.state.borrow();
        let (head, rest) = path.split_once('.')?;
        let (segment, tail) = match rest.split_once('.') {
            Some((segment, tail)) => (segment, Some(tail)),
            None => (rest, None),
        };
        let selector = Selector::parse(segment)?;

        let (name, translated) = if head == state.view_name {
            let link = match selector {
                Selector::Index(index) => state.links.at_derived(index),
                Selector::Key(key) => state.links.for_derived_key(key),
            }?;
            let segment = match selector {
                Selector::Index(_) => link.source.to_string(),
                Selector::Key(_) => link.source_key.to_string(),
            };
            (&state.source_name, segment)
        } else if head == state.source_name {
            let link = match selector {
                Selector::Index(index) => state.links.at_source(index),
                Selector::Key(key) => state.links.for_source_key(key),
            }?;
            let segment = match selector {
                Selector::Index(_) => link.derived.to_string(),
                Selector::Key(_) => link.derived_key.to_string(),
            };
            (&state.view_name, segment)
        } else {
            return None;
        };

        Some(match tail {
            Some(tail) => format!("{name}.{translated}.{tail}"),
            None => format!("{name}.{translated}"),
        })
    }

    // =========================================================================
    // Write-through
    // =========================================================================

    /// Mutate the element at `derived_index` and report the change against
    /// the source as `<source>.#<key>.<subpath>`.
    ///
    /// The notification is also processed by this view and returned so the
    /// caller can forward it to other observers of the source.
    pub fn write(
        &self,
        derived_index: usize,
        subpath: &str,
        f: impl FnOnce(&mut T),
    ) -> Result<Notification<T>> {
        let (item, key, name) = {
            let state = self.shared.state.borrow();
            let item = state
                .items
                .get(derived_index)
                .cloned()
                .ok_or(ViewError::IndexOutOfRange {
                    index: derived_index,
                    len: state.items.len(),
                })?;
            let source = state.source.as_ref().ok_or(ViewError::NoSource)?;
            let key = source
                .key_of(&item)
                .ok_or(ViewError::Unlinked(derived_index))?;
            (item, key, state.source_name.clone())
        };

        item.update(f);

        let notification = if subpath.is_empty() {
            Notification::member(&name, key, Some(item))
        } else {
            Notification::attribute(&name, key, subpath)
        };
        self.notify(notification.clone())?;
        Ok(notification)
    }

    /// Put `item` into the source slot of the element at `derived_index`.
    pub fn replace(&self, derived_index: usize, item: Item<T>) -> Result<Notification<T>> {
        let (source, source_index, name) = {
            let state = self.shared.state.borrow();
            let old = state
                .items
                .get(derived_index)
                .ok_or(ViewError::IndexOutOfRange {
                    index: derived_index,
                    len: state.items.len(),
                })?;
            let source = state.source.clone().ok_or(ViewError::NoSource)?;
            let source_index = state
                .links
                .at_derived(derived_index)
                .map(|link| link.source)
                .or_else(|| source.index_of(old))
                .ok_or(ViewError::Unlinked(derived_index))?;
            (source, source_index, state.source_name.clone())
        };

        let (key, _) = source.set(source_index, item.clone())?;
        let notification = Notification::member(&name, key, Some(item));
        self.notify(notification.clone())?;
        Ok(notification)
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Point the view at another list. Recomputes on the next turn.
    pub fn set_source(&self, source: Option<List<T>>) -> Result<()> {
        let name = self.shared.state.borrow().source_name.clone();
        self.notify(Notification::replaced(&name, source))
    }

    /// Swap the filter. Recomputes on the next turn.
    pub fn set_filter(&self, filter: Option<Callback<FilterFn<T>>>) -> Result<()> {
        let resolver = self.shared.state.borrow().resolver.clone();
        let filter = resolve_filter(filter, resolver.as_deref())?;
        self.shared.state.borrow_mut().filter = filter;
        self.update();
        Ok(())
    }

    /// Swap the comparator. Recomputes on the next turn.
    pub fn set_sort(&self, sort: Option<Callback<SortFn<T>>>) -> Result<()> {
        let resolver = self.shared.state.borrow().resolver.clone();
        let sort = resolve_sort(sort, resolver.as_deref())?;
        self.shared.state.borrow_mut().sort = sort;
        self.update();
        Ok(())
    }

    /// Replace the observed attribute paths. Affects later notifications only.
    pub fn set_observe(&self, observe: ObservedPaths) {
        self.shared.state.borrow_mut().observe = observe;
    }

    // =========================================================================
    // Change processing
    // =========================================================================

    /// Feed one notification from the observation layer.
    ///
    /// Returns the first error raised while draining the queue. A rejected
    /// notification leaves the view unchanged.
    pub fn notify(&self, notification: Notification<T>) -> Result<()> {
        self.enqueue(Job::Notify(notification))
    }

    /// Request a debounced recompute. Requests in the same turn coalesce.
    pub fn update(&self) {
        if !self.shared.debounce.request() {
            tracing::trace!("recompute already pending");
            return;
        }

        let weak: Weak<Shared<T>> = Rc::downgrade(&self.shared);
        self.shared.scheduler.defer(Box::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if let Err(err) = (FilteredView { shared }).flush() {
                tracing::warn!(%err, "deferred recompute failed");
            }
        }));
    }

    /// Run a pending debounced recompute now. No-op when none is pending.
    pub fn flush(&self) -> Result<()> {
        self.enqueue(Job::Flush)
    }

    /// Recompute immediately, bypassing the debounce.
    pub fn recompute_now(&self) -> Result<()> {
        self.enqueue(Job::Recompute)
    }

    fn enqueue(&self, job: Job<T>) -> Result<()> {
        self.shared.inbox.borrow_mut().push_back(job);
        self.drain()
    }

    fn drain(&self) -> Result<()> {
        let Some(_guard) = DispatchGuard::enter(&self.shared.dispatching) else {
            tracing::trace!("view busy, job queued");
            return Ok(());
        };

        let mut first_error = None;
        loop {
            let job = self.shared.inbox.borrow_mut().pop_front();
            let Some(job) = job else {
                break;
            };
            match self.run(job) {
                Ok(events) => self.publish(events),
                Err(err) => {
                    tracing::warn!(%err, "change rejected");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn run(&self, job: Job<T>) -> Result<Vec<ViewEvent<T>>> {
        match job {
            Job::Flush => {
                if !self.shared.debounce.take() {
                    return Ok(Vec::new());
                }
                Ok(vec![self.shared.state.borrow_mut().recompute()])
            }
            Job::Recompute => {
                self.shared.debounce.take();
                Ok(vec![self.shared.state.borrow_mut().recompute()])
            }
            Job::Notify(notification) => self.route(notification),
        }
    }

    fn route(&self, notification: Notification<T>) -> Result<Vec<ViewEvent<T>>> {
        let route = {
            let state = self.shared.state.borrow();
            classify(
                notification,
                &state.source_name,
                &state.observe,
                state.dependencies(),
            )
        };

        match route {
            Route::Replace(source) => {
                self.shared.state.borrow_mut().source = source;
                self.update();
                Ok(Vec::new())
            }
            Route::Recompute => {
                self.update();
                Ok(Vec::new())
            }
            Route::Splices(_) if self.shared.debounce.is_pending() => {
                tracing::trace!("recompute pending, splices superseded");
                Ok(Vec::new())
            }
            Route::Splices(splices) => {
                let (events, stale) = self.shared.state.borrow_mut().apply_splices(splices)?;
                if stale {
                    self.update();
                }
                Ok(events)
            }
            Route::Member { selector, item } => {
                Ok(self.shared.state.borrow_mut().replace_member(selector, item))
            }
            Route::Attribute {
                selector,
                subpath,
                reposition: moves,
            } => Ok(self
                .shared
                .state
                .borrow_mut()
                .change_attribute(selector, &subpath, moves)),
            Route::Ignore(reason) => {
                tracing::trace!(?reason, "notification ignored");
                Ok(Vec::new())
            }
        }
    }

    fn publish(&self, events: Vec<ViewEvent<T>>) {
        if events.is_empty() {
            return;
        }

        let observers: Vec<Observer<T>> = self
            .shared
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for event in &events {
            for observer in &observers {
                observer(event);
            }
        }

        let revision = self.shared.revision_count.get() + 1;
        self.shared.revision_count.set(revision);
        self.shared.revision.set(revision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{filter_fn, sort_by_key};
    use crate::pipeline::TurnQueue;
    use std::panic::{self, AssertUnwindSafe};

    #[derive(Debug)]
    struct Row {
        rank: i32,
    }

    fn ranks(view: &FilteredView<Row>) -> Vec<i32> {
        view.items().iter().map(|i| i.borrow().rank).collect()
    }

    fn rows(ranks: &[i32]) -> List<Row> {
        List::from_values(ranks.iter().map(|&rank| Row { rank }))
    }

    fn ranked_view(list: &List<Row>, turns: &TurnQueue) -> FilteredView<Row> {
        let options = ViewOptions {
            filter: Some(filter_fn(|row: &Row, _, _| row.rank > 0)),
            sort: Some(sort_by_key(|row: &Row| row.rank)),
            observe: ObservedPaths::parse("rank"),
            ..Default::default()
        };
        FilteredView::new(Some(list.clone()), options, Rc::new(turns.clone())).unwrap()
    }

    #[test]
    fn test_initial_projection() {
        let turns = TurnQueue::new();
        let list = rows(&[3, -1, 1, 2]);
        let view = ranked_view(&list, &turns);

        assert_eq!(ranks(&view), vec![1, 2, 3]);
        assert_eq!(view.stats().recomputes, 1);
        assert_eq!(view.links().len(), 3);
    }

    #[test]
    fn test_splice_notification_is_incremental() {
        let turns = TurnQueue::new();
        let list = rows(&[3, 1]);
        let view = ranked_view(&list, &turns);

        let splice = list.push(Item::new(Row { rank: 2 }));
        view.notify(Notification::splices("items", vec![splice])).unwrap();

        assert_eq!(ranks(&view), vec![1, 2, 3]);
        assert_eq!(view.stats().recomputes, 1);
        assert_eq!(view.stats().splice_batches, 1);
        assert_eq!(turns.pending(), 0);
    }

    #[test]
    fn test_observer_reentrancy_is_queued() {
        let turns = TurnQueue::new();
        let list = rows(&[1]);
        let view = ranked_view(&list, &turns);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner = view.clone();
        let inner_list = list.clone();
        let log = seen.clone();
        let _cleanup = view.subscribe(move |event| {
            log.borrow_mut().push(inner.len());
            let ViewEvent::Splice(splice) = event else {
                return;
            };
            if splice.added.len() == 1 && inner.len() == 2 {
                let splice = inner_list.push(Item::new(Row { rank: 5 }));
                inner.notify(Notification::splices("items", vec![splice])).unwrap();
            }
        });

        let splice = list.push(Item::new(Row { rank: 2 }));
        view.notify(Notification::splices("items", vec![splice])).unwrap();

        assert_eq!(ranks(&view), vec![1, 2, 5]);
        assert_eq!(*seen.borrow(), vec![2, 3], "second edit observed after the first");
    }

    #[test]
    fn test_unsubscribe() {
        let turns = TurnQueue::new();
        let list = rows(&[1]);
        let view = ranked_view(&list, &turns);
        let count = Rc::new(Cell::new(0));

        let c = count.clone();
        let cleanup = view.subscribe(move |_| c.set(c.get() + 1));
        view.recompute_now().unwrap();
        cleanup();
        view.recompute_now().unwrap();

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_revision_bumps_once_per_change() {
        let turns = TurnQueue::new();
        let list = rows(&[1, 2]);
        let view = ranked_view(&list, &turns);
        let revision = view.revision();
        assert_eq!(revision.get(), 0);

        let a = list.push(Item::new(Row { rank: 3 }));
        let b = list.push(Item::new(Row { rank: 4 }));
        view.notify(Notification::splices("items", vec![a, b])).unwrap();
        assert_eq!(revision.get(), 1);

        view.notify(Notification::length("items", 4)).unwrap();
        assert_eq!(revision.get(), 1, "ignored notifications publish nothing");
    }

    #[test]
    fn test_dropped_view_skips_deferred_flush() {
        let turns = TurnQueue::new();
        let list = rows(&[1]);
        let view = ranked_view(&list, &turns);
        view.update();
        drop(view);

        assert_eq!(turns.run_turn(), 1);
    }

    #[test]
    fn test_member_swap_without_projection() {
        let turns = TurnQueue::new();
        let list = rows(&[1, 2, 3]);
        let view = FilteredView::new(
            Some(list.clone()),
            ViewOptions::default(),
            Rc::new(turns.clone()),
        )
        .unwrap();

        let old = view.get(1).unwrap();
        let old_key = view.key_of(&old).unwrap();
        view.replace(1, Item::new(Row { rank: 20 })).unwrap();

        assert_eq!(ranks(&view), vec![1, 20, 3]);
        let new = view.get(1).unwrap();
        assert_eq!(view.key_of(&new), Some(old_key), "slot keeps its view key");
        assert_eq!(view.key_of(&old), None);
    }

    #[test]
    #[should_panic(expected = "filter exploded")]
    fn test_callback_panic_reaches_the_caller() {
        let turns = TurnQueue::new();
        let list = rows(&[1, 2]);
        let view = ranked_view(&list, &turns);

        view.set_filter(Some(filter_fn(|_: &Row, _, _| panic!("filter exploded"))))
            .unwrap();
        let _ = view.recompute_now();
    }

    #[test]
    fn test_view_recovers_after_callback_panic() {
        let turns = TurnQueue::new();
        let list = rows(&[3, 1, 2]);
        let view = ranked_view(&list, &turns);
        let before = view.stats();

        view.set_filter(Some(filter_fn(|_: &Row, _, _| panic!("filter exploded"))))
            .unwrap();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| view.recompute_now()));

        assert!(outcome.is_err(), "panic propagates out of recompute_now");
        assert!(!view.shared.dispatching.get(), "dispatch guard reset during unwind");
        assert!(view.shared.inbox.borrow().is_empty());
        assert_eq!(ranks(&view), vec![1, 2, 3], "failed recompute left the view as it was");
        assert_eq!(view.stats().recomputes, before.recomputes);
        assert_eq!(view.links().len(), 3);

        view.set_filter(Some(filter_fn(|row: &Row, _, _| row.rank > 1)))
            .unwrap();
        view.recompute_now().unwrap();
        assert_eq!(ranks(&view), vec![2, 3]);
        assert_eq!(view.links().len(), 2);

        let splice = list.push(Item::new(Row { rank: 5 }));
        view.notify(Notification::splices("items", vec![splice])).unwrap();
        assert_eq!(ranks(&view), vec![2, 3, 5], "later notifications are processed");
        assert_eq!(view.stats().splice_batches, before.splice_batches + 1);

        assert!(!view.is_pending());
        turns.flush();
        assert_eq!(ranks(&view), vec![2, 3, 5], "stale deferred flushes are no-ops");
    }

    #[test]
    fn test_attribute_change_publishes_view_path() {
        let turns = TurnQueue::new();
        let list = rows(&[3, 1, -4]);
        let view = ranked_view(&list, &turns);
        let paths = Rc::new(RefCell::new(Vec::new()));

        let log = paths.clone();
        let _cleanup = view.subscribe(move |event| {
            if let ViewEvent::Path(path) = event {
                log.borrow_mut().push(path.clone());
            }
        });

        let first = list.get(0).unwrap();
        let key = list.key_of(&first).unwrap();
        view.notify(Notification::attribute("other", key, "label"))
            .unwrap();
        view.notify(Notification::attribute("items", key, "label")).unwrap();
        let hidden = list.key_of(&list.get(2).unwrap()).unwrap();
        view.notify(Notification::attribute("items", hidden, "label")).unwrap();

        assert_eq!(*paths.borrow(), vec!["filtered.1.label".to_string()]);
        assert_eq!(view.stats().repositions, 0, "label is not observed");
    }
}
