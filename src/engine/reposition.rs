//! Position Reconciler - Re-evaluate one element after an attribute change.

use super::compute::compute;
use super::splice::{reconcile, ViewParts, ViewSplice};
use crate::types::{FilterFn, Item, SortFn};

/// What happened to the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reposition {
    /// Still at the same derived index.
    Unchanged(usize),
    /// Moved within the view.
    Moved { from: usize, to: usize },
    /// Now filtered out.
    Removed { from: usize },
    /// Now passes the filter.
    Inserted { to: usize },
    /// Neither before nor after.
    Absent,
}

/// Move `subjects` to where the projection of `source` puts them.
///
/// The outcome describes the first subject. Every occurrence of every
/// subject is re-placed; the caller relinks the whole view afterwards.
pub(crate) fn reposition<T>(
    subjects: &[Item<T>],
    source: &[Item<T>],
    view: ViewParts<'_, T>,
    filter: Option<&FilterFn<T>>,
    sort: Option<&SortFn<T>>,
) -> (Reposition, Vec<ViewSplice<T>>) {
    let Some(first) = subjects.first() else {
        return (Reposition::Absent, Vec::new());
    };

    let projected = compute(source, filter, sort);
    let current = view.items.iter().position(|d| d.ptr_eq(first));
    let target = projected.iter().position(|p| p.ptr_eq(first));

    let outcome = match (current, target) {
        (Some(from), Some(to)) if from == to => Reposition::Unchanged(from),
        (None, None) => Reposition::Absent,
        (Some(from), Some(to)) => Reposition::Moved { from, to },
        (Some(from), None) => Reposition::Removed { from },
        (None, Some(to)) => Reposition::Inserted { to },
    };

    let touched = subjects.iter().map(Item::id).collect();
    let edits = reconcile(view, source, &projected, touched);

    tracing::debug!(?outcome, edits = edits.len(), "repositioned element");
    (outcome, edits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::links::LinkTable;
    use crate::engine::registry::Collection;
    use std::rc::Rc;

    #[derive(Debug)]
    struct Row {
        rank: i32,
    }

    struct Harness {
        source: Vec<Item<Row>>,
        items: Vec<Item<Row>>,
        keys: Collection<Row>,
        links: LinkTable,
        filter: FilterFn<Row>,
        sort: SortFn<Row>,
    }

    impl Harness {
        fn new(ranks: &[i32]) -> Self {
            let source: Vec<Item<Row>> = ranks.iter().map(|&rank| Item::new(Row { rank })).collect();
            let filter: FilterFn<Row> = Rc::new(|row: &Row, _: usize, _: &[Item<Row>]| row.rank > 3);
            let sort: SortFn<Row> = Rc::new(|a: &Row, b: &Row| a.rank.cmp(&b.rank));
            let items = compute(&source, Some(&filter), Some(&sort));
            let keys = Collection::from_items(&items);
            let mut links = LinkTable::new();
            links.relink(&source, &Collection::from_items(&source), &items, &keys);
            Self { source, items, keys, links, filter, sort }
        }

        fn set_rank(&mut self, index: usize, rank: i32) -> (Reposition, Vec<ViewSplice<Row>>) {
            let item = self.source[index].clone();
            item.borrow_mut().rank = rank;
            let result = reposition(
                &[item],
                &self.source,
                ViewParts {
                    items: &mut self.items,
                    keys: &mut self.keys,
                },
                Some(&self.filter),
                Some(&self.sort),
            );
            self.links.relink(
                &self.source,
                &Collection::from_items(&self.source),
                &self.items,
                &self.keys,
            );
            result
        }

        fn ranks(&self) -> Vec<i32> {
            self.items.iter().map(|item| item.borrow().rank).collect()
        }
    }

    #[test]
    fn test_unchanged_is_noop() {
        let mut h = Harness::new(&[5, 9, 7]);
        let (outcome, edits) = h.set_rank(2, 8);
        assert_eq!(outcome, Reposition::Unchanged(1));
        assert!(edits.is_empty());
    }

    #[test]
    fn test_moves_within_view() {
        let mut h = Harness::new(&[5, 9, 7]);
        let (outcome, edits) = h.set_rank(1, 4);

        assert_eq!(outcome, Reposition::Moved { from: 2, to: 0 });
        assert_eq!(h.ranks(), vec![4, 5, 7]);
        assert_eq!(edits.len(), 2, "remove then reinsert");
        assert!(h.keys.contains(&h.source[1]));
    }

    #[test]
    fn test_filtered_out() {
        let mut h = Harness::new(&[5, 9, 7]);
        let (outcome, _) = h.set_rank(0, 1);

        assert_eq!(outcome, Reposition::Removed { from: 0 });
        assert_eq!(h.ranks(), vec![7, 9]);
        assert!(!h.keys.contains(&h.source[0]));
        assert_eq!(h.links.link_for(h.source[0].id()), None, "no link once filtered out");
    }

    #[test]
    fn test_filtered_in() {
        let mut h = Harness::new(&[5, 2, 9]);
        let (outcome, edits) = h.set_rank(1, 6);

        assert_eq!(outcome, Reposition::Inserted { to: 1 });
        assert_eq!(h.ranks(), vec![5, 6, 9]);
        assert_eq!(edits.len(), 1);
    }

    #[test]
    fn test_absent_stays_absent() {
        let mut h = Harness::new(&[5, 2]);
        let (outcome, edits) = h.set_rank(1, 3);
        assert_eq!(outcome, Reposition::Absent);
        assert!(edits.is_empty());
    }

    #[test]
    fn test_duplicate_subject_moves_every_occurrence() {
        let mut h = Harness::new(&[5, 9]);
        h.source.push(h.source[0].clone());
        h.items = compute(&h.source, Some(&h.filter), Some(&h.sort));
        h.keys = Collection::from_items(&h.items);

        let (outcome, _) = h.set_rank(0, 10);

        assert_eq!(outcome, Reposition::Moved { from: 0, to: 1 });
        assert_eq!(h.ranks(), vec![9, 10, 10]);
        assert!(h.items[1].ptr_eq(&h.source[0]) && h.items[2].ptr_eq(&h.source[0]));
        assert_eq!(h.links.len(), 3);
        assert_eq!(h.links.source_index_of(2), Some(2));
    }

    #[test]
    fn test_no_subjects_is_absent() {
        let mut h = Harness::new(&[5]);
        let (outcome, edits) = reposition(
            &[],
            &h.source,
            ViewParts {
                items: &mut h.items,
                keys: &mut h.keys,
            },
            Some(&h.filter),
            Some(&h.sort),
        );
        assert_eq!(outcome, Reposition::Absent);
        assert!(edits.is_empty());
    }
}
