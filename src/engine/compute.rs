//! Filter/Sort Engine - Pure projection of a source sequence.

use std::collections::HashMap;

use crate::types::{FilterFn, Item, ItemId, SortFn};

/// Produce the filtered-and-sorted projection of `source`.
///
/// Without a filter every element passes; without a comparator the result
/// keeps source order. The sort is stable, so ties keep their source-relative
/// order and consecutive recomputes move as little as possible.
///
/// The comparator must describe a consistent ordering. A panicking predicate
/// or comparator propagates to the caller.
pub fn compute<T>(
    source: &[Item<T>],
    filter: Option<&FilterFn<T>>,
    sort: Option<&SortFn<T>>,
) -> Vec<Item<T>> {
    let mut out: Vec<Item<T>> = match filter {
        Some(filter) => source
            .iter()
            .enumerate()
            .filter(|(index, item)| filter(&item.borrow(), *index, source))
            .map(|(_, item)| item.clone())
            .collect(),
        None => source.to_vec(),
    };

    if let Some(sort) = sort {
        out.sort_by(|a, b| sort(&a.borrow(), &b.borrow()));
    }

    out
}

/// Number of occurrences of each element in `items`.
pub(crate) fn occurrence_counts<T>(items: &[Item<T>]) -> HashMap<ItemId, usize> {
    let mut counts = HashMap::with_capacity(items.len());
    for item in items {
        *counts.entry(item.id()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn items(values: &[i32]) -> Vec<Item<i32>> {
        values.iter().copied().map(Item::new).collect()
    }

    fn values(items: &[Item<i32>]) -> Vec<i32> {
        items.iter().map(Item::get).collect()
    }

    #[test]
    fn test_passthrough_without_callbacks() {
        let source = items(&[3, 1, 2]);
        let out = compute(&source, None, None);

        assert_eq!(values(&out), vec![3, 1, 2]);
        assert!(out.iter().zip(&source).all(|(a, b)| a.ptr_eq(b)), "no copies");
    }

    #[test]
    fn test_filter_then_sort() {
        let source = items(&[5, 2, 8, 1, 9]);
        let filter: FilterFn<i32> = Rc::new(|v: &i32, _: usize, _: &[Item<i32>]| *v > 1);
        let sort: SortFn<i32> = Rc::new(|a: &i32, b: &i32| a.cmp(b));

        let out = compute(&source, Some(&filter), Some(&sort));
        assert_eq!(values(&out), vec![2, 5, 8, 9]);
    }

    #[test]
    fn test_sort_is_stable() {
        let source: Vec<Item<(i32, char)>> = [(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd')]
            .into_iter()
            .map(Item::new)
            .collect();
        let sort: SortFn<(i32, char)> = Rc::new(|a: &(i32, char), b: &(i32, char)| a.0.cmp(&b.0));

        let out = compute(&source, None, Some(&sort));
        let tags: Vec<char> = out.iter().map(|item| item.borrow().1).collect();
        assert_eq!(tags, vec!['b', 'd', 'a', 'c'], "ties keep source order");
    }

    #[test]
    fn test_filter_sees_index_and_array() {
        let source = items(&[10, 20, 30]);
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let filter: FilterFn<i32> = Rc::new(move |_: &i32, index: usize, array: &[Item<i32>]| {
            calls_clone.set(calls_clone.get() + 1);
            assert_eq!(array.len(), 3);
            index != 1
        });

        let out = compute(&source, Some(&filter), None);
        assert_eq!(values(&out), vec![10, 30]);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_source_untouched() {
        let source = items(&[2, 1]);
        let sort: SortFn<i32> = Rc::new(|a: &i32, b: &i32| a.cmp(b));
        let _ = compute(&source, None, Some(&sort));
        assert_eq!(values(&source), vec![2, 1]);
    }

    #[test]
    fn test_occurrence_counts() {
        let source = items(&[7, 8]);
        let doubled = vec![source[0].clone(), source[1].clone(), source[0].clone()];
        let counts = occurrence_counts(&doubled);
        assert_eq!(counts.get(&source[0].id()), Some(&2));
        assert_eq!(counts.get(&source[1].id()), Some(&1));
        assert_eq!(counts.get(&Item::new(7).id()), None);
    }
}
