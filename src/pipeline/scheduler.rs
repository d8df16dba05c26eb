//! Recompute Scheduler - Coalesce recompute requests per turn.
//!
//! The view keeps one pending flag. The first request in a turn sets it and
//! defers a flush through the [`Scheduler`]; later requests in the same turn
//! see the flag and do nothing. The flush clears the flag and recomputes from
//! whatever source and callbacks are current at that moment.
//!
//! # Example
//!
//! ```ignore
//! let turns = TurnQueue::new();
//! let view = FilteredView::new(Some(list), options, Rc::new(turns.clone()))?;
//!
//! view.update();
//! view.update();          // coalesced
//! turns.run_turn();       // exactly one recompute
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Deferred-task primitive of the host event loop.
pub trait Scheduler {
    /// Run `task` in a later turn.
    fn defer(&self, task: Box<dyn FnOnce()>);
}

// =============================================================================
// TurnQueue
// =============================================================================

/// Single-threaded task queue driven by explicit turns.
#[derive(Clone, Default)]
pub struct TurnQueue {
    tasks: Rc<RefCell<VecDeque<Box<dyn FnOnce()>>>>,
}

impl TurnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every task queued before this call.
    ///
    /// Tasks deferred while the turn runs wait for the next turn.
    /// Returns the number of tasks run.
    pub fn run_turn(&self) -> usize {
        let batch = std::mem::take(&mut *self.tasks.borrow_mut());
        let count = batch.len();
        for task in batch {
            task();
        }
        count
    }

    /// Run turns until the queue stays empty. Returns the total task count.
    pub fn flush(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.run_turn();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }

    /// Number of tasks waiting for the next turn.
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl Scheduler for TurnQueue {
    fn defer(&self, task: Box<dyn FnOnce()>) {
        self.tasks.borrow_mut().push_back(task);
    }
}

// =============================================================================
// Debounce flag
// =============================================================================

/// Pending-recompute flag of one view.
#[derive(Debug, Default)]
pub(crate) struct Debounce {
    pending: Cell<bool>,
}

impl Debounce {
    /// Mark a recompute as wanted. Returns `true` only for the request that
    /// raised the flag, which is the one that must schedule the flush.
    pub fn request(&self) -> bool {
        !self.pending.replace(true)
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.pending.replace(false)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_runs_queued_tasks_in_order() {
        let queue = TurnQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for n in 0..3 {
            let log = log.clone();
            queue.defer(Box::new(move || log.borrow_mut().push(n)));
        }

        assert_eq!(queue.pending(), 3);
        assert_eq!(queue.run_turn(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_tasks_deferred_during_turn_wait() {
        let queue = TurnQueue::new();
        let ran = Rc::new(Cell::new(0));

        let inner_queue = queue.clone();
        let inner_ran = ran.clone();
        queue.defer(Box::new(move || {
            inner_ran.set(inner_ran.get() + 1);
            let again = inner_ran.clone();
            inner_queue.defer(Box::new(move || again.set(again.get() + 1)));
        }));

        assert_eq!(queue.run_turn(), 1);
        assert_eq!(ran.get(), 1, "nested task belongs to the next turn");
        assert_eq!(queue.flush(), 1);
        assert_eq!(ran.get(), 2);
    }

    #[test]
    fn test_debounce_raises_once() {
        let flag = Debounce::default();
        assert!(flag.request());
        assert!(!flag.request());
        assert!(flag.is_pending());
        assert!(flag.take());
        assert!(!flag.take());
        assert!(flag.request(), "flag can be raised again after a flush");
    }
}
