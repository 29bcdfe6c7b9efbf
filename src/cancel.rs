//! Cooperative cancellation and resource budgeting for the evaluator.
//!
//! Grounded in the teacher crate's `execution::timeout::QueryTimeout` /
//! `CancelHandle` and `execution::limits::ResourceLimits`: the same
//! atomic-flag cooperative-cancellation shape, adapted from query-level wall
//! clock timeouts to worklist-step and recursive-lattice-query budgets (the
//! units a single-threaded, non-yielding evaluator can check cheaply and
//! deterministically between steps).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// A cheaply cloneable, thread-shareable cancellation flag.
///
/// The evaluator polls `is_cancelled` on every delta pop (see §5 of the
/// design: "the only suspension point is the evaluator's own work-queue
/// pop"). Tripping the flag from another thread is the only way to cancel a
/// running `solve`.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// A handle that can be stashed elsewhere (e.g. on another thread, or a
    /// timer) to cancel this token later.
    pub fn handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }
}

/// A detached handle that can cancel the [`CancellationToken`] it was taken
/// from, without holding a reference to the evaluator itself.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Bounds that protect a `solve` from a runaway or non-well-founded user
/// lattice (§7: `EvalError::LatticeTimeoutOrOverflow`).
#[derive(Debug, Clone, Copy)]
pub struct ResourceBudget {
    /// Maximum recursive `leq`/`join` sub-queries charged while resolving a
    /// single body atom. `None` means unlimited.
    pub max_recursive_queries: Option<usize>,
    /// Maximum total worklist steps for one `solve` call. `None` means
    /// unlimited (the evaluator still honors external cancellation).
    pub max_worklist_steps: Option<usize>,
}

impl Default for ResourceBudget {
    fn default() -> Self {
        ResourceBudget {
            max_recursive_queries: Some(1_000_000),
            max_worklist_steps: None,
        }
    }
}

/// A live, per-solve counter against a [`ResourceBudget`].
///
/// Cheap to check (a single atomic load + compare); cheap to share (it is
/// itself `Clone` and uses interior atomics), which matters because the
/// lattice runtime may recurse through nested evaluator instances that each
/// need to charge the *same* outer budget.
#[derive(Debug, Clone)]
pub struct BudgetTracker {
    budget: ResourceBudget,
    recursive_queries_used: Arc<AtomicUsize>,
    worklist_steps_used: Arc<AtomicUsize>,
}

impl BudgetTracker {
    pub fn new(budget: ResourceBudget) -> Self {
        BudgetTracker {
            budget,
            recursive_queries_used: Arc::new(AtomicUsize::new(0)),
            worklist_steps_used: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Charges one recursive lattice query. Returns `false` once the budget
    /// is exhausted.
    pub fn charge_recursive_query(&self) -> bool {
        let used = self.recursive_queries_used.fetch_add(1, Ordering::Relaxed) + 1;
        match self.budget.max_recursive_queries {
            Some(limit) => used <= limit,
            None => true,
        }
    }

    /// Charges one worklist step. Returns `false` once the budget is
    /// exhausted.
    pub fn charge_worklist_step(&self) -> bool {
        let used = self.worklist_steps_used.fetch_add(1, Ordering::Relaxed) + 1;
        match self.budget.max_worklist_steps {
            Some(limit) => used <= limit,
            None => true,
        }
    }

    pub fn worklist_steps_used(&self) -> usize {
        self.worklist_steps_used.load(Ordering::Relaxed)
    }
}
