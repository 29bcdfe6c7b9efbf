//! Additive, behavior-neutral observability: tracing spans/events around a
//! solve, and a post-solve summary a caller can log or assert against in
//! tests.
//!
//! Follows the teacher crate's event style: structured fields plus a
//! `snake_case` event name, emitted via the `tracing` macros directly rather
//! than through a custom abstraction.

use std::collections::HashMap;

use serde::Serialize;

use crate::database::Database;
use crate::evaluator::Outcome;
use crate::symbol::{SymbolId, SymbolTable};

/// A snapshot of what a solve derived, keyed by symbol name for readability.
#[derive(Debug, Clone, Serialize)]
pub struct SolveStats {
    pub outcome_solved: bool,
    pub total_derivations: usize,
    pub derivations_by_symbol: HashMap<String, usize>,
}

impl SolveStats {
    pub fn capture(symbols: &SymbolTable, db: &Database, outcome: Outcome) -> Self {
        let derivations_by_symbol = symbols
            .symbols()
            .map(|s| (s.name.to_string(), db.derivation_count(s.id)))
            .filter(|(_, count)| *count > 0)
            .collect();

        SolveStats {
            outcome_solved: matches!(outcome, Outcome::Solved),
            total_derivations: db.total_derivations(),
            derivations_by_symbol,
        }
    }

    pub fn derivations_for(&self, symbols: &SymbolTable, symbol: SymbolId) -> usize {
        self.derivations_by_symbol
            .get(symbols.symbol(symbol).name.as_ref())
            .copied()
            .unwrap_or(0)
    }

    /// Renders these stats as JSON, for the `logging.format = "json"` case of
    /// [`crate::config::LoggingConfig`].
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Emits a `solve_started` event; call at the top of a `solve` entry point.
pub fn trace_solve_started(program_name: &str, clause_count: usize) {
    tracing::info!(program = program_name, clauses = clause_count, "solve_started");
}

/// Emits a `solve_finished` event summarizing the outcome.
pub fn trace_solve_finished(program_name: &str, stats: &SolveStats, worklist_steps: usize) {
    tracing::info!(
        program = program_name,
        solved = stats.outcome_solved,
        total_derivations = stats.total_derivations,
        worklist_steps,
        "solve_finished"
    );
}

/// Emits a `lattice_query_recursed` event each time a clause-backed lattice
/// triggers a nested sub-solve — useful for spotting unexpectedly deep
/// recursive lattice chains without changing evaluation behavior.
pub fn trace_lattice_recursion(lattice_name: &str) {
    tracing::debug!(lattice = lattice_name, "lattice_query_recursed");
}
