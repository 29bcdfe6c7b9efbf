//! The bottom-up solver: seeds ground facts, then drives a FIFO delta queue
//! until it's dry (semi-naive evaluation), or — for the efficiency
//! comparison in tests — repeatedly re-scans everything until a full pass
//! produces nothing new (naive evaluation).
//!
//! Grounded in the delta/worklist shape of the stratified-Datalog reference
//! material, adapted here to dispatch through [`crate::lattice::LatticeRuntime`]
//! so a body atom can be satisfied by a relation scan, a lattice-map lookup,
//! or a host function call.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cancel::{BudgetTracker, CancellationToken};
use crate::clause::Atom;
use crate::database::Database;
use crate::dispatch;
use crate::error::EvalError;
use crate::index::ClauseIndex;
use crate::symbol::{Interpretation, SymbolId, SymbolTable};
use crate::unify::match_atom;
use crate::value::{groundify, Substitution, Tuple, Value};

/// How `solve_with` drives the fixpoint. `Naive` exists only so tests can
/// demonstrate that semi-naive evaluation does strictly less work — the
/// public `solve` entry point always uses `SemiNaive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    SemiNaive,
    Naive,
}

/// Why a solve stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Solved,
    Cancelled,
}

/// Counts body-atom match attempts (candidate tuples tested, or host calls
/// made) across a solve, so `EvalMode::SemiNaive` and `EvalMode::Naive` can
/// be compared empirically on the same program.
#[derive(Debug, Default)]
pub struct EvalStats {
    body_match_attempts: AtomicUsize,
}

impl EvalStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, n: usize) {
        self.body_match_attempts.fetch_add(n, Ordering::Relaxed);
    }

    pub fn total(&self) -> usize {
        self.body_match_attempts.load(Ordering::Relaxed)
    }
}

/// Runs a full solve to completion or until cancelled, using semi-naive
/// evaluation. Returns the populated database plus why it stopped.
pub fn solve(
    symbols: &SymbolTable,
    clauses: &ClauseIndex,
    runtime: &crate::lattice::LatticeRuntime,
    budget: BudgetTracker,
    cancel: CancellationToken,
) -> Result<(Database, Outcome), EvalError> {
    crate::diagnostics::trace_solve_started("solve", clauses.all().len());
    let stats = EvalStats::new();
    let (db, outcome) = solve_with(symbols, clauses, runtime, budget.clone(), cancel, EvalMode::SemiNaive, &stats)?;
    let solve_stats = crate::diagnostics::SolveStats::capture(symbols, &db, outcome);
    crate::diagnostics::trace_solve_finished("solve", &solve_stats, budget.worklist_steps_used());
    Ok((db, outcome))
}

/// Like [`solve`], but propagates any non-`Solved` outcome as an error and
/// discards the stats. Used when a caller needs a single answer and treats
/// early termination as a fault — e.g. a clause-backed lattice's own
/// recursive sub-solve (see [`crate::lattice::LatticeRuntime`]).
pub fn solve_clauses(
    symbols: &SymbolTable,
    clauses: &ClauseIndex,
    runtime: &crate::lattice::LatticeRuntime,
    budget: BudgetTracker,
    cancel: CancellationToken,
) -> Result<Database, EvalError> {
    let context = clauses.all().first().map(|c| c.head.symbol).unwrap_or(SymbolId(0));
    let (db, outcome) = solve(symbols, clauses, runtime, budget, cancel)?;
    match outcome {
        Outcome::Solved => Ok(db),
        Outcome::Cancelled => Err(EvalError::LatticeTimeoutOrOverflow { symbol: context }),
    }
}

/// Full control over evaluation mode and instrumentation, for tests that
/// need to compare semi-naive against naive re-evaluation (see the
/// efficiency scenario in the integration tests).
pub fn solve_with(
    symbols: &SymbolTable,
    clauses: &ClauseIndex,
    runtime: &crate::lattice::LatticeRuntime,
    budget: BudgetTracker,
    cancel: CancellationToken,
    mode: EvalMode,
    stats: &EvalStats,
) -> Result<(Database, Outcome), EvalError> {
    let mut db = Database::new();
    seed_facts(symbols, &mut db, runtime, clauses)?;

    let outcome = match mode {
        EvalMode::SemiNaive => semi_naive_loop(symbols, &mut db, runtime, clauses, &budget, &cancel, stats)?,
        EvalMode::Naive => naive_loop(symbols, &mut db, runtime, clauses, &budget, &cancel, stats)?,
    };

    Ok((db, outcome))
}

fn seed_facts(
    symbols: &SymbolTable,
    db: &mut Database,
    runtime: &crate::lattice::LatticeRuntime,
    clauses: &ClauseIndex,
) -> Result<(), EvalError> {
    for clause in clauses.all() {
        if clause.is_fact() {
            apply_and_insert(symbols, db, runtime, &clause.head, &Substitution::new())?;
        }
    }
    Ok(())
}

fn semi_naive_loop(
    symbols: &SymbolTable,
    db: &mut Database,
    runtime: &crate::lattice::LatticeRuntime,
    clauses: &ClauseIndex,
    budget: &BudgetTracker,
    cancel: &CancellationToken,
    stats: &EvalStats,
) -> Result<Outcome, EvalError> {
    while let Some(delta) = db.pop_delta() {
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        if !budget.charge_worklist_step() {
            return Err(EvalError::LatticeTimeoutOrOverflow { symbol: delta.symbol });
        }

        for clause in clauses.consuming(delta.symbol) {
            for (i, atom) in clause.body.iter().enumerate() {
                if atom.symbol != delta.symbol {
                    continue;
                }
                let mut subst = Substitution::new();
                if !match_atom(atom, &delta.tuple, &mut subst) {
                    continue;
                }

                let mut substs = vec![subst];
                for (j, other) in clause.body.iter().enumerate() {
                    if j == i {
                        continue;
                    }
                    substs = extend_by_atom(symbols, db, runtime, other, substs, stats)?;
                    if substs.is_empty() {
                        break;
                    }
                }

                for s in &substs {
                    apply_and_insert(symbols, db, runtime, &clause.head, s)?;
                }
            }
        }
    }
    Ok(Outcome::Solved)
}

fn naive_loop(
    symbols: &SymbolTable,
    db: &mut Database,
    runtime: &crate::lattice::LatticeRuntime,
    clauses: &ClauseIndex,
    budget: &BudgetTracker,
    cancel: &CancellationToken,
    stats: &EvalStats,
) -> Result<Outcome, EvalError> {
    loop {
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        if !budget.charge_worklist_step() {
            let context = clauses.all().first().map(|c| c.head.symbol).unwrap_or(SymbolId(0));
            return Err(EvalError::LatticeTimeoutOrOverflow { symbol: context });
        }

        for clause in clauses.all() {
            if clause.is_fact() {
                continue;
            }
            let mut substs = vec![Substitution::new()];
            for atom in &clause.body {
                substs = extend_by_atom(symbols, db, runtime, atom, substs, stats)?;
                if substs.is_empty() {
                    break;
                }
            }
            for s in &substs {
                apply_and_insert(symbols, db, runtime, &clause.head, s)?;
            }
        }

        if db.has_pending_deltas() {
            while db.pop_delta().is_some() {}
        } else {
            break;
        }
    }
    Ok(Outcome::Solved)
}

/// Extends every substitution in `substs` by satisfying `atom` against the
/// current database (full scan, not delta-restricted) or a host function.
fn extend_by_atom(
    symbols: &SymbolTable,
    db: &Database,
    runtime: &crate::lattice::LatticeRuntime,
    atom: &Atom,
    substs: Vec<Substitution>,
    stats: &EvalStats,
) -> Result<Vec<Substitution>, EvalError> {
    if symbols.symbol(atom.symbol).interpretation.is_code() {
        let mut out = Vec::new();
        for s in &substs {
            stats.record(1);
            if let Some(extended) = dispatch::satisfy_code(symbols, runtime, atom, s)? {
                out.push(extended);
            }
        }
        return Ok(out);
    }

    if symbols.symbol(atom.symbol).interpretation.is_lattice_map() {
        let mut out = Vec::new();
        let mut needs_scan = Vec::new();
        for s in &substs {
            match dispatch::satisfy_lattice_map_by_key(symbols, db, atom, s) {
                Some(Some(extended)) => {
                    stats.record(1);
                    out.push(extended);
                }
                Some(None) => stats.record(1),
                None => needs_scan.push(s.clone()),
            }
        }
        if !needs_scan.is_empty() {
            let tuples = dispatch::scan_tuples(symbols, db, atom);
            out.extend(scan_and_match(atom, &tuples, &needs_scan, stats));
        }
        return Ok(out);
    }

    let tuples = dispatch::scan_tuples(symbols, db, atom);
    Ok(scan_and_match(atom, &tuples, &substs, stats))
}

fn scan_and_match(atom: &Atom, tuples: &[Tuple], substs: &[Substitution], stats: &EvalStats) -> Vec<Substitution> {
    let mut out = Vec::new();
    for s in substs {
        stats.record(tuples.len());
        for tuple in tuples {
            let mut extended = s.clone();
            if match_atom(atom, tuple, &mut extended) {
                out.push(extended);
            }
        }
    }
    out
}

fn apply_and_insert(
    symbols: &SymbolTable,
    db: &mut Database,
    runtime: &crate::lattice::LatticeRuntime,
    head: &Atom,
    subst: &Substitution,
) -> Result<(), EvalError> {
    let mut values = Vec::with_capacity(head.args.len());
    for term in &head.args {
        let value: Value = groundify(term, subst)
            .expect("a range-restricted clause head is always ground under a body-derived substitution");
        values.push(value);
    }

    match &symbols.symbol(head.symbol).interpretation {
        Interpretation::Relation => {
            db.insert_relation(symbols, head.symbol, values.into());
        }
        Interpretation::LatticeMap { key_arity, .. } => {
            let value = values.pop().expect("lattice-map head must carry a trailing value argument");
            debug_assert_eq!(values.len(), *key_arity);
            db.insert_lattice(symbols, runtime, head.symbol, values, value)?;
        }
        Interpretation::Code { .. } => {
            panic!("clause head targets Code-interpreted symbol {:?}; load-time validation should reject this", head.symbol)
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::ResourceBudget;
    use crate::clause::Clause;
    use crate::lattice::LatticeRuntime;
    use crate::value::Term;

    fn transitive_closure_program() -> (SymbolTable, ClauseIndex, SymbolId, SymbolId) {
        let mut symbols = SymbolTable::new();
        let edge = symbols.declare("edge", 2, Interpretation::Relation).unwrap();
        let tc = symbols.declare("tc", 2, Interpretation::Relation).unwrap();

        let edges = [(0, 1), (1, 2), (2, 3)];
        let mut clauses: Vec<Clause> = edges
            .iter()
            .map(|&(a, b)| {
                Clause::new(
                    Atom::new(edge, [Term::Constant(Value::Int32(a)), Term::Constant(Value::Int32(b))]),
                    [],
                )
            })
            .collect();

        clauses.push(Clause::new(
            Atom::new(tc, [Term::var("x"), Term::var("y")]),
            [Atom::new(edge, [Term::var("x"), Term::var("y")])],
        ));
        clauses.push(Clause::new(
            Atom::new(tc, [Term::var("x"), Term::var("z")]),
            [
                Atom::new(edge, [Term::var("x"), Term::var("y")]),
                Atom::new(tc, [Term::var("y"), Term::var("z")]),
            ],
        ));

        (symbols, ClauseIndex::build(clauses), edge, tc)
    }

    #[test]
    fn transitive_closure_derives_all_reachable_pairs() {
        let (symbols, clauses, _edge, tc) = transitive_closure_program();
        let runtime = LatticeRuntime::new();
        let (db, outcome) = solve(
            &symbols,
            &clauses,
            &runtime,
            BudgetTracker::new(ResourceBudget::default()),
            CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Solved);

        let pairs: std::collections::HashSet<(i32, i32)> = db
            .scan_relation(tc)
            .map(|t| {
                let (Value::Int32(a), Value::Int32(b)) = (&t[0], &t[1]) else {
                    panic!("expected ints")
                };
                (*a, *b)
            })
            .collect();
        let expected: std::collections::HashSet<(i32, i32)> =
            [(0, 1), (1, 2), (2, 3), (0, 2), (1, 3), (0, 3)].into_iter().collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn semi_naive_makes_fewer_body_match_attempts_than_naive() {
        let (symbols, clauses, _edge, _tc) = transitive_closure_program();
        let runtime = LatticeRuntime::new();

        let semi_stats = EvalStats::new();
        solve_with(
            &symbols,
            &clauses,
            &runtime,
            BudgetTracker::new(ResourceBudget::default()),
            CancellationToken::new(),
            EvalMode::SemiNaive,
            &semi_stats,
        )
        .unwrap();

        let naive_stats = EvalStats::new();
        solve_with(
            &symbols,
            &clauses,
            &runtime,
            BudgetTracker::new(ResourceBudget::default()),
            CancellationToken::new(),
            EvalMode::Naive,
            &naive_stats,
        )
        .unwrap();

        assert!(
            semi_stats.total() < naive_stats.total(),
            "semi-naive ({}) should attempt strictly fewer body matches than naive ({})",
            semi_stats.total(),
            naive_stats.total()
        );
    }

    #[test]
    fn cancellation_stops_the_solve_and_returns_partial_results() {
        let (symbols, clauses, _edge, _tc) = transitive_closure_program();
        let runtime = LatticeRuntime::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (_db, outcome) = solve(
            &symbols,
            &clauses,
            &runtime,
            BudgetTracker::new(ResourceBudget::default()),
            cancel,
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
    }
}
