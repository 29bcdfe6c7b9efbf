//! Program loading: the validation gate between "a host assembled some
//! clauses and registered some functions" and "this is safe to hand to the
//! evaluator".
//!
//! Mirrors the teacher crate's `Catalog`/`DependencyGraph` split: the symbol
//! table and clause set are built up freely, then validated once, in a fixed
//! order, before anything is indexed for evaluation.

use std::sync::Arc;

use crate::cancel::{BudgetTracker, CancellationToken, ResourceBudget};
use crate::clause::{is_range_restricted, Clause};
use crate::error::LoadError;
use crate::index::ClauseIndex;
use crate::lattice::LatticeRuntime;
use crate::symbol::{Interpretation, SymbolTable};

/// A fully validated program, indexed and ready for [`crate::evaluator::solve`].
pub struct LoadedProgram {
    pub symbols: SymbolTable,
    pub clauses: Arc<ClauseIndex>,
    pub runtime: LatticeRuntime,
}

impl LoadedProgram {
    /// Runs the program to a fixpoint with the given resource budget and
    /// cancellation token, using the default (semi-naive) evaluation mode.
    pub fn solve(
        &self,
        budget: ResourceBudget,
        cancel: CancellationToken,
    ) -> Result<(crate::database::Database, crate::evaluator::Outcome), crate::error::EvalError> {
        crate::evaluator::solve(
            &self.symbols,
            &self.clauses,
            &self.runtime,
            BudgetTracker::new(budget),
            cancel,
        )
    }
}

/// Validates and indexes a program. Checks, in order:
///
/// 1. every atom (head or body, across every clause) refers to a declared
///    symbol and has the arity it was declared with;
/// 2. every non-fact clause is range-restricted;
/// 3. every declared lattice's `leq` is `Relation`-or-`Code` and its `join`
///    is `LatticeMap`-or-`Code`;
/// 4. every `Code`-interpreted symbol reachable from a lattice's `leq`/`join`
///    has a host function actually registered on `runtime`.
///
/// A malformed program never reaches the evaluator: this function either
/// returns a fully indexed [`LoadedProgram`] or the first [`LoadError`] it
/// finds.
pub fn load(symbols: SymbolTable, clauses: Vec<Clause>, runtime: LatticeRuntime) -> Result<LoadedProgram, LoadError> {
    validate_arities(&symbols, &clauses)?;
    validate_range_restriction(&clauses)?;
    validate_lattice_interpretations(&symbols)?;
    validate_code_registered(&symbols, &runtime)?;

    let index = Arc::new(ClauseIndex::build(clauses));
    let runtime = runtime.with_clauses(Arc::clone(&index));

    Ok(LoadedProgram {
        symbols,
        clauses: index,
        runtime,
    })
}

fn validate_arities(symbols: &SymbolTable, clauses: &[Clause]) -> Result<(), LoadError> {
    for clause in clauses {
        for atom in std::iter::once(&clause.head).chain(clause.body.iter()) {
            let symbol = symbols
                .try_symbol(atom.symbol)
                .ok_or_else(|| LoadError::UnknownSymbol(format!("{:?}", atom.symbol)))?;
            if atom.args.len() != symbol.arity {
                return Err(LoadError::ArityMismatch {
                    symbol: symbol.name.to_string(),
                    expected: symbol.arity,
                    found: atom.args.len(),
                });
            }
        }
    }
    Ok(())
}

fn validate_range_restriction(clauses: &[Clause]) -> Result<(), LoadError> {
    for clause in clauses {
        if clause.is_fact() || is_range_restricted(clause) {
            continue;
        }
        let body_vars: std::collections::HashSet<_> = clause.body.iter().flat_map(|a| a.variables()).collect();
        let offending = clause
            .head
            .variables()
            .into_iter()
            .find(|v| !body_vars.contains(v))
            .expect("is_range_restricted returned false, so some head variable must be missing from the body");
        return Err(LoadError::NonRangeRestricted {
            head: format!("{:?}", clause.head.symbol),
            variable: offending.to_string(),
        });
    }
    Ok(())
}

fn validate_lattice_interpretations(symbols: &SymbolTable) -> Result<(), LoadError> {
    for decl in symbols.lattices() {
        let leq_ok = matches!(
            symbols.symbol(decl.leq).interpretation,
            Interpretation::Relation | Interpretation::Code { .. }
        );
        if !leq_ok {
            return Err(LoadError::MissingInterpretation(format!(
                "{}: leq symbol must be Relation or Code",
                decl.name
            )));
        }
        let join_ok = matches!(
            symbols.symbol(decl.join).interpretation,
            Interpretation::LatticeMap { .. } | Interpretation::Code { .. }
        );
        if !join_ok {
            return Err(LoadError::MissingInterpretation(format!(
                "{}: join symbol must be LatticeMap or Code",
                decl.name
            )));
        }
    }
    Ok(())
}

fn validate_code_registered(symbols: &SymbolTable, runtime: &LatticeRuntime) -> Result<(), LoadError> {
    for decl in symbols.lattices() {
        for &symbol in &[decl.leq, decl.join] {
            if symbols.symbol(symbol).interpretation.is_code() && !runtime.has_code(symbol) {
                return Err(LoadError::MissingInterpretation(format!(
                    "{}: no host function registered for '{}'",
                    decl.name,
                    symbols.symbol(symbol).name
                )));
            }
        }
    }
    Ok(())
}
