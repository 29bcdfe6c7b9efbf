//! Error kinds for program loading and evaluation.
//!
//! Mirrors the teacher crate's `StorageError`/`ResourceError` style: every
//! variant is a `thiserror`-derived, structured case, never a bare string.

use thiserror::Error;

use crate::symbol::SymbolId;

/// Errors that abort before any evaluation — a malformed `Program` never
/// reaches the evaluator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("symbol '{symbol}' declared with arity {found}, but already declared with arity {expected}")]
    ArityMismatch {
        symbol: String,
        expected: usize,
        found: usize,
    },

    #[error("reference to unknown symbol '{0}'")]
    UnknownSymbol(String),

    #[error("clause head '{head}' is not range-restricted: variable '{variable}' does not appear in the body")]
    NonRangeRestricted { head: String, variable: String },

    #[error("symbol '{0}' has no registered interpretation (Code function or clause set)")]
    MissingInterpretation(String),

    #[error("lattice '{0}' has no declared bottom value")]
    MissingBottom(String),
}

/// Errors that abort a `solve` in progress. The evaluator returns the partial
/// database alongside the diagnostic (see [`crate::evaluator::Outcome`]).
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    #[error("function atom over symbol {symbol:?} called with an unbound input argument at position {position}")]
    UngroundFunctionInput { symbol: SymbolId, position: usize },

    #[error("derived tuple for symbol {symbol:?} has arity {found}, expected {expected}")]
    ArityMismatch {
        symbol: SymbolId,
        expected: usize,
        found: usize,
    },

    #[error("join produced a value that is not an upper bound of its inputs for lattice {lattice:?}")]
    NonMonotoneJoin { lattice: crate::symbol::LatticeId },

    #[error("code function registered for symbol {symbol:?} did not return a value of the expected shape")]
    CodeFunctionFailed { symbol: SymbolId },

    #[error("recursive lattice query for symbol {symbol:?} exceeded its resource budget — the lattice may not be well-founded")]
    LatticeTimeoutOrOverflow { symbol: SymbolId },
}

/// A single error type for callers of the top-level `solve` entry point who
/// want `?`-propagation rather than the evaluator's partial-database-plus-
/// `Outcome::Error` return.
#[derive(Error, Debug, Clone)]
pub enum SolveError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}
