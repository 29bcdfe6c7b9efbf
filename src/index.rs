//! Indexes a clause set by the symbols its heads and bodies mention, so the
//! evaluator can go straight from a delta's symbol to the clauses it might
//! feed without scanning the whole program on every step.

use std::collections::{HashMap, HashSet};

use crate::clause::Clause;
use crate::symbol::SymbolId;

/// A clause set indexed two ways: by the symbol each clause derives (its
/// head), and by every symbol each clause reads (its body atoms).
#[derive(Debug, Clone, Default)]
pub struct ClauseIndex {
    clauses: Vec<Clause>,
    by_head_symbol: HashMap<SymbolId, Vec<usize>>,
    by_body_symbol: HashMap<SymbolId, Vec<usize>>,
}

impl ClauseIndex {
    pub fn build(clauses: Vec<Clause>) -> Self {
        let mut by_head_symbol: HashMap<SymbolId, Vec<usize>> = HashMap::new();
        let mut by_body_symbol: HashMap<SymbolId, Vec<usize>> = HashMap::new();

        for (i, clause) in clauses.iter().enumerate() {
            by_head_symbol.entry(clause.head.symbol).or_default().push(i);
            let mut seen = HashSet::new();
            for atom in &clause.body {
                if seen.insert(atom.symbol) {
                    by_body_symbol.entry(atom.symbol).or_default().push(i);
                }
            }
        }

        ClauseIndex {
            clauses,
            by_head_symbol,
            by_body_symbol,
        }
    }

    pub fn all(&self) -> &[Clause] {
        &self.clauses
    }

    /// Clauses whose head derives `symbol`.
    pub fn defining(&self, symbol: SymbolId) -> impl Iterator<Item = &Clause> {
        self.by_head_symbol
            .get(&symbol)
            .into_iter()
            .flatten()
            .map(move |&i| &self.clauses[i])
    }

    /// Clauses that read `symbol` in some body atom — the set a fresh delta
    /// over `symbol` must be joined against.
    pub fn consuming(&self, symbol: SymbolId) -> impl Iterator<Item = &Clause> {
        self.by_body_symbol
            .get(&symbol)
            .into_iter()
            .flatten()
            .map(move |&i| &self.clauses[i])
    }

    /// Every symbol transitively reachable from `roots` by following clause
    /// bodies backward (i.e. "what must be derived to derive a root symbol").
    /// Used to scope a recursive lattice sub-solve to just the clauses that
    /// define `leq`/`join`, rather than the whole program.
    pub fn reachable_from(&self, roots: impl IntoIterator<Item = SymbolId>) -> HashSet<SymbolId> {
        let mut seen: HashSet<SymbolId> = HashSet::new();
        let mut stack: Vec<SymbolId> = roots.into_iter().collect();
        while let Some(sym) = stack.pop() {
            if !seen.insert(sym) {
                continue;
            }
            for clause in self.defining(sym) {
                for atom in &clause.body {
                    if !seen.contains(&atom.symbol) {
                        stack.push(atom.symbol);
                    }
                }
            }
        }
        seen
    }
}
