//! Horn clauses: atoms, heads, and bodies over interned symbols.

use std::collections::HashSet;
use std::sync::Arc;

use crate::symbol::SymbolId;
use crate::value::Term;

/// `Predicate(symbol, t1..tn)` — an atom whose arguments are open terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub symbol: SymbolId,
    pub args: Vec<Term>,
}

impl Atom {
    pub fn new(symbol: SymbolId, args: impl IntoIterator<Item = Term>) -> Self {
        Atom {
            symbol,
            args: args.into_iter().collect(),
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn variables(&self) -> HashSet<Arc<str>> {
        let mut out = Vec::new();
        for arg in &self.args {
            arg.variables(&mut out);
        }
        out.into_iter().collect()
    }
}

/// A Horn clause: one head atom implied by a conjunction of body atoms.
///
/// Every variable in `head` must appear somewhere in `body` — this is checked
/// once at load time by [`is_range_restricted`], never at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub head: Atom,
    pub body: Vec<Atom>,
}

impl Clause {
    pub fn new(head: Atom, body: impl IntoIterator<Item = Atom>) -> Self {
        Clause {
            head,
            body: body.into_iter().collect(),
        }
    }

    /// A clause with an empty body is a ground fact declaration; it is
    /// range-restricted only if its head has no variables at all.
    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }
}

/// A clause is range-restricted iff every variable in its head appears in at
/// least one body atom.
pub fn is_range_restricted(clause: &Clause) -> bool {
    let head_vars = clause.head.variables();
    if head_vars.is_empty() {
        return true;
    }
    let body_vars: HashSet<Arc<str>> = clause
        .body
        .iter()
        .flat_map(Atom::variables)
        .collect();
    head_vars.is_subset(&body_vars)
}
