//! Dispatches `leq`/`join` queries to either a registered host function or a
//! recursive, scoped, budget-limited sub-solve of the lattice's own clauses.
//!
//! Grounded in the `Lattice` trait / `is_subseteq` shape seen in the abstract
//! interpretation reference material, generalized here to also allow a
//! lattice's order and join to be *derived* by ordinary Horn clauses rather
//! than always supplied as host code.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cancel::{BudgetTracker, CancellationToken, ResourceBudget};
use crate::clause::Clause;
use crate::database::Database;
use crate::error::EvalError;
use crate::index::ClauseIndex;
use crate::symbol::{Interpretation, LatticeId, SymbolId, SymbolTable};
use crate::value::Value;

/// A host-supplied total function backing a `Code`-interpreted symbol.
/// Returns `None` to signal the function declined to produce a value (e.g. a
/// join of incomparable elements with no defined upper bound).
pub type CodeFn = Arc<dyn Fn(&[Value]) -> Option<Value> + Send + Sync>;

/// Resolves `leq`/`join` for every declared lattice, and holds the registry
/// of host `Code` functions available to a solve.
#[derive(Clone)]
pub struct LatticeRuntime {
    code_fns: HashMap<SymbolId, CodeFn>,
    clauses: Option<Arc<ClauseIndex>>,
    recursive_budget: BudgetTracker,
    cancel: CancellationToken,
    solved: Arc<Mutex<HashMap<LatticeId, Arc<Database>>>>,
}

impl LatticeRuntime {
    pub fn new() -> Self {
        LatticeRuntime {
            code_fns: HashMap::new(),
            clauses: None,
            recursive_budget: BudgetTracker::new(ResourceBudget::default()),
            cancel: CancellationToken::new(),
            solved: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers the host function backing a `Code`-interpreted symbol.
    pub fn register_code(&mut self, symbol: SymbolId, f: impl Fn(&[Value]) -> Option<Value> + Send + Sync + 'static) {
        self.code_fns.insert(symbol, Arc::new(f));
    }

    /// Whether a host function has been registered for `symbol`. Used at
    /// load time to catch a `Code`-interpreted symbol with no backing
    /// function before a solve ever reaches it.
    pub fn has_code(&self, symbol: SymbolId) -> bool {
        self.code_fns.contains_key(&symbol)
    }

    /// Calls the host function registered for `symbol` with `inputs`,
    /// returning its result unchanged. Used for any `Code`-interpreted body
    /// atom, not just a lattice's own `leq`/`join`.
    pub fn call_code(&self, symbol: SymbolId, inputs: &[Value]) -> Option<Value> {
        let f = self
            .code_fns
            .get(&symbol)
            .unwrap_or_else(|| panic!("no code function registered for symbol {symbol:?}"));
        f(inputs)
    }

    /// Attaches the full program's clause index, needed to resolve
    /// clause-defined (as opposed to `Code`-defined) `leq`/`join` symbols.
    pub fn with_clauses(mut self, clauses: Arc<ClauseIndex>) -> Self {
        self.clauses = Some(clauses);
        self
    }

    pub fn with_recursive_budget(mut self, budget: BudgetTracker) -> Self {
        self.recursive_budget = budget;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// `a ≤ b` under the named lattice.
    pub fn leq(&self, symbols: &SymbolTable, lattice: LatticeId, a: &Value, b: &Value) -> Result<bool, EvalError> {
        let decl = symbols.lattice(lattice);
        match &symbols.symbol(decl.leq).interpretation {
            Interpretation::Code { .. } => {
                let f = self
                    .code_fns
                    .get(&decl.leq)
                    .unwrap_or_else(|| panic!("no code function registered for leq symbol {:?}", decl.leq));
                match f(&[a.clone(), b.clone()]) {
                    Some(Value::Bool(result)) => Ok(result),
                    _ => Err(EvalError::CodeFunctionFailed { symbol: decl.leq }),
                }
            }
            Interpretation::Relation => {
                if !self.recursive_budget.charge_recursive_query() {
                    return Err(EvalError::LatticeTimeoutOrOverflow { symbol: decl.leq });
                }
                let sub_db = self.solved_sub_database(symbols, lattice)?;
                let query = [a.clone(), b.clone()];
                Ok(sub_db.scan_relation(decl.leq).any(|t| t.as_ref() == query.as_slice()))
            }
            Interpretation::LatticeMap { .. } => {
                panic!("leq symbol {:?} must be declared Relation or Code", decl.leq)
            }
        }
    }

    /// `a ⊔ b` under the named lattice.
    pub fn join(&self, symbols: &SymbolTable, lattice: LatticeId, a: &Value, b: &Value) -> Result<Value, EvalError> {
        let decl = symbols.lattice(lattice);
        match &symbols.symbol(decl.join).interpretation {
            Interpretation::Code { .. } => {
                let f = self
                    .code_fns
                    .get(&decl.join)
                    .unwrap_or_else(|| panic!("no code function registered for join symbol {:?}", decl.join));
                f(&[a.clone(), b.clone()]).ok_or(EvalError::NonMonotoneJoin { lattice })
            }
            Interpretation::LatticeMap { .. } => {
                if !self.recursive_budget.charge_recursive_query() {
                    return Err(EvalError::LatticeTimeoutOrOverflow { symbol: decl.join });
                }
                let sub_db = self.solved_sub_database(symbols, lattice)?;
                Ok(sub_db.lookup(symbols, decl.join, &[a.clone(), b.clone()]))
            }
            Interpretation::Relation => {
                panic!("join symbol {:?} must be declared LatticeMap or Code", decl.join)
            }
        }
    }

    /// The lazily-computed, memoized solve of the clause set that defines
    /// this lattice's `leq`/`join`, scoped to just the symbols reachable from
    /// them (§4.H: a single-query driver over the relevant clause subset,
    /// not the whole outer program).
    fn solved_sub_database(&self, symbols: &SymbolTable, lattice: LatticeId) -> Result<Arc<Database>, EvalError> {
        if let Some(cached) = self.solved.lock().get(&lattice) {
            return Ok(Arc::clone(cached));
        }

        let decl = symbols.lattice(lattice);
        crate::diagnostics::trace_lattice_recursion(&decl.name);
        let clauses = self
            .clauses
            .as_ref()
            .expect("clause-backed lattice queried without a program clause index attached");
        let reached = clauses.reachable_from([decl.leq, decl.join]);
        let scoped: Vec<Clause> = clauses
            .all()
            .iter()
            .filter(|c| reached.contains(&c.head.symbol))
            .cloned()
            .collect();
        let scoped_index = Arc::new(ClauseIndex::build(scoped));

        let nested_runtime = LatticeRuntime {
            code_fns: self.code_fns.clone(),
            clauses: Some(Arc::clone(&scoped_index)),
            recursive_budget: self.recursive_budget.clone(),
            cancel: self.cancel.clone(),
            solved: Arc::new(Mutex::new(HashMap::new())),
        };

        let worklist_budget = BudgetTracker::new(ResourceBudget::default());
        let solved = crate::evaluator::solve_clauses(
            symbols,
            &scoped_index,
            &nested_runtime,
            worklist_budget,
            self.cancel.clone(),
        )?;

        let arc = Arc::new(solved);
        self.solved.lock().insert(lattice, Arc::clone(&arc));
        Ok(arc)
    }
}

impl Default for LatticeRuntime {
    fn default() -> Self {
        Self::new()
    }
}
