//! The per-predicate relational store: set-relations and lattice-maps.
//!
//! Every symbol owns one [`Cell`]. Insertion always goes through [`Database`]
//! so that the delta queue and per-symbol derivation counters stay
//! consistent with what is actually stored.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::EvalError;
use crate::lattice::LatticeRuntime;
use crate::symbol::{Interpretation, SymbolId, SymbolTable};
use crate::value::{Tuple, Value};

/// A newly-derived ground atom awaiting propagation through clause bodies.
///
/// `tuple` always has length equal to the symbol's declared arity: for a
/// lattice-map this is the key arguments followed by the (possibly joined)
/// lattice value, so that clause bodies can match against it exactly like a
/// relation tuple.
#[derive(Debug, Clone)]
pub struct Delta {
    pub symbol: SymbolId,
    pub tuple: Tuple,
}

#[derive(Debug)]
enum Cell {
    Set(HashSet<Tuple>),
    LatticeMap(HashMap<Tuple, Value>),
}

/// The evaluator's relational store: one cell per declared symbol, plus the
/// FIFO delta queue that drives semi-naive propagation.
#[derive(Debug)]
pub struct Database {
    cells: HashMap<SymbolId, Cell>,
    deltas: VecDeque<Delta>,
    derivation_counts: HashMap<SymbolId, usize>,
}

impl Database {
    pub fn new() -> Self {
        Database {
            cells: HashMap::new(),
            deltas: VecDeque::new(),
            derivation_counts: HashMap::new(),
        }
    }

    fn cell_mut<'a>(cells: &'a mut HashMap<SymbolId, Cell>, symbols: &SymbolTable, symbol: SymbolId) -> &'a mut Cell {
        cells.entry(symbol).or_insert_with(|| {
            match &symbols.symbol(symbol).interpretation {
                Interpretation::Relation => Cell::Set(HashSet::new()),
                Interpretation::LatticeMap { .. } => Cell::LatticeMap(HashMap::new()),
                Interpretation::Code { .. } => Cell::Set(HashSet::new()),
            }
        })
    }

    /// Inserts a ground tuple into a `Relation` or `Code` symbol's cell.
    /// Returns whether it was new.
    pub fn insert_relation(&mut self, symbols: &SymbolTable, symbol: SymbolId, tuple: Tuple) -> bool {
        let cell = Self::cell_mut(&mut self.cells, symbols, symbol);
        let Cell::Set(set) = cell else {
            panic!("insert_relation called on a lattice-map symbol");
        };
        let is_new = set.insert(tuple.clone());
        if is_new {
            *self.derivation_counts.entry(symbol).or_insert(0) += 1;
            self.deltas.push_back(Delta { symbol, tuple });
        }
        is_new
    }

    /// Inserts `(key, value)` into a `LatticeMap` symbol's cell, joining with
    /// whatever is already stored at `key` (treating a missing entry as the
    /// lattice's bottom). Returns `(changed, new_value)`; `changed` means the
    /// new value strictly increased the cell under `leq`.
    pub fn insert_lattice(
        &mut self,
        symbols: &SymbolTable,
        runtime: &LatticeRuntime,
        symbol: SymbolId,
        key: Vec<Value>,
        value: Value,
    ) -> Result<(bool, Value), EvalError> {
        let Interpretation::LatticeMap { key_arity, lattice } = symbols.symbol(symbol).interpretation.clone() else {
            panic!("insert_lattice called on a non-lattice-map symbol");
        };
        debug_assert_eq!(key.len(), key_arity);

        let key_tuple: Tuple = key.clone().into();
        let lattice_decl = symbols.lattice(lattice);

        let current = {
            let cell = Self::cell_mut(&mut self.cells, symbols, symbol);
            let Cell::LatticeMap(map) = cell else {
                panic!("insert_lattice called on a set-relation symbol");
            };
            map.get(&key_tuple).cloned()
        };
        let baseline = current.clone().unwrap_or_else(|| lattice_decl.bottom.clone());

        let joined = runtime.join(symbols, lattice, &baseline, &value)?;

        let already_covers = runtime.leq(symbols, lattice, &joined, &baseline)?;
        let changed = !already_covers;

        if changed {
            let cell = Self::cell_mut(&mut self.cells, symbols, symbol);
            let Cell::LatticeMap(map) = cell else {
                unreachable!()
            };
            map.insert(key_tuple.clone(), joined.clone());
            *self.derivation_counts.entry(symbol).or_insert(0) += 1;

            let mut full = key;
            full.push(joined.clone());
            self.deltas.push_back(Delta {
                symbol,
                tuple: full.into(),
            });
        }

        Ok((changed, joined))
    }

    /// Returns the value currently stored at `key` for a lattice-map symbol,
    /// or the lattice's bottom if no entry exists yet (§4.F: "a missing entry
    /// is treated as ⊥").
    pub fn lookup(&self, symbols: &SymbolTable, symbol: SymbolId, key: &[Value]) -> Value {
        match self.cells.get(&symbol) {
            Some(Cell::LatticeMap(map)) => map.get(key).cloned().unwrap_or_else(|| {
                let Interpretation::LatticeMap { lattice, .. } = &symbols.symbol(symbol).interpretation else {
                    unreachable!()
                };
                symbols.lattice(*lattice).bottom.clone()
            }),
            _ => {
                let Interpretation::LatticeMap { lattice, .. } = &symbols.symbol(symbol).interpretation else {
                    panic!("lookup called on a non-lattice-map symbol");
                };
                symbols.lattice(*lattice).bottom.clone()
            }
        }
    }

    /// The current extension of a `Relation`/`Code` symbol.
    pub fn scan_relation(&self, symbol: SymbolId) -> Box<dyn Iterator<Item = &Tuple> + '_> {
        match self.cells.get(&symbol) {
            Some(Cell::Set(set)) => Box::new(set.iter()),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// The current extension of a `LatticeMap` symbol, each entry expressed
    /// as a full tuple (key arguments followed by the stored value), so it
    /// can be matched against a clause body atom the same way a relation
    /// tuple is.
    pub fn scan_lattice_map(&self, symbol: SymbolId) -> Vec<Tuple> {
        match self.cells.get(&symbol) {
            Some(Cell::LatticeMap(map)) => map
                .iter()
                .map(|(key, value)| {
                    let mut full: Vec<Value> = key.iter().cloned().collect();
                    full.push(value.clone());
                    full.into()
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn pop_delta(&mut self) -> Option<Delta> {
        self.deltas.pop_front()
    }

    pub fn has_pending_deltas(&self) -> bool {
        !self.deltas.is_empty()
    }

    pub fn derivation_count(&self, symbol: SymbolId) -> usize {
        self.derivation_counts.get(&symbol).copied().unwrap_or(0)
    }

    pub fn total_derivations(&self) -> usize {
        self.derivation_counts.values().sum()
    }

    /// Every symbol that currently owns a cell (has been scanned, inserted
    /// into, or looked up at least once).
    pub fn symbols_with_cells(&self) -> impl Iterator<Item = &SymbolId> {
        self.cells.keys()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::LatticeRuntime;
    use crate::symbol::SymbolTable;

    fn flat_leq(a: &[Value]) -> Option<Value> {
        let (x, y) = (&a[0], &a[1]);
        Some(Value::Bool(x == y))
    }

    fn flat_join(a: &[Value]) -> Option<Value> {
        let (x, y) = (&a[0], &a[1]);
        if x == y {
            Some(x.clone())
        } else {
            None
        }
    }

    fn setup() -> (SymbolTable, LatticeRuntime, SymbolId) {
        let mut symbols = SymbolTable::new();
        let leq = symbols
            .declare("leq", 2, Interpretation::Code { output_arity: 1 })
            .unwrap();
        let join = symbols
            .declare("join", 2, Interpretation::Code { output_arity: 1 })
            .unwrap();
        let lattice = symbols.declare_lattice("Flat", Value::Bool(false), leq, join);
        let val = symbols
            .declare("val", 2, Interpretation::LatticeMap { key_arity: 1, lattice })
            .unwrap();

        let mut runtime = LatticeRuntime::new();
        runtime.register_code(leq, flat_leq);
        runtime.register_code(join, flat_join);

        (symbols, runtime, val)
    }

    #[test]
    fn relation_insert_reports_new_and_dedups() {
        let mut symbols = SymbolTable::new();
        let edge = symbols.declare("edge", 2, Interpretation::Relation).unwrap();
        let mut db = Database::new();

        let t: Tuple = vec![Value::Int32(1), Value::Int32(2)].into();
        assert!(db.insert_relation(&symbols, edge, t.clone()));
        assert!(!db.insert_relation(&symbols, edge, t));
        assert_eq!(db.derivation_count(edge), 1);
    }

    #[test]
    fn lattice_insert_joins_and_reports_unchanged_on_subsumed_value() {
        let (symbols, runtime, val) = setup();
        let mut db = Database::new();

        let (changed, joined) = db
            .insert_lattice(&symbols, &runtime, val, vec![Value::Int32(1)], Value::Bool(true))
            .unwrap();
        assert!(changed);
        assert_eq!(joined, Value::Bool(true));

        // Re-inserting the same value must not be reported as a change.
        let (changed_again, _) = db
            .insert_lattice(&symbols, &runtime, val, vec![Value::Int32(1)], Value::Bool(true))
            .unwrap();
        assert!(!changed_again);
    }

    #[test]
    fn missing_lattice_key_reads_as_bottom() {
        let (symbols, _runtime, val) = setup();
        let db = Database::new();
        assert_eq!(db.lookup(&symbols, val, &[Value::Int32(99)]), Value::Bool(false));
    }
}
