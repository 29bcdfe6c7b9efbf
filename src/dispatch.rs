//! Satisfies a single body atom against the database, the way its symbol's
//! [`Interpretation`] says to: by scanning a stored extension (`Relation`,
//! `LatticeMap`) or by calling a host function (`Code`).

use crate::clause::Atom;
use crate::database::Database;
use crate::error::EvalError;
use crate::lattice::LatticeRuntime;
use crate::symbol::{Interpretation, SymbolTable};
use crate::unify::match_atom;
use crate::value::{groundify, Substitution, Tuple, Value};

/// The current extension of `atom.symbol`, expressed as plain tuples — for a
/// `LatticeMap` symbol this is key-arguments-followed-by-value, exactly as
/// stored by [`Database::scan_lattice_map`].
pub fn scan_tuples(symbols: &SymbolTable, db: &Database, atom: &Atom) -> Vec<Tuple> {
    match &symbols.symbol(atom.symbol).interpretation {
        Interpretation::Relation => db.scan_relation(atom.symbol).cloned().collect(),
        Interpretation::LatticeMap { .. } => db.scan_lattice_map(atom.symbol),
        Interpretation::Code { .. } => {
            panic!("scan_tuples called on a Code-interpreted symbol; use satisfy_code instead")
        }
    }
}

/// Every way `atom` can be satisfied by scanning its stored extension,
/// starting from `subst`. Used for the non-delta body atoms of a clause.
pub fn satisfy_by_scan(symbols: &SymbolTable, db: &Database, atom: &Atom, subst: &Substitution) -> Vec<Substitution> {
    scan_tuples(symbols, db, atom)
        .iter()
        .filter_map(|tuple| {
            let mut extended = subst.clone();
            match_atom(atom, tuple, &mut extended).then_some(extended)
        })
        .collect()
}

/// Satisfies a `LatticeMap` body atom whose key positions are fully ground
/// under `subst` by a single point lookup, rather than a scan of the stored
/// extension — so a key with no derived entry yet still resolves, binding
/// the value argument to the lattice's bottom (§4.F/§4.G).
///
/// Returns `None` if the atom's key positions aren't fully ground under
/// `subst`; the caller should fall back to [`scan_tuples`] in that case,
/// since the set of keys that could ever bind isn't enumerable from the
/// database alone. Returns `Some(None)` for a ground key whose looked-up
/// value doesn't match the atom's trailing term — an ordinary failed match,
/// not a fault.
pub fn satisfy_lattice_map_by_key(
    symbols: &SymbolTable,
    db: &Database,
    atom: &Atom,
    subst: &Substitution,
) -> Option<Option<Substitution>> {
    let Interpretation::LatticeMap { key_arity, .. } = symbols.symbol(atom.symbol).interpretation.clone() else {
        panic!("satisfy_lattice_map_by_key called on a non-lattice-map symbol");
    };

    let mut key = Vec::with_capacity(key_arity);
    for term in &atom.args[..key_arity] {
        key.push(groundify(term, subst)?);
    }

    let value = db.lookup(symbols, atom.symbol, &key);
    let mut extended = subst.clone();
    Some(crate::unify::match_term(&atom.args[key_arity], &value, &mut extended).then_some(extended))
}

/// Satisfies a `Code`-interpreted body atom by calling its host function.
///
/// The leading `arity - output_arity` argument positions must already be
/// ground in `subst`; the trailing `output_arity` positions are unified
/// against the function's return value. Returns `Ok(None)` (not an error) if
/// the call succeeds but the result doesn't match an already-bound output
/// term — that's an ordinary failed-match, not a fault.
pub fn satisfy_code(
    symbols: &SymbolTable,
    runtime: &LatticeRuntime,
    atom: &Atom,
    subst: &Substitution,
) -> Result<Option<Substitution>, EvalError> {
    let Interpretation::Code { output_arity } = symbols.symbol(atom.symbol).interpretation.clone() else {
        panic!("satisfy_code called on a non-Code symbol");
    };
    let input_len = atom.args.len() - output_arity;

    let mut inputs = Vec::with_capacity(input_len);
    for (position, term) in atom.args[..input_len].iter().enumerate() {
        match groundify(term, subst) {
            Some(value) => inputs.push(value),
            None => {
                return Err(EvalError::UngroundFunctionInput {
                    symbol: atom.symbol,
                    position,
                })
            }
        }
    }

    let result = runtime.call_code(atom.symbol, &inputs);
    let Some(result) = result else {
        return Ok(None);
    };

    let output_terms = &atom.args[input_len..];
    let mut extended = subst.clone();
    let matched = if output_arity == 1 {
        crate::unify::match_term(&output_terms[0], &result, &mut extended)
    } else {
        match &result {
            Value::Tuple(values) if values.len() == output_arity => output_terms
                .iter()
                .zip(values.iter())
                .all(|(t, v)| crate::unify::match_term(t, v, &mut extended)),
            _ => false,
        }
    };

    Ok(matched.then_some(extended))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Term;

    #[test]
    fn scan_satisfies_relation_atom_against_stored_tuples() {
        let mut symbols = SymbolTable::new();
        let edge = symbols.declare("edge", 2, Interpretation::Relation).unwrap();
        let mut db = Database::new();
        db.insert_relation(&symbols, edge, vec![Value::Int32(1), Value::Int32(2)].into());
        db.insert_relation(&symbols, edge, vec![Value::Int32(2), Value::Int32(3)].into());

        let atom = Atom::new(edge, [Term::Constant(Value::Int32(1)), Term::var("y")]);
        let results = satisfy_by_scan(&symbols, &db, &atom, &Substitution::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get("y"), Some(&Value::Int32(2)));
    }

    #[test]
    fn lattice_map_atom_with_ground_key_and_no_entry_binds_bottom() {
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
        let db = Database::new();

        let atom = Atom::new(val, [Term::Constant(Value::Int32(1)), Term::var("v")]);
        let result = satisfy_lattice_map_by_key(&symbols, &db, &atom, &Substitution::new())
            .expect("key is fully ground")
            .expect("bottom value must match an unbound output term");
        assert_eq!(result.get("v"), Some(&Value::Bool(false)));
    }

    #[test]
    fn lattice_map_atom_with_unground_key_defers_to_a_scan() {
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
        let db = Database::new();

        let atom = Atom::new(val, [Term::var("k"), Term::var("v")]);
        assert!(satisfy_lattice_map_by_key(&symbols, &db, &atom, &Substitution::new()).is_none());
    }

    #[test]
    fn code_atom_requires_ground_inputs() {
        let mut symbols = SymbolTable::new();
        let double = symbols
            .declare("double", 2, Interpretation::Code { output_arity: 1 })
            .unwrap();
        let mut runtime = LatticeRuntime::new();
        runtime.register_code(double, |args| match &args[0] {
            Value::Int32(n) => Some(Value::Int32(n * 2)),
            _ => None,
        });

        let atom = Atom::new(double, [Term::var("x"), Term::var("y")]);
        let err = satisfy_code(&symbols, &runtime, &atom, &Substitution::new()).unwrap_err();
        assert!(matches!(err, EvalError::UngroundFunctionInput { symbol, .. } if symbol == double));

        let mut subst = Substitution::new();
        subst.bind("x".into(), Value::Int32(21));
        let ok = satisfy_code(&symbols, &runtime, &atom, &subst).unwrap().unwrap();
        assert_eq!(ok.get("y"), Some(&Value::Int32(42)));
    }
}
