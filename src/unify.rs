//! Matches a term pattern against a ground value, extending a substitution.
//!
//! This is a one-directional matcher, not a general unifier: the right-hand
//! side is always already ground (a value taken from the database), which is
//! why no occurs-check or unification-between-open-terms is ever needed (see
//! the Non-goals in the crate's top-level docs).

use crate::clause::Atom;
use crate::value::{Substitution, Term, Value};

/// Extends `subst` so that `term` matches `value`, or fails if they disagree.
///
/// - A variable unifies with any value; if it is already bound, the new
///   value must equal the old one.
/// - A constant matches only an equal value.
/// - A constructor pattern matches a [`Value::Ctor`] of the same name and
///   arity, recursively matching each argument.
pub fn match_term(term: &Term, value: &Value, subst: &mut Substitution) -> bool {
    match term {
        Term::Variable(name) => subst.bind(name.clone(), value.clone()),
        Term::Constant(expected) => expected == value,
        Term::Constructor(name, args) => match value {
            Value::Ctor(vname, vargs) if vname.as_ref() == name.as_ref() && vargs.len() == args.len() => {
                args.iter().zip(vargs.iter()).all(|(t, v)| match_term(t, v, subst))
            }
            _ => false,
        },
    }
}

/// Matches every argument of `atom` against the corresponding element of
/// `tuple`, extending `subst` in place.
///
/// Returns `false` (leaving `subst` partially extended — callers should clone
/// before calling if they need to roll back) on the first mismatch. The
/// evaluator always calls this against a cloned substitution per candidate.
pub fn match_atom(atom: &Atom, tuple: &[Value], subst: &mut Substitution) -> bool {
    if atom.args.len() != tuple.len() {
        return false;
    }
    atom.args
        .iter()
        .zip(tuple.iter())
        .all(|(term, value)| match_term(term, value, subst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolId;

    #[test]
    fn variable_binds_to_any_value() {
        let mut subst = Substitution::new();
        assert!(match_term(&Term::var("x"), &Value::Int32(42), &mut subst));
        assert_eq!(subst.get("x"), Some(&Value::Int32(42)));
    }

    #[test]
    fn repeated_variable_must_agree() {
        let atom = Atom::new(
            SymbolId(0),
            [Term::var("x"), Term::var("x")],
        );
        let mut subst = Substitution::new();
        assert!(match_atom(&atom, &[Value::Int32(1), Value::Int32(1)], &mut subst));

        let mut subst2 = Substitution::new();
        assert!(!match_atom(&atom, &[Value::Int32(1), Value::Int32(2)], &mut subst2));
    }

    #[test]
    fn constructor_pattern_matches_structurally() {
        let pattern = Term::constructor(
            "SP",
            [Term::var("s"), Term::Constant(Value::ctor("Even", []))],
        );
        let mut subst = Substitution::new();
        let value = Value::ctor("SP", [Value::ctor("Pos", []), Value::ctor("Even", [])]);
        assert!(match_term(&pattern, &value, &mut subst));
        assert_eq!(subst.get("s"), Some(&Value::ctor("Pos", [])));
    }

    #[test]
    fn constructor_mismatch_fails() {
        let pattern = Term::constructor("Some", [Term::var("x")]);
        let mut subst = Substitution::new();
        let value = Value::ctor("None", []);
        assert!(!match_term(&pattern, &value, &mut subst));
    }

    proptest::proptest! {
        #[test]
        fn a_fresh_variable_matches_and_binds_any_int(n: i32) {
            let mut subst = Substitution::new();
            assert!(match_term(&Term::var("x"), &Value::Int32(n), &mut subst));
            assert_eq!(subst.get("x"), Some(&Value::Int32(n)));
        }

        #[test]
        fn a_constant_term_only_matches_its_own_value(a: i32, b: i32) {
            let mut subst = Substitution::new();
            let matched = match_term(&Term::Constant(Value::Int32(a)), &Value::Int32(b), &mut subst);
            prop_assert_eq!(matched, a == b);
        }
    }
}
