//! Ground values, open terms, and substitutions.
//!
//! Values are the ground algebraic data the database stores; terms are the open
//! patterns that appear in clause heads and bodies. A substitution binds variable
//! names to ground values. Nothing here ever needs unification between two
//! non-ground terms — the evaluator only ever matches a term pattern against an
//! already-ground tuple (see [`crate::unify`]).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A ground, structurally-comparable value.
///
/// Integer widths are distinct types with no implicit coercion between them —
/// `Int32(1) != Int64(1)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Unit,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    /// Arbitrary-precision-ish integer width; `i128` stands in for a bignum.
    BigInt(i128),
    Str(Arc<str>),
    Tuple(Arc<[Value]>),
    /// A named constructor application, e.g. `Pos`, `Some(Int32(1))`, `SP(Pos, Even)`.
    Ctor(Arc<str>, Arc<[Value]>),
}

impl Value {
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn tuple(values: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(values.into_iter().collect::<Vec<_>>().into())
    }

    pub fn ctor(name: impl Into<Arc<str>>, args: impl IntoIterator<Item = Value>) -> Self {
        Value::Ctor(name.into(), args.into_iter().collect::<Vec<_>>().into())
    }

    /// Constructor name and arity, for constructors only.
    pub fn ctor_head(&self) -> Option<(&str, usize)> {
        match self {
            Value::Ctor(name, args) => Some((name, args.len())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int8(n) => write!(f, "{n}i8"),
            Value::Int16(n) => write!(f, "{n}i16"),
            Value::Int32(n) => write!(f, "{n}"),
            Value::Int64(n) => write!(f, "{n}i64"),
            Value::BigInt(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, ")")
            }
            Value::Ctor(name, args) => {
                if args.is_empty() {
                    write!(f, "{name}")
                } else {
                    write!(f, "{name}(")?;
                    for (i, v) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{v}")?;
                    }
                    write!(f, ")")
                }
            }
        }
    }
}

/// The ground argument vector of a fact (a predicate's tuple of arguments).
pub type Tuple = Arc<[Value]>;

pub fn tuple(values: impl IntoIterator<Item = Value>) -> Tuple {
    values.into_iter().collect::<Vec<_>>().into()
}

/// An open term: a variable, a ground constant, or a constructor pattern over
/// sub-terms (which may themselves contain variables).
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Variable(Arc<str>),
    Constant(Value),
    Constructor(Arc<str>, Vec<Term>),
}

impl Term {
    pub fn var(name: impl Into<Arc<str>>) -> Self {
        Term::Variable(name.into())
    }

    pub fn constructor(name: impl Into<Arc<str>>, args: impl IntoIterator<Item = Term>) -> Self {
        Term::Constructor(name.into(), args.into_iter().collect())
    }

    /// Every variable name mentioned by this term, including nested ones.
    pub fn variables(&self, out: &mut Vec<Arc<str>>) {
        match self {
            Term::Variable(v) => out.push(v.clone()),
            Term::Constant(_) => {}
            Term::Constructor(_, args) => {
                for a in args {
                    a.variables(out);
                }
            }
        }
    }
}

/// A mapping from variable names to ground values.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    bindings: HashMap<Arc<str>, Value>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Binds `name` to `value`. Returns `false` (and leaves the substitution
    /// unchanged) if `name` is already bound to a *different* value.
    pub fn bind(&mut self, name: Arc<str>, value: Value) -> bool {
        match self.bindings.get(&name) {
            Some(existing) => *existing == value,
            None => {
                self.bindings.insert(name, value);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Replaces every bound variable in `term` with its value. Unbound variables
/// are left as-is — this is total, it never fails.
pub fn substitute(term: &Term, subst: &Substitution) -> Term {
    match term {
        Term::Variable(name) => match subst.get(name) {
            Some(value) => Term::Constant(value.clone()),
            None => term.clone(),
        },
        Term::Constant(_) => term.clone(),
        Term::Constructor(name, args) => Term::Constructor(
            name.clone(),
            args.iter().map(|a| substitute(a, subst)).collect(),
        ),
    }
}

/// Whether every variable `term` mentions is bound in `subst`.
pub fn is_ground(term: &Term, subst: &Substitution) -> bool {
    match term {
        Term::Variable(name) => subst.get(name).is_some(),
        Term::Constant(_) => true,
        Term::Constructor(_, args) => args.iter().all(|a| is_ground(a, subst)),
    }
}

/// Fully resolves `term` to a ground [`Value`] under `subst`. Fails if any
/// variable it mentions is unbound.
pub fn groundify(term: &Term, subst: &Substitution) -> Option<Value> {
    match term {
        Term::Variable(name) => subst.get(name).cloned(),
        Term::Constant(value) => Some(value.clone()),
        Term::Constructor(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for a in args {
                values.push(groundify(a, subst)?);
            }
            Some(Value::Ctor(name.clone(), values.into()))
        }
    }
}
