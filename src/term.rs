//! Logic variables and terms.
//!
//! A [`Variable`] is identified by a process-unique integer issued by a
//! [`Variables`] arena. Identity, not the variable object, is the binding
//! key: reusing one variable across two concurrently in-flight queries is
//! unsafe. Identity `0` is reserved for the blank variable `_`, which
//! unifies with anything, never writes a binding, and never links two of
//! its own occurrences together.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::value::{Value, ValueType};

/// Variable identity. `0` is the blank variable.
pub type VarId = u64;

/// The reserved identity of the blank variable `_`.
pub const BLANK: VarId = 0;

/// Process-wide identity well. Arenas draw from it so that identities never
/// collide across query-building sessions, which keeps frames from two
/// queries disjoint even if a caller mixes their clauses up.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A typed logic variable.
#[derive(Debug, Clone)]
pub struct Variable {
    id: VarId,
    vtype: Option<ValueType>,
    name: Option<Arc<str>>,
}

impl Variable {
    /// The blank variable `_`.
    pub fn blank() -> Variable {
        Variable {
            id: BLANK,
            vtype: None,
            name: None,
        }
    }

    pub fn id(&self) -> VarId {
        self.id
    }

    pub fn is_blank(&self) -> bool {
        self.id == BLANK
    }

    /// The type capability, if any. A typed variable validates/coerces every
    /// constant bound to it.
    pub fn value_type(&self) -> Option<ValueType> {
        self.vtype
    }

    /// Debug name, if the variable was created with one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// How the variable prints in diagnostics: `?name` or `?<id>`.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("?{}", name),
            None if self.id == BLANK => "_".to_string(),
            None => format!("?{}", self.id),
        }
    }
}

/// Identity is the whole of variable equality.
impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Arena issuing variable identities for one query-building session.
///
/// The arena replaces a global mutable counter: construction is explicit and
/// scoped, while the identities themselves come from a shared monotonic well
/// so the global-uniqueness invariant holds across arenas.
#[derive(Debug, Default)]
pub struct Variables {
    issued: u64,
}

impl Variables {
    pub fn new() -> Variables {
        Variables::default()
    }

    fn next(&mut self) -> VarId {
        self.issued += 1;
        NEXT_ID.fetch_add(1, Ordering::Relaxed)
    }

    /// A fresh untyped, unnamed variable.
    pub fn fresh(&mut self) -> Variable {
        Variable {
            id: self.next(),
            vtype: None,
            name: None,
        }
    }

    /// A fresh untyped variable carrying a debug name.
    pub fn named(&mut self, name: &str) -> Variable {
        Variable {
            id: self.next(),
            vtype: None,
            name: Some(Arc::from(name)),
        }
    }

    /// A fresh typed variable; constants bound to it are validated/coerced
    /// through the given type.
    pub fn typed(&mut self, name: &str, vtype: ValueType) -> Variable {
        Variable {
            id: self.next(),
            vtype: Some(vtype),
            name: Some(Arc::from(name)),
        }
    }

    /// Number of variables this arena has issued.
    pub fn issued(&self) -> u64 {
        self.issued
    }
}

// ============================================================================
// TERMS
// ============================================================================

/// A term: a constant or a variable, usable in every clause position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Constant(Value),
    Variable(Variable),
}

impl Term {
    pub fn is_constant(&self) -> bool {
        matches!(self, Term::Constant(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// The constant inside, if this is one.
    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Term::Constant(value) => Some(value),
            Term::Variable(_) => None,
        }
    }

    /// The variable inside, if this is one.
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Term::Constant(_) => None,
            Term::Variable(variable) => Some(variable),
        }
    }

    /// The variable's identity, ignoring the blank variable (which is never
    /// a join key).
    pub fn var_id(&self) -> Option<VarId> {
        match self {
            Term::Variable(v) if !v.is_blank() => Some(v.id()),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Constant(value) => write!(f, "{}", value),
            Term::Variable(variable) => write!(f, "{}", variable),
        }
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Term {
        Term::Constant(value)
    }
}

impl From<Variable> for Term {
    fn from(variable: Variable) -> Term {
        Term::Variable(variable)
    }
}

impl From<&Variable> for Term {
    fn from(variable: &Variable) -> Term {
        Term::Variable(variable.clone())
    }
}

macro_rules! term_from_value {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Term {
            fn from(v: $ty) -> Term {
                Term::Constant(Value::from(v))
            }
        })*
    };
}

term_from_value!(bool, i32, i64, f32, &str, String, Vec<u8>, crate::value::Reference);

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_issues_unique_ids() {
        let mut a = Variables::new();
        let mut b = Variables::new();
        let x = a.fresh();
        let y = a.fresh();
        let z = b.fresh();
        assert_ne!(x.id(), y.id());
        assert_ne!(x.id(), z.id());
        assert_ne!(y.id(), z.id());
        assert_eq!(a.issued(), 2);
        assert_eq!(b.issued(), 1);
    }

    #[test]
    fn test_blank_identity() {
        let blank = Variable::blank();
        assert!(blank.is_blank());
        assert_eq!(blank.id(), BLANK);
        assert_eq!(Term::from(Variable::blank()).var_id(), None);
    }

    #[test]
    fn test_variable_equality_is_identity() {
        let mut vars = Variables::new();
        let x = vars.named("x");
        let also_x = x.clone();
        let y = vars.named("x");
        assert_eq!(x, also_x);
        assert_ne!(x, y); // same name, different identity
    }

    #[test]
    fn test_term_conversions() {
        assert_eq!(Term::from(5i64), Term::Constant(Value::Int64(5)));
        assert!(Term::from("a").is_constant());
        let mut vars = Variables::new();
        let v = vars.fresh();
        let term = Term::from(&v);
        assert_eq!(term.var_id(), Some(v.id()));
    }
}
