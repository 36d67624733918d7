//! Binding frames and unification.
//!
//! A [`Frame`] is an immutable substitution: variable identity → term.
//! Every successful unification step produces a *new* frame extending the
//! old one; a frame never rebinds an identity to a different value. Frames
//! are backed by a persistent hash map so branching is O(1) — conjunction
//! and disjunction both keep many concurrently live frames.
//!
//! Unification is single-assignment with deferred variable aliasing: an
//! unbound variable meeting another unbound variable links to it, and the
//! link resolves when either side later acquires a concrete value. There is
//! no occurs-check; a cyclic alias chain is the caller's bug and can loop.

use std::fmt;

use crate::term::{Term, VarId, Variable};
use crate::value::{Value, ValueType};

/// Immutable mapping from variable identity to a term.
///
/// Bound terms are either constants or variable-to-variable links; [`walk`]
/// chases links transitively.
///
/// [`walk`]: Frame::walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    slots: im::HashMap<VarId, Term>,
}

impl Frame {
    /// The empty frame.
    pub fn new() -> Frame {
        Frame::default()
    }

    /// The term bound to an identity, if any. One step only; see [`walk`]
    /// for transitive resolution.
    ///
    /// [`walk`]: Frame::walk
    pub fn get(&self, id: VarId) -> Option<&Term> {
        self.slots.get(&id)
    }

    pub fn is_bound(&self, variable: &Variable) -> bool {
        self.slots.contains_key(&variable.id())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VarId, &Term)> {
        self.slots.iter()
    }

    /// A new frame with one extra binding. Callers go through [`unify`];
    /// binding directly skips the type capability and re-binding checks.
    fn bind(&self, id: VarId, term: Term) -> Frame {
        let mut slots = self.slots.clone();
        slots.insert(id, term);
        Frame { slots }
    }

    /// Resolve a term through the frame, chasing variable links until a
    /// constant or an unbound variable remains.
    pub fn walk(&self, term: &Term) -> Term {
        let mut current = term.clone();
        while let Term::Variable(v) = &current {
            if v.is_blank() {
                break;
            }
            match self.slots.get(&v.id()) {
                Some(next) => current = next.clone(),
                None => break,
            }
        }
        current
    }

    /// Resolve a term to a constant if the frame determines one.
    pub fn resolve(&self, term: &Term) -> Option<Value> {
        match self.walk(term) {
            Term::Constant(value) => Some(value),
            Term::Variable(_) => None,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (id, term)) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "?{} = {}", id, term)?;
        }
        write!(f, "}}")
    }
}

// ============================================================================
// RECOVERABLE FAILURES
// ============================================================================

/// Why a candidate frame was rejected.
///
/// This is the recoverable error tier: a mismatch removes one frame from
/// the output stream and is never surfaced or logged — a Datalog query
/// routinely explores many failing candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// A typed variable rejected the constant.
    Type { expected: ValueType, got: Value },
    /// Two constants were not structurally equal.
    NotEqual { left: Value, right: Value },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Type { expected, got } => {
                write!(f, "expected {} value, got {}", expected, got)
            }
            Mismatch::NotEqual { left, right } => {
                write!(f, "{} != {}", left, right)
            }
        }
    }
}

// ============================================================================
// UNIFICATION
// ============================================================================

/// Unify two terms under a frame, producing the extended frame.
///
/// The algorithm, in order:
/// 1. the blank variable on either side succeeds without binding;
/// 2. a bound variable stands for its bound term (links chase
///    transitively);
/// 3. an unbound variable meeting a constant binds after running its type
///    capability, rejecting the frame on a typed mismatch;
/// 4. two unbound variables alias: the left identity links to the right
///    variable, deferring resolution;
/// 5. two constants succeed iff structurally equal.
///
/// No partial frame is ever produced: on failure the input frame is simply
/// dropped by the caller.
pub fn unify(left: &Term, right: &Term, frame: &Frame) -> Result<Frame, Mismatch> {
    if is_blank(left) || is_blank(right) {
        return Ok(frame.clone());
    }
    let left = frame.walk(left);
    let right = frame.walk(right);
    match (&left, &right) {
        (Term::Constant(a), Term::Constant(b)) => {
            if a == b {
                Ok(frame.clone())
            } else {
                Err(Mismatch::NotEqual {
                    left: a.clone(),
                    right: b.clone(),
                })
            }
        }
        (Term::Variable(a), Term::Variable(b)) => {
            if a.id() == b.id() {
                // Same variable on both sides: already unified.
                Ok(frame.clone())
            } else {
                Ok(frame.bind(a.id(), right.clone()))
            }
        }
        (Term::Variable(v), Term::Constant(c)) | (Term::Constant(c), Term::Variable(v)) => {
            bind_constant(v, c, frame)
        }
    }
}

/// Unify a term against a constant. Equivalent to
/// `unify(term, &Term::Constant(value.clone()), frame)` without the clone
/// on the failure paths; the match clause calls this for every fact
/// position.
pub fn unify_value(term: &Term, value: &Value, frame: &Frame) -> Result<Frame, Mismatch> {
    if is_blank(term) {
        return Ok(frame.clone());
    }
    match frame.walk(term) {
        Term::Constant(bound) => {
            if bound == *value {
                Ok(frame.clone())
            } else {
                Err(Mismatch::NotEqual {
                    left: bound,
                    right: value.clone(),
                })
            }
        }
        Term::Variable(v) => bind_constant(&v, value, frame),
    }
}

/// Bind an unbound variable to a constant, routing through its type
/// capability.
fn bind_constant(variable: &Variable, value: &Value, frame: &Frame) -> Result<Frame, Mismatch> {
    let value = match variable.value_type() {
        Some(vtype) => vtype.coerce(value).ok_or(Mismatch::Type {
            expected: vtype,
            got: value.clone(),
        })?,
        None => value.clone(),
    };
    Ok(frame.bind(variable.id(), Term::Constant(value)))
}

fn is_blank(term: &Term) -> bool {
    matches!(term, Term::Variable(v) if v.is_blank())
}

// ============================================================================
// TESTS
// ============================================================================
