//! Rules: named, parameterized, optionally self-referential sub-queries.
//!
//! A rule pairs a formal parameter selector with a body clause. Applying a
//! rule scopes evaluation to the rule's own variable namespace: the caller's
//! terms are unified against the formals to build a seed frame, the body
//! runs against that singleton seed, and every body result is merged back
//! into the caller's frame. A recursive application re-enters the same
//! procedure; termination is the caller's responsibility — there is no
//! cycle detection and no fixpoint cache.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use crate::bindings::{unify, Frame};
use crate::clause::{Clause, Selector};
use crate::error::RuleError;
use crate::term::Term;

/// A constructed rule. Cheap to clone; applications share the body.
///
/// A self-referential body holds the rule through this same handle, so a
/// recursive rule is an `Rc` cycle and lives for the life of the process.
/// Rule sets are built once and reused, which makes that the right
/// trade-off here.
#[derive(Debug, Clone)]
pub struct Rule {
    inner: Rc<RuleInner>,
}

#[derive(Debug)]
struct RuleInner {
    formals: Selector,
    body: OnceCell<Clause>,
}

impl Rule {
    /// A rule whose body is already planned.
    pub(crate) fn from_parts(formals: Selector, body: Clause) -> Rule {
        let inner = RuleInner {
            formals,
            body: OnceCell::new(),
        };
        let _ = inner.body.set(body);
        Rule {
            inner: Rc::new(inner),
        }
    }

    /// A rule handle whose body arrives later, so the body's clauses can
    /// apply the rule being defined. See [`crate::recursive`].
    pub(crate) fn deferred(formals: Selector) -> Rule {
        Rule {
            inner: Rc::new(RuleInner {
                formals,
                body: OnceCell::new(),
            }),
        }
    }

    pub(crate) fn set_body(&self, body: Clause) {
        self.inner
            .body
            .set(body)
            .expect("rule body is set exactly once");
    }

    /// The formal parameter selector.
    pub fn formals(&self) -> &Selector {
        &self.inner.formals
    }

    pub(crate) fn body(&self) -> &Clause {
        self.inner
            .body
            .get()
            .expect("rule body is initialized at construction")
    }

    /// Apply the rule to caller-supplied terms, producing a clause.
    ///
    /// Arity mismatches between the terms and the rule's formals are a
    /// programmer mistake and fail here, at construction time, rather than
    /// silently producing no results during evaluation.
    pub fn apply(&self, terms: Selector) -> Result<Clause, RuleError> {
        for name in self.inner.formals.names() {
            if !terms.contains(name) {
                return Err(RuleError::MissingParameter {
                    name: name.to_string(),
                });
            }
        }
        for (name, _) in terms.iter() {
            if !self.inner.formals.contains(name) {
                return Err(RuleError::UnknownParameter { name: name.clone() });
            }
        }
        Ok(Clause::Apply(RuleApplication {
            rule: self.clone(),
            terms,
        }))
    }
}

/// A rule application: the rule plus the caller's terms, keyed by formal
/// parameter name. Arity was validated when the clause was built.
#[derive(Debug, Clone)]
pub struct RuleApplication {
    rule: Rule,
    terms: Selector,
}

impl RuleApplication {
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn terms(&self) -> &Selector {
        &self.terms
    }

    /// Build the seed frame for one caller frame: each formal unifies
    /// against the caller's term resolved through the caller frame. A
    /// caller term that is still an unbound variable links the formal to
    /// it, so bindings made by the body flow out through the link.
    ///
    /// `None` means the caller's constants don't fit the formals (a typed
    /// mismatch or a conflicting constant) — the frame is dropped, the
    /// recoverable tier.
    pub(crate) fn seed(&self, frame: &Frame) -> Option<Frame> {
        let mut seed = Frame::new();
        for (name, formal) in self.rule.formals().iter() {
            let caller = self
                .terms
                .get(name)
                .expect("application terms cover every formal");
            let resolved = frame.walk(caller);
            seed = unify(formal, &resolved, &seed).ok()?;
        }
        Some(seed)
    }

    /// Merge one body result back into the caller's frame: each caller
    /// term unifies against the formal's resolved value. Formals the body
    /// left unbound contribute nothing.
    pub(crate) fn merge(&self, caller_frame: &Frame, result: &Frame) -> Option<Frame> {
        let mut merged = caller_frame.clone();
        for (name, formal) in self.rule.formals().iter() {
            let caller = self
                .terms
                .get(name)
                .expect("application terms cover every formal");
            if let Term::Constant(value) = result.walk(formal) {
                merged = unify(caller, &Term::Constant(value), &merged).ok()?;
            }
        }
        Some(merged)
    }
}

impl fmt::Display for RuleApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(apply {})", self.terms)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{match_, Selector};
    use crate::term::{Variable, Variables};
    use crate::value::Value;

    fn sample_rule(vars: &mut Variables) -> Rule {
        let item = vars.named("item");
        let label = vars.named("label");
        let body = match_(&item, "name", &label);
        let formals = Selector::new().with("item", &item).with("label", &label);
        Rule::from_parts(formals, body)
    }

    #[test]
    fn test_apply_validates_arity() {
        let mut vars = Variables::new();
        let rule = sample_rule(&mut vars);
        let x = vars.named("x");

        let missing = rule.apply(Selector::new().with("item", &x));
        assert_eq!(
            missing.unwrap_err(),
            RuleError::MissingParameter {
                name: "label".to_string()
            }
        );

        let unknown = rule.apply(
            Selector::new()
                .with("item", &x)
                .with("label", &x)
                .with("extra", 1i64),
        );
        assert_eq!(
            unknown.unwrap_err(),
            RuleError::UnknownParameter {
                name: "extra".to_string()
            }
        );

        let y = vars.named("y");
        assert!(rule
            .apply(Selector::new().with("item", &x).with("label", &y))
            .is_ok());
    }

    #[test]
    fn test_seed_links_unbound_caller_variables() {
        let mut vars = Variables::new();
        let rule = sample_rule(&mut vars);
        let x = vars.named("x");
        let Clause::Apply(application) = rule
            .apply(
                Selector::new()
                    .with("item", Value::Int64(0))
                    .with("label", &x),
            )
            .unwrap()
        else {
            unreachable!()
        };

        let seed = application.seed(&Frame::new()).unwrap();
        // The constant parameter bound the formal directly.
        let item_formal = rule.formals().get("item").unwrap();
        assert_eq!(seed.resolve(item_formal), Some(Value::Int64(0)));
        // The variable parameter produced a link, not a value.
        let label_formal = rule.formals().get("label").unwrap();
        assert_eq!(seed.resolve(label_formal), None);
        assert!(matches!(seed.walk(label_formal), Term::Variable(v) if v.id() == x.id()));
    }

    #[test]
    fn test_merge_carries_results_to_caller() {
        let mut vars = Variables::new();
        let rule = sample_rule(&mut vars);
        let x = vars.named("x");
        let Clause::Apply(application) = rule
            .apply(
                Selector::new()
                    .with("item", Value::Int64(0))
                    .with("label", &x),
            )
            .unwrap()
        else {
            unreachable!()
        };

        let caller_frame = Frame::new();
        let seed = application.seed(&caller_frame).unwrap();
        // Pretend the body bound the label formal.
        let label_formal = rule.formals().get("label").unwrap();
        let result = unify(label_formal, &Term::from("Ben"), &seed).unwrap();

        let merged = application.merge(&caller_frame, &result).unwrap();
        assert_eq!(
            merged.resolve(&Term::from(&x)),
            Some(Value::from("Ben"))
        );
    }

    #[test]
    fn test_blank_parameter_is_unconstrained() {
        let mut vars = Variables::new();
        let rule = sample_rule(&mut vars);
        let Clause::Apply(application) = rule
            .apply(
                Selector::new()
                    .with("item", Value::Int64(0))
                    .with("label", Variable::blank()),
            )
            .unwrap()
        else {
            unreachable!()
        };
        let seed = application.seed(&Frame::new()).unwrap();
        let label_formal = rule.formals().get("label").unwrap();
        assert!(!seed.is_bound(label_formal.as_variable().unwrap()));
    }
}
