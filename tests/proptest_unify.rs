//! Property tests for unification and binding frames.

mod generators;

use generators::{arb_pair_same_type, arb_value};
use proptest::prelude::*;
use triplog::{unify, Frame, Term, Variable, Variables};

proptest! {
    /// For all constants `a`: `unify(a, a, frame)` succeeds with the frame
    /// unchanged.
    #[test]
    fn prop_unify_is_reflexive(value in arb_value()) {
        let frame = Frame::new();
        let term = Term::from(value);
        prop_assert_eq!(unify(&term, &term, &frame), Ok(frame));
    }

    /// For all `a != b` of the same type, `unify(a, b, frame)` fails.
    #[test]
    fn prop_distinct_constants_never_unify((a, b) in arb_pair_same_type()) {
        prop_assume!(a != b);
        let frame = Frame::new();
        prop_assert!(unify(&Term::from(a), &Term::from(b), &frame).is_err());
    }

    /// The blank variable matches anything and never adds a key.
    #[test]
    fn prop_blank_is_neutral(value in arb_value()) {
        let blank = Term::from(Variable::blank());
        let frame = unify(&blank, &Term::from(value), &Frame::new()).unwrap();
        prop_assert!(frame.is_empty());
    }

    /// Binding an unbound variable makes the value resolvable, and the
    /// original frame is untouched (persistence).
    #[test]
    fn prop_bind_then_resolve(value in arb_value()) {
        let mut vars = Variables::new();
        let x = Term::from(vars.fresh());
        let before = Frame::new();
        let after = unify(&x, &Term::from(value.clone()), &before).unwrap();
        prop_assert_eq!(after.resolve(&x), Some(value));
        prop_assert!(before.is_empty());
    }

    /// A bound variable re-unifies with its value and rejects any other
    /// value of the same type.
    #[test]
    fn prop_rebinding_requires_agreement((a, b) in arb_pair_same_type()) {
        let mut vars = Variables::new();
        let x = Term::from(vars.fresh());
        let frame = unify(&x, &Term::from(a.clone()), &Frame::new()).unwrap();
        prop_assert!(unify(&x, &Term::from(a.clone()), &frame).is_ok());
        if a != b {
            prop_assert!(unify(&x, &Term::from(b), &frame).is_err());
        }
    }

    /// Variable-to-variable links resolve once either side gets a value.
    #[test]
    fn prop_alias_links_resolve_transitively(value in arb_value()) {
        let mut vars = Variables::new();
        let x = Term::from(vars.fresh());
        let y = Term::from(vars.fresh());
        let frame = unify(&x, &y, &Frame::new()).unwrap();
        let frame = unify(&y, &Term::from(value.clone()), &frame).unwrap();
        prop_assert_eq!(frame.resolve(&x), Some(value.clone()));
        prop_assert_eq!(frame.resolve(&y), Some(value));
    }

    /// Unification never produces a partial frame: on failure the input
    /// frame still has exactly its old bindings.
    #[test]
    fn prop_no_partial_frames((a, b) in arb_pair_same_type()) {
        prop_assume!(a != b);
        let mut vars = Variables::new();
        let x = Term::from(vars.fresh());
        let frame = unify(&x, &Term::from(a), &Frame::new()).unwrap();
        let len_before = frame.len();
        let _ = unify(&x, &Term::from(b), &frame);
        prop_assert_eq!(frame.len(), len_before);
    }
}
