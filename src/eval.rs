//! The lazy clause evaluator.
//!
//! `evaluate` is a pure function from (store, clause, frame stream) to a
//! frame stream; it never mutates the store. Each clause variant is a
//! separate transform over the stream, composed by ordinary iterator
//! plumbing — rule recursion is plain function recursion back through this
//! entry point, and a consumer that stops pulling halts all further work.
//!
//! Disjunction is the single eager point: it must materialize its input
//! frames once so every branch replays the same starting set. Everything
//! else streams.

use std::iter;

use tracing::trace;

use crate::bindings::{unify, unify_value, Frame};
use crate::builtins;
use crate::clause::{Clause, FormulaApplication, Operand, Operator, Output, Resolved, Selector};
use crate::rule::RuleApplication;
use crate::store::FactSource;
use crate::value::Value;

/// A lazily evaluated stream of binding frames.
pub type Frames<'a> = Box<dyn Iterator<Item = Frame> + 'a>;

/// Evaluate a clause over a stream of input frames, yielding every
/// satisfying extension of each.
pub fn evaluate<'a>(
    store: &'a dyn FactSource,
    clause: &'a Clause,
    frames: Frames<'a>,
) -> Frames<'a> {
    match clause {
        // Thread the stream through each conjunct left to right. Order is
        // evaluation-significant; the planner chooses it, not this step.
        Clause::And(clauses) => clauses
            .iter()
            .fold(frames, |stream, clause| evaluate(store, clause, stream)),

        // Every branch sees the same starting frames, so the single-pass
        // source has to be materialized once. Results concatenate in
        // branch order; a frame satisfying two branches appears twice.
        Clause::Or(branches) => {
            let input: Vec<Frame> = frames.collect();
            trace!(
                branches = branches.len(),
                frames = input.len(),
                "or: input materialized"
            );
            Box::new(branches.iter().flat_map(move |branch| {
                evaluate(store, branch, Box::new(input.clone().into_iter()))
            }))
        }

        // Negation-as-failure: a frame passes through unchanged iff the
        // inner clause has no matches under it. Produces no new bindings.
        Clause::Not(inner) => Box::new(frames.filter(move |frame| {
            evaluate(store, inner, Box::new(iter::once(frame.clone())))
                .next()
                .is_none()
        })),

        // Candidates are fetched once for the whole clause, then
        // nested-loop joined against every input frame, unifying the
        // entity, attribute, and value positions in order with a
        // short-circuit on the first failure.
        Clause::Match(pattern) => {
            let facts = store.facts(&pattern.selector());
            trace!(pattern = %pattern, candidates = facts.len(), "match: candidates fetched");
            Box::new(frames.flat_map(move |frame| {
                let mut matched = Vec::new();
                for fact in &facts {
                    let Ok(frame) = unify_value(&pattern.entity, &fact.entity, &frame) else {
                        continue;
                    };
                    let Ok(frame) = unify_value(&pattern.attribute, &fact.attribute, &frame)
                    else {
                        continue;
                    };
                    let Ok(frame) = unify_value(&pattern.value, &fact.value, &frame) else {
                        continue;
                    };
                    matched.push(frame);
                }
                matched.into_iter()
            }))
        }

        Clause::Formula(application) => Box::new(
            frames.flat_map(move |frame| formula_frames(application, &frame).into_iter()),
        ),

        Clause::Apply(application) => Box::new(
            frames.flat_map(move |frame| apply_frames(store, application, &frame).into_iter()),
        ),
    }
}

/// One formula step over one frame: resolve the input, invoke the
/// operator, unify what comes back. A multi-valued operator expands the
/// frame; a domain failure (empty result) or an unresolved input drops it.
fn formula_frames(application: &FormulaApplication, frame: &Frame) -> Vec<Frame> {
    // `==` over single terms is unification, not function application: it
    // binds in either direction, which is what lets the planner place an
    // assignment as soon as one side resolves.
    if application.is_assignment() {
        if let (Operand::Term(input), Output::Term(output)) =
            (&application.input, &application.output)
        {
            return match unify(input, output, frame) {
                Ok(frame) => vec![frame],
                Err(_) => Vec::new(),
            };
        }
    }
    let Some(input) = application.input.resolve(frame) else {
        return Vec::new();
    };
    let results = match &application.operator {
        Operator::Named(name) => builtins::apply(name, &input),
        Operator::Custom { apply, .. } => apply(&input),
    };
    match &application.output {
        // No output: the results are a pass/fail test on the frame.
        Output::None => {
            if results.is_empty() {
                Vec::new()
            } else {
                vec![frame.clone()]
            }
        }
        Output::Term(term) => results
            .iter()
            .filter_map(|result| {
                let value = result.as_value()?;
                unify_value(term, value, frame).ok()
            })
            .collect(),
        Output::Record(selector) => results
            .iter()
            .filter_map(|result| match result {
                Resolved::Record(fields) => unify_record(selector, fields, frame),
                _ => None,
            })
            .collect(),
    }
}

/// Field-wise unification of a record result against named output terms.
/// Every selector name must be present in the result.
fn unify_record(
    selector: &Selector,
    fields: &indexmap::IndexMap<String, Value>,
    frame: &Frame,
) -> Option<Frame> {
    let mut frame = frame.clone();
    for (name, term) in selector.iter() {
        let value = fields.get(name)?;
        frame = unify_value(term, value, &frame).ok()?;
    }
    Some(frame)
}

/// One rule application over one frame: seed the rule's namespace from the
/// caller's terms, run the body against the singleton seed, merge each
/// result back into the caller's frame. Recursive applications re-enter
/// `evaluate` as ordinary recursion.
fn apply_frames(
    store: &dyn FactSource,
    application: &RuleApplication,
    frame: &Frame,
) -> Vec<Frame> {
    let Some(seed) = application.seed(frame) else {
        return Vec::new();
    };
    evaluate(store, application.rule().body(), Box::new(iter::once(seed)))
        .filter_map(|result| application.merge(frame, &result))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{and, match_, not, or};
    use crate::store::Triples;
    use crate::term::{Term, Variables};
    use crate::value::Fact;

    fn seed<'a>() -> Frames<'a> {
        Box::new(iter::once(Frame::new()))
    }

    fn store() -> Triples {
        Triples::from_facts([
            Fact::new(0i64, "name", "Ben"),
            Fact::new(1i64, "name", "Ada"),
            Fact::new(0i64, "role", "admin"),
        ])
    }

    #[test]
    fn test_match_joins_per_frame() {
        let store = store();
        let mut vars = Variables::new();
        let id = vars.named("id");
        let name = vars.named("name");
        let clause = and([match_(&id, "role", "admin"), match_(&id, "name", &name)]);
        let frames: Vec<Frame> = evaluate(&store, &clause, seed()).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].resolve(&Term::from(&name)),
            Some("Ben".into())
        );
    }

    #[test]
    fn test_or_concatenates_in_branch_order() {
        let store = store();
        let mut vars = Variables::new();
        let id = vars.named("id");
        let clause = or([match_(&id, "name", "Ada"), match_(&id, "name", "Ben")]);
        let frames: Vec<Frame> = evaluate(&store, &clause, seed()).collect();
        let ids: Vec<_> = frames
            .iter()
            .map(|f| f.resolve(&Term::from(&id)).unwrap())
            .collect();
        assert_eq!(ids, vec![Value::Int64(1), Value::Int64(0)]);
    }

    #[test]
    fn test_not_passes_frames_unchanged() {
        let store = store();
        let mut vars = Variables::new();
        let id = vars.named("id");
        let clause = and([
            match_(&id, "name", crate::clause::blank()),
            not(match_(&id, "role", "admin")),
        ]);
        let frames: Vec<Frame> = evaluate(&store, &clause, seed()).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].resolve(&Term::from(&id)), Some(Value::Int64(1)));
    }

    #[test]
    fn test_abandoned_stream_stops_work() {
        let store = store();
        let mut vars = Variables::new();
        let e = vars.named("e");
        let a = vars.named("a");
        let v = vars.named("v");
        let clause = match_(&e, &a, &v);
        // Pull one result and drop the iterator: no panic, no exhaustion.
        let mut stream = evaluate(&store, &clause, seed());
        assert!(stream.next().is_some());
        drop(stream);
    }
}
