//! Caller-facing entry points: queries, projection, rule construction.
//!
//! A query pairs a projection selector with a clause list. `query` plans
//! the clauses, evaluates them from a single empty frame, and projects
//! each surviving frame through the selector into a row.

use std::iter;

use indexmap::{IndexMap, IndexSet};

use crate::bindings::Frame;
use crate::clause::{Clause, Selector};
use crate::error::{QueryError, RuleError};
use crate::eval::evaluate;
use crate::plan::plan;
use crate::rule::Rule;
use crate::store::FactSource;
use crate::value::Value;

/// The caller-facing unit of work.
#[derive(Debug, Clone)]
pub struct Query {
    /// Projection: output name → term.
    pub select: Selector,
    /// Clause list, implicitly conjoined. Written order does not matter;
    /// the planner chooses the evaluation order.
    pub where_: Vec<Clause>,
}

/// One result row: each select name mapped to its resolved constant.
///
/// A selected variable that no surviving frame bound materializes as a
/// missing field in that row rather than aborting the query.
pub type Row = IndexMap<String, Value>;

/// Run a query against a fact source, returning every satisfying row.
///
/// Results are not deduplicated: a binding reachable two ways appears
/// twice. Fails only on construction mistakes — a clause set that is not
/// range-restricted, or an unknown operator; data conditions never error.
pub fn query(store: &dyn FactSource, query: &Query) -> Result<Vec<Row>, QueryError> {
    let ordered = plan(query.where_.iter().cloned(), &IndexSet::new())?;
    let body = Clause::And(ordered);
    let rows = evaluate(store, &body, Box::new(iter::once(Frame::new())))
        .map(|frame| project(&query.select, &frame))
        .collect();
    Ok(rows)
}

fn project(select: &Selector, frame: &Frame) -> Row {
    let mut row = Row::new();
    for (name, term) in select.iter() {
        if let Some(value) = frame.resolve(term) {
            row.insert(name.clone(), value);
        }
    }
    row
}

/// Construct a rule from a formal selector and a body clause list.
///
/// The body is planned here, with the formals seeded as resolved; a body
/// that is not range-restricted fails at construction, not at first
/// application.
pub fn rule(select: Selector, where_: Vec<Clause>) -> Result<Rule, QueryError> {
    let mut resolved = IndexSet::new();
    select.variables(&mut resolved);
    let ordered = plan(where_, &resolved)?;
    Ok(Rule::from_parts(select, Clause::And(ordered)))
}

/// Construct a rule whose body may apply the rule being defined.
///
/// The closure receives a handle to the rule before its body exists, so
/// `handle.apply(...)` clauses inside the body can reference it — direct
/// recursion. Termination remains the caller's responsibility: nothing
/// detects cycles or memoizes recursive applications.
pub fn recursive(
    select: Selector,
    build: impl FnOnce(&Rule) -> Result<Vec<Clause>, RuleError>,
) -> Result<Rule, QueryError> {
    let rule = Rule::deferred(select);
    let clauses = build(&rule)?;
    let mut resolved = IndexSet::new();
    rule.formals().variables(&mut resolved);
    let ordered = plan(clauses, &resolved)?;
    rule.set_body(Clause::And(ordered));
    Ok(rule)
}

// ============================================================================
// TESTS
// ============================================================================
