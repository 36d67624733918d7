//! The query planner.
//!
//! Input: a flattened clause list. Output: an ordering that is safe to
//! evaluate left to right — every clause's variables are resolved by some
//! earlier clause — or a fatal range-restriction error. The same greedy
//! placement doubles as the selectivity heuristic: patterns with the
//! fewest free positions go first, because more constant positions mean a
//! narrower store lookup.
//!
//! The algorithm is a fixed point over a `resolved` variable set:
//!
//! 1. classify clauses into assignments, patterns, functional relations,
//!    negations, disjunctions, and rule applications;
//! 2. place assignments with fewer than two unresolved variables;
//! 3. place functional relations whose input variables are all resolved;
//! 4. for `limit` in 1, 2, 3: place patterns with at most `limit`
//!    unresolved variables, re-running 2–3 after each placement;
//! 5. plan each disjunction branch recursively, append the whole `Or`,
//!    and conservatively mark every variable in any branch resolved;
//! 6. append negations whose variables are resolved;
//! 7. append rule applications, then retry 2–3;
//! 8. anything still unplaced is a range-restriction failure.
//!
//! A static score (pattern > and > or > formula > not > rule, penalized
//! per variable position) fixes iteration order inside each class.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use crate::builtins;
use crate::clause::{flatten, Clause, Operand, Operator, Output, Selector};
use crate::error::PlanError;
use crate::term::{Term, VarId};

/// Order a clause list for safe, selective, left-to-right evaluation.
///
/// `resolved` seeds the known-bound variables: empty for a query, the
/// formal parameters for a rule body.
pub fn plan(
    clauses: impl IntoIterator<Item = Clause>,
    resolved: &IndexSet<VarId>,
) -> Result<Vec<Clause>, PlanError> {
    let clauses = flatten(clauses);
    for clause in &clauses {
        validate_operators(clause)?;
    }

    let mut planner = Planner::new(clauses, resolved.clone());
    planner.settle();
    planner.place_patterns();
    planner.place_disjunctions()?;
    planner.place_negations();
    planner.place_applications();

    planner.finish()
}

struct Planner {
    resolved: IndexSet<VarId>,
    labels: IndexMap<VarId, String>,
    ordered: Vec<Clause>,
    assignments: Vec<Clause>,
    formulas: Vec<Clause>,
    patterns: Vec<Clause>,
    negations: Vec<Clause>,
    disjunctions: Vec<Clause>,
    applications: Vec<Clause>,
}

impl Planner {
    fn new(clauses: Vec<Clause>, resolved: IndexSet<VarId>) -> Planner {
        let mut planner = Planner {
            resolved,
            labels: IndexMap::new(),
            ordered: Vec::new(),
            assignments: Vec::new(),
            formulas: Vec::new(),
            patterns: Vec::new(),
            negations: Vec::new(),
            disjunctions: Vec::new(),
            applications: Vec::new(),
        };
        for clause in clauses {
            collect_labels(&clause, &mut planner.labels);
            match &clause {
                Clause::Formula(formula) if formula.is_assignment() => {
                    planner.assignments.push(clause)
                }
                Clause::Formula(_) => planner.formulas.push(clause),
                Clause::Match(_) => planner.patterns.push(clause),
                Clause::Not(_) => planner.negations.push(clause),
                Clause::Or(_) => planner.disjunctions.push(clause),
                Clause::Apply(_) => planner.applications.push(clause),
                // plan() flattened conjunctions already.
                Clause::And(_) => unreachable!("conjunctions are flattened before classification"),
            }
        }
        // Static tie-break inside each class; the sort is stable, so equal
        // scores keep their textual order.
        for class in [
            &mut planner.assignments,
            &mut planner.formulas,
            &mut planner.patterns,
            &mut planner.negations,
            &mut planner.disjunctions,
            &mut planner.applications,
        ] {
            class.sort_by_key(|clause| -clause.score());
        }
        planner
    }

    fn unresolved(&self, clause: &Clause) -> usize {
        let mut vars = IndexSet::new();
        clause.variables(&mut vars);
        vars.iter().filter(|id| !self.resolved.contains(*id)).count()
    }

    fn place(&mut self, clause: Clause) {
        trace!(clause = %clause, "planner: placed");
        clause.variables(&mut self.resolved);
        self.ordered.push(clause);
    }

    /// Steps 2–3 to their own fixed point: assignments with at least one
    /// side resolved, then functional relations whose inputs are resolved
    /// (their outputs become resolved), until neither makes progress.
    fn settle(&mut self) {
        loop {
            let mut progressed = false;
            while let Some(i) = self
                .assignments
                .iter()
                .position(|clause| self.unresolved(clause) < 2)
            {
                let clause = self.assignments.remove(i);
                self.place(clause);
                progressed = true;
            }
            while let Some(i) = self.formulas.iter().position(|clause| {
                let Clause::Formula(formula) = clause else {
                    return false;
                };
                formula
                    .input_variables()
                    .iter()
                    .all(|id| self.resolved.contains(id))
            }) {
                let clause = self.formulas.remove(i);
                self.place(clause);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
    }

    /// Step 4: selectivity tiers. Within a tier the pattern with the
    /// fewest unresolved variables goes first, so each placement can
    /// unlock cheaper patterns before the tier widens.
    fn place_patterns(&mut self) {
        for limit in 1..=3 {
            loop {
                let candidate = self
                    .patterns
                    .iter()
                    .enumerate()
                    .map(|(i, clause)| (self.unresolved(clause), i))
                    .filter(|(unresolved, _)| *unresolved <= limit)
                    .min_by_key(|(unresolved, _)| *unresolved);
                let Some((_, i)) = candidate else {
                    break;
                };
                let clause = self.patterns.remove(i);
                self.place(clause);
                self.settle();
            }
        }
    }

    /// Step 5: plan each branch independently, then append the whole `Or`.
    ///
    /// Marking *every* variable occurring anywhere in any branch as
    /// resolved is an intentional over-approximation: a branch that does
    /// not bind one of them can let a later clause run against a frame
    /// where the variable is unbound. Kept as specified.
    fn place_disjunctions(&mut self) -> Result<(), PlanError> {
        let disjunctions = std::mem::take(&mut self.disjunctions);
        for clause in disjunctions {
            let Clause::Or(branches) = clause else {
                unreachable!("disjunction class holds only Or clauses");
            };
            let mut planned = Vec::with_capacity(branches.len());
            for branch in branches {
                let ordered = plan([branch], &self.resolved)?;
                planned.push(match ordered.len() {
                    1 => ordered.into_iter().next().expect("one clause"),
                    _ => Clause::And(ordered),
                });
            }
            self.place(Clause::Or(planned));
            self.settle();
        }
        Ok(())
    }

    /// Step 6: negations go after the clauses that resolve their
    /// variables. One that stays unresolved here is a failure at step 8.
    fn place_negations(&mut self) {
        let negations = std::mem::take(&mut self.negations);
        for clause in negations {
            if self.unresolved(&clause) == 0 {
                self.place(clause);
            } else {
                self.negations.push(clause);
            }
        }
    }

    /// Step 7: rule applications last, then one more settle pass in case
    /// an application's outputs unlock a leftover assignment or formula.
    fn place_applications(&mut self) {
        let applications = std::mem::take(&mut self.applications);
        for clause in applications {
            self.place(clause);
        }
        self.settle();
    }

    /// Step 8: either a complete ordering or a range-restriction error
    /// naming the variables no ordering can resolve. Nothing is ever
    /// silently dropped.
    fn finish(self) -> Result<Vec<Clause>, PlanError> {
        let unplaced: Vec<&Clause> = self
            .assignments
            .iter()
            .chain(&self.formulas)
            .chain(&self.patterns)
            .chain(&self.negations)
            .collect();
        if unplaced.is_empty() {
            debug!(clauses = self.ordered.len(), "planner: order complete");
            return Ok(self.ordered);
        }
        let mut stuck = IndexSet::new();
        for clause in unplaced {
            clause.variables(&mut stuck);
        }
        let variables = stuck
            .iter()
            .filter(|id| !self.resolved.contains(*id))
            .map(|id| {
                self.labels
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| format!("?{}", id))
            })
            .collect();
        Err(PlanError::RangeRestriction { variables })
    }
}

/// Reject queries naming unknown registry operators before evaluation, so
/// a typo fails loudly instead of silently filtering every frame.
fn validate_operators(clause: &Clause) -> Result<(), PlanError> {
    match clause {
        Clause::And(clauses) | Clause::Or(clauses) => {
            clauses.iter().try_for_each(validate_operators)
        }
        Clause::Not(inner) => validate_operators(inner),
        Clause::Formula(formula) => match &formula.operator {
            Operator::Named(name) if !builtins::exists(name) => {
                Err(PlanError::UnknownOperator { name: name.clone() })
            }
            _ => Ok(()),
        },
        // Rule bodies were planned (and validated) at rule construction.
        Clause::Match(_) | Clause::Apply(_) => Ok(()),
    }
}

fn collect_labels(clause: &Clause, out: &mut IndexMap<VarId, String>) {
    let mut push = |term: &Term| {
        if let Some(id) = term.var_id() {
            let variable = term.as_variable().expect("var_id implies a variable");
            out.entry(id).or_insert_with(|| variable.label());
        }
    };
    match clause {
        Clause::And(clauses) | Clause::Or(clauses) => {
            for inner in clauses {
                collect_labels(inner, out);
            }
        }
        Clause::Not(inner) => collect_labels(inner, out),
        Clause::Match(pattern) => {
            push(&pattern.entity);
            push(&pattern.attribute);
            push(&pattern.value);
        }
        Clause::Formula(formula) => {
            match &formula.input {
                Operand::Term(term) => push(term),
                Operand::Tuple(terms) => terms.iter().for_each(&mut push),
                Operand::Record(fields) => fields.values().for_each(&mut push),
            }
            match &formula.output {
                Output::None => {}
                Output::Term(term) => push(term),
                Output::Record(selector) => selector_labels(selector, &mut push),
            }
        }
        Clause::Apply(application) => selector_labels(application.terms(), &mut push),
    }
}

fn selector_labels(selector: &Selector, push: &mut impl FnMut(&Term)) {
    for (_, term) in selector.iter() {
        push(term);
    }
}

// ============================================================================
// TESTS
// ============================================================================
