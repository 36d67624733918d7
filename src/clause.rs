//! The clause AST.
//!
//! A query's `where` is a list of clauses: fact patterns, boolean
//! combinators, functional relations (formulas), and rule applications.
//! Each variant is an explicit case of one sum type carrying only its own
//! payload; the evaluator interprets them, the planner reorders them.

use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::bindings::Frame;
use crate::rule::RuleApplication;
use crate::store::FactSelector;
use crate::term::{Term, VarId, Variable};
use crate::value::Value;

/// A clause in a query body.
#[derive(Debug, Clone)]
pub enum Clause {
    /// Conjunction: thread the frame stream through each clause in order.
    And(Vec<Clause>),
    /// Disjunction: every branch sees the same input frames; results
    /// concatenate in branch order, without deduplication.
    Or(Vec<Clause>),
    /// Negation-as-failure: pass a frame through iff the inner clause has
    /// no matches under it.
    Not(Box<Clause>),
    /// Fact pattern against the store.
    Match(Pattern),
    /// Functional relation from the operator registry.
    Formula(FormulaApplication),
    /// Application of a (possibly recursive) rule.
    Apply(RuleApplication),
}

/// An (entity, attribute, value) pattern. Constant positions narrow the
/// store selector; variable positions are left open and join per frame.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub entity: Term,
    pub attribute: Term,
    pub value: Term,
}

impl Pattern {
    /// Derive the store selector from the constant positions. Computed once
    /// per clause: candidates are fetched for the whole clause, not per
    /// frame.
    pub fn selector(&self) -> FactSelector {
        FactSelector {
            entity: self.entity.as_constant().cloned(),
            attribute: self.attribute.as_constant().cloned(),
            value: self.value.as_constant().cloned(),
        }
    }

    fn variables(&self, out: &mut IndexSet<VarId>) {
        for term in [&self.entity, &self.attribute, &self.value] {
            if let Some(id) = term.var_id() {
                out.insert(id);
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {}]", self.entity, self.attribute, self.value)
    }
}

// ============================================================================
// SELECTORS
// ============================================================================

/// An ordered mapping from output name to term.
///
/// Used both as a rule's formal parameter list and as a query's final
/// projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector(IndexMap<String, Term>);

impl Selector {
    pub fn new() -> Selector {
        Selector::default()
    }

    /// Builder-style insertion, preserving insertion order.
    pub fn with(mut self, name: impl Into<String>, term: impl Into<Term>) -> Selector {
        self.0.insert(name.into(), term.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Term> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Term)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn variables(&self, out: &mut IndexSet<VarId>) {
        for (_, term) in self.iter() {
            if let Some(id) = term.var_id() {
                out.insert(id);
            }
        }
    }
}

impl<N: Into<String>, T: Into<Term>> FromIterator<(N, T)> for Selector {
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Selector {
        Selector(
            iter.into_iter()
                .map(|(name, term)| (name.into(), term.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, term)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, term)?;
        }
        write!(f, "}}")
    }
}

// ============================================================================
// FORMULAS
// ============================================================================

/// Input to a formula: whichever shape the operator expects.
#[derive(Debug, Clone)]
pub enum Operand {
    Term(Term),
    Tuple(Vec<Term>),
    Record(IndexMap<String, Term>),
}

impl Operand {
    pub fn record<N: Into<String>, T: Into<Term>>(
        fields: impl IntoIterator<Item = (N, T)>,
    ) -> Operand {
        Operand::Record(
            fields
                .into_iter()
                .map(|(name, term)| (name.into(), term.into()))
                .collect(),
        )
    }

    /// Fully resolve through a frame. `None` when any position is still a
    /// variable: the owning formula then drops the frame.
    pub fn resolve(&self, frame: &Frame) -> Option<Resolved> {
        match self {
            Operand::Term(term) => frame.resolve(term).map(Resolved::Value),
            Operand::Tuple(terms) => terms
                .iter()
                .map(|term| frame.resolve(term))
                .collect::<Option<Vec<Value>>>()
                .map(Resolved::Tuple),
            Operand::Record(fields) => fields
                .iter()
                .map(|(name, term)| frame.resolve(term).map(|v| (name.clone(), v)))
                .collect::<Option<IndexMap<String, Value>>>()
                .map(Resolved::Record),
        }
    }

    fn variables(&self, out: &mut IndexSet<VarId>) {
        let mut push = |term: &Term| {
            if let Some(id) = term.var_id() {
                out.insert(id);
            }
        };
        match self {
            Operand::Term(term) => push(term),
            Operand::Tuple(terms) => terms.iter().for_each(push),
            Operand::Record(fields) => fields.values().for_each(push),
        }
    }
}

macro_rules! operand_from_term {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Operand {
            fn from(v: $ty) -> Operand {
                Operand::Term(Term::from(v))
            }
        })*
    };
}

operand_from_term!(Term, Variable, &Variable, Value, bool, i32, i64, f32, &str, String);

/// A fully resolved operand, as handed to an operator, and the shape an
/// operator's results come back in (registry operators yield plain values;
/// custom operators may yield records for named outputs).
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value(Value),
    Tuple(Vec<Value>),
    Record(IndexMap<String, Value>),
}

impl Resolved {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Resolved::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// The function side of a formula: a registry name, or a caller-supplied
/// pure function.
#[derive(Clone)]
pub enum Operator {
    Named(String),
    Custom {
        name: String,
        apply: Rc<dyn Fn(&Resolved) -> Vec<Resolved>>,
    },
}

impl Operator {
    pub fn named(name: impl Into<String>) -> Operator {
        Operator::Named(name.into())
    }

    pub fn custom(
        name: impl Into<String>,
        apply: impl Fn(&Resolved) -> Vec<Resolved> + 'static,
    ) -> Operator {
        Operator::Custom {
            name: name.into(),
            apply: Rc::new(apply),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Operator::Named(name) => name,
            Operator::Custom { name, .. } => name,
        }
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Named(name) => write!(f, "Named({:?})", name),
            Operator::Custom { name, .. } => write!(f, "Custom({:?})", name),
        }
    }
}

/// Where a formula's results go.
#[derive(Debug, Clone)]
pub enum Output {
    /// No output: the formula is a pass/fail test on the input frame.
    None,
    /// Unify each produced value against one term.
    Term(Term),
    /// Unify record-shaped results field-wise against named terms.
    Record(Selector),
}

/// A functional relation used as a clause: resolve the input through the
/// current frame, invoke the operator, unify what comes back. One input
/// frame can expand into several output frames (multi-valued operators) or
/// vanish (domain failure).
#[derive(Debug, Clone)]
pub struct FormulaApplication {
    pub input: Operand,
    pub operator: Operator,
    pub output: Output,
}

impl FormulaApplication {
    pub fn input_variables(&self) -> IndexSet<VarId> {
        let mut out = IndexSet::new();
        self.input.variables(&mut out);
        out
    }

    pub fn output_variables(&self) -> IndexSet<VarId> {
        let mut out = IndexSet::new();
        match &self.output {
            Output::None => {}
            Output::Term(term) => {
                if let Some(id) = term.var_id() {
                    out.insert(id);
                }
            }
            Output::Record(selector) => selector.variables(&mut out),
        }
        out
    }

    /// Whether this is an identity assignment (`==`), the planner's
    /// cheapest class.
    pub fn is_assignment(&self) -> bool {
        self.operator.name() == "=="
    }
}

impl fmt::Display for FormulaApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.operator.name())?;
        match &self.input {
            Operand::Term(term) => write!(f, " {}", term)?,
            Operand::Tuple(terms) => {
                for term in terms {
                    write!(f, " {}", term)?;
                }
            }
            Operand::Record(fields) => {
                for (name, term) in fields {
                    write!(f, " {}: {}", name, term)?;
                }
            }
        }
        match &self.output {
            Output::None => {}
            Output::Term(term) => write!(f, " -> {}", term)?,
            Output::Record(selector) => write!(f, " -> {}", selector)?,
        }
        write!(f, ")")
    }
}

// ============================================================================
// CLAUSE OPERATIONS
// ============================================================================

impl Clause {
    /// Collect every non-blank variable identity occurring anywhere in the
    /// clause, in first-occurrence order.
    pub fn variables(&self, out: &mut IndexSet<VarId>) {
        match self {
            Clause::And(clauses) | Clause::Or(clauses) => {
                for clause in clauses {
                    clause.variables(out);
                }
            }
            Clause::Not(inner) => inner.variables(out),
            Clause::Match(pattern) => pattern.variables(out),
            Clause::Formula(formula) => {
                formula.input.variables(out);
                out.extend(formula.output_variables());
            }
            // Only the caller-side terms: the rule's own namespace is
            // private to its body.
            Clause::Apply(application) => application.terms().variables(out),
        }
    }

    /// Static tie-break score: pattern > and > or > formula > not > rule,
    /// penalized per variable position. Governs iteration order inside each
    /// planner class; the dependency-driven placement does the real work.
    pub fn score(&self) -> i64 {
        let base = match self {
            Clause::Match(_) => 600,
            Clause::And(_) => 500,
            Clause::Or(_) => 400,
            Clause::Formula(_) => 300,
            Clause::Not(_) => 200,
            Clause::Apply(_) => 100,
        };
        let mut vars = IndexSet::new();
        self.variables(&mut vars);
        base - 10 * vars.len() as i64
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::And(clauses) => {
                write!(f, "(and")?;
                for clause in clauses {
                    write!(f, " {}", clause)?;
                }
                write!(f, ")")
            }
            Clause::Or(clauses) => {
                write!(f, "(or")?;
                for clause in clauses {
                    write!(f, " {}", clause)?;
                }
                write!(f, ")")
            }
            Clause::Not(inner) => write!(f, "(not {})", inner),
            Clause::Match(pattern) => write!(f, "{}", pattern),
            Clause::Formula(formula) => write!(f, "{}", formula),
            Clause::Apply(application) => write!(f, "{}", application),
        }
    }
}

/// Flatten nested conjunctions into one clause list. `And` wrappers expand
/// recursively; every other clause passes through.
pub fn flatten(clauses: impl IntoIterator<Item = Clause>) -> Vec<Clause> {
    let mut out = Vec::new();
    for clause in clauses {
        match clause {
            Clause::And(inner) => out.extend(flatten(inner)),
            other => out.push(other),
        }
    }
    out
}

// ============================================================================
// BUILDERS
// ============================================================================

/// Conjunction of clauses.
pub fn and(clauses: impl IntoIterator<Item = Clause>) -> Clause {
    Clause::And(clauses.into_iter().collect())
}

/// Disjunction of clauses.
pub fn or(clauses: impl IntoIterator<Item = Clause>) -> Clause {
    Clause::Or(clauses.into_iter().collect())
}

/// Negation-as-failure.
pub fn not(clause: Clause) -> Clause {
    Clause::Not(Box::new(clause))
}

/// Fact pattern over (entity, attribute, value).
pub fn match_(
    entity: impl Into<Term>,
    attribute: impl Into<Term>,
    value: impl Into<Term>,
) -> Clause {
    Clause::Match(Pattern {
        entity: entity.into(),
        attribute: attribute.into(),
        value: value.into(),
    })
}

/// Formula clause with an output term.
pub fn formula(input: impl Into<Operand>, operator: &str, output: impl Into<Term>) -> Clause {
    Clause::Formula(FormulaApplication {
        input: input.into(),
        operator: Operator::named(operator),
        output: Output::Term(output.into()),
    })
}

/// Formula clause used as a pass/fail test (no output).
pub fn check(input: impl Into<Operand>, operator: &str) -> Clause {
    Clause::Formula(FormulaApplication {
        input: input.into(),
        operator: Operator::named(operator),
        output: Output::None,
    })
}

/// Tuple operand from terms, for the arithmetic and comparison operators.
pub fn tuple<T: Into<Term>>(terms: impl IntoIterator<Item = T>) -> Operand {
    Operand::Tuple(terms.into_iter().map(Into::into).collect())
}

/// Two-term tuple operand; the common shape for comparisons and binary
/// arithmetic, without forcing both terms to the same Rust type.
pub fn pair(left: impl Into<Term>, right: impl Into<Term>) -> Operand {
    Operand::Tuple(vec![left.into(), right.into()])
}

/// Blank `_` term, for positions whose value is irrelevant.
pub fn blank() -> Term {
    Term::Variable(Variable::blank())
}

// ============================================================================
// TESTS
// ============================================================================
