//! Triplog: an embeddable Datalog-style query engine over triple stores.
//!
//! Facts are (entity, attribute, value) triples held by a fact source;
//! queries are built as data — pattern clauses, boolean combinators,
//! functional relations, and recursive rules over typed logic variables —
//! and evaluated against the source, yielding every satisfying variable
//! assignment.
//!
//! ```
//! use triplog::{match_, query, Query, Selector, Triples, Fact, Variables};
//!
//! let store = Triples::from_facts([
//!     Fact::new(0i64, "name", "Ben"),
//!     Fact::new(0i64, "salary", 60000i64),
//! ]);
//!
//! let mut vars = Variables::new();
//! let id = vars.named("id");
//! let name = vars.named("name");
//!
//! let rows = query(&store, &Query {
//!     select: Selector::new().with("name", &name),
//!     where_: vec![match_(&id, "name", &name)],
//! }).unwrap();
//!
//! assert_eq!(rows[0].get("name"), Some(&"Ben".into()));
//! ```
//!
//! Evaluation is single-threaded, synchronous, and lazy: clause
//! combinators are pull-based iterator transforms over immutable binding
//! frames, and a consumer that stops pulling halts further work. The
//! planner reorders a query's clauses so every variable is resolved by
//! some earlier clause (range restriction) and the most selective store
//! lookups run first; an unsatisfiable ordering is a fatal
//! [`PlanError`], surfaced before evaluation starts.

pub mod bindings;
pub mod builtins;
pub mod clause;
pub mod error;
pub mod eval;
pub mod plan;
pub mod query;
pub mod rule;
pub mod store;
pub mod term;
pub mod value;

pub use bindings::{unify, unify_value, Frame, Mismatch};
pub use clause::{
    and, blank, check, formula, match_, not, or, pair, tuple, Clause, FormulaApplication, Operand,
    Operator, Output, Pattern, Resolved, Selector,
};
pub use error::{PlanError, QueryError, RuleError};
pub use eval::{evaluate, Frames};
pub use plan::plan;
pub use query::{query, recursive, rule, Query, Row};
pub use rule::{Rule, RuleApplication};
pub use store::{FactSelector, FactSource, Instruction, TransactError, Triples};
pub use term::{Term, VarId, Variable, Variables};
pub use value::{Fact, Reference, Value, ValueType};
