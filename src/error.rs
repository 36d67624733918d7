//! Fatal error types.
//!
//! These are the per-query tier: planning failures and malformed rule
//! applications indicate a programmer mistake in query construction and
//! surface as explicit errors before evaluation starts. The recoverable
//! per-frame tier ([`crate::bindings::Mismatch`]) never reaches here — a
//! failing candidate frame is silently dropped from the stream.

use std::error::Error;
use std::fmt;

/// Planning failure: the clause set admits no safe left-to-right order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Some variable can never be resolved by any ordering; the listed
    /// labels are the variables left unresolved by the best attempt.
    RangeRestriction { variables: Vec<String> },
    /// A formula names an operator that is not in the registry.
    UnknownOperator { name: String },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::RangeRestriction { variables } => {
                write!(
                    f,
                    "query is not range-restricted: no clause order can resolve {}",
                    variables.join(", ")
                )
            }
            PlanError::UnknownOperator { name } => {
                write!(f, "unknown operator: {}", name)
            }
        }
    }
}

impl Error for PlanError {}

/// Malformed rule application: the caller-supplied terms do not fit the
/// rule's formal parameter selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// A formal parameter was not supplied.
    MissingParameter { name: String },
    /// A supplied name matches no formal parameter.
    UnknownParameter { name: String },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::MissingParameter { name } => {
                write!(f, "rule application omits parameter {:?}", name)
            }
            RuleError::UnknownParameter { name } => {
                write!(f, "rule has no parameter {:?}", name)
            }
        }
    }
}

impl Error for RuleError {}

/// Any fatal query-construction failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    Plan(PlanError),
    Rule(RuleError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Plan(e) => write!(f, "{}", e),
            QueryError::Rule(e) => write!(f, "{}", e),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            QueryError::Plan(e) => Some(e),
            QueryError::Rule(e) => Some(e),
        }
    }
}

impl From<PlanError> for QueryError {
    fn from(error: PlanError) -> QueryError {
        QueryError::Plan(error)
    }
}

impl From<RuleError> for QueryError {
    fn from(error: RuleError) -> QueryError {
        QueryError::Rule(error)
    }
}
