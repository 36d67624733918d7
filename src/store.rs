//! Fact store contracts and the in-memory triple index.
//!
//! The evaluator only needs the [`FactSource`] lookup contract: give me
//! every fact matching a possibly-partial selector. [`Triples`] is one
//! implementation — an in-memory index kept three ways (entity-first,
//! attribute-first, value-first) so that whichever selector positions are
//! constant, lookup narrows before scanning.
//!
//! Mutation goes through [`Triples::transact`] and must be serialized
//! strictly before or after a query, never interleaved with one: a match
//! clause fetches its candidates once and assumes a stable snapshot.

use std::error::Error;
use std::fmt;

use indexmap::{IndexMap, IndexSet};

use crate::value::{Fact, Value};

/// A possibly-partial (entity, attribute, value) selector. `None` in a
/// position means "any value in that position".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactSelector {
    pub entity: Option<Value>,
    pub attribute: Option<Value>,
    pub value: Option<Value>,
}

impl FactSelector {
    pub fn new() -> FactSelector {
        FactSelector::default()
    }

    pub fn entity(mut self, entity: impl Into<Value>) -> FactSelector {
        self.entity = Some(entity.into());
        self
    }

    pub fn attribute(mut self, attribute: impl Into<Value>) -> FactSelector {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> FactSelector {
        self.value = Some(value.into());
        self
    }

    /// Whether a fact matches every constant position.
    pub fn matches(&self, fact: &Fact) -> bool {
        self.entity.as_ref().map_or(true, |e| *e == fact.entity)
            && self
                .attribute
                .as_ref()
                .map_or(true, |a| *a == fact.attribute)
            && self.value.as_ref().map_or(true, |v| *v == fact.value)
    }
}

impl fmt::Display for FactSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let position = |value: &Option<Value>| match value {
            Some(v) => v.to_string(),
            None => "_".to_string(),
        };
        write!(
            f,
            "[{} {} {}]",
            position(&self.entity),
            position(&self.attribute),
            position(&self.value),
        )
    }
}

/// The fact lookup contract the evaluator consumes (the "querier").
///
/// Implementations return every fact matching the selector. The evaluator
/// never mutates a source and fetches candidates at most once per match
/// clause.
pub trait FactSource {
    fn facts(&self, selector: &FactSelector) -> Vec<Fact>;
}

/// One mutation: assert or retract a single fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Assert(Fact),
    Retract(Fact),
}

/// Transaction failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactError {
    /// Retraction of a fact that is not in the store. Instructions apply in
    /// order; the failing instruction and everything after it are not
    /// applied.
    NotFound(Fact),
}

impl fmt::Display for TransactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactError::NotFound(fact) => {
                write!(f, "cannot retract absent fact {}", fact)
            }
        }
    }
}

impl Error for TransactError {}

// ============================================================================
// IN-MEMORY TRIPLE INDEX
// ============================================================================

/// Two-level index: first key → second key → set of third components.
type Index = IndexMap<Value, IndexMap<Value, IndexSet<Value>>>;

/// In-memory triple store, indexed entity-first (EAV), attribute-first
/// (AEV), and value-first (VAE). Insertion order is preserved per level so
/// results are deterministic.
#[derive(Debug, Clone, Default)]
pub struct Triples {
    eav: Index,
    aev: Index,
    vae: Index,
    count: usize,
}

impl Triples {
    pub fn new() -> Triples {
        Triples::default()
    }

    /// Build a store from facts, ignoring duplicates.
    pub fn from_facts(facts: impl IntoIterator<Item = Fact>) -> Triples {
        let mut store = Triples::new();
        for fact in facts {
            store.assert(fact);
        }
        store
    }

    /// Add one fact. Returns false if it was already present.
    pub fn assert(&mut self, fact: Fact) -> bool {
        let Fact {
            entity,
            attribute,
            value,
        } = fact;
        let added = insert(&mut self.eav, &entity, &attribute, &value);
        if added {
            insert(&mut self.aev, &attribute, &entity, &value);
            insert(&mut self.vae, &value, &attribute, &entity);
            self.count += 1;
        }
        added
    }

    /// Remove one fact. Returns false if it was not present.
    pub fn retract(&mut self, fact: &Fact) -> bool {
        let removed = remove(&mut self.eav, &fact.entity, &fact.attribute, &fact.value);
        if removed {
            remove(&mut self.aev, &fact.attribute, &fact.entity, &fact.value);
            remove(&mut self.vae, &fact.value, &fact.attribute, &fact.entity);
            self.count -= 1;
        }
        removed
    }

    /// Apply instructions in order. The first failure aborts: it and every
    /// later instruction are left unapplied.
    pub fn transact(
        &mut self,
        instructions: impl IntoIterator<Item = Instruction>,
    ) -> Result<(), TransactError> {
        for instruction in instructions {
            match instruction {
                Instruction::Assert(fact) => {
                    self.assert(fact);
                }
                Instruction::Retract(fact) => {
                    if !self.retract(&fact) {
                        return Err(TransactError::NotFound(fact));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Every fact, entity-first order.
    pub fn iter(&self) -> impl Iterator<Item = Fact> + '_ {
        self.eav.iter().flat_map(|(entity, attrs)| {
            attrs.iter().flat_map(move |(attribute, values)| {
                values.iter().map(move |value| Fact {
                    entity: entity.clone(),
                    attribute: attribute.clone(),
                    value: value.clone(),
                })
            })
        })
    }
}

fn insert(index: &mut Index, first: &Value, second: &Value, third: &Value) -> bool {
    index
        .entry(first.clone())
        .or_default()
        .entry(second.clone())
        .or_default()
        .insert(third.clone())
}

fn remove(index: &mut Index, first: &Value, second: &Value, third: &Value) -> bool {
    let Some(inner) = index.get_mut(first) else {
        return false;
    };
    let Some(set) = inner.get_mut(second) else {
        return false;
    };
    let removed = set.shift_remove(third);
    if set.is_empty() {
        inner.shift_remove(second);
    }
    if inner.is_empty() {
        index.shift_remove(first);
    }
    removed
}

impl FactSource for Triples {
    fn facts(&self, selector: &FactSelector) -> Vec<Fact> {
        let fact = |e: &Value, a: &Value, v: &Value| Fact {
            entity: e.clone(),
            attribute: a.clone(),
            value: v.clone(),
        };
        match (&selector.entity, &selector.attribute, &selector.value) {
            (Some(e), Some(a), Some(v)) => match self.eav.get(e).and_then(|attrs| attrs.get(a)) {
                Some(values) if values.contains(v) => vec![fact(e, a, v)],
                _ => Vec::new(),
            },
            (Some(e), Some(a), None) => self
                .eav
                .get(e)
                .and_then(|attrs| attrs.get(a))
                .map(|values| values.iter().map(|v| fact(e, a, v)).collect())
                .unwrap_or_default(),
            (Some(e), None, Some(v)) => self
                .eav
                .get(e)
                .map(|attrs| {
                    attrs
                        .iter()
                        .filter(|(_, values)| values.contains(v))
                        .map(|(a, _)| fact(e, a, v))
                        .collect()
                })
                .unwrap_or_default(),
            (Some(e), None, None) => self
                .eav
                .get(e)
                .map(|attrs| {
                    attrs
                        .iter()
                        .flat_map(|(a, values)| values.iter().map(move |v| fact(e, a, v)))
                        .collect()
                })
                .unwrap_or_default(),
            (None, Some(a), Some(v)) => self
                .vae
                .get(v)
                .and_then(|attrs| attrs.get(a))
                .map(|entities| entities.iter().map(|e| fact(e, a, v)).collect())
                .unwrap_or_default(),
            (None, Some(a), None) => self
                .aev
                .get(a)
                .map(|entities| {
                    entities
                        .iter()
                        .flat_map(|(e, values)| values.iter().map(move |v| fact(e, a, v)))
                        .collect()
                })
                .unwrap_or_default(),
            (None, None, Some(v)) => self
                .vae
                .get(v)
                .map(|attrs| {
                    attrs
                        .iter()
                        .flat_map(|(a, entities)| entities.iter().map(move |e| fact(e, a, v)))
                        .collect()
                })
                .unwrap_or_default(),
            (None, None, None) => self.iter().collect(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
