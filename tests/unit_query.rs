//! End-to-end query tests: planning, evaluation, projection, rules.

use triplog::{
    and, check, match_, or, query, recursive, rule, pair, tuple, Fact, PlanError, Query, QueryError,
    Selector, Triples, Value, Variables,
};

fn employees() -> Triples {
    Triples::from_facts([
        Fact::new(0i64, "salary", 60000i64),
        Fact::new(0i64, "name", "Ben"),
        Fact::new(1i64, "salary", 40000i64),
        Fact::new(1i64, "supervisor", 0i64),
    ])
}

/// Salary query over the employee dataset: the threshold formula sits
/// between two patterns in written order, and the planner must schedule it
/// after `salary` resolves.
fn salary_above(store: &Triples, threshold: i64) -> Vec<triplog::Row> {
    let mut vars = Variables::new();
    let id = vars.named("id");
    let name = vars.named("name");
    let salary = vars.named("salary");
    query(
        store,
        &Query {
            select: Selector::new().with("name", &name).with("salary", &salary),
            where_: vec![
                match_(&id, "salary", &salary),
                check(pair(&salary, threshold), ">"),
                match_(&id, "name", &name),
            ],
        },
    )
    .unwrap()
}

#[test]
fn test_employee_salary_threshold() {
    let store = employees();
    let rows = salary_above(&store, 30000);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::from("Ben")));
    assert_eq!(rows[0].get("salary"), Some(&Value::Int64(60000)));
    // Raising the threshold above Ben's salary empties the result.
    assert!(salary_above(&store, 60000).is_empty());
}

#[test]
fn test_unnamed_employee_passes_without_name_pattern() {
    let store = employees();
    let mut vars = Variables::new();
    let id = vars.named("id");
    let salary = vars.named("salary");
    let rows = query(
        &store,
        &Query {
            select: Selector::new().with("salary", &salary),
            where_: vec![
                match_(&id, "salary", &salary),
                check(pair(&salary, 30000i64), ">"),
            ],
        },
    )
    .unwrap();
    // Both salaries clear 30000; only one clears 50000.
    assert_eq!(rows.len(), 2);
    let rows = query(
        &store,
        &Query {
            select: Selector::new().with("salary", &salary),
            where_: vec![
                match_(&id, "salary", &salary),
                check(pair(&salary, 50000i64), ">"),
            ],
        },
    )
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("salary"), Some(&Value::Int64(60000)));
}

fn chain() -> Triples {
    Triples::from_facts([
        Fact::new(0i64, "name", "zero"),
        Fact::new(1i64, "name", "one"),
        Fact::new(2i64, "name", "two"),
        Fact::new(3i64, "name", "three"),
        Fact::new(0i64, "list/next", 1i64),
        Fact::new(1i64, "list/next", 2i64),
        Fact::new(2i64, "list/next", 3i64),
    ])
}

/// A self-referential "descendant" rule: directly next, or next of a
/// descendant. Terminates because `list/next` is acyclic and finite.
fn descendant_rule() -> triplog::Rule {
    let mut vars = Variables::new();
    let this = vars.named("this");
    let descendant = vars.named("descendant");
    recursive(
        Selector::new()
            .with("this", &this)
            .with("descendant", &descendant),
        |handle| {
            let mut inner = Variables::new();
            let mid = inner.named("mid");
            Ok(vec![or([
                match_(&this, "list/next", &descendant),
                and([
                    match_(&this, "list/next", &mid),
                    handle.apply(
                        Selector::new()
                            .with("this", &mid)
                            .with("descendant", &descendant),
                    )?,
                ]),
            ])])
        },
    )
    .unwrap()
}

#[test]
fn test_recursive_rule_finds_all_descendants() {
    let store = chain();
    let descendant = descendant_rule();
    let mut vars = Variables::new();
    let item = vars.named("item");
    let name = vars.named("name");
    let rows = query(
        &store,
        &Query {
            select: Selector::new().with("name", &name),
            where_: vec![
                descendant
                    .apply(
                        Selector::new()
                            .with("this", 0i64)
                            .with("descendant", &item),
                    )
                    .unwrap(),
                match_(&item, "name", &name),
            ],
        },
    )
    .unwrap();
    // All three downstream items, in list order.
    let names: Vec<&Value> = rows.iter().map(|row| row.get("name").unwrap()).collect();
    assert_eq!(
        names,
        vec![
            &Value::from("one"),
            &Value::from("two"),
            &Value::from("three")
        ]
    );
}

#[test]
fn test_recursive_rule_from_mid_chain() {
    let store = chain();
    let descendant = descendant_rule();
    let mut vars = Variables::new();
    let item = vars.named("item");
    let rows = query(
        &store,
        &Query {
            select: Selector::new().with("item", &item),
            where_: vec![descendant
                .apply(
                    Selector::new()
                        .with("this", 2i64)
                        .with("descendant", &item),
                )
                .unwrap()],
        },
    )
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("item"), Some(&Value::Int64(3)));
}

#[test]
fn test_rule_checks_a_bound_pair() {
    let store = chain();
    let descendant = descendant_rule();
    // Fully ground application: acts as a test, one row per derivation.
    let rows = query(
        &store,
        &Query {
            select: Selector::new().with("ok", true),
            where_: vec![descendant
                .apply(
                    Selector::new()
                        .with("this", 0i64)
                        .with("descendant", 3i64),
                )
                .unwrap()],
        },
    )
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("ok"), Some(&Value::Boolean(true)));

    // An unreachable pair yields nothing.
    let rows = query(
        &store,
        &Query {
            select: Selector::new().with("ok", true),
            where_: vec![descendant
                .apply(
                    Selector::new()
                        .with("this", 3i64)
                        .with("descendant", 0i64),
                )
                .unwrap()],
        },
    )
    .unwrap();
    assert!(rows.is_empty());
}

#[test]
fn test_unbound_selected_variable_is_a_missing_field() {
    let store = employees();
    let mut vars = Variables::new();
    let id = vars.named("id");
    let bonus = vars.named("bonus");
    // Only the first disjunction branch binds `bonus`; the second leaves
    // it unbound, and the row comes back without the field. Current,
    // perhaps surprising, behavior — documented rather than an error.
    let rows = query(
        &store,
        &Query {
            select: Selector::new().with("id", &id).with("bonus", &bonus),
            where_: vec![or([
                match_(&id, "bonus", &bonus),
                match_(&id, "supervisor", 0i64),
            ])],
        },
    )
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("id"), Some(&Value::Int64(1)));
    assert_eq!(rows[0].get("bonus"), None);
}

#[test]
fn test_query_that_is_not_range_restricted_fails() {
    let mut vars = Variables::new();
    let x = vars.named("x");
    let y = vars.named("y");
    let error = query(
        &employees(),
        &Query {
            select: Selector::new().with("x", &x),
            where_: vec![check(tuple([&x, &y]), ">")],
        },
    )
    .unwrap_err();
    assert!(matches!(
        error,
        QueryError::Plan(PlanError::RangeRestriction { .. })
    ));
}

#[test]
fn test_rule_body_range_restriction_fails_at_construction() {
    let mut vars = Variables::new();
    let item = vars.named("item");
    let other = vars.named("other");
    let stray = vars.named("stray");
    let error = rule(
        Selector::new().with("item", &item),
        vec![check(tuple([&other, &stray]), ">")],
    )
    .unwrap_err();
    assert!(matches!(
        error,
        QueryError::Plan(PlanError::RangeRestriction { .. })
    ));
}

#[test]
fn test_mutation_between_queries_is_visible() {
    let mut store = employees();
    let mut vars = Variables::new();
    let id = vars.named("id");
    let name = vars.named("name");
    let q = Query {
        select: Selector::new().with("name", &name),
        where_: vec![match_(&id, "name", &name)],
    };
    assert_eq!(query(&store, &q).unwrap().len(), 1);

    store
        .transact([triplog::Instruction::Assert(Fact::new(1i64, "name", "Sam"))])
        .unwrap();
    assert_eq!(query(&store, &q).unwrap().len(), 2);
}
