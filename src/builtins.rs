//! The builtin relation registry.
//!
//! A fixed table mapping operator name → pure function from a resolved
//! input to zero or more output values. Operator names are part of the
//! query language's wire surface: exact spellings, result arity, and
//! result order are compatibility contracts.
//!
//! Every function is total over its declared domain. Undefined domain
//! inputs — division by zero, non-numeric arithmetic operands, invalid
//! UTF-8 — produce an *empty* result set rather than an error, which makes
//! the owning formula clause filter the frame out.

use indexmap::IndexMap;

use crate::clause::Resolved;
use crate::value::{Reference, Value};

/// Whether a name is in the registry. The planner rejects queries naming
/// unknown operators before evaluation starts.
pub fn exists(name: &str) -> bool {
    const NAMES: &[&str] = &[
        "==",
        "data/type",
        "data/refer",
        "+",
        "-",
        "*",
        "/",
        "%",
        "**",
        "math/absolute",
        ">",
        ">=",
        "<",
        "<=",
        "!=",
        "text/concat",
        "text/words",
        "text/lines",
        "text/case/upper",
        "text/case/lower",
        "text/trim",
        "text/trim/start",
        "text/trim/end",
        "text/includes",
        "text/slice",
        "text/length",
        "text/like",
        "text/to/utf8",
        "utf8/to/text",
    ];
    NAMES.contains(&name)
}

/// Invoke a registry operator on a resolved input.
pub fn apply(name: &str, input: &Resolved) -> Vec<Resolved> {
    match name {
        "==" => identity(input),
        "data/type" => data_type(input),
        "data/refer" => data_refer(input),
        "+" | "-" | "*" | "/" | "%" | "**" => arithmetic(name, input),
        "math/absolute" => absolute(input),
        ">" | ">=" | "<" | "<=" | "!=" => comparison(name, input),
        "text/concat" => text_concat(input),
        "text/words" => text_split(input, |s| {
            s.split_whitespace().map(str::to_string).collect()
        }),
        "text/lines" => text_split(input, |s| s.lines().map(str::to_string).collect()),
        "text/case/upper" => text_map(input, |s| s.to_uppercase()),
        "text/case/lower" => text_map(input, |s| s.to_lowercase()),
        "text/trim" => text_map(input, |s| s.trim().to_string()),
        "text/trim/start" => text_map(input, |s| s.trim_start().to_string()),
        "text/trim/end" => text_map(input, |s| s.trim_end().to_string()),
        "text/includes" => text_includes(input),
        "text/slice" => text_slice(input),
        "text/length" => text_length(input),
        "text/like" => text_like(input),
        "text/to/utf8" => text_to_utf8(input),
        "utf8/to/text" => utf8_to_text(input),
        _ => Vec::new(),
    }
}

fn one(value: Value) -> Vec<Resolved> {
    vec![Resolved::Value(value)]
}

/// The success result of a pass/fail operator: one value, so the clause
/// passes the frame through. Failure is the empty set — never `false`, so a
/// pass/fail operator can also unify into an output term without ever
/// producing a negative witness.
fn pass(condition: bool) -> Vec<Resolved> {
    if condition {
        one(Value::Boolean(true))
    } else {
        Vec::new()
    }
}

// ============================================================================
// IDENTITY AND REFLECTION
// ============================================================================

fn identity(input: &Resolved) -> Vec<Resolved> {
    match input.as_value() {
        Some(value) => one(value.clone()),
        None => Vec::new(),
    }
}

fn data_type(input: &Resolved) -> Vec<Resolved> {
    match input.as_value() {
        Some(value) => one(Value::Text(value.value_type().tag().to_string())),
        None => Vec::new(),
    }
}

fn data_refer(input: &Resolved) -> Vec<Resolved> {
    match input.as_value() {
        Some(value) => one(Value::Reference(Reference::of(value))),
        None => Vec::new(),
    }
}

// ============================================================================
// ARITHMETIC
// ============================================================================

/// Arithmetic works in `i64` until a `Float32` operand promotes the whole
/// computation to `f32`. `Int32` operands widen on entry; integer results
/// always come back as `Int64`.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f32),
}

impl Num {
    fn value(self) -> Value {
        match self {
            Num::Int(n) => Value::Int64(n),
            Num::Float(x) => Value::Float32(x),
        }
    }
}

fn num(value: &Value) -> Option<Num> {
    match value {
        Value::Int32(n) => Some(Num::Int(i64::from(*n))),
        Value::Int64(n) => Some(Num::Int(*n)),
        Value::Float32(x) => Some(Num::Float(*x)),
        _ => None,
    }
}

/// The numeric operands of an arithmetic operator: a single value or a
/// tuple of values, every one numeric.
fn nums(input: &Resolved) -> Option<Vec<Num>> {
    match input {
        Resolved::Value(value) => Some(vec![num(value)?]),
        Resolved::Tuple(values) => values.iter().map(num).collect(),
        Resolved::Record(_) => None,
    }
}

fn combine(
    a: Num,
    b: Num,
    int: impl Fn(i64, i64) -> Option<i64>,
    float: impl Fn(f32, f32) -> f32,
) -> Option<Num> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => int(x, y).map(Num::Int),
        (Num::Float(x), Num::Float(y)) => Some(Num::Float(float(x, y))),
        (Num::Int(x), Num::Float(y)) => Some(Num::Float(float(x as f32, y))),
        (Num::Float(x), Num::Int(y)) => Some(Num::Float(float(x, y as f32))),
    }
}

fn fold(
    operands: &[Num],
    empty: Option<Num>,
    int: impl Fn(i64, i64) -> Option<i64> + Copy,
    float: impl Fn(f32, f32) -> f32 + Copy,
) -> Option<Num> {
    let (&first, rest) = match operands.split_first() {
        Some(split) => split,
        None => return empty,
    };
    rest.iter()
        .try_fold(first, |acc, &next| combine(acc, next, int, float))
}

fn arithmetic(name: &str, input: &Resolved) -> Vec<Resolved> {
    let Some(operands) = nums(input) else {
        return Vec::new();
    };
    let zero_divisor = || {
        operands.iter().skip(1).any(|n| match n {
            Num::Int(i) => *i == 0,
            Num::Float(x) => *x == 0.0,
        })
    };
    let result = match name {
        // Empty sum is 0, empty product is 1; the other operators have no
        // unit and yield nothing for an empty input list.
        "+" => fold(&operands, Some(Num::Int(0)), i64::checked_add, |a, b| a + b),
        "*" => fold(&operands, Some(Num::Int(1)), i64::checked_mul, |a, b| a * b),
        "-" => fold(&operands, None, i64::checked_sub, |a, b| a - b),
        // A zero divisor is a domain failure for floats too, not an
        // infinity.
        "/" | "%" if zero_divisor() => None,
        "/" => fold(&operands, None, i64::checked_div, |a, b| a / b),
        "%" => match operands.as_slice() {
            [a, b] => combine(*a, *b, i64::checked_rem, |x, y| x % y),
            _ => None,
        },
        "**" => match operands.as_slice() {
            [base, exponent] => power(*base, *exponent),
            _ => None,
        },
        _ => None,
    };
    match result {
        Some(n) => one(n.value()),
        None => Vec::new(),
    }
}

fn power(base: Num, exponent: Num) -> Option<Num> {
    match (base, exponent) {
        (Num::Int(b), Num::Int(e)) if (0..=u32::MAX as i64).contains(&e) => {
            b.checked_pow(e as u32).map(Num::Int)
        }
        // Negative integer exponents and float operands compute in f32.
        (Num::Int(b), Num::Int(e)) => Some(Num::Float((b as f32).powf(e as f32))),
        (Num::Int(b), Num::Float(e)) => Some(Num::Float((b as f32).powf(e))),
        (Num::Float(b), Num::Int(e)) => Some(Num::Float(b.powf(e as f32))),
        (Num::Float(b), Num::Float(e)) => Some(Num::Float(b.powf(e))),
    }
}

fn absolute(input: &Resolved) -> Vec<Resolved> {
    let result = match input.as_value().and_then(num) {
        Some(Num::Int(n)) => n.checked_abs().map(Num::Int),
        Some(Num::Float(x)) => Some(Num::Float(x.abs())),
        None => None,
    };
    match result {
        Some(n) => one(n.value()),
        None => Vec::new(),
    }
}

// ============================================================================
// COMPARISONS
// ============================================================================

/// Ordering comparisons accept numeric pairs (with int/float promotion) and
/// text pairs (lexicographic). `!=` is structural inequality over any pair.
fn comparison(name: &str, input: &Resolved) -> Vec<Resolved> {
    let Resolved::Tuple(values) = input else {
        return Vec::new();
    };
    let [left, right] = values.as_slice() else {
        return Vec::new();
    };
    if name == "!=" {
        return pass(left != right);
    }
    let ordering = match (num(left), num(right)) {
        (Some(a), Some(b)) => {
            let (x, y) = match (a, b) {
                (Num::Int(x), Num::Int(y)) => return ordered(name, x.cmp(&y)),
                (Num::Float(x), Num::Float(y)) => (x, y),
                (Num::Int(x), Num::Float(y)) => (x as f32, y),
                (Num::Float(x), Num::Int(y)) => (x, y as f32),
            };
            match x.partial_cmp(&y) {
                Some(ordering) => ordering,
                // NaN comparisons are a domain failure, not "false".
                None => return Vec::new(),
            }
        }
        _ => match (left, right) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => return Vec::new(),
        },
    };
    ordered(name, ordering)
}

fn ordered(name: &str, ordering: std::cmp::Ordering) -> Vec<Resolved> {
    pass(match name {
        ">" => ordering.is_gt(),
        ">=" => ordering.is_ge(),
        "<" => ordering.is_lt(),
        "<=" => ordering.is_le(),
        _ => false,
    })
}

// ============================================================================
// TEXT
// ============================================================================

fn text(value: &Value) -> Option<&str> {
    match value {
        Value::Text(s) => Some(s),
        _ => None,
    }
}

fn field<'a>(record: &'a IndexMap<String, Value>, name: &str) -> Option<&'a Value> {
    record.get(name)
}

/// One text in, one text out.
fn text_map(input: &Resolved, f: impl Fn(&str) -> String) -> Vec<Resolved> {
    match input.as_value().and_then(text) {
        Some(s) => one(Value::Text(f(s))),
        None => Vec::new(),
    }
}

/// One text in, many texts out, order preserved.
fn text_split(input: &Resolved, f: impl Fn(&str) -> Vec<String>) -> Vec<Resolved> {
    match input.as_value().and_then(text) {
        Some(s) => f(s)
            .into_iter()
            .map(|part| Resolved::Value(Value::Text(part)))
            .collect(),
        None => Vec::new(),
    }
}

fn text_concat(input: &Resolved) -> Vec<Resolved> {
    let parts = match input {
        Resolved::Value(value) => vec![value],
        Resolved::Tuple(values) => values.iter().collect(),
        Resolved::Record(_) => return Vec::new(),
    };
    let mut joined = String::new();
    for part in parts {
        match text(part) {
            Some(s) => joined.push_str(s),
            None => return Vec::new(),
        }
    }
    one(Value::Text(joined))
}

/// `text/includes { this, slice }`: does `this` contain `slice`?
fn text_includes(input: &Resolved) -> Vec<Resolved> {
    let Resolved::Record(record) = input else {
        return Vec::new();
    };
    match (
        field(record, "this").and_then(text),
        field(record, "slice").and_then(text),
    ) {
        (Some(this), Some(slice)) => pass(this.contains(slice)),
        _ => Vec::new(),
    }
}

/// `text/slice { of, start, end? }`: character-indexed substring with
/// negative-from-end indexes and clamping, the way the original language
/// slices.
fn text_slice(input: &Resolved) -> Vec<Resolved> {
    let Resolved::Record(record) = input else {
        return Vec::new();
    };
    let Some(of) = field(record, "of").and_then(text) else {
        return Vec::new();
    };
    let chars: Vec<char> = of.chars().collect();
    let len = chars.len();
    let clamp = |index: i64| -> usize {
        let index = if index < 0 { index + len as i64 } else { index };
        index.clamp(0, len as i64) as usize
    };
    let index = |name: &str, default: usize| match field(record, name) {
        None => Some(default),
        Some(value) => match num(value) {
            Some(Num::Int(n)) => Some(clamp(n)),
            _ => None,
        },
    };
    let (Some(start), Some(end)) = (index("start", 0), index("end", len)) else {
        return Vec::new();
    };
    let slice: String = if start < end {
        chars[start..end].iter().collect()
    } else {
        String::new()
    };
    one(Value::Text(slice))
}

/// Character count, not byte or UTF-16 unit count.
fn text_length(input: &Resolved) -> Vec<Resolved> {
    match input.as_value().and_then(text) {
        Some(s) => one(Value::Int64(s.chars().count() as i64)),
        None => Vec::new(),
    }
}

/// `text/like { text, pattern }`: case-insensitive glob match, `*` for any
/// run and `?` for any single character.
fn text_like(input: &Resolved) -> Vec<Resolved> {
    let Resolved::Record(record) = input else {
        return Vec::new();
    };
    match (
        field(record, "text").and_then(text),
        field(record, "pattern").and_then(text),
    ) {
        (Some(subject), Some(pattern)) => {
            let subject: Vec<char> = subject.to_lowercase().chars().collect();
            let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
            pass(glob(&pattern, &subject))
        }
        _ => Vec::new(),
    }
}

fn glob(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('*', rest)) => (0..=text.len()).any(|skip| glob(rest, &text[skip..])),
        Some(('?', rest)) => !text.is_empty() && glob(rest, &text[1..]),
        Some((c, rest)) => text.first() == Some(c) && glob(rest, &text[1..]),
    }
}

// ============================================================================
// UTF-8 CODEC
// ============================================================================

fn text_to_utf8(input: &Resolved) -> Vec<Resolved> {
    match input.as_value().and_then(text) {
        Some(s) => one(Value::Bytes(s.as_bytes().to_vec())),
        None => Vec::new(),
    }
}

fn utf8_to_text(input: &Resolved) -> Vec<Resolved> {
    match input.as_value() {
        Some(Value::Bytes(bytes)) => match String::from_utf8(bytes.clone()) {
            Ok(s) => one(Value::Text(s)),
            Err(_) => Vec::new(),
        },
        _ => Vec::new(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
