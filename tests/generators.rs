//! Proptest generators for triplog data structures
//!
//! Provides `Strategy` implementations for generating constants used in
//! property tests.

use proptest::collection::vec;
use proptest::prelude::*;
use triplog::Value;

/// Generate an arbitrary constant of any type.
pub fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Boolean),
        any::<i32>().prop_map(Value::Int32),
        any::<f32>().prop_map(Value::Float32),
        any::<i64>().prop_map(Value::Int64),
        arb_text().prop_map(Value::Text),
        vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
    ]
}

/// Generate a short printable string.
pub fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _-]{0,12}".prop_map(String::from)
}

/// Generate two constants of the same type (possibly equal).
pub fn arb_pair_same_type() -> impl Strategy<Value = (Value, Value)> {
    prop_oneof![
        (any::<bool>(), any::<bool>()).prop_map(|(a, b)| (Value::Boolean(a), Value::Boolean(b))),
        (any::<i32>(), any::<i32>()).prop_map(|(a, b)| (Value::Int32(a), Value::Int32(b))),
        (any::<i64>(), any::<i64>()).prop_map(|(a, b)| (Value::Int64(a), Value::Int64(b))),
        (arb_text(), arb_text()).prop_map(|(a, b)| (Value::Text(a), Value::Text(b))),
        (vec(any::<u8>(), 0..16), vec(any::<u8>(), 0..16))
            .prop_map(|(a, b)| (Value::Bytes(a), Value::Bytes(b))),
    ]
}
