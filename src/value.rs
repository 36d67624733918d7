//! Constants, type tags, and facts.
//!
//! A [`Value`] is one of the seven constant types a triple position can hold.
//! Equality is structural throughout: byte sequences and references compare
//! byte-for-byte, and `Float32` compares by bit pattern so that values admit
//! total `Eq`/`Ord`/`Hash` and can key the store's indexes (NaN equals
//! itself; the ordering is total but otherwise unremarkable).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A constant: the only things a fact position or a bound variable can hold.
#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    Int32(i32),
    Float32(f32),
    Int64(i64),
    Text(String),
    Bytes(Vec<u8>),
    /// Opaque content-addressed link, comparable by byte identity.
    Reference(Reference),
}

/// Type tag for a [`Value`] variant.
///
/// Doubles as the "type capability" a variable can carry: binding a constant
/// to a typed variable runs [`ValueType::coerce`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    Int32,
    Float32,
    Int64,
    Text,
    Bytes,
    Reference,
}

impl ValueType {
    /// The tag string exposed by the `data/type` operator. Part of the wire
    /// surface: exact spellings matter.
    pub fn tag(&self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::Int32 => "int32",
            ValueType::Float32 => "float32",
            ValueType::Int64 => "int64",
            ValueType::Text => "string",
            ValueType::Bytes => "bytes",
            ValueType::Reference => "reference",
        }
    }

    /// Validate/coerce a constant into this type's representation.
    ///
    /// Exact variant matches pass through; `Int32` widens losslessly into
    /// `Int64`. Everything else is a mismatch and the caller rejects the
    /// candidate frame.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ValueType::Int64, Value::Int32(n)) => Some(Value::Int64(i64::from(*n))),
            _ if *self == value.value_type() => Some(value.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Value {
    /// The type tag of this constant.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Boolean(_) => ValueType::Boolean,
            Value::Int32(_) => ValueType::Int32,
            Value::Float32(_) => ValueType::Float32,
            Value::Int64(_) => ValueType::Int64,
            Value::Text(_) => ValueType::Text,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Reference(_) => ValueType::Reference,
        }
    }

    /// Rank used for cross-variant ordering. Arbitrary but fixed.
    fn rank(&self) -> u8 {
        match self {
            Value::Boolean(_) => 0,
            Value::Int32(_) => 1,
            Value::Float32(_) => 2,
            Value::Int64(_) => 3,
            Value::Text(_) => 4,
            Value::Bytes(_) => 5,
            Value::Reference(_) => 6,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Reference(a), Value::Reference(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Boolean(b) => b.hash(state),
            Value::Int32(n) => n.hash(state),
            Value::Float32(x) => x.to_bits().hash(state),
            Value::Int64(n) => n.hash(state),
            Value::Text(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::Reference(r) => r.hash(state),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Int32(a), Value::Int32(b)) => a.cmp(b),
            (Value::Float32(a), Value::Float32(b)) => a.total_cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Reference(a), Value::Reference(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int32(n) => write!(f, "{}", n),
            Value::Float32(x) => write!(f, "{}", x),
            Value::Int64(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "bytes[{}]", b.len()),
            Value::Reference(r) => write!(f, "{}", r),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float32(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Reference(r)
    }
}

// ============================================================================
// CONTENT-ADDRESSED REFERENCES
// ============================================================================

/// A 32-byte content hash linking to a value.
///
/// Produced by the `data/refer` operator. Two references are equal iff their
/// bytes are equal; the hash is BLAKE3 over a canonical tagged encoding of
/// the referred value, so structurally equal values always produce the same
/// reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reference([u8; 32]);

impl Reference {
    /// Compute the content reference of a value.
    pub fn of(value: &Value) -> Reference {
        let mut hasher = blake3::Hasher::new();
        encode_into(value, &mut hasher);
        Reference(*hasher.finalize().as_bytes())
    }

    /// The raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Construct from raw hash bytes, e.g. one read back out of a store.
    pub fn from_bytes(bytes: [u8; 32]) -> Reference {
        Reference(bytes)
    }
}

/// Canonical encoding: one tag byte per variant, then the payload.
/// Numerics are little-endian; text and bytes are raw; a reference feeds its
/// own hash bytes. The encoding is an input to hashing only, never decoded.
fn encode_into(value: &Value, hasher: &mut blake3::Hasher) {
    match value {
        Value::Boolean(b) => {
            hasher.update(&[0x00, u8::from(*b)]);
        }
        Value::Int32(n) => {
            hasher.update(&[0x01]);
            hasher.update(&n.to_le_bytes());
        }
        Value::Float32(x) => {
            hasher.update(&[0x02]);
            hasher.update(&x.to_bits().to_le_bytes());
        }
        Value::Int64(n) => {
            hasher.update(&[0x03]);
            hasher.update(&n.to_le_bytes());
        }
        Value::Text(s) => {
            hasher.update(&[0x04]);
            hasher.update(s.as_bytes());
        }
        Value::Bytes(b) => {
            hasher.update(&[0x05]);
            hasher.update(b);
        }
        Value::Reference(r) => {
            hasher.update(&[0x06]);
            hasher.update(r.as_bytes());
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#")?;
        for byte in &self.0[..6] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

// ============================================================================
// FACTS
// ============================================================================

/// An immutable (entity, attribute, value) triple.
///
/// Owned by the store; the evaluator only ever reads them. Entity and
/// attribute are ordinary constants — there is no separate entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fact {
    pub entity: Value,
    pub attribute: Value,
    pub value: Value,
}

impl Fact {
    pub fn new(
        entity: impl Into<Value>,
        attribute: impl Into<Value>,
        value: impl Into<Value>,
    ) -> Fact {
        Fact {
            entity: entity.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {}]", self.entity, self.attribute, self.value)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        assert_eq!(Value::from(5i64), Value::Int64(5));
        assert_ne!(Value::Int32(5), Value::Int64(5));
        assert_eq!(Value::from("a"), Value::Text("a".to_string()));
        assert_eq!(Value::from(vec![1u8, 2]), Value::Bytes(vec![1, 2]));
        assert_ne!(Value::from(vec![1u8, 2]), Value::Bytes(vec![2, 1]));
    }

    #[test]
    fn test_float_bit_equality() {
        let nan = Value::Float32(f32::NAN);
        assert_eq!(nan, nan.clone());
        assert_ne!(Value::Float32(0.0), Value::Float32(-0.0));
    }

    #[test]
    fn test_coerce_widens_int32() {
        assert_eq!(
            ValueType::Int64.coerce(&Value::Int32(7)),
            Some(Value::Int64(7))
        );
        assert_eq!(ValueType::Int32.coerce(&Value::Int64(7)), None);
        assert_eq!(ValueType::Text.coerce(&Value::Int64(7)), None);
        assert_eq!(
            ValueType::Text.coerce(&Value::from("x")),
            Some(Value::from("x"))
        );
    }

    #[test]
    fn test_reference_is_content_addressed() {
        let a = Reference::of(&Value::from("hello"));
        let b = Reference::of(&Value::from("hello"));
        let c = Reference::of(&Value::from("world"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        // Tagged encoding keeps same-bytes values of different types apart.
        let t = Reference::of(&Value::Text("ab".into()));
        let y = Reference::of(&Value::Bytes(b"ab".to_vec()));
        assert_ne!(t, y);
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(Value::Boolean(true).value_type().tag(), "boolean");
        assert_eq!(Value::from("x").value_type().tag(), "string");
        assert_eq!(Value::Int32(1).value_type().tag(), "int32");
    }
}
