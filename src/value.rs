//! Typed output values.
//!
//! The converter produces `TypedValue`, a closed tagged variant mirroring the
//! descriptor kinds. Keeping the output model closed (no `serde_json::Value`
//! leaking through) makes every dispatch in the converter exhaustive.
//!
//! Equality is order-insensitive for sets/maps (the underlying indexmap
//! semantics); `Hash` is written to agree with that, so typed values can be
//! set elements and dict keys.

use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPED VALUES
// ————————————————————————————————————————————————————————————————————————————

/// A fully-validated, strongly-shaped value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    List(Vec<TypedValue>),
    /// Insertion order preserved; duplicates collapsed after validation.
    Set(IndexSet<TypedValue>),
    Tuple(Vec<TypedValue>),
    Dict(IndexMap<TypedValue, TypedValue>),
    Struct(StructValue),
    Variant(VariantValue),
}

/// A constructed record instance: the output of the construction step.
///
/// Fields keep declaration order. Deferred-default fields that were absent
/// from the input are absent here too; whatever materializes the host object
/// is responsible for filling them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructValue {
    pub type_name: String,
    pub fields: IndexMap<String, TypedValue>,
}

impl StructValue {
    /// Build a record from a mapping of field name to validated value.
    pub fn new(type_name: impl Into<String>, fields: IndexMap<String, TypedValue>) -> Self {
        Self { type_name: type_name.into(), fields }
    }

    pub fn get(&self, field: &str) -> Option<&TypedValue> {
        self.fields.get(field)
    }
}

/// A matched enum variant. `value` is the underlying scalar the input was
/// matched against; re-serialization emits it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantValue {
    pub enum_name: String,
    pub variant: String,
    pub value: Box<TypedValue>,
}

impl TypedValue {
    /// Lift a dynamic scalar into a typed one. Returns `None` for containers
    /// and for integers that do not fit `i64`.
    pub fn from_literal(value: &Value) -> Option<TypedValue> {
        match value {
            Value::Null => Some(TypedValue::Null),
            Value::Bool(b) => Some(TypedValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(TypedValue::Int(i))
                } else if n.is_f64() {
                    n.as_f64().map(|f| TypedValue::Float(OrderedFloat(f)))
                } else {
                    None
                }
            }
            Value::String(s) => Some(TypedValue::Str(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

// `Hash` must agree with the derived `Eq`: set/map equality ignores insertion
// order, so those variants hash only their discriminant and length.
impl Hash for TypedValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            TypedValue::Null => {}
            TypedValue::Bool(b) => b.hash(state),
            TypedValue::Int(i) => i.hash(state),
            TypedValue::Float(f) => f.hash(state),
            TypedValue::Str(s) => s.hash(state),
            TypedValue::List(xs) | TypedValue::Tuple(xs) => {
                for x in xs {
                    x.hash(state);
                }
            }
            TypedValue::Set(xs) => xs.len().hash(state),
            TypedValue::Dict(m) => m.len().hash(state),
            TypedValue::Struct(s) => {
                s.type_name.hash(state);
                s.fields.len().hash(state);
            }
            TypedValue::Variant(v) => {
                v.enum_name.hash(state);
                v.variant.hash(state);
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RE-SERIALIZATION
// ————————————————————————————————————————————————————————————————————————————

// Serializes back to the dynamic shape the value was converted from: records
// as objects in field order, sets/tuples as arrays, variants as their
// underlying value. Successful conversion round-trips through this.
impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TypedValue::Null => serializer.serialize_unit(),
            TypedValue::Bool(b) => serializer.serialize_bool(*b),
            TypedValue::Int(i) => serializer.serialize_i64(*i),
            TypedValue::Float(f) => serializer.serialize_f64(f.0),
            TypedValue::Str(s) => serializer.serialize_str(s),
            TypedValue::List(xs) | TypedValue::Tuple(xs) => {
                let mut seq = serializer.serialize_seq(Some(xs.len()))?;
                for x in xs {
                    seq.serialize_element(x)?;
                }
                seq.end()
            }
            TypedValue::Set(xs) => {
                let mut seq = serializer.serialize_seq(Some(xs.len()))?;
                for x in xs {
                    seq.serialize_element(x)?;
                }
                seq.end()
            }
            TypedValue::Dict(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(&json_key(k).map_err(serde::ser::Error::custom)?, v)?;
                }
                map.end()
            }
            TypedValue::Struct(s) => {
                let mut map = serializer.serialize_map(Some(s.fields.len()))?;
                for (name, v) in &s.fields {
                    map.serialize_entry(name, v)?;
                }
                map.end()
            }
            TypedValue::Variant(v) => v.value.serialize(serializer),
        }
    }
}

/// JSON object keys are strings; non-string keys render as their compact
/// JSON text (so an `int` key `1` becomes `"1"`).
fn json_key(key: &TypedValue) -> Result<String, serde_json::Error> {
    match key {
        TypedValue::Str(s) => Ok(s.clone()),
        other => serde_json::to_string(other),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DYNAMIC KINDS
// ————————————————————————————————————————————————————————————————————————————

/// Runtime kind of a dynamic value, as named in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Dict,
}

impl ValueKind {
    pub fn of(value: &Value) -> ValueKind {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(n) => {
                if n.is_f64() {
                    ValueKind::Float
                } else {
                    ValueKind::Int
                }
            }
            Value::String(_) => ValueKind::Str,
            Value::Array(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Dict,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "str",
            ValueKind::List => "list",
            ValueKind::Dict => "dict",
        };
        f.write_str(name)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
