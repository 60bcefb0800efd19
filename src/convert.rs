//! Recursive converter/validator.
//!
//! Walks a dynamic value and a descriptor together, dispatching by
//! descriptor kind. Errors accumulate; nothing short-circuits past the
//! level that failed, so one pass reports every violation in the tree.
//!
//! Contract notes:
//! - `convert` is a pure function of its inputs; the accumulator and the
//!   scratch path are the only things it touches, and the path is restored
//!   before returning.
//! - Container conversions return partial results alongside errors; a
//!   parent binds a child only when the child's subtree was error-free.
//! - The union probe is the single place branch errors are discarded:
//!   only total exhaustion is reported.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::sync::Arc;

use crate::descriptor::{
    DefaultKind, Descriptor, EnumDescriptor, ScalarKind, StructDescriptor,
};
use crate::errors::{ErrorKind, NameList, Path, Segment, TypeList, ValidationError};
use crate::value::{StructValue, TypedValue, ValueKind, VariantValue};

/// Convert `value` against `descriptor`, appending every violation found to
/// `errors`. Returns the converted value; `None` when this level could not
/// produce one. Zero appended errors implies `Some`.
pub fn convert(
    value: &Value,
    descriptor: &Descriptor,
    path: &mut Path,
    errors: &mut Vec<ValidationError>,
) -> Option<TypedValue> {
    match descriptor {
        Descriptor::Scalar(kind) => convert_scalar(value, *kind, path, errors),
        Descriptor::Struct(desc) => convert_struct(value, desc, path, errors),
        Descriptor::Enum(desc) => convert_enum(value, desc, path, errors),
        Descriptor::Union(branches) => convert_union(value, branches, path, errors),
        Descriptor::List(elem) => {
            let items = require_array(value, descriptor, path, errors)?;
            Some(TypedValue::List(convert_elements(items, elem, path, errors)))
        }
        Descriptor::Set(elem) => {
            let items = require_array(value, descriptor, path, errors)?;
            // dedup strictly after element validation; insertion order kept
            let kept: IndexSet<TypedValue> =
                convert_elements(items, elem, path, errors).into_iter().collect();
            Some(TypedValue::Set(kept))
        }
        Descriptor::Tuple(elems) => convert_tuple(value, elems, descriptor, path, errors),
        Descriptor::Map(key, val) => convert_map(value, key, val, descriptor, path, errors),
    }
}

fn mismatch(value: &Value, expected: &Descriptor, path: &Path) -> ValidationError {
    ValidationError::new(
        path.clone(),
        ErrorKind::TypeMismatch {
            value: value.clone(),
            actual: ValueKind::of(value),
            expected: expected.clone(),
        },
    )
}

// ————————————————————————————————————————————————————————————————————————————
// PER-KIND CONVERSIONS
// ————————————————————————————————————————————————————————————————————————————

// Exact runtime-kind match; no coercion between int and float, never from
// string to number.
fn convert_scalar(
    value: &Value,
    kind: ScalarKind,
    path: &mut Path,
    errors: &mut Vec<ValidationError>,
) -> Option<TypedValue> {
    let converted = match (kind, value) {
        (ScalarKind::Null, Value::Null) => Some(TypedValue::Null),
        (ScalarKind::Bool, Value::Bool(b)) => Some(TypedValue::Bool(*b)),
        (ScalarKind::Int, Value::Number(n)) => n.as_i64().map(TypedValue::Int),
        (ScalarKind::Float, Value::Number(n)) if n.is_f64() => {
            n.as_f64().map(|f| TypedValue::Float(f.into()))
        }
        (ScalarKind::Str, Value::String(s)) => Some(TypedValue::Str(s.clone())),
        _ => None,
    };
    if converted.is_none() {
        errors.push(mismatch(value, &Descriptor::Scalar(kind), path));
    }
    converted
}

fn convert_struct(
    value: &Value,
    desc: &Arc<StructDescriptor>,
    path: &mut Path,
    errors: &mut Vec<ValidationError>,
) -> Option<TypedValue> {
    let Value::Object(entries) = value else {
        // shape mismatch fails this level fast; no recursion into fields
        errors.push(mismatch(value, &Descriptor::Struct(desc.clone()), path));
        return None;
    };

    let level_start = errors.len();
    let known = desc.field_names();

    for (key, val) in entries {
        if desc.field(key).is_none() {
            path.push(Segment::Key(key.clone()));
            errors.push(ValidationError::new(
                path.clone(),
                ErrorKind::ExtraField {
                    name: key.clone(),
                    value: val.clone(),
                    actual: ValueKind::of(val),
                    known: NameList(known.clone()),
                },
            ));
            path.pop();
        }
    }

    let mut fields = IndexMap::new();
    for field in &desc.fields {
        match entries.get(&field.name) {
            Some(val) => {
                path.push(Segment::Field(field.name.clone()));
                let before = errors.len();
                let converted = convert(val, &field.ty, path, errors);
                path.pop();
                if errors.len() == before {
                    if let Some(v) = converted {
                        fields.insert(field.name.clone(), v);
                    }
                }
            }
            None => match &field.default {
                DefaultKind::Eager(default) => {
                    // pre-typed at resolution time; no re-validation
                    fields.insert(field.name.clone(), default.clone());
                }
                DefaultKind::Deferred => {}
                DefaultKind::None => {
                    path.push(Segment::Field(field.name.clone()));
                    errors.push(ValidationError::new(
                        path.clone(),
                        ErrorKind::FieldRequired {
                            name: field.name.clone(),
                            expected: field.ty.clone(),
                        },
                    ));
                    path.pop();
                }
            },
        }
    }

    // construction runs only for an error-free level; child errors above
    // still propagate to the caller either way
    if errors.len() == level_start {
        Some(TypedValue::Struct(StructValue::new(desc.name.clone(), fields)))
    } else {
        None
    }
}

// First variant whose underlying value equals the input wins; duplicate
// underlying values alias the earliest declaration.
fn convert_enum(
    value: &Value,
    desc: &Arc<EnumDescriptor>,
    path: &mut Path,
    errors: &mut Vec<ValidationError>,
) -> Option<TypedValue> {
    if let Some(literal) = TypedValue::from_literal(value) {
        for variant in &desc.variants {
            if variant.value == literal {
                return Some(TypedValue::Variant(VariantValue {
                    enum_name: desc.name.clone(),
                    variant: variant.name.clone(),
                    value: Box::new(variant.value.clone()),
                }));
            }
        }
    }
    errors.push(mismatch(value, &Descriptor::Enum(desc.clone()), path));
    None
}

// Ordered first-match-wins probe. Branch-local errors are discarded; only
// exhaustion of every branch is reported.
fn convert_union(
    value: &Value,
    branches: &[Descriptor],
    path: &mut Path,
    errors: &mut Vec<ValidationError>,
) -> Option<TypedValue> {
    for branch in branches {
        let mut probe = Vec::new();
        let converted = convert(value, branch, path, &mut probe);
        if probe.is_empty() {
            if let Some(v) = converted {
                return Some(v);
            }
        }
    }
    errors.push(ValidationError::new(
        path.clone(),
        ErrorKind::MultiTypeMismatch {
            value: value.clone(),
            actual: ValueKind::of(value),
            expected: TypeList(branches.to_vec()),
        },
    ));
    None
}

fn require_array<'a>(
    value: &'a Value,
    expected: &Descriptor,
    path: &mut Path,
    errors: &mut Vec<ValidationError>,
) -> Option<&'a [Value]> {
    match value {
        Value::Array(items) => Some(items),
        _ => {
            errors.push(mismatch(value, expected, path));
            None
        }
    }
}

// Shared by list and set: independent elementwise conversion in index
// order, failed indices excluded, survivors kept.
fn convert_elements(
    items: &[Value],
    elem: &Descriptor,
    path: &mut Path,
    errors: &mut Vec<ValidationError>,
) -> Vec<TypedValue> {
    let mut kept = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        path.push(Segment::Index(i));
        let before = errors.len();
        let converted = convert(item, elem, path, errors);
        path.pop();
        if errors.len() == before {
            if let Some(v) = converted {
                kept.push(v);
            }
        }
    }
    kept
}

fn convert_tuple(
    value: &Value,
    elems: &[Descriptor],
    expected: &Descriptor,
    path: &mut Path,
    errors: &mut Vec<ValidationError>,
) -> Option<TypedValue> {
    let items = require_array(value, expected, path, errors)?;

    if items.len() != elems.len() {
        errors.push(ValidationError::new(
            path.clone(),
            ErrorKind::TupleLengthMismatch {
                value: value.clone(),
                actual_len: items.len(),
                expected_len: elems.len(),
            },
        ));
    }

    // elementwise over the overlapping prefix only; positions beyond it are
    // neither converted nor reported individually
    let overlap = items.len().min(elems.len());
    let mut kept = Vec::with_capacity(overlap);
    for i in 0..overlap {
        path.push(Segment::Index(i));
        let before = errors.len();
        let converted = convert(&items[i], &elems[i], path, errors);
        path.pop();
        if errors.len() == before {
            if let Some(v) = converted {
                kept.push(v);
            }
        }
    }
    Some(TypedValue::Tuple(kept))
}

// Keys and values convert independently, both reported at the entry's key;
// an entry survives only when both sides are error-free.
fn convert_map(
    value: &Value,
    key_desc: &Descriptor,
    val_desc: &Descriptor,
    expected: &Descriptor,
    path: &mut Path,
    errors: &mut Vec<ValidationError>,
) -> Option<TypedValue> {
    let Value::Object(entries) = value else {
        errors.push(mismatch(value, expected, path));
        return None;
    };

    let mut kept = IndexMap::new();
    for (key, val) in entries {
        path.push(Segment::Key(key.clone()));
        let before = errors.len();
        let key_value = Value::String(key.clone());
        let converted_key = convert(&key_value, key_desc, path, errors);
        let converted_val = convert(val, val_desc, path, errors);
        path.pop();
        if errors.len() == before {
            if let (Some(k), Some(v)) = (converted_key, converted_val) {
                kept.insert(k, v);
            }
        }
    }
    Some(TypedValue::Dict(kept))
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
