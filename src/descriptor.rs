// Resolved structural type model. No unresolved names here: `Shape` lowering
// in the registry produces this, and the converter dispatches on it.

use std::fmt;
use std::sync::Arc;

use crate::value::TypedValue;

/// Structural description of a target type, independent of any host type.
///
/// Immutable once resolved; cheap to clone (nominal payloads are shared via
/// `Arc`) and safe to share across concurrent conversions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Scalar(ScalarKind),
    Struct(Arc<StructDescriptor>),
    Enum(Arc<EnumDescriptor>),
    /// Ordered branches; order is a deliberate priority (first match wins).
    Union(Vec<Descriptor>),
    List(Box<Descriptor>),
    Set(Box<Descriptor>),
    /// Fixed arity, one descriptor per position.
    Tuple(Vec<Descriptor>),
    Map(Box<Descriptor>, Box<Descriptor>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Null => "null",
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Str => "str",
        }
    }
}

/// A nominal record type: ordered fields merged across the inheritance
/// chain, base-first. Field names are unique; a redeclared field keeps its
/// original position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl StructDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: Descriptor,
    pub default: DefaultKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultKind {
    /// Absence is an error.
    None,
    /// Pre-typed value, validated at resolution time, bound verbatim when the
    /// field is absent.
    Eager(TypedValue),
    /// Absence is legal; the construction side fills the value.
    Deferred,
}

/// A nominal enumeration. Matching is by value equality against the
/// underlying scalar, in declaration order, so duplicate underlying values
/// act as aliases of the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub name: String,
    pub variants: Vec<VariantDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDescriptor {
    pub name: String,
    pub value: TypedValue,
}

// ————————————————————————————————————————————————————————————————————————————
// RENDERING
// ————————————————————————————————————————————————————————————————————————————

// Canonical type expressions, used verbatim inside error messages:
// scalars by name, containers as `list[T]` / `set[T]` / `tuple[A, B]` /
// `dict[K, V]`, nominal types by their registered name, unions joined by `|`.
impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Scalar(kind) => f.write_str(kind.name()),
            Descriptor::Struct(s) => f.write_str(&s.name),
            Descriptor::Enum(e) => f.write_str(&e.name),
            Descriptor::Union(branches) => {
                for (i, b) in branches.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{b}")?;
                }
                Ok(())
            }
            Descriptor::List(elem) => write!(f, "list[{elem}]"),
            Descriptor::Set(elem) => write!(f, "set[{elem}]"),
            Descriptor::Tuple(elems) => {
                f.write_str("tuple[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{e}")?;
                }
                f.write_str("]")
            }
            Descriptor::Map(key, value) => write!(f, "dict[{key}, {value}]"),
        }
    }
}
