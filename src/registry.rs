//! Schema registration and descriptor resolution.
//!
//! Target types are declared explicitly (builder-style `StructDecl` /
//! `EnumDecl` plus structural `Shape` expressions) and lowered on first use
//! into immutable [`Descriptor`] trees. Resolution merges inherited fields
//! base-first, validates eager default literals, and memoizes the result
//! per type for the process lifetime.
//!
//! Anything wrong at this layer is a usage defect ([`SchemaError`], fatal),
//! never a data-validation error.

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::sync::Arc;

use crate::convert::convert;
use crate::descriptor::{
    DefaultKind, Descriptor, EnumDescriptor, FieldDescriptor, ScalarKind, StructDescriptor,
    VariantDescriptor,
};
use crate::errors::{ConvertError, Path, SchemaError, ValidationReport};
use crate::value::TypedValue;

// ————————————————————————————————————————————————————————————————————————————
// DECLARATIONS
// ————————————————————————————————————————————————————————————————————————————

/// A declared (unresolved) type expression. Nominal types are referenced by
/// registered name and looked up at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List(Box<Shape>),
    Set(Box<Shape>),
    Tuple(Vec<Shape>),
    Map(Box<Shape>, Box<Shape>),
    Union(Vec<Shape>),
    Named(String),
}

impl Shape {
    pub fn list(elem: Shape) -> Shape {
        Shape::List(Box::new(elem))
    }

    pub fn set(elem: Shape) -> Shape {
        Shape::Set(Box::new(elem))
    }

    pub fn tuple(elems: impl IntoIterator<Item = Shape>) -> Shape {
        Shape::Tuple(elems.into_iter().collect())
    }

    pub fn map(key: Shape, value: Shape) -> Shape {
        Shape::Map(Box::new(key), Box::new(value))
    }

    pub fn union(branches: impl IntoIterator<Item = Shape>) -> Shape {
        Shape::Union(branches.into_iter().collect())
    }

    pub fn named(name: impl Into<String>) -> Shape {
        Shape::Named(name.into())
    }
}

/// One declared record field. An eager default literal and the deferred
/// marker may both be present; eager wins at resolution time.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    name: String,
    shape: Shape,
    default: Option<Value>,
    deferred: bool,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self { name: name.into(), shape, default: None, deferred: false }
    }

    /// Attach an eager default: a dynamic literal validated once against the
    /// field's type at resolution time and bound verbatim afterwards.
    pub fn default_value(mut self, literal: Value) -> Self {
        self.default = Some(literal);
        self
    }

    /// Mark omission as legal; the construction side supplies the value.
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }
}

/// A declared record type, optionally inheriting fields from a base.
#[derive(Debug, Clone)]
pub struct StructDecl {
    name: String,
    base: Option<String>,
    fields: Vec<FieldDecl>,
}

impl StructDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), base: None, fields: Vec::new() }
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn field(self, name: impl Into<String>, shape: Shape) -> Self {
        self.field_decl(FieldDecl::new(name, shape))
    }

    pub fn field_decl(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }
}

/// A declared enumeration: ordered (variant name, underlying scalar) pairs.
#[derive(Debug, Clone)]
pub struct EnumDecl {
    name: String,
    variants: Vec<(String, Value)>,
}

impl EnumDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), variants: Vec::new() }
    }

    pub fn variant(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variants.push((name.into(), value));
        self
    }
}

// ————————————————————————————————————————————————————————————————————————————
// REGISTRY
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug)]
enum TypeDecl {
    Struct(StructDecl),
    Enum(EnumDecl),
}

#[derive(Debug)]
struct Entry {
    decl: TypeDecl,
    // populated on first resolution; lock-free reads afterwards
    cell: OnceCell<Descriptor>,
}

/// The schema registry: declared nominal types plus their memoized
/// descriptors. Build it once, then share it by reference; conversions
/// running on other threads only ever read it.
#[derive(Debug, Default)]
pub struct Registry {
    types: IndexMap<String, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_struct(&mut self, decl: StructDecl) -> Result<(), SchemaError> {
        self.register(decl.name.clone(), TypeDecl::Struct(decl))
    }

    pub fn register_enum(&mut self, decl: EnumDecl) -> Result<(), SchemaError> {
        self.register(decl.name.clone(), TypeDecl::Enum(decl))
    }

    fn register(&mut self, name: String, decl: TypeDecl) -> Result<(), SchemaError> {
        if self.types.contains_key(&name) {
            return Err(SchemaError::DuplicateType(name));
        }
        self.types.insert(name, Entry { decl, cell: OnceCell::new() });
        Ok(())
    }

    // ——— resolution ———

    /// Lower a declared shape to its resolved descriptor.
    pub fn resolve(&self, shape: &Shape) -> Result<Descriptor, SchemaError> {
        self.resolve_shape(shape, &mut Vec::new())
    }

    fn resolve_shape(&self, shape: &Shape, stack: &mut Vec<String>) -> Result<Descriptor, SchemaError> {
        match shape {
            Shape::Null => Ok(Descriptor::Scalar(ScalarKind::Null)),
            Shape::Bool => Ok(Descriptor::Scalar(ScalarKind::Bool)),
            Shape::Int => Ok(Descriptor::Scalar(ScalarKind::Int)),
            Shape::Float => Ok(Descriptor::Scalar(ScalarKind::Float)),
            Shape::Str => Ok(Descriptor::Scalar(ScalarKind::Str)),
            Shape::List(elem) => Ok(Descriptor::List(Box::new(self.resolve_shape(elem, stack)?))),
            Shape::Set(elem) => Ok(Descriptor::Set(Box::new(self.resolve_shape(elem, stack)?))),
            Shape::Tuple(elems) => {
                let elems = elems
                    .iter()
                    .map(|e| self.resolve_shape(e, stack))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Descriptor::Tuple(elems))
            }
            Shape::Map(key, value) => Ok(Descriptor::Map(
                Box::new(self.resolve_shape(key, stack)?),
                Box::new(self.resolve_shape(value, stack)?),
            )),
            Shape::Union(branches) => {
                if branches.is_empty() {
                    return Err(SchemaError::EmptyUnion);
                }
                let branches = branches
                    .iter()
                    .map(|b| self.resolve_shape(b, stack))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Descriptor::Union(branches))
            }
            Shape::Named(name) => self.resolve_named(name, stack),
        }
    }

    fn resolve_named(&self, name: &str, stack: &mut Vec<String>) -> Result<Descriptor, SchemaError> {
        let entry = self
            .types
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))?;

        if let Some(descriptor) = entry.cell.get() {
            return Ok(descriptor.clone());
        }
        // descriptors are acyclic by contract; refuse self-reachable types
        if stack.iter().any(|n| n == name) {
            return Err(SchemaError::RecursiveType(name.to_string()));
        }

        stack.push(name.to_string());
        let resolved = match &entry.decl {
            TypeDecl::Struct(decl) => self.resolve_struct(decl, stack),
            TypeDecl::Enum(decl) => self.resolve_enum(decl),
        };
        stack.pop();

        let descriptor = resolved?;
        Ok(entry.cell.get_or_init(|| descriptor).clone())
    }

    /// Walk the inheritance chain most-general-first and merge declared
    /// fields: a redeclared field overwrites its type/default in place
    /// (position preserved), new fields append in declaration order.
    fn resolve_struct(&self, decl: &StructDecl, stack: &mut Vec<String>) -> Result<Descriptor, SchemaError> {
        let mut chain = vec![decl];
        let mut current = decl;
        while let Some(base_name) = &current.base {
            if chain.iter().any(|d| &d.name == base_name) {
                return Err(SchemaError::RecursiveType(base_name.clone()));
            }
            let entry = self
                .types
                .get(base_name)
                .ok_or_else(|| SchemaError::UnknownType(base_name.clone()))?;
            let TypeDecl::Struct(base) = &entry.decl else {
                return Err(SchemaError::InvalidBase {
                    type_name: current.name.clone(),
                    base: base_name.clone(),
                });
            };
            chain.push(base);
            current = base;
        }
        chain.reverse(); // base-first

        let mut merged: IndexMap<String, FieldDescriptor> = IndexMap::new();
        for declared in chain {
            for field in &declared.fields {
                let ty = self.resolve_shape(&field.shape, stack)?;
                let default = match (&field.default, field.deferred) {
                    // eager beats the deferred marker when both are present
                    (Some(literal), _) => {
                        DefaultKind::Eager(self.check_default(&declared.name, field, literal, &ty)?)
                    }
                    (None, true) => DefaultKind::Deferred,
                    (None, false) => DefaultKind::None,
                };
                // insert keeps the original position on overwrite
                merged.insert(
                    field.name.clone(),
                    FieldDescriptor { name: field.name.clone(), ty, default },
                );
            }
        }

        Ok(Descriptor::Struct(Arc::new(StructDescriptor {
            name: decl.name.clone(),
            fields: merged.into_values().collect(),
        })))
    }

    // Eager defaults are validated here, once, against the field's own
    // descriptor; conversion then binds them without re-validation.
    fn check_default(
        &self,
        type_name: &str,
        field: &FieldDecl,
        literal: &Value,
        ty: &Descriptor,
    ) -> Result<TypedValue, SchemaError> {
        let mut errors = Vec::new();
        let mut path = Path::root();
        match convert(literal, ty, &mut path, &mut errors) {
            Some(typed) if errors.is_empty() => Ok(typed),
            _ => Err(SchemaError::InvalidDefault {
                type_name: type_name.to_string(),
                field: field.name.clone(),
                report: ValidationReport { type_name: ty.to_string(), errors },
            }),
        }
    }

    fn resolve_enum(&self, decl: &EnumDecl) -> Result<Descriptor, SchemaError> {
        let mut variants = Vec::with_capacity(decl.variants.len());
        for (name, value) in &decl.variants {
            let value = TypedValue::from_literal(value).ok_or_else(|| {
                SchemaError::NonScalarVariant {
                    enum_name: decl.name.clone(),
                    variant: name.clone(),
                }
            })?;
            variants.push(VariantDescriptor { name: name.clone(), value });
        }
        Ok(Descriptor::Enum(Arc::new(EnumDescriptor {
            name: decl.name.clone(),
            variants,
        })))
    }

    // ——— entry points ———

    /// Convert a decoded dynamic value against a target shape. Returns the
    /// typed value, or the aggregate report listing every violation.
    pub fn from_value(&self, value: &Value, target: &Shape) -> Result<TypedValue, ConvertError> {
        let descriptor = self.resolve(target)?;
        let mut errors = Vec::new();
        let mut path = Path::root();
        let result = convert(value, &descriptor, &mut path, &mut errors);
        match result {
            Some(typed) if errors.is_empty() => Ok(typed),
            _ => Err(ConvertError::Validation(ValidationReport {
                type_name: descriptor.to_string(),
                errors,
            })),
        }
    }

    /// Decode JSON text, then convert. Decode failures surface as-is.
    pub fn from_json(&self, text: &str, target: &Shape) -> Result<TypedValue, ConvertError> {
        let value: Value = serde_json::from_str(text)?;
        self.from_value(&value, target)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn struct_descriptor(reg: &Registry, name: &str) -> Arc<StructDescriptor> {
        match reg.resolve(&Shape::named(name)).unwrap() {
            Descriptor::Struct(s) => s,
            other => panic!("expected a struct descriptor, got {other:?}"),
        }
    }

    #[test]
    fn inherited_fields_come_base_first() {
        let mut reg = Registry::new();
        reg.register_struct(
            StructDecl::new("Base").field("a", Shape::Str).field("z", Shape::Int),
        )
        .unwrap();
        reg.register_struct(
            StructDecl::new("Child").base("Base").field("w", Shape::Bool),
        )
        .unwrap();

        let desc = struct_descriptor(&reg, "Child");
        assert_eq!(desc.name, "Child");
        assert_eq!(desc.field_names(), ["a", "z", "w"]);
    }

    #[test]
    fn redeclared_field_overwrites_in_place() {
        let mut reg = Registry::new();
        reg.register_struct(
            StructDecl::new("Base")
                .field("a", Shape::Str)
                .field_decl(FieldDecl::new("z", Shape::Int).default_value(json!(1))),
        )
        .unwrap();
        reg.register_struct(
            StructDecl::new("Child")
                .base("Base")
                .field("z", Shape::Str) // new type, default dropped, position kept
                .field("w", Shape::Bool),
        )
        .unwrap();

        let desc = struct_descriptor(&reg, "Child");
        assert_eq!(desc.field_names(), ["a", "z", "w"]);
        let z = desc.field("z").unwrap();
        assert_eq!(z.ty, Descriptor::Scalar(ScalarKind::Str));
        assert_eq!(z.default, DefaultKind::None);
    }

    #[test]
    fn descriptors_are_resolved_once_and_cached() {
        let mut reg = Registry::new();
        reg.register_struct(StructDecl::new("T").field("a", Shape::Int)).unwrap();
        let first = struct_descriptor(&reg, "T");
        let second = struct_descriptor(&reg, "T");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unknown_and_duplicate_types_are_fatal() {
        let mut reg = Registry::new();
        reg.register_struct(StructDecl::new("T").field("a", Shape::Int)).unwrap();
        assert!(matches!(
            reg.register_struct(StructDecl::new("T")),
            Err(SchemaError::DuplicateType(_))
        ));
        assert!(matches!(
            reg.resolve(&Shape::named("Missing")),
            Err(SchemaError::UnknownType(_))
        ));
        assert!(matches!(
            reg.resolve(&Shape::named("T2")).err(),
            Some(SchemaError::UnknownType(name)) if name == "T2"
        ));
    }

    #[test]
    fn schema_defects_never_become_validation_reports() {
        let reg = Registry::new();
        let err = reg.from_value(&json!(1), &Shape::named("Missing")).unwrap_err();
        assert!(matches!(err, ConvertError::Schema(SchemaError::UnknownType(_))));
        assert!(err.report().is_none());
    }

    #[test]
    fn inheritance_cycles_are_refused() {
        let mut reg = Registry::new();
        reg.register_struct(StructDecl::new("A").base("B").field("x", Shape::Int)).unwrap();
        reg.register_struct(StructDecl::new("B").base("A").field("y", Shape::Int)).unwrap();
        assert!(matches!(
            reg.resolve(&Shape::named("A")),
            Err(SchemaError::RecursiveType(_))
        ));
    }

    #[test]
    fn self_referential_field_types_are_refused() {
        let mut reg = Registry::new();
        reg.register_struct(
            StructDecl::new("Node").field("next", Shape::named("Node")),
        )
        .unwrap();
        assert!(matches!(
            reg.resolve(&Shape::named("Node")),
            Err(SchemaError::RecursiveType(_))
        ));
    }

    #[test]
    fn enum_bases_are_invalid() {
        let mut reg = Registry::new();
        reg.register_enum(EnumDecl::new("E").variant("a", json!(1))).unwrap();
        reg.register_struct(StructDecl::new("T").base("E").field("x", Shape::Int)).unwrap();
        assert!(matches!(
            reg.resolve(&Shape::named("T")),
            Err(SchemaError::InvalidBase { .. })
        ));
    }

    #[test]
    fn empty_unions_are_invalid() {
        let reg = Registry::new();
        assert!(matches!(
            reg.resolve(&Shape::Union(Vec::new())),
            Err(SchemaError::EmptyUnion)
        ));
    }

    #[test]
    fn eager_default_literals_are_validated_at_resolution() {
        let mut reg = Registry::new();
        reg.register_struct(StructDecl::new("Bad").field_decl(
            FieldDecl::new("n", Shape::Int).default_value(json!("seven")),
        ))
        .unwrap();
        match reg.resolve(&Shape::named("Bad")) {
            Err(SchemaError::InvalidDefault { type_name, field, report }) => {
                assert_eq!(type_name, "Bad");
                assert_eq!(field, "n");
                assert_eq!(report.len(), 1);
            }
            other => panic!("expected an invalid-default error, got {other:?}"),
        }
    }

    #[test]
    fn non_scalar_enum_variants_are_refused() {
        let mut reg = Registry::new();
        reg.register_enum(EnumDecl::new("E").variant("a", json!([1]))).unwrap();
        assert!(matches!(
            reg.resolve(&Shape::named("E")),
            Err(SchemaError::NonScalarVariant { .. })
        ));
    }
}
