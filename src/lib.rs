//! Type-directed conversion of dynamic JSON values into validated, strongly
//! shaped values, with exhaustive error reporting.
//!
//! Design goals:
//! - Report every structural violation in one pass; never stop at the first.
//! - Each error carries the exact dot-joined path to the offending value.
//! - Descriptors are explicit, registered schemas (no runtime reflection):
//!   resolved once per type, immutable, shareable across threads.
//! - Structural conformance only; no coercion (a string is never parsed
//!   into a number) and no semantic validation.
//!
//! Flow: declare types against a [`Registry`], then call
//! [`Registry::from_value`] on a decoded `serde_json::Value` (or
//! [`Registry::from_json`] on raw text). Success yields a [`TypedValue`];
//! failure yields a [`ValidationReport`] listing every violation. Schema
//! defects (unknown types, bad defaults) fail fatally as [`SchemaError`]
//! and are never mixed into a report.

pub mod convert;
pub mod descriptor;
pub mod errors;
pub mod registry;
pub mod value;

pub use convert::convert;
pub use descriptor::{
    DefaultKind, Descriptor, EnumDescriptor, FieldDescriptor, ScalarKind, StructDescriptor,
    VariantDescriptor,
};
pub use errors::{
    ConvertError, ErrorKind, NameList, Path, SchemaError, Segment, TypeList, ValidationError,
    ValidationReport,
};
pub use registry::{EnumDecl, FieldDecl, Registry, Shape, StructDecl};
pub use value::{StructValue, TypedValue, ValueKind, VariantValue};
