//! Error model and aggregate reporting.
//!
//! Two classes, never mixed:
//! - recoverable structural [`ValidationError`]s, collected into a
//!   [`ValidationReport`] and surfaced as one aggregate failure;
//! - fatal [`SchemaError`]s (schema/usage defects: unknown types, bad
//!   defaults), raised from registration/resolution, never per-value.
//!
//! The report rendering is a compatibility contract; consumers parse it.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::descriptor::Descriptor;
use crate::value::ValueKind;

// ————————————————————————————————————————————————————————————————————————————
// PATHS
// ————————————————————————————————————————————————————————————————————————————

/// One step into nested input: a record field, a mapping key, or a sequence
/// index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) | Segment::Key(name) => f.write_str(name),
            Segment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Location of a value inside the overall input tree. Empty at the root;
/// renders dot-joined (`b.0`, `f.x`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) {
        self.segments.pop();
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATION ERRORS
// ————————————————————————————————————————————————————————————————————————————

/// A single structural violation, tagged with the exact path to the
/// offending value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub path: Path,
    pub kind: ErrorKind,
}

impl ValidationError {
    pub fn new(path: Path, kind: ErrorKind) -> Self {
        Self { path, kind }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// The error taxonomy. Message templates are a rendering contract; do not
/// reword them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("expected: type={expected}; got: value={value}, type={actual}")]
    TypeMismatch {
        value: Value,
        actual: ValueKind,
        expected: Descriptor,
    },

    /// Union exhaustion: every branch rejected the value.
    #[error("expected: types={expected}; got: value={value}, type={actual}")]
    MultiTypeMismatch {
        value: Value,
        actual: ValueKind,
        expected: TypeList,
    },

    #[error("expected: tuple_len={expected_len}; got: tuple_len={actual_len}, tuple={value}")]
    TupleLengthMismatch {
        value: Value,
        actual_len: usize,
        expected_len: usize,
    },

    #[error("expected: field={name} type={expected}; got: nothing")]
    FieldRequired { name: String, expected: Descriptor },

    #[error("expected: fields={known}; got: field={name} val={value} type={actual}")]
    ExtraField {
        name: String,
        value: Value,
        actual: ValueKind,
        known: NameList,
    },
}

/// Union branch descriptors, rendered joined by `|`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeList(pub Vec<Descriptor>);

impl fmt::Display for TypeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Known field names, rendered as `[a, b, c]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameList(pub Vec<String>);

impl fmt::Display for NameList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        f.write_str("]")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// AGGREGATE REPORT
// ————————————————————————————————————————————————————————————————————————————

/// Every violation found in one conversion attempt, in discovery order
/// (depth-first, field-declaration order). Non-empty by construction: a
/// zero-error conversion returns a value, never a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub type_name: String,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }
}

// Exact rendering contract:
//
//   <N> validation error(s) for <target type name>
//   <path.joined.by.dots>
//     <error message>
//   ...
//
// A root-level error contributes an empty path line.
impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s) for {}", self.len(), self.type_name)?;
        for err in &self.errors {
            write!(f, "\n{}\n  {}", err.path, err.kind)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

// ————————————————————————————————————————————————————————————————————————————
// FATAL ERRORS & PUBLIC FAILURE TYPE
// ————————————————————————————————————————————————————————————————————————————

/// Schema/usage defects. These signal programmer errors in the registered
/// type model, not problems with the data being converted.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown type: `{0}`")]
    UnknownType(String),

    #[error("type `{0}` is already registered")]
    DuplicateType(String),

    #[error("recursive type: `{0}` is reachable from itself")]
    RecursiveType(String),

    #[error("base `{base}` of `{type_name}` is not a struct type")]
    InvalidBase { type_name: String, base: String },

    #[error("union with no branches")]
    EmptyUnion,

    #[error("invalid eager default for field `{field}` of `{type_name}`:\n{report}")]
    InvalidDefault {
        type_name: String,
        field: String,
        report: ValidationReport,
    },

    #[error("variant `{variant}` of enum `{enum_name}` has a non-scalar value")]
    NonScalarVariant { enum_name: String, variant: String },
}

/// Failure of a top-level conversion entry point.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Fatal schema defect (usage contract violation).
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The input did not conform; the report lists every violation.
    #[error(transparent)]
    Validation(#[from] ValidationReport),

    /// The text was not valid JSON; surfaced from the decoder as-is.
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

impl ConvertError {
    /// The aggregate report, when the failure was a validation failure.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            ConvertError::Validation(report) => Some(report),
            _ => None,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
