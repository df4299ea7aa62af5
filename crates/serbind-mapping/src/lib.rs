#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # serbind-mapping
//!
//! Binding compiler and executor for declarative object-to-object mapping.
//!
//! A target schema declares, through annotations, how each of its fields is
//! produced from a source schema. [`BindingSet::compile`] turns those
//! declarations into an immutable, ordered set of [`Binding`]s once; the set
//! is then executed against any number of source records, producing either a
//! fresh target [`Record`](serbind_ir::Record) or a key-ordered mapping of
//! target field names to values.
//!
//! ```
//! use serbind_ir::{Record, Type, Value};
//! use serbind_mapping::{BindingSet, FieldFilter};
//! use serbind_schema::{FieldDef, RecordSchema, SchemaRegistry};
//!
//! let registry = SchemaRegistry::new()
//!     .with(RecordSchema::new("Person").property("name", Type::String))
//!     .with(
//!         RecordSchema::new("PersonView")
//!             .serialized_from("Person")
//!             .field(FieldDef::new("label", Type::String).public().from_field("name")),
//!     );
//!
//! let bindings = BindingSet::compile(&registry, "PersonView", FieldFilter::all())?;
//! let source = Value::Record(Record::new("Person").with_field("name", "Ada"));
//! let mapping = bindings.serialize_to_mapping(&source, &FieldFilter::all())?;
//!
//! assert_eq!(mapping["label"], Value::from("Ada"));
//! # Ok::<(), serbind_mapping::Error>(())
//! ```

pub mod binding;
mod compiler;
mod executor;
pub mod filter;

pub use binding::{Binding, BindingKind, BindingPlan, BindingSet, BindingStep};
pub use executor::FieldMap;
pub use filter::FieldFilter;

/// Accessor naming conventions shared with the schema provider
pub use serbind_schema::naming;

use serbind_schema::InvokeError;
use std::fmt;
use thiserror::Error;

/// Category of a binding failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Target schema lacks a usable `serialized_from` declaration
    NotASerializer,
    /// Source instance is not of the declared source schema
    SourceMismatch,
    /// A required reader does not exist on the source schema
    MissingAccessor,
    /// Declared types of a binding do not agree
    TypeMismatch,
    /// Combinator arity differs from its source field count
    ArgCountMismatch,
    /// Target instance could not be constructed
    ConstructionFailure,
    /// Target field is not publicly writable
    AccessDenied,
    /// An accessor or combinator failed while running
    InvocationFailure,
    /// A value could not be stored into the target
    AssignmentFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::NotASerializer => "not a serializer",
            ErrorKind::SourceMismatch => "source mismatch",
            ErrorKind::MissingAccessor => "missing accessor",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::ArgCountMismatch => "argument count mismatch",
            ErrorKind::ConstructionFailure => "construction failure",
            ErrorKind::AccessDenied => "access denied",
            ErrorKind::InvocationFailure => "invocation failure",
            ErrorKind::AssignmentFailure => "assignment failure",
        };
        f.write_str(label)
    }
}

/// Errors raised while compiling or executing bindings
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<InvokeError>,
}

impl Error {
    /// Build an error without an underlying cause
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Build an error wrapping the provider's invocation failure
    pub fn with_source(kind: ErrorKind, message: impl Into<String>, source: InvokeError) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn not_a_serializer(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotASerializer, message)
    }

    pub fn source_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SourceMismatch, message)
    }

    pub fn missing_accessor(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingAccessor, message)
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    pub fn arg_count_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArgCountMismatch, message)
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Message without the category prefix
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Underlying invocation failure, if any
    pub fn invoke_error(&self) -> Option<&InvokeError> {
        self.source.as_ref()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
