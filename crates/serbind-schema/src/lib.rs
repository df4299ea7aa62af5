#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # serbind-schema
//!
//! Record schema model, schema provider contract, and schema document loader.
//!
//! A schema describes a record type the way a host runtime's introspection
//! would: declared fields, declared methods with callable bodies, a
//! constructor, and the binding annotations (`serialized_from`, `from_field`,
//! `with_serializer`, `synthesized`) attached to each element.

pub mod combinators;
pub mod loader;
pub mod model;
pub mod naming;
pub mod provider;
pub mod registry;

pub use combinators::{CombinatorFn, CombinatorRegistry};
pub use loader::SchemaLoader;
pub use model::{
    BoxError, Constructor, ConstructorFn, FieldDef, InvokeError, MethodBody, MethodDef, MutatorFn,
    NativeFn, RecordSchema, Synthesized, WithSerializer,
};
pub use provider::SchemaProvider;
pub use registry::SchemaRegistry;

use thiserror::Error;

/// Errors that can occur when loading or querying schemas
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("Method '{method}' of schema '{schema}' refers to unknown combinator '{combinator}'")]
    UnknownCombinator {
        schema: String,
        method: String,
        combinator: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
