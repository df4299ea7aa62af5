#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # serbind-ir
//!
//! Dynamic value model shared by the schema provider and the binding engine.
//!
//! Source and target objects are represented as [`Record`]s: an instance of a
//! named record type holding one [`Value`] per declared field. Declared field,
//! parameter and return types are described by [`Type`], which also carries
//! the assignability rule used when bindings are type-checked.

/// Live instances of record types.
pub mod record;
/// Declared types and the assignability rule.
pub mod types;
/// Dynamic values stored in record fields.
pub mod value;

pub use record::Record;
pub use types::Type;
pub use value::Value;

use thiserror::Error;

/// Errors that can occur when working with values and types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown type '{0}'")]
    UnknownType(String),
}

/// Crate-local result type for value operations.
pub type Result<T> = std::result::Result<T, Error>;
