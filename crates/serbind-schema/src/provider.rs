//! Schema provider contract
//!
//! The binding engine never looks at schema storage directly; it asks a
//! [`SchemaProvider`] for declared elements, constructs instances through it,
//! and defers to it for the assignability rule.

use serbind_ir::{Record, Type, Value};

use crate::model::{FieldDef, InvokeError, MethodDef, RecordSchema};

/// Introspection oracle over a set of record schemas.
///
/// Every lookup borrows from the provider, so anything compiled against it
/// lives no longer than the provider itself.
pub trait SchemaProvider: Send + Sync {
    /// Look up a schema by name
    fn schema(&self, name: &str) -> Option<&RecordSchema>;

    /// Source schema named by the `serialized_from` annotation
    fn serialized_from(&self, schema: &str) -> Option<&str> {
        self.schema(schema)?.serialized_from.as_deref()
    }

    /// Declared fields in declaration order
    fn declared_fields(&self, schema: &str) -> &[FieldDef] {
        self.schema(schema).map_or(&[][..], |s| s.fields.as_slice())
    }

    /// Declared methods in declaration order
    fn declared_methods(&self, schema: &str) -> &[MethodDef] {
        self.schema(schema).map_or(&[][..], |s| s.methods.as_slice())
    }

    fn find_field(&self, schema: &str, field: &str) -> Option<&FieldDef> {
        self.schema(schema)?.find_field(field)
    }

    /// Find a method by name and exact parameter types
    fn find_method_by_name(&self, schema: &str, name: &str, params: &[Type]) -> Option<&MethodDef> {
        self.schema(schema)?.find_method(name, params)
    }

    /// Zero-argument construction
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is unknown or its constructor cannot be used.
    fn construct(&self, schema: &str) -> Result<Record, InvokeError> {
        self.schema(schema)
            .ok_or_else(|| InvokeError::UnknownSchema(schema.to_string()))?
            .instantiate()
    }

    /// Store a value into a publicly writable field of an instance
    ///
    /// # Errors
    ///
    /// Returns an error if the field cannot be written or the value does not fit.
    fn store_field(&self, record: &mut Record, field: &str, value: Value) -> Result<(), InvokeError> {
        let schema = record.schema.clone();
        self.schema(&schema)
            .ok_or(InvokeError::UnknownSchema(schema))?
            .store(record, field, value)
    }

    /// Host widening rule used for loose type checks
    fn assignable_from(&self, to: &Type, from: &Type) -> bool {
        to.is_assignable_from(from)
    }
}
