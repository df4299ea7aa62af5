//! Record instances

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// An instance of a named record type.
///
/// Fields keep the order in which they were declared on the schema that
/// constructed the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Name of the record type this instance belongs to
    pub schema: String,

    /// Field values, keyed by field name
    pub fields: IndexMap<String, Value>,
}

impl Record {
    /// Create an empty record of the given type
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field assignment
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Name of the record type
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Get a field value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a field value, returning the previous value if the field existed
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Check if the record has a slot for the field
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}
