//! In-memory schema registry

use indexmap::IndexMap;
use serbind_ir::{Record, Type, Value};
use tracing::{debug, trace};

use crate::model::RecordSchema;
use crate::provider::SchemaProvider;
use crate::{Error, Result};

/// Registry of record schemas, implementing [`SchemaProvider`]
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, RecordSchema>,
}

impl SchemaRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            schemas: IndexMap::new(),
        }
    }

    /// Register a schema, returning the one it replaced
    pub fn register(&mut self, schema: RecordSchema) -> Option<RecordSchema> {
        debug!(
            schema = %schema.name,
            fields = schema.fields.len(),
            methods = schema.methods.len(),
            "Registering schema"
        );
        let replaced = self.schemas.insert(schema.name.clone(), schema);
        if let Some(previous) = &replaced {
            debug!(schema = %previous.name, "Replaced previously registered schema");
        }
        replaced
    }

    /// Builder-style registration
    #[must_use]
    pub fn with(mut self, schema: RecordSchema) -> Self {
        self.register(schema);
        self
    }

    /// Register every schema from an iterator
    pub fn extend(&mut self, schemas: impl IntoIterator<Item = RecordSchema>) {
        for schema in schemas {
            self.register(schema);
        }
    }

    /// Get a schema by name
    pub fn get(&self, name: &str) -> Option<&RecordSchema> {
        self.schemas.get(name)
    }

    /// Check if a schema exists
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered schema names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Build an instance of `schema` from a JSON object.
    ///
    /// Every declared field is present on the result; fields missing from the
    /// object are absent. Record-typed fields holding objects are converted
    /// recursively. Keys with no declared field are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is unknown, the document is not an
    /// object, or a value does not fit its field's declared type.
    pub fn record_from_json(&self, schema: &str, json: &serde_json::Value) -> Result<Record> {
        let definition = self
            .get(schema)
            .ok_or_else(|| Error::NotFound(format!("Schema '{schema}' is not registered")))?;
        let object = json.as_object().ok_or_else(|| {
            Error::InvalidFormat(format!("Expected a JSON object for schema '{schema}'"))
        })?;

        for key in object.keys() {
            if definition.find_field(key).is_none() {
                trace!(schema, field = %key, "Ignoring undeclared field");
            }
        }

        let mut record = definition.blank_record();
        for field in &definition.fields {
            let Some(raw) = object.get(&field.name) else {
                continue;
            };
            let value = match (&field.ty, raw) {
                (Type::Record(nested), serde_json::Value::Object(_)) => {
                    Value::Record(self.record_from_json(nested, raw)?)
                }
                _ => Value::from_json(raw.clone()),
            };
            if !field.ty.accepts(&value) {
                return Err(Error::InvalidFormat(format!(
                    "Field '{}' of schema '{}' expects '{}' but found '{}'",
                    field.name,
                    schema,
                    field.ty,
                    value.kind_name()
                )));
            }
            record.set(field.name.clone(), value);
        }
        Ok(record)
    }
}

impl SchemaProvider for SchemaRegistry {
    fn schema(&self, name: &str) -> Option<&RecordSchema> {
        self.schemas.get(name)
    }
}
