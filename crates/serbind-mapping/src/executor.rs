//! Binding execution
//!
//! Runs a compiled [`BindingSet`] against source records, either into a fresh
//! target instance or into a key-ordered field mapping.

use serbind_ir::{Record, Value};
use serbind_schema::{InvokeError, MethodDef};
use std::collections::BTreeMap;
use tracing::trace;

use crate::binding::{Binding, BindingSet};
use crate::filter::FieldFilter;
use crate::{Error, ErrorKind, Result};

/// Target field names to values, iterated in lexicographic key order
pub type FieldMap = BTreeMap<String, Value>;

impl<'s> BindingSet<'s> {
    /// Build a fresh target instance from `source`.
    ///
    /// Returns `Ok(None)` when `source` is absent. An empty `filter` falls back
    /// to the set's default filter; fields outside the effective filter are
    /// left as the constructor produced them.
    ///
    /// # Errors
    ///
    /// Fails when `source` is not of the declared source schema, when the
    /// target cannot be constructed, or when any accessor, combinator or
    /// assignment fails.
    pub fn serialize_to_instance(&self, source: &Value, filter: &FieldFilter) -> Result<Option<Record>> {
        let Some(source) = self.check_source(source)? else {
            return Ok(None);
        };
        let mut target = self.construct()?;
        let filter = filter.effective(&self.default_filter);

        for (field, binding) in &self.bindings {
            if !filter.allows(field) {
                continue;
            }
            trace!(target_schema = %self.target.name, field = %field, kind = %binding.kind(), "Applying binding");

            let value = match binding {
                Binding::Direct { source_reader, .. } => self.read(source_reader, source)?,
                Binding::Chained {
                    source_reader,
                    sub_bindings,
                    ..
                } => {
                    let nested = self.read(source_reader, source)?;
                    sub_bindings
                        .serialize_to_instance(&nested, &FieldFilter::all())?
                        .map_or(Value::Null, Value::Record)
                }
                Binding::Synthetic {
                    combinator,
                    source_readers,
                    ..
                } => self.combine(combinator, source_readers, source, &target)?,
            };

            match binding.target_writer() {
                Some(writer) => self.write(writer, &mut target, value)?,
                None => self.store(&mut target, field, value)?,
            }
        }

        Ok(Some(target))
    }

    /// Build a mapping of target field names to values from `source`.
    ///
    /// Returns an empty mapping when `source` is absent. Chained fields map
    /// to nested mappings, synthesized fields to the combinator's result.
    ///
    /// # Errors
    ///
    /// Same as [`BindingSet::serialize_to_instance`], except that no value is
    /// ever assigned into the target.
    pub fn serialize_to_mapping(&self, source: &Value, filter: &FieldFilter) -> Result<FieldMap> {
        let Some(source) = self.check_source(source)? else {
            return Ok(FieldMap::new());
        };
        // combinators are invoked on a target instance
        let receiver = self.construct()?;
        let filter = filter.effective(&self.default_filter);

        let mut mapping = FieldMap::new();
        for (field, binding) in &self.bindings {
            if !filter.allows(field) {
                continue;
            }
            trace!(target_schema = %self.target.name, field = %field, kind = %binding.kind(), "Mapping binding");

            let value = match binding {
                Binding::Direct { source_reader, .. } => self.read(source_reader, source)?,
                Binding::Chained {
                    source_reader,
                    sub_bindings,
                    ..
                } => {
                    let nested = self.read(source_reader, source)?;
                    Value::Map(sub_bindings.serialize_to_mapping(&nested, &FieldFilter::all())?)
                }
                Binding::Synthetic {
                    combinator,
                    source_readers,
                    ..
                } => self.combine(combinator, source_readers, source, &receiver)?,
            };
            mapping.insert(field.clone(), value);
        }

        Ok(mapping)
    }

    /// [`BindingSet::serialize_to_instance`] with the default filter
    pub fn serialize(&self, source: &Value) -> Result<Option<Record>> {
        self.serialize_to_instance(source, &FieldFilter::all())
    }

    /// [`BindingSet::serialize_to_mapping`] with the default filter
    pub fn serialize_to_map(&self, source: &Value) -> Result<FieldMap> {
        self.serialize_to_mapping(source, &FieldFilter::all())
    }

    fn check_source<'v>(&self, source: &'v Value) -> Result<Option<&'v Record>> {
        match source {
            Value::Null => Ok(None),
            Value::Record(record) if record.schema == self.source => Ok(Some(record)),
            other => Err(Error::source_mismatch(format!(
                "Source object does not match serializer '{}': expected '{}', found '{}'",
                self.target.name,
                self.source,
                other.kind_name()
            ))),
        }
    }

    fn construct(&self) -> Result<Record> {
        self.provider.construct(&self.target.name).map_err(|source| {
            Error::with_source(
                ErrorKind::ConstructionFailure,
                format!("Could not instantiate instance of type '{}'", self.target.name),
                source,
            )
        })
    }

    fn read(&self, reader: &MethodDef, source: &Record) -> Result<Value> {
        reader.call(source, &[]).map_err(|cause| {
            Error::with_source(
                ErrorKind::InvocationFailure,
                format!("Could not invoke '{}' on object of type '{}'", reader.name, source.schema),
                cause,
            )
        })
    }

    fn combine(
        &self,
        combinator: &MethodDef,
        readers: &[&MethodDef],
        source: &Record,
        receiver: &Record,
    ) -> Result<Value> {
        let args = readers
            .iter()
            .map(|reader| self.read(reader, source))
            .collect::<Result<Vec<_>>>()?;
        combinator.call(receiver, &args).map_err(|cause| {
            Error::with_source(
                ErrorKind::InvocationFailure,
                format!(
                    "Could not invoke '{}' on object of type '{}'",
                    combinator.name, self.target.name
                ),
                cause,
            )
        })
    }

    fn write(&self, writer: &MethodDef, target: &mut Record, value: Value) -> Result<()> {
        writer.call_mut(target, &[value]).map_err(|cause| {
            let message = format!(
                "Could not invoke '{}' on object of type '{}'",
                writer.name, self.target.name
            );
            Error::with_source(assignment_kind(&cause), message, cause)
        })
    }

    fn store(&self, target: &mut Record, field: &str, value: Value) -> Result<()> {
        self.provider
            .store_field(target, field, value)
            .map_err(|cause| {
                let message = format!(
                    "Could not set field '{field}' on object of type '{}'",
                    self.target.name
                );
                Error::with_source(assignment_kind(&cause), message, cause)
            })
    }
}

fn assignment_kind(cause: &InvokeError) -> ErrorKind {
    match cause {
        InvokeError::FieldNotAccessible { .. } => ErrorKind::AccessDenied,
        InvokeError::Failed { .. } => ErrorKind::InvocationFailure,
        _ => ErrorKind::AssignmentFailure,
    }
}
