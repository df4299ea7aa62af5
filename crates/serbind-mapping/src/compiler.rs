//! Binding compilation
//!
//! Scans a target schema's methods, then its fields, and resolves every
//! annotated or conventional element against the source schema. All lookups
//! happen here; execution only invokes what was resolved.

use indexmap::IndexMap;
use serbind_ir::Type;
use serbind_schema::naming::{accessor_to_field, field_to_reader, field_to_writer, is_writer_name};
use serbind_schema::{MethodDef, SchemaProvider, Synthesized, WithSerializer};
use tracing::{debug, trace};

use crate::binding::{Binding, BindingSet};
use crate::filter::FieldFilter;
use crate::{Error, Result};

impl<'s> BindingSet<'s> {
    /// Compile the bindings of `target` against the schemas of `provider`.
    ///
    /// `default_filter` restricts execution whenever a call passes an empty
    /// filter. Chained bindings compile their nested sets eagerly, so any
    /// error in the whole graph surfaces here.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::NotASerializer`](crate::ErrorKind::NotASerializer)
    /// when `target` has no source declaration,
    /// [`ErrorKind::MissingAccessor`](crate::ErrorKind::MissingAccessor) when a
    /// source reader is absent, and with a type or arity mismatch when the
    /// declared signatures do not line up.
    pub fn compile(
        provider: &'s dyn SchemaProvider,
        target: &str,
        default_filter: FieldFilter,
    ) -> Result<Self> {
        Compiler {
            provider,
            chain: Vec::new(),
        }
        .compile(target, default_filter)
    }
}

struct Compiler<'s> {
    provider: &'s dyn SchemaProvider,
    /// Target schemas currently being compiled, outermost first
    chain: Vec<String>,
}

impl<'s> Compiler<'s> {
    fn compile(&mut self, target: &str, default_filter: FieldFilter) -> Result<BindingSet<'s>> {
        let provider = self.provider;
        let schema = provider.schema(target).ok_or_else(|| {
            Error::not_a_serializer(format!("Serializer '{target}' is not a known schema"))
        })?;
        let source = provider.serialized_from(target).ok_or_else(|| {
            Error::not_a_serializer(format!(
                "Serializer '{target}' does not declare the schema it is serialized from"
            ))
        })?;
        if provider.schema(source).is_none() {
            return Err(Error::not_a_serializer(format!(
                "Serializer '{target}' is serialized from unknown schema '{source}'"
            )));
        }

        self.chain.push(target.to_string());
        let mut bindings = IndexMap::new();
        let scanned = self
            .scan_methods(target, source, &mut bindings)
            .and_then(|()| self.scan_fields(target, source, &mut bindings));
        self.chain.pop();
        scanned?;

        debug!(
            target_schema = target,
            source_schema = source,
            bindings = bindings.len(),
            "Compiled binding set"
        );

        Ok(BindingSet {
            provider,
            target: schema,
            source,
            default_filter,
            bindings,
        })
    }

    fn scan_methods(
        &mut self,
        target: &str,
        source: &str,
        bindings: &mut IndexMap<String, Binding<'s>>,
    ) -> Result<()> {
        let provider = self.provider;
        for method in provider.declared_methods(target) {
            let target_field = accessor_to_field(&method.name);
            let source_field = method
                .from_field
                .clone()
                .unwrap_or_else(|| target_field.clone());

            if let Some(synthesized) = &method.synthesized {
                let binding = self.synthetic(target, source, method, synthesized)?;
                trace!(target_schema = target, field = %synthesized.target, combinator = %method.name, "Bound synthetic field");
                bindings.insert(synthesized.target.clone(), binding);
            } else if is_writer_name(&method.name) && method.arity() == 1 {
                let param = &method.params[0];
                let binding = match &method.with_serializer {
                    Some(annotation) => {
                        let sub_bindings = self.chained(target, &method.name, annotation, param)?;
                        Binding::Chained {
                            target_field: target_field.clone(),
                            source_reader: self.reader(source, &source_field)?,
                            target_writer: Some(method),
                            sub_bindings: Box::new(sub_bindings),
                        }
                    }
                    None => {
                        let reader = self.reader(source, &source_field)?;
                        self.check_assignable(target, method, param, reader)?;
                        Binding::Direct {
                            target_field: target_field.clone(),
                            source_reader: reader,
                            target_writer: Some(method),
                        }
                    }
                };
                trace!(target_schema = target, field = %target_field, writer = %method.name, kind = %binding.kind(), "Bound writer");
                bindings.insert(target_field, binding);
            } else {
                trace!(target_schema = target, method = %method.name, "Ignoring method");
            }
        }
        Ok(())
    }

    fn scan_fields(
        &mut self,
        target: &str,
        source: &str,
        bindings: &mut IndexMap<String, Binding<'s>>,
    ) -> Result<()> {
        let provider = self.provider;
        for field in provider.declared_fields(target) {
            if !field.public || field.transient || bindings.contains_key(&field.name) {
                trace!(target_schema = target, field = %field.name, "Skipping field");
                continue;
            }
            let source_field = field.from_field.as_deref().unwrap_or(&field.name);

            let binding = match &field.with_serializer {
                Some(annotation) => {
                    let sub_bindings = self.chained(target, &field.name, annotation, &field.ty)?;
                    Binding::Chained {
                        target_field: field.name.clone(),
                        source_reader: self.reader(source, source_field)?,
                        target_writer: None,
                        sub_bindings: Box::new(sub_bindings),
                    }
                }
                None => Binding::Direct {
                    target_field: field.name.clone(),
                    source_reader: self.reader(source, source_field)?,
                    target_writer: None,
                },
            };
            trace!(target_schema = target, field = %field.name, kind = %binding.kind(), "Bound public field");
            bindings.insert(field.name.clone(), binding);
        }
        Ok(())
    }

    fn synthetic(
        &self,
        target: &str,
        source: &str,
        combinator: &'s MethodDef,
        annotation: &Synthesized,
    ) -> Result<Binding<'s>> {
        let source_readers = annotation
            .from
            .iter()
            .map(|field| self.reader(source, field))
            .collect::<Result<Vec<_>>>()?;

        if combinator.arity() != source_readers.len() {
            return Err(Error::arg_count_mismatch(format!(
                "Combinator '{}' on '{target}' takes {} arguments but {} source fields are declared",
                combinator.name,
                combinator.arity(),
                source_readers.len()
            )));
        }

        for (index, (param, reader)) in combinator.params.iter().zip(&source_readers).enumerate() {
            if reader.returns.as_ref() != Some(param) {
                return Err(Error::type_mismatch(format!(
                    "Parameter {index} of '{}' on '{target}' is '{param}' but '{}' on '{source}' returns '{}'",
                    combinator.name,
                    reader.name,
                    display_returns(reader)
                )));
            }
        }

        Ok(Binding::Synthetic {
            target_field: annotation.target.clone(),
            combinator,
            source_readers,
            target_writer: self.lookup_writer(target, &annotation.target),
        })
    }

    /// Compile the nested set of a chained binding whose target element is
    /// declared with type `declared`
    fn chained(
        &mut self,
        target: &str,
        element: &str,
        annotation: &WithSerializer,
        declared: &Type,
    ) -> Result<BindingSet<'s>> {
        let serializer = match &annotation.serializer {
            Some(serializer) => {
                if Type::record(serializer.as_str()) != *declared {
                    return Err(Error::type_mismatch(format!(
                        "Serializer '{serializer}' of '{element}' on '{target}' does not match declared type '{declared}'"
                    )));
                }
                serializer.as_str()
            }
            None => declared.record_name().ok_or_else(|| {
                Error::not_a_serializer(format!(
                    "Type '{declared}' of '{element}' on '{target}' is not a serializer"
                ))
            })?,
        };

        if self.chain.iter().any(|name| name == serializer) {
            return Err(Error::not_a_serializer(format!(
                "Serializer '{serializer}' of '{element}' on '{target}' chains back into itself"
            )));
        }

        self.compile(serializer, FieldFilter::from(annotation.fields.clone()))
    }

    fn reader(&self, source: &str, field: &str) -> Result<&'s MethodDef> {
        let name = field_to_reader(field);
        let reader = self
            .provider
            .find_method_by_name(source, &name, &[])
            .ok_or_else(|| {
                Error::missing_accessor(format!("No method named '{name}' on schema '{source}'"))
            })?;
        if reader.returns.is_none() {
            return Err(Error::missing_accessor(format!(
                "Method '{name}' on schema '{source}' returns nothing"
            )));
        }
        Ok(reader)
    }

    fn check_assignable(
        &self,
        target: &str,
        writer: &MethodDef,
        param: &Type,
        reader: &MethodDef,
    ) -> Result<()> {
        match &reader.returns {
            Some(returns) if self.provider.assignable_from(param, returns) => Ok(()),
            _ => Err(Error::type_mismatch(format!(
                "'{}' on '{target}' takes '{param}' which cannot hold '{}' returned by '{}'",
                writer.name,
                display_returns(reader),
                reader.name
            ))),
        }
    }

    /// Writer `set<Field>` taking exactly the declared type of `field`
    fn lookup_writer(&self, target: &str, field: &str) -> Option<&'s MethodDef> {
        let declared = self.provider.find_field(target, field)?;
        self.provider
            .find_method_by_name(target, &field_to_writer(field), std::slice::from_ref(&declared.ty))
    }
}

fn display_returns(method: &MethodDef) -> String {
    method
        .returns
        .as_ref()
        .map_or_else(|| "nothing".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BindingKind, ErrorKind};
    use serbind_schema::{FieldDef, MethodBody, RecordSchema, SchemaRegistry};

    fn registry(target: RecordSchema) -> SchemaRegistry {
        SchemaRegistry::new()
            .with(
                RecordSchema::new("Source")
                    .property("count", Type::Integer)
                    .property("ratio", Type::Decimal)
                    .property("label", Type::String)
                    .property("child", Type::record("Source")),
            )
            .with(target)
    }

    fn compile_error(target: RecordSchema) -> Error {
        let name = target.name.clone();
        let registry = registry(target);
        BindingSet::compile(&registry, &name, FieldFilter::all()).unwrap_err()
    }

    #[test]
    fn plain_writer_accepts_widening() {
        let registry = registry(
            RecordSchema::new("T")
                .serialized_from("Source")
                .field(FieldDef::new("count", Type::Decimal))
                .setter("count", Type::Decimal),
        );
        let bindings = BindingSet::compile(&registry, "T", FieldFilter::all()).unwrap();
        assert_eq!(bindings.get("count").map(Binding::kind), Some(BindingKind::Direct));
    }

    #[test]
    fn plain_writer_rejects_narrowing() {
        let error = compile_error(
            RecordSchema::new("T")
                .serialized_from("Source")
                .field(FieldDef::new("ratio", Type::Integer))
                .setter("ratio", Type::Integer),
        );
        assert_eq!(error.kind(), ErrorKind::TypeMismatch);
        assert!(error.message().contains("setRatio"));
    }

    #[test]
    fn synthetic_requires_exact_parameter_types() {
        let error = compile_error(
            RecordSchema::new("T").serialized_from("Source").method(
                MethodDef::new(
                    "scale",
                    vec![Type::Decimal],
                    Some(Type::Decimal),
                    MethodBody::Format("{0}".to_string()),
                )
                .synthesized(Synthesized::new("scaled", ["count"])),
            ),
        );
        assert_eq!(error.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn missing_reader_names_schema_and_accessor() {
        let error = compile_error(
            RecordSchema::new("T")
                .serialized_from("Source")
                .public_field("missing", Type::String),
        );
        assert_eq!(error.kind(), ErrorKind::MissingAccessor);
        assert!(error.message().contains("getMissing"));
        assert!(error.message().contains("Source"));
    }

    #[test]
    fn source_redirect_applies_to_reader_only() {
        let registry = registry(
            RecordSchema::new("T")
                .serialized_from("Source")
                .field(FieldDef::new("title", Type::String))
                .method(MethodDef::setter("title", Type::String).from_field("label")),
        );
        let bindings = BindingSet::compile(&registry, "T", FieldFilter::all()).unwrap();

        let Some(Binding::Direct { source_reader, target_writer, .. }) = bindings.get("title") else {
            panic!("expected a direct binding for 'title'");
        };
        assert_eq!(source_reader.name, "getLabel");
        assert_eq!(target_writer.map(|w| w.name.as_str()), Some("setTitle"));
    }

    #[test]
    fn unusable_methods_are_ignored() {
        let registry = registry(
            RecordSchema::new("T")
                .serialized_from("Source")
                .method(MethodDef::new("setNothing", Vec::new(), None, MethodBody::Setter("x".into())))
                .method(MethodDef::getter("label", Type::String))
                .method(MethodDef::new(
                    "compute",
                    vec![Type::Integer, Type::Integer],
                    Some(Type::Integer),
                    MethodBody::Format("{0}{1}".into()),
                )),
        );
        let bindings = BindingSet::compile(&registry, "T", FieldFilter::all()).unwrap();
        assert!(bindings.is_empty());
    }

    #[test]
    fn synthesized_takes_precedence_over_with_serializer() {
        let registry = registry(
            RecordSchema::new("T")
                .serialized_from("Source")
                .field(FieldDef::new("label", Type::String))
                .setter("label", Type::String)
                .method(
                    MethodDef::new(
                        "setCombined",
                        vec![Type::String],
                        Some(Type::String),
                        MethodBody::Format("<{0}>".into()),
                    )
                    .with_serializer(WithSerializer::inferred())
                    .synthesized(Synthesized::new("label", ["label"])),
                ),
        );
        let bindings = BindingSet::compile(&registry, "T", FieldFilter::all()).unwrap();

        let Some(Binding::Synthetic { target_writer, .. }) = bindings.get("label") else {
            panic!("expected a synthetic binding for 'label'");
        };
        assert_eq!(target_writer.map(|w| w.name.as_str()), Some("setLabel"));
        assert!(bindings.get("combined").is_none());
    }

    #[test]
    fn inferred_serializer_must_be_a_record_type() {
        let error = compile_error(
            RecordSchema::new("T").serialized_from("Source").field(
                FieldDef::new("count", Type::Integer)
                    .public()
                    .with_serializer(WithSerializer::inferred()),
            ),
        );
        assert_eq!(error.kind(), ErrorKind::NotASerializer);
    }

    #[test]
    fn sub_serializer_errors_surface_at_compile_time() {
        let error = compile_error(
            RecordSchema::new("T").serialized_from("Source").field(
                FieldDef::new("child", Type::record("Source"))
                    .public()
                    .with_serializer(WithSerializer::inferred()),
            ),
        );
        assert_eq!(error.kind(), ErrorKind::NotASerializer);
        assert!(error.message().contains("'Source'"));
    }

    #[test]
    fn self_chaining_is_rejected() {
        let error = compile_error(
            RecordSchema::new("T").serialized_from("Source").field(
                FieldDef::new("child", Type::record("T"))
                    .public()
                    .with_serializer(WithSerializer::inferred()),
            ),
        );
        assert_eq!(error.kind(), ErrorKind::NotASerializer);
        assert!(error.message().contains("chains back"));
    }

    #[test]
    fn unknown_source_schema_is_rejected() {
        let error = compile_error(RecordSchema::new("T").serialized_from("Nowhere"));
        assert_eq!(error.kind(), ErrorKind::NotASerializer);
        assert!(error.message().contains("Nowhere"));
    }

    #[test]
    fn describe_nests_chained_plans() {
        let registry = registry(
            RecordSchema::new("T")
                .serialized_from("Source")
                .public_field("label", Type::String)
                .field(
                    FieldDef::new("child", Type::record("Leaf"))
                        .public()
                        .with_serializer(WithSerializer::of("Leaf").fields(["count"])),
                ),
        )
        .with(
            RecordSchema::new("Leaf")
                .serialized_from("Source")
                .public_field("count", Type::Integer),
        );
        let plan = BindingSet::compile(&registry, "T", FieldFilter::all())
            .unwrap()
            .describe();

        assert_eq!(plan.target, "T");
        assert_eq!(plan.source, "Source");
        assert_eq!(plan.bindings.len(), 2);
        let child = &plan.bindings[1];
        assert_eq!(child.kind, BindingKind::Chained);
        assert_eq!(child.readers, ["getChild"]);
        assert_eq!(child.writer, None);
        let nested = child.chained.as_deref().unwrap();
        assert_eq!(nested.target, "Leaf");
        assert_eq!(nested.default_filter, ["count"]);
    }
}
