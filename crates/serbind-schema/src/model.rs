//! Schema model definitions
//!
//! A [`RecordSchema`] describes one record type: its declared fields, its
//! declared methods (accessors and combinators), how instances are
//! constructed, and the binding annotations attached to each element.

use serbind_ir::{Record, Type, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::naming::{field_to_reader, field_to_writer};

/// Boxed error returned by user-supplied method bodies and constructors
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// User-supplied method body: receives the receiver instance and the arguments
pub type NativeFn = Arc<dyn Fn(&Record, &[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// User-supplied writer body: assigns the arguments into the receiver
pub type MutatorFn = Arc<dyn Fn(&mut Record, &[Value]) -> Result<(), BoxError> + Send + Sync>;

/// User-supplied zero-argument constructor
pub type ConstructorFn = Arc<dyn Fn() -> Result<Record, BoxError> + Send + Sync>;

/// Failure raised while constructing an instance or invoking an accessor
#[derive(thiserror::Error, Debug)]
pub enum InvokeError {
    #[error("Unknown schema '{0}'")]
    UnknownSchema(String),

    #[error("Constructor of '{schema}' is not accessible")]
    InaccessibleConstructor { schema: String },

    #[error("'{schema}' has no zero-argument constructor (constructor takes {arity} argument(s))")]
    NoDefaultConstructor { schema: String, arity: usize },

    #[error("Constructor of '{schema}' failed: {source}")]
    ConstructorFailed {
        schema: String,
        #[source]
        source: BoxError,
    },

    #[error("No field '{field}' on object of type '{schema}'")]
    NoSuchField { schema: String, field: String },

    #[error("Field '{field}' on object of type '{schema}' is not publicly writable")]
    FieldNotAccessible { schema: String, field: String },

    #[error("Illegal value of type '{found}' for field '{field}' of type '{expected}' on '{schema}'")]
    FieldType {
        schema: String,
        field: String,
        expected: String,
        found: String,
    },

    #[error("'{accessor}' expects {expected} argument(s) but was given {actual}")]
    ArgumentCount {
        accessor: String,
        expected: usize,
        actual: usize,
    },

    #[error("Illegal argument {index} of type '{found}' for '{accessor}': expected '{expected}'")]
    ArgumentType {
        accessor: String,
        index: usize,
        expected: String,
        found: String,
    },

    #[error("'{accessor}' cannot be invoked on a read-only receiver")]
    ReadOnlyReceiver { accessor: String },

    #[error("'{accessor}' does not assign into its receiver")]
    NotAWriter { accessor: String },

    #[error("Invocation of '{accessor}' failed: {source}")]
    Failed {
        accessor: String,
        #[source]
        source: BoxError,
    },
}

/// Marks a field or writer as chained through another record schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithSerializer {
    /// Schema to compile the nested bindings for; inferred from the declared type when absent
    #[serde(default)]
    pub serializer: Option<String>,

    /// Fields to include from the nested schema; empty includes all
    #[serde(default)]
    pub fields: Vec<String>,
}

impl WithSerializer {
    /// Chain through the schema named by the declared type
    pub fn inferred() -> Self {
        Self::default()
    }

    /// Chain through an explicitly named schema
    pub fn of(serializer: impl Into<String>) -> Self {
        Self {
            serializer: Some(serializer.into()),
            fields: Vec::new(),
        }
    }

    /// Restrict the nested bindings to the given fields
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Marks a method as a combinator computing `target` from source fields `from`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesized {
    /// Target field receiving the combinator's result
    pub target: String,

    /// Source fields whose values are passed as arguments, in order
    #[serde(default)]
    pub from: Vec<String>,
}

impl Synthesized {
    pub fn new<I, S>(target: impl Into<String>, from: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target: target.into(),
            from: from.into_iter().map(Into::into).collect(),
        }
    }
}

/// A declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    /// Publicly writable by direct store
    pub public: bool,
    /// Excluded from bindings
    pub transient: bool,
    pub from_field: Option<String>,
    pub with_serializer: Option<WithSerializer>,
}

impl FieldDef {
    /// Create a private, non-transient field
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            public: false,
            transient: false,
            from_field: None,
            with_serializer: None,
        }
    }

    #[must_use]
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    #[must_use]
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    #[must_use]
    pub fn from_field(mut self, source: impl Into<String>) -> Self {
        self.from_field = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_serializer(mut self, annotation: WithSerializer) -> Self {
        self.with_serializer = Some(annotation);
        self
    }
}

/// How a method computes its result
#[derive(Clone)]
pub enum MethodBody {
    /// Return the value of a field of the receiver
    Getter(String),

    /// Store the single argument into a field of the receiver
    Setter(String),

    /// Substitute the arguments' string forms into `{0}`, `{1}`, ... placeholders
    Format(String),

    /// Arbitrary user code
    Native(NativeFn),

    /// Arbitrary user code assigning into the receiver
    Mutator(MutatorFn),
}

impl MethodBody {
    /// Whether invoking the body can assign into the receiver
    pub fn writes_receiver(&self) -> bool {
        matches!(self, MethodBody::Setter(_) | MethodBody::Mutator(_))
    }
}

impl fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodBody::Getter(field) => f.debug_tuple("Getter").field(field).finish(),
            MethodBody::Setter(field) => f.debug_tuple("Setter").field(field).finish(),
            MethodBody::Format(template) => f.debug_tuple("Format").field(template).finish(),
            MethodBody::Native(_) => f.write_str("Native(..)"),
            MethodBody::Mutator(_) => f.write_str("Mutator(..)"),
        }
    }
}

/// A declared method
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<Type>,
    /// `None` for methods returning nothing
    pub returns: Option<Type>,
    pub body: MethodBody,
    pub from_field: Option<String>,
    pub with_serializer: Option<WithSerializer>,
    pub synthesized: Option<Synthesized>,
}

impl MethodDef {
    pub fn new(
        name: impl Into<String>,
        params: Vec<Type>,
        returns: Option<Type>,
        body: MethodBody,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            returns,
            body,
            from_field: None,
            with_serializer: None,
            synthesized: None,
        }
    }

    /// Conventional reader `get<Field>()` returning the field's value
    pub fn getter(field: &str, ty: Type) -> Self {
        Self::new(
            field_to_reader(field),
            Vec::new(),
            Some(ty),
            MethodBody::Getter(field.to_string()),
        )
    }

    /// Conventional writer `set<Field>(value)` storing into the field
    pub fn setter(field: &str, ty: Type) -> Self {
        Self::new(
            field_to_writer(field),
            vec![ty],
            None,
            MethodBody::Setter(field.to_string()),
        )
    }

    /// Method backed by a closure
    pub fn native<F>(name: impl Into<String>, params: Vec<Type>, returns: Type, body: F) -> Self
    where
        F: Fn(&Record, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self::new(name, params, Some(returns), MethodBody::Native(Arc::new(body)))
    }

    /// Writer backed by a closure that assigns into the receiver
    pub fn mutator<F>(name: impl Into<String>, params: Vec<Type>, body: F) -> Self
    where
        F: Fn(&mut Record, &[Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::new(name, params, None, MethodBody::Mutator(Arc::new(body)))
    }

    #[must_use]
    pub fn from_field(mut self, source: impl Into<String>) -> Self {
        self.from_field = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_serializer(mut self, annotation: WithSerializer) -> Self {
        self.with_serializer = Some(annotation);
        self
    }

    #[must_use]
    pub fn synthesized(mut self, annotation: Synthesized) -> Self {
        self.synthesized = Some(annotation);
        self
    }

    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Invoke on a shared receiver. Writers need [`MethodDef::call_mut`].
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments do not match the declared parameters,
    /// the body addresses a missing field, or user code fails.
    pub fn call(&self, receiver: &Record, args: &[Value]) -> Result<Value, InvokeError> {
        self.check_args(args)?;
        match &self.body {
            MethodBody::Getter(field) => {
                receiver
                    .get(field)
                    .cloned()
                    .ok_or_else(|| InvokeError::NoSuchField {
                        schema: receiver.schema.clone(),
                        field: field.clone(),
                    })
            }
            MethodBody::Format(template) => Ok(Value::String(render_template(template, args))),
            MethodBody::Native(body) => {
                body(receiver, args).map_err(|source| InvokeError::Failed {
                    accessor: self.name.clone(),
                    source,
                })
            }
            MethodBody::Setter(_) | MethodBody::Mutator(_) => Err(InvokeError::ReadOnlyReceiver {
                accessor: self.name.clone(),
            }),
        }
    }

    /// Invoke as a writer, assigning the arguments into `receiver`
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot assign into its receiver, the
    /// arguments do not match the declared parameters, the setter's field is
    /// missing, or user code fails.
    pub fn call_mut(&self, receiver: &mut Record, args: &[Value]) -> Result<(), InvokeError> {
        match &self.body {
            MethodBody::Setter(field) => {
                self.check_args(args)?;
                if !receiver.has_field(field) {
                    return Err(InvokeError::NoSuchField {
                        schema: receiver.schema.clone(),
                        field: field.clone(),
                    });
                }
                if let Some(value) = args.first() {
                    receiver.set(field.clone(), value.clone());
                }
                Ok(())
            }
            MethodBody::Mutator(body) => {
                self.check_args(args)?;
                body(receiver, args).map_err(|source| InvokeError::Failed {
                    accessor: self.name.clone(),
                    source,
                })
            }
            MethodBody::Getter(_) | MethodBody::Format(_) | MethodBody::Native(_) => {
                Err(InvokeError::NotAWriter {
                    accessor: self.name.clone(),
                })
            }
        }
    }

    fn check_args(&self, args: &[Value]) -> Result<(), InvokeError> {
        if args.len() != self.params.len() {
            return Err(InvokeError::ArgumentCount {
                accessor: self.name.clone(),
                expected: self.params.len(),
                actual: args.len(),
            });
        }
        for (index, (param, arg)) in self.params.iter().zip(args).enumerate() {
            if !param.accepts(arg) {
                return Err(InvokeError::ArgumentType {
                    accessor: self.name.clone(),
                    index,
                    expected: param.to_string(),
                    found: arg.kind_name(),
                });
            }
        }
        Ok(())
    }
}

/// Single left-to-right pass, so placeholders inside argument values stay literal
fn render_template(template: &str, args: &[Value]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let tail = &rest[open..];
        let placeholder = tail[1..].find('}').and_then(|close| {
            let index = tail[1..=close].parse::<usize>().ok()?;
            Some((args.get(index)?, close + 2))
        });
        match placeholder {
            Some((arg, consumed)) => {
                rendered.push_str(&arg.as_string().unwrap_or_default());
                rest = &tail[consumed..];
            }
            None => {
                rendered.push('{');
                rest = &tail[1..];
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

/// How instances of a schema are created
#[derive(Clone, Default)]
pub enum Constructor {
    /// Zero-argument constructor leaving every field absent
    #[default]
    Default,

    /// Constructor exists but is not accessible
    Private,

    /// Only a constructor taking this many arguments exists
    RequiresArgs(usize),

    /// User code producing the instance
    Native(ConstructorFn),
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constructor::Default => f.write_str("Default"),
            Constructor::Private => f.write_str("Private"),
            Constructor::RequiresArgs(arity) => f.debug_tuple("RequiresArgs").field(arity).finish(),
            Constructor::Native(_) => f.write_str("Native(..)"),
        }
    }
}

/// A complete record type description
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub name: String,
    /// Source schema this schema is mapped from
    pub serialized_from: Option<String>,
    pub constructor: Constructor,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
}

impl RecordSchema {
    /// Create an empty schema with a default constructor
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            serialized_from: None,
            constructor: Constructor::Default,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn serialized_from(mut self, source: impl Into<String>) -> Self {
        self.serialized_from = Some(source.into());
        self
    }

    #[must_use]
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = constructor;
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a publicly writable field
    #[must_use]
    pub fn public_field(self, name: &str, ty: Type) -> Self {
        self.field(FieldDef::new(name, ty).public())
    }

    /// Add a private field together with its conventional reader
    #[must_use]
    pub fn property(self, name: &str, ty: Type) -> Self {
        self.field(FieldDef::new(name, ty.clone()))
            .method(MethodDef::getter(name, ty))
    }

    #[must_use]
    pub fn method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// Add the conventional writer for an existing field
    #[must_use]
    pub fn setter(self, field: &str, ty: Type) -> Self {
        self.method(MethodDef::setter(field, ty))
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Find a method by name and exact parameter types
    pub fn find_method(&self, name: &str, params: &[Type]) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.params == params)
    }

    /// Create a fresh instance through the declared constructor
    ///
    /// # Errors
    ///
    /// Returns an error if the constructor is inaccessible, needs arguments, or fails.
    pub fn instantiate(&self) -> Result<Record, InvokeError> {
        match &self.constructor {
            Constructor::Default => Ok(self.blank_record()),
            Constructor::Private => Err(InvokeError::InaccessibleConstructor {
                schema: self.name.clone(),
            }),
            Constructor::RequiresArgs(arity) => Err(InvokeError::NoDefaultConstructor {
                schema: self.name.clone(),
                arity: *arity,
            }),
            Constructor::Native(build) => {
                build().map_err(|source| InvokeError::ConstructorFailed {
                    schema: self.name.clone(),
                    source,
                })
            }
        }
    }

    /// Instance with every declared field present and absent
    pub fn blank_record(&self) -> Record {
        self.fields
            .iter()
            .fold(Record::new(self.name.clone()), |record, field| {
                record.with_field(field.name.clone(), Value::Null)
            })
    }

    /// Store a value directly into a publicly writable field
    ///
    /// # Errors
    ///
    /// Returns an error if the field is missing, not public, or the value
    /// does not fit its declared type.
    pub fn store(&self, record: &mut Record, field: &str, value: Value) -> Result<(), InvokeError> {
        let def = self.find_field(field).ok_or_else(|| InvokeError::NoSuchField {
            schema: self.name.clone(),
            field: field.to_string(),
        })?;
        if !def.public {
            return Err(InvokeError::FieldNotAccessible {
                schema: self.name.clone(),
                field: field.to_string(),
            });
        }
        if !def.ty.accepts(&value) {
            return Err(InvokeError::FieldType {
                schema: self.name.clone(),
                field: field.to_string(),
                expected: def.ty.to_string(),
                found: value.kind_name(),
            });
        }
        record.set(field.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_schema() -> RecordSchema {
        RecordSchema::new("Source")
            .property("id", Type::Integer)
            .property("name", Type::String)
    }

    #[test]
    fn property_adds_private_field_and_reader() {
        let schema = source_schema();

        let field = schema.find_field("id").unwrap();
        assert!(!field.public);
        let getter = schema.find_method("getId", &[]).unwrap();
        assert_eq!(getter.returns, Some(Type::Integer));
        assert!(schema.find_method("getId", &[Type::Integer]).is_none());
    }

    #[test]
    fn getter_reads_receiver_field() {
        let schema = source_schema();
        let record = Record::new("Source").with_field("id", 7).with_field("name", "n");

        let getter = schema.find_method("getName", &[]).unwrap();
        assert_eq!(getter.call(&record, &[]).unwrap(), Value::from("n"));
    }

    #[test]
    fn setter_requires_mutable_receiver_and_matching_argument() {
        let schema = RecordSchema::new("Target")
            .field(FieldDef::new("name", Type::String))
            .setter("name", Type::String);
        let setter = schema.find_method("setName", &[Type::String]).unwrap();
        let mut record = schema.blank_record();

        assert!(matches!(
            setter.call(&record, &[Value::from("x")]),
            Err(InvokeError::ReadOnlyReceiver { .. })
        ));
        assert!(matches!(
            setter.call_mut(&mut record, &[Value::from(1)]),
            Err(InvokeError::ArgumentType { index: 0, .. })
        ));
        setter.call_mut(&mut record, &[Value::from("x")]).unwrap();
        assert_eq!(record.get("name"), Some(&Value::from("x")));
    }

    #[test]
    fn format_body_substitutes_positional_arguments() {
        let method = MethodDef::new(
            "makeCombined",
            vec![Type::Integer, Type::String],
            Some(Type::String),
            MethodBody::Format("{0}-{1}".to_string()),
        );
        let receiver = Record::new("Target");

        let result = method
            .call(&receiver, &[Value::from(1), Value::from("foo")])
            .unwrap();
        assert_eq!(result, Value::from("1-foo"));
        assert!(matches!(
            method.call(&receiver, &[Value::from(1)]),
            Err(InvokeError::ArgumentCount { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn format_body_keeps_placeholders_inside_arguments() {
        let method = MethodDef::new(
            "label",
            vec![Type::String, Type::Integer],
            Some(Type::String),
            MethodBody::Format("{0}:{1} {2} {x}".to_string()),
        );

        let result = method
            .call(&Record::new("Target"), &[Value::from("{1}"), Value::from(5)])
            .unwrap();
        assert_eq!(result, Value::from("{1}:5 {2} {x}"));
    }

    #[test]
    fn mutator_assigns_into_receiver() {
        let writer = MethodDef::mutator("setName", vec![Type::String], |record, args| {
            let name = args[0].as_string().unwrap_or_default().to_uppercase();
            record.set("name", Value::from(name));
            Ok(())
        });
        let mut record = Record::new("Target").with_field("name", Value::Null);

        assert!(writer.body.writes_receiver());
        assert!(matches!(
            writer.call(&record, &[Value::from("x")]),
            Err(InvokeError::ReadOnlyReceiver { .. })
        ));
        writer.call_mut(&mut record, &[Value::from("foo")]).unwrap();
        assert_eq!(record.get("name"), Some(&Value::from("FOO")));
    }

    #[test]
    fn read_only_bodies_refuse_to_write() {
        let echo = MethodDef::native("setName", vec![Type::String], Type::String, |_, args| {
            Ok(args[0].clone())
        });
        let mut record = Record::new("Target").with_field("name", Value::Null);

        assert!(!echo.body.writes_receiver());
        assert!(matches!(
            echo.call_mut(&mut record, &[Value::from("foo")]),
            Err(InvokeError::NotAWriter { .. })
        ));
        assert_eq!(record.get("name"), Some(&Value::Null));
    }

    #[test]
    fn native_failures_keep_their_cause() {
        let method = MethodDef::native("explode", vec![], Type::String, |_, _| {
            Err("boom".into())
        });

        let error = method.call(&Record::new("T"), &[]).unwrap_err();
        assert!(matches!(error, InvokeError::Failed { .. }));
        assert_eq!(
            std::error::Error::source(&error).map(ToString::to_string),
            Some("boom".to_string())
        );
    }

    #[test]
    fn constructors_report_why_they_fail() {
        let private = RecordSchema::new("P").constructor(Constructor::Private);
        let needs_args = RecordSchema::new("A").constructor(Constructor::RequiresArgs(1));
        let throws = RecordSchema::new("E")
            .constructor(Constructor::Native(Arc::new(|| -> Result<Record, BoxError> {
                Err("ctor failed".into())
            })));

        assert!(matches!(
            private.instantiate(),
            Err(InvokeError::InaccessibleConstructor { .. })
        ));
        assert!(matches!(
            needs_args.instantiate(),
            Err(InvokeError::NoDefaultConstructor { arity: 1, .. })
        ));
        assert!(matches!(
            throws.instantiate(),
            Err(InvokeError::ConstructorFailed { .. })
        ));
    }

    #[test]
    fn default_constructor_leaves_fields_absent() {
        let schema = RecordSchema::new("Sub")
            .public_field("extra", Type::String)
            .public_field("required", Type::String);

        let record = schema.instantiate().unwrap();
        assert_eq!(record.field_names().collect::<Vec<_>>(), vec!["extra", "required"]);
        assert!(record.get("extra").unwrap().is_null());
    }

    #[test]
    fn store_checks_visibility_and_type() {
        let schema = RecordSchema::new("T")
            .public_field("id", Type::Integer)
            .field(FieldDef::new("secret", Type::String));
        let mut record = schema.blank_record();

        schema.store(&mut record, "id", Value::from(3)).unwrap();
        assert_eq!(record.get("id"), Some(&Value::Integer(3)));
        assert!(matches!(
            schema.store(&mut record, "secret", Value::from("s")),
            Err(InvokeError::FieldNotAccessible { .. })
        ));
        assert!(matches!(
            schema.store(&mut record, "id", Value::from("3")),
            Err(InvokeError::FieldType { .. })
        ));
        assert!(matches!(
            schema.store(&mut record, "missing", Value::Null),
            Err(InvokeError::NoSuchField { .. })
        ));
    }
}
