//! Schema document loader
//!
//! Schemas can be described in YAML or JSON documents:
//!
//! ```yaml
//! schemas:
//!   - name: Source
//!     properties:
//!       id: integer
//!       name: string
//!   - name: Target
//!     serialized_from: Source
//!     fields:
//!       - { name: id, type: integer, public: true }
//!       - { name: combined, type: string, public: true }
//!     methods:
//!       - name: makeCombined
//!         params: [integer, string]
//!         returns: string
//!         format: "{0}-{1}"
//!         synthesized: { target: combined, from: [id, name] }
//! ```
//!
//! `properties` expand to a private field plus its `get<Field>` reader.
//! Method bodies are one of `getter`, `setter`, `format`, or `native`; native
//! bodies name a function in the loader's [`CombinatorRegistry`].

use indexmap::IndexMap;
use serbind_ir::Type;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use crate::combinators::CombinatorRegistry;
use crate::model::{
    Constructor, FieldDef, MethodBody, MethodDef, RecordSchema, Synthesized, WithSerializer,
};
use crate::naming::is_writer_name;
use crate::registry::SchemaRegistry;
use crate::{Error, Result};

/// Serializable document format for loading from files
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDocument {
    #[serde(default)]
    schemas: Vec<SchemaFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    name: String,
    #[serde(default)]
    serialized_from: Option<String>,
    #[serde(default)]
    constructor: ConstructorFile,
    #[serde(default)]
    properties: IndexMap<String, Type>,
    #[serde(default)]
    fields: Vec<FieldFile>,
    #[serde(default)]
    methods: Vec<MethodFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ConstructorFile {
    #[default]
    Default,
    Private,
    RequiresArgs(usize),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldFile {
    name: String,
    #[serde(rename = "type")]
    ty: Type,
    #[serde(default)]
    public: bool,
    #[serde(default)]
    transient: bool,
    #[serde(default)]
    from_field: Option<String>,
    #[serde(default)]
    with_serializer: Option<WithSerializer>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MethodFile {
    name: String,
    #[serde(default)]
    params: Vec<Type>,
    #[serde(default)]
    returns: Option<Type>,
    #[serde(default)]
    getter: Option<String>,
    #[serde(default)]
    setter: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    native: Option<String>,
    #[serde(default)]
    from_field: Option<String>,
    #[serde(default)]
    with_serializer: Option<WithSerializer>,
    #[serde(default)]
    synthesized: Option<Synthesized>,
}

/// Loads record schemas from YAML or JSON documents
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    combinators: CombinatorRegistry,
    schema_paths: Vec<PathBuf>,
}

impl SchemaLoader {
    /// Create a loader with the built-in combinators and the given search paths
    pub fn new(schema_paths: Vec<PathBuf>) -> Self {
        Self::with_combinators(CombinatorRegistry::with_builtins(), schema_paths)
    }

    /// Create a loader resolving native bodies through a custom registry
    pub fn with_combinators(combinators: CombinatorRegistry, schema_paths: Vec<PathBuf>) -> Self {
        Self {
            combinators,
            schema_paths,
        }
    }

    pub fn combinators(&self) -> &CombinatorRegistry {
        &self.combinators
    }

    pub fn schema_paths(&self) -> &[PathBuf] {
        &self.schema_paths
    }

    /// Load every schema document found on the search paths into a registry.
    ///
    /// Paths naming files are loaded directly; directories contribute their
    /// `.yaml`, `.yml` and `.json` files in file-name order.
    ///
    /// # Errors
    ///
    /// Returns an error if a path cannot be read or a document is invalid.
    pub fn load_registry(&self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        for path in &self.schema_paths {
            for file in schema_files(path)? {
                registry.extend(self.load_from_file(&file)?);
            }
        }
        info!(
            schemas = registry.len(),
            paths = self.schema_paths.len(),
            "Loaded schema registry"
        );
        Ok(registry)
    }

    /// Load schemas from a specific file path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid document.
    pub fn load_from_file(&self, path: &Path) -> Result<Vec<RecordSchema>> {
        trace!("Loading schemas from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;

        if is_yaml(path) {
            self.load_from_yaml(&content)
        } else {
            self.load_from_json(&content)
        }
    }

    /// Load schemas from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or names an unknown combinator.
    pub fn load_from_json(&self, json: &str) -> Result<Vec<RecordSchema>> {
        let document: SchemaDocument = serde_json::from_str(json)
            .map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))?;
        self.convert_document(document)
    }

    /// Load schemas from a YAML string
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or names an unknown combinator.
    pub fn load_from_yaml(&self, yaml: &str) -> Result<Vec<RecordSchema>> {
        let document: SchemaDocument = serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidFormat(format!("YAML parse error: {e}")))?;
        self.convert_document(document)
    }

    fn convert_document(&self, document: SchemaDocument) -> Result<Vec<RecordSchema>> {
        let schemas = document
            .schemas
            .into_iter()
            .map(|file| self.convert_schema_file(file))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = schemas.len(), "Converted schema document");
        Ok(schemas)
    }

    fn convert_schema_file(&self, file: SchemaFile) -> Result<RecordSchema> {
        let mut schema = RecordSchema::new(file.name).constructor(match file.constructor {
            ConstructorFile::Default => Constructor::Default,
            ConstructorFile::Private => Constructor::Private,
            ConstructorFile::RequiresArgs(arity) => Constructor::RequiresArgs(arity),
        });
        schema.serialized_from = file.serialized_from;

        for (name, ty) in file.properties {
            schema = schema.property(&name, ty);
        }

        for field in file.fields {
            let mut def = FieldDef::new(field.name, field.ty);
            def.public = field.public;
            def.transient = field.transient;
            def.from_field = field.from_field;
            def.with_serializer = field.with_serializer;
            schema = schema.field(def);
        }

        for method in file.methods {
            let body = self.method_body(&schema.name, &method)?;
            let mut def = MethodDef::new(method.name, method.params, method.returns, body);
            def.from_field = method.from_field;
            def.with_serializer = method.with_serializer;
            def.synthesized = method.synthesized;
            schema = schema.method(def);
        }

        Ok(schema)
    }

    fn method_body(&self, schema: &str, method: &MethodFile) -> Result<MethodBody> {
        let bodies = [
            method.getter.clone().map(MethodBody::Getter),
            method.setter.clone().map(MethodBody::Setter),
            method.format.clone().map(MethodBody::Format),
            method
                .native
                .as_deref()
                .map(|name| {
                    self.combinators
                        .method_body(name)
                        .ok_or_else(|| Error::UnknownCombinator {
                            schema: schema.to_string(),
                            method: method.name.clone(),
                            combinator: name.to_string(),
                        })
                })
                .transpose()?,
        ];

        let mut declared = bodies.into_iter().flatten();
        let body = match (declared.next(), declared.next()) {
            (Some(body), None) => body,
            _ => {
                return Err(Error::InvalidFormat(format!(
                    "Method '{}' of schema '{}' must declare exactly one of getter, setter, format, native",
                    method.name, schema
                )));
            }
        };

        match &body {
            MethodBody::Format(_)
                if !matches!(method.returns, Some(Type::String | Type::Any)) =>
            {
                Err(Error::InvalidFormat(format!(
                    "Method '{}' of schema '{}' has a format body and must return string",
                    method.name, schema
                )))
            }
            MethodBody::Native(_)
                if is_writer_name(&method.name)
                    && method.params.len() == 1
                    && method.synthesized.is_none() =>
            {
                Err(Error::InvalidFormat(format!(
                    "Writer '{}' of schema '{}' cannot assign through a native body; use setter",
                    method.name, schema
                )))
            }
            _ => Ok(body),
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e == "yaml" || e == "yml")
}

fn is_schema_document(path: &Path) -> bool {
    is_yaml(path) || path.extension().is_some_and(|e| e == "json")
}

fn schema_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "Schema path {} does not exist",
                path.display()
            )));
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_file() && is_schema_document(&entry_path) {
            files.push(entry_path);
        }
    }
    files.sort();
    trace!("Found schema files in {:?}: {:?}", path, files);
    Ok(files)
}
