//! Compiled binding descriptors
//!
//! A [`BindingSet`] is the compiled form of one target schema: which source
//! readers feed which target field, through which writer. It is immutable
//! after [`BindingSet::compile`] and can be shared across threads.

use indexmap::IndexMap;
use serbind_schema::{MethodDef, RecordSchema, SchemaProvider};
use serde::Serialize;
use std::fmt;

use crate::filter::FieldFilter;

/// How one target field is produced
#[derive(Debug, Clone)]
pub enum Binding<'s> {
    /// Copy the value returned by a source reader
    Direct {
        target_field: String,
        source_reader: &'s MethodDef,
        /// `None` stores into the public field directly
        target_writer: Option<&'s MethodDef>,
    },

    /// Run the reader's value through a nested binding set
    Chained {
        target_field: String,
        source_reader: &'s MethodDef,
        target_writer: Option<&'s MethodDef>,
        sub_bindings: Box<BindingSet<'s>>,
    },

    /// Combine several source values with a combinator of the target
    Synthetic {
        target_field: String,
        combinator: &'s MethodDef,
        source_readers: Vec<&'s MethodDef>,
        /// `None` when the target has no `set<Field>` of the field's type
        target_writer: Option<&'s MethodDef>,
    },
}

impl<'s> Binding<'s> {
    pub fn target_field(&self) -> &str {
        match self {
            Binding::Direct { target_field, .. }
            | Binding::Chained { target_field, .. }
            | Binding::Synthetic { target_field, .. } => target_field,
        }
    }

    pub fn kind(&self) -> BindingKind {
        match self {
            Binding::Direct { .. } => BindingKind::Direct,
            Binding::Chained { .. } => BindingKind::Chained,
            Binding::Synthetic { .. } => BindingKind::Synthetic,
        }
    }

    pub fn target_writer(&self) -> Option<&'s MethodDef> {
        match self {
            Binding::Direct { target_writer, .. }
            | Binding::Chained { target_writer, .. }
            | Binding::Synthetic { target_writer, .. } => *target_writer,
        }
    }

    /// Nested binding set of a chained binding
    pub fn sub_bindings(&self) -> Option<&BindingSet<'s>> {
        match self {
            Binding::Chained { sub_bindings, .. } => Some(&**sub_bindings),
            _ => None,
        }
    }

    fn step(&self) -> BindingStep {
        let (readers, combinator, chained) = match self {
            Binding::Direct { source_reader, .. } => (vec![source_reader.name.clone()], None, None),
            Binding::Chained {
                source_reader,
                sub_bindings,
                ..
            } => (
                vec![source_reader.name.clone()],
                None,
                Some(Box::new(sub_bindings.describe())),
            ),
            Binding::Synthetic {
                combinator,
                source_readers,
                ..
            } => (
                source_readers.iter().map(|r| r.name.clone()).collect(),
                Some(combinator.name.clone()),
                None,
            ),
        };

        BindingStep {
            field: self.target_field().to_string(),
            kind: self.kind(),
            readers,
            combinator,
            writer: self.target_writer().map(|w| w.name.clone()),
            chained,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    Direct,
    Chained,
    Synthetic,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindingKind::Direct => "direct",
            BindingKind::Chained => "chained",
            BindingKind::Synthetic => "synthetic",
        })
    }
}

/// Owned, serialisable description of a compiled binding set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingPlan {
    pub target: String,
    pub source: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub default_filter: Vec<String>,
    pub bindings: Vec<BindingStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingStep {
    pub field: String,
    pub kind: BindingKind,
    /// Source readers in argument order
    pub readers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combinator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chained: Option<Box<BindingPlan>>,
}

/// Compiled bindings of one target schema
#[derive(Clone)]
pub struct BindingSet<'s> {
    pub(crate) provider: &'s dyn SchemaProvider,
    pub(crate) target: &'s RecordSchema,
    pub(crate) source: &'s str,
    pub(crate) default_filter: FieldFilter,
    pub(crate) bindings: IndexMap<String, Binding<'s>>,
}

impl<'s> BindingSet<'s> {
    /// Target schema
    pub fn target(&self) -> &'s RecordSchema {
        self.target
    }

    /// Name of the source schema the target is serialized from
    pub fn source(&self) -> &'s str {
        self.source
    }

    /// Filter applied when a call passes an empty one
    pub fn default_filter(&self) -> &FieldFilter {
        &self.default_filter
    }

    /// Target field names in binding order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding<'s>> {
        self.bindings.values()
    }

    pub fn get(&self, field: &str) -> Option<&Binding<'s>> {
        self.bindings.get(field)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn describe(&self) -> BindingPlan {
        BindingPlan {
            target: self.target.name.clone(),
            source: self.source.to_string(),
            default_filter: self.default_filter.fields().to_vec(),
            bindings: self.bindings.values().map(Binding::step).collect(),
        }
    }
}

impl PartialEq for BindingSet<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.describe() == other.describe()
    }
}

impl fmt::Debug for BindingSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingSet")
            .field("target", &self.target.name)
            .field("source", &self.source)
            .field("default_filter", &self.default_filter)
            .field("bindings", &self.bindings)
            .finish()
    }
}
