//! Declared types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::value::Value;

/// Declared type of a field, accessor parameter, or accessor return value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Type {
    /// Accepts any value
    Any,
    Boolean,
    Integer,
    Decimal,
    String,
    List,
    Map,
    /// A named record type
    Record(String),
}

impl Type {
    /// Shorthand for a record type
    pub fn record(name: impl Into<String>) -> Self {
        Type::Record(name.into())
    }

    /// Name of the record type, if this is one
    pub fn record_name(&self) -> Option<&str> {
        match self {
            Type::Record(name) => Some(name),
            _ => None,
        }
    }

    /// Whether a value declared as `from` may be stored where `self` is declared.
    ///
    /// Identical types are assignable, `any` accepts everything, and integers
    /// widen to decimals.
    pub fn is_assignable_from(&self, from: &Type) -> bool {
        match (self, from) {
            (to, from) if to == from => true,
            (Type::Any, _) => true,
            (Type::Decimal, Type::Integer) => true,
            _ => false,
        }
    }

    /// Whether a runtime value can be stored in a slot of this type.
    ///
    /// Absent values are accepted by every type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (Type::Any, _) => true,
            (Type::Boolean, Value::Boolean(_))
            | (Type::Integer, Value::Integer(_))
            | (Type::Decimal, Value::Decimal(_) | Value::Integer(_))
            | (Type::String, Value::String(_))
            | (Type::List, Value::List(_))
            | (Type::Map, Value::Map(_)) => true,
            (Type::Record(name), Value::Record(record)) => record.schema == *name,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "any"),
            Type::Boolean => write!(f, "boolean"),
            Type::Integer => write!(f, "integer"),
            Type::Decimal => write!(f, "decimal"),
            Type::String => write!(f, "string"),
            Type::List => write!(f, "list"),
            Type::Map => write!(f, "map"),
            Type::Record(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for Type {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let ty = match s.trim() {
            "any" => Type::Any,
            "bool" | "boolean" => Type::Boolean,
            "int" | "integer" => Type::Integer,
            "decimal" | "float" => Type::Decimal,
            "string" => Type::String,
            "list" => Type::List,
            "map" => Type::Map,
            name if is_record_name(name) => Type::Record(name.to_string()),
            other => return Err(crate::Error::UnknownType(other.to_string())),
        };
        Ok(ty)
    }
}

fn is_record_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic())
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

impl TryFrom<String> for Type {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        value.parse()
    }
}

impl From<Type> for String {
    fn from(value: Type) -> Self {
        value.to_string()
    }
}
