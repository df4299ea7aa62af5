//! Named combinator functions
//!
//! Schema documents cannot carry code, so methods declared there refer to
//! combinators by name. A [`CombinatorRegistry`] supplies those functions to
//! the [`SchemaLoader`](crate::SchemaLoader).

use serbind_ir::{Record, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{BoxError, MethodBody};

/// Type alias for combinator function
pub type CombinatorFn = Arc<dyn Fn(&[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// Registry of named combinator functions
#[derive(Clone, Default)]
pub struct CombinatorRegistry {
    functions: HashMap<String, CombinatorFn>,
}

impl CombinatorRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in combinators
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }

    /// Register a function
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        func: impl Fn(&[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.functions.insert(name.into(), Arc::new(func));
        self
    }

    /// Get a function by name
    #[must_use]
    pub fn get_function(&self, name: &str) -> Option<CombinatorFn> {
        self.functions.get(name).cloned()
    }

    /// Check if function exists
    #[must_use]
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered function names, sorted
    #[must_use]
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Call a function by name
    ///
    /// # Errors
    ///
    /// Returns an error if the function is missing or fails.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, BoxError> {
        let func = self.get_function(name).ok_or_else(|| -> BoxError {
            format!(
                "Combinator '{name}' not found, available combinators: {:?}",
                self.function_names()
            )
            .into()
        })?;
        func(args)
    }

    /// Method body invoking the named function, ignoring the receiver
    #[must_use]
    pub fn method_body(&self, name: &str) -> Option<MethodBody> {
        let func = self.get_function(name)?;
        Some(MethodBody::Native(Arc::new(
            move |_receiver: &Record, args: &[Value]| func(args),
        )))
    }
}

impl std::fmt::Debug for CombinatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinatorRegistry")
            .field("functions", &self.function_names())
            .finish()
    }
}

fn register_builtins(registry: &mut CombinatorRegistry) {
    registry
        .register_function("concat", |args| {
            Ok(Value::String(
                args.iter()
                    .map(|arg| arg.as_string().unwrap_or_default())
                    .collect(),
            ))
        })
        .register_function("join", |args| {
            let Some((separator, rest)) = args.split_first() else {
                return Err("join requires a separator argument".into());
            };
            let separator = separator
                .as_string()
                .ok_or("join separator must be a scalar")?;
            Ok(Value::String(
                rest.iter()
                    .map(|arg| arg.as_string().unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(&separator),
            ))
        })
        .register_function("upper", |args| {
            string_arg(args, "upper").map(|s| s.map_or(Value::Null, |s| Value::String(s.to_uppercase())))
        })
        .register_function("lower", |args| {
            string_arg(args, "lower").map(|s| s.map_or(Value::Null, |s| Value::String(s.to_lowercase())))
        })
        .register_function("add", |args| numeric_fold(args, "add", 0, 0.0, i64::checked_add, |a, b| a + b))
        .register_function("multiply", |args| {
            numeric_fold(args, "multiply", 1, 1.0, i64::checked_mul, |a, b| a * b)
        });
}

fn string_arg(args: &[Value], name: &str) -> Result<Option<String>, BoxError> {
    match args {
        [Value::Null] => Ok(None),
        [value] => value
            .as_string()
            .map(Some)
            .ok_or_else(|| format!("{name} requires a scalar argument").into()),
        _ => Err(format!("{name} requires 1 argument").into()),
    }
}

/// Folds integer arguments exactly; any decimal argument switches to decimal arithmetic.
fn numeric_fold(
    args: &[Value],
    name: &str,
    int_identity: i64,
    dec_identity: f64,
    int_op: fn(i64, i64) -> Option<i64>,
    dec_op: fn(f64, f64) -> f64,
) -> Result<Value, BoxError> {
    if args.is_empty() {
        return Err(format!("{name} requires at least 1 argument").into());
    }
    if args.iter().all(|arg| matches!(arg, Value::Integer(_))) {
        let mut acc = int_identity;
        for arg in args {
            if let Value::Integer(i) = arg {
                acc = int_op(acc, *i).ok_or_else(|| format!("{name} overflowed"))?;
            }
        }
        return Ok(Value::Integer(acc));
    }
    let mut acc = dec_identity;
    for (index, arg) in args.iter().enumerate() {
        acc = dec_op(acc, value_to_f64(arg, name, index)?);
    }
    Ok(Value::Decimal(acc))
}

fn value_to_f64(value: &Value, name: &str, index: usize) -> Result<f64, BoxError> {
    match value {
        #[allow(clippy::cast_precision_loss)]
        Value::Integer(i) => Ok(*i as f64),
        Value::Decimal(d) => Ok(*d),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| format!("Cannot parse argument {index} of {name} as number").into()),
        _ => Err(format!("Invalid argument {index} type for {name}").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = CombinatorRegistry::with_builtins();
        assert_eq!(
            registry.function_names(),
            vec!["add", "concat", "join", "lower", "multiply", "upper"]
        );
        assert!(CombinatorRegistry::new().function_names().is_empty());
    }

    #[test]
    fn string_builtins() {
        let registry = CombinatorRegistry::with_builtins();

        assert_eq!(
            registry
                .call("join", &[Value::from("-"), Value::from(1), Value::from("foo")])
                .unwrap(),
            Value::from("1-foo")
        );
        assert_eq!(
            registry.call("concat", &[Value::from("a"), Value::Null, Value::from(2)]).unwrap(),
            Value::from("a2")
        );
        assert_eq!(registry.call("upper", &[Value::from("abc")]).unwrap(), Value::from("ABC"));
        assert_eq!(registry.call("lower", &[Value::Null]).unwrap(), Value::Null);
        assert!(registry.call("upper", &[]).is_err());
        assert!(registry.call("join", &[]).is_err());
    }

    #[test]
    fn numeric_builtins_keep_integers_exact() {
        let registry = CombinatorRegistry::with_builtins();

        assert_eq!(
            registry.call("add", &[Value::from(5), Value::from(3)]).unwrap(),
            Value::Integer(8)
        );
        assert_eq!(
            registry.call("multiply", &[Value::from(2), Value::from(1.5)]).unwrap(),
            Value::Decimal(3.0)
        );
        assert!(registry.call("add", &[Value::from(i64::MAX), Value::from(1)]).is_err());
        assert!(registry.call("add", &[Value::from("x"), Value::from(1.0)]).is_err());
    }

    #[test]
    fn missing_combinator_lists_available_names() {
        let registry = CombinatorRegistry::with_builtins();
        let error = registry.call("nope", &[]).unwrap_err();
        assert!(error.to_string().contains("Combinator 'nope' not found"));
    }

    #[test]
    fn custom_function_becomes_method_body() {
        let mut registry = CombinatorRegistry::new();
        registry.register_function("double", |args| match args {
            [Value::Integer(i)] => Ok(Value::Integer(i * 2)),
            _ => Err("double requires 1 integer argument".into()),
        });

        let Some(MethodBody::Native(body)) = registry.method_body("double") else {
            panic!("expected a native body");
        };
        assert_eq!(body(&Record::new("T"), &[Value::from(21)]).unwrap(), Value::Integer(42));
        assert!(registry.method_body("missing").is_none());
    }
}
