//! Value validators attached to settings.
//!
//! A validator receives the already type-checked value and either returns it
//! (possibly transformed) or fails with a [`ConfigError::ValidationError`]. Settings
//! run their validators in declaration order, feeding each one the previous
//! one's output.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

/// Information about the field being validated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext<'a> {
    /// Name of the setting, if it has one.
    pub field: Option<&'a str>,
}

impl<'a> ValidationContext<'a> {
    /// Context for the named field.
    #[must_use]
    pub fn new(field: Option<&'a str>) -> Self {
        Self { field }
    }

    /// The field name, or `<?>` for anonymous settings (list items).
    #[must_use]
    pub fn field_name(&self) -> &'a str {
        self.field.unwrap_or("<?>")
    }

    /// Build a validation error for this field.
    #[must_use]
    pub fn fail(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::validation(self.field_name(), message)
    }
}

type ValidateFn = dyn Fn(&ValidationContext<'_>, Value) -> ConfigResult<Value> + Send + Sync;

/// A named validation function.
#[derive(Clone)]
pub struct Validator {
    name: String,
    func: Arc<ValidateFn>,
}

impl Validator {
    /// Wrap `func` as a validator called `name`.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&ValidationContext<'_>, Value) -> ConfigResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// The validator's name, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the validator.
    ///
    /// # Errors
    ///
    /// Returns whatever error the validation function produces.
    pub fn validate(&self, ctx: &ValidationContext<'_>, value: Value) -> ConfigResult<Value> {
        (self.func)(ctx, value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("name", &self.name).finish()
    }
}

/// The JSON type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// `null`
    Null,
    /// `true` / `false`
    Bool,
    /// A number stored as an integer.
    Int,
    /// A number stored as floating point.
    Float,
    /// A string.
    String,
    /// An array.
    List,
    /// An object.
    Dict,
}

impl ValueType {
    /// Classify `value`.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(n) if n.is_f64() => Self::Float,
            Value::Number(_) => Self::Int,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::List,
            Value::Object(_) => Self::Dict,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::List => "list",
            Self::Dict => "dict",
        })
    }
}

/// Accept only values whose JSON type is one of `types`.
#[must_use]
pub fn value_type(types: &[ValueType]) -> Validator {
    let types = types.to_vec();
    Validator::new("value_type", move |ctx, value| {
        if types.contains(&ValueType::of(&value)) {
            return Ok(value);
        }
        let expected = match types.as_slice() {
            [single] => single.to_string(),
            many => format!(
                "one of: {}",
                many.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        Err(ctx.fail(format!("the type of the value must be {expected}")))
    })
}

/// Accept only values equal to one of `options`.
pub fn one_of<I, V>(options: I) -> Validator
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let options: Vec<Value> = options.into_iter().map(Into::into).collect();
    Validator::new("one_of", move |ctx, value| {
        if options.contains(&value) {
            return Ok(value);
        }
        let expected = options
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(ctx.fail(format!("value {value} must be one of: {expected}")))
    })
}

/// Accept numbers within `min..=max`. Either bound may be omitted.
#[must_use]
pub fn range(min: Option<f64>, max: Option<f64>) -> Validator {
    Validator::new("range", move |ctx, value| {
        let Some(n) = value.as_f64() else {
            return Err(ctx.fail("value must be a number"));
        };
        if min.is_some_and(|lo| n < lo) || max.is_some_and(|hi| n > hi) {
            let lo = min.map_or_else(|| "-inf".to_owned(), |v| v.to_string());
            let hi = max.map_or_else(|| "inf".to_owned(), |v| v.to_string());
            return Err(ctx.fail(format!("value {n} is out of range [{lo}, {hi}]")));
        }
        Ok(value)
    })
}
