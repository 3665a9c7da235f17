//! Field specifications: type, default, missing/null policy and validators.

use std::sync::Arc;

use serde_json::{Number, Value};

use crate::config::DictConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::schema::ConfigSchema;
use crate::slot::Slot;
use crate::spec::ConfigSpec;
use crate::validation::{ValidationContext, Validator};

/// What to do when a value is missing, null or (for lists) empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingAction {
    /// Fail validation.
    Error,
    /// Substitute the setting's default. Fails if there is none.
    #[default]
    UseDefault,
    /// Pass the value through unchanged.
    Leave,
}

/// The type a setting accepts.
#[derive(Debug, Clone)]
pub enum SettingKind {
    /// Any value.
    Any,
    /// A JSON string.
    String,
    /// A JSON boolean.
    Bool,
    /// A JSON integer.
    Int,
    /// A JSON floating point number. Integers are not widened.
    Float,
    /// A JSON array, optionally with a setting every element must satisfy.
    List(Option<Box<Setting>>),
    /// A JSON object, optionally validated against a nested spec.
    Dict(Option<Arc<ConfigSpec>>),
}

impl SettingKind {
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _)
            | (Self::String, Value::String(_))
            | (Self::Bool, Value::Bool(_))
            | (Self::List(_), Value::Array(_))
            | (Self::Dict(_), Value::Object(_)) => true,
            (Self::Int, Value::Number(n)) => !n.is_f64(),
            (Self::Float, Value::Number(n)) => n.is_f64(),
            _ => false,
        }
    }

    fn type_error(&self) -> &'static str {
        match self {
            Self::Any => "",
            Self::String => "value must be a string",
            Self::Bool => "value must be a bool",
            Self::Int => "value must be an int",
            Self::Float => "value must be a float",
            Self::List(_) => "value must be a list",
            Self::Dict(_) => "value must be a mapping",
        }
    }
}

/// Specification of one config field.
///
/// Built with one of the kind constructors and refined with the `with_*` /
/// `on_*` builder methods:
///
/// ```
/// use stratum_config::{MissingAction, Setting};
///
/// let port = Setting::int()
///     .named("port")
///     .with_default(8080)
///     .on_null(MissingAction::Error);
/// assert_eq!(port.name(), Some("port"));
/// ```
#[derive(Debug, Clone)]
pub struct Setting {
    name: Option<String>,
    default: Slot,
    on_missing: MissingAction,
    on_null: MissingAction,
    on_empty: MissingAction,
    kind: SettingKind,
    parse_strings: bool,
    validators: Vec<Validator>,
}

impl Setting {
    /// A setting of the given kind with default policies: missing values use
    /// the default, null values and empty lists are left alone.
    #[must_use]
    pub fn of_kind(kind: SettingKind) -> Self {
        Self {
            name: None,
            default: Slot::Missing,
            on_missing: MissingAction::UseDefault,
            on_null: MissingAction::Leave,
            on_empty: MissingAction::Leave,
            kind,
            parse_strings: false,
            validators: Vec::new(),
        }
    }

    /// Accepts any value.
    #[must_use]
    pub fn any() -> Self {
        Self::of_kind(SettingKind::Any)
    }

    /// Accepts strings.
    #[must_use]
    pub fn string() -> Self {
        Self::of_kind(SettingKind::String)
    }

    /// Accepts booleans.
    #[must_use]
    pub fn bool() -> Self {
        Self::of_kind(SettingKind::Bool)
    }

    /// Accepts integers.
    #[must_use]
    pub fn int() -> Self {
        Self::of_kind(SettingKind::Int)
    }

    /// Accepts floating point numbers.
    #[must_use]
    pub fn float() -> Self {
        Self::of_kind(SettingKind::Float)
    }

    /// Accepts lists of anything.
    #[must_use]
    pub fn list() -> Self {
        Self::of_kind(SettingKind::List(None))
    }

    /// Accepts lists whose elements all satisfy `item`.
    #[must_use]
    pub fn list_of(item: Setting) -> Self {
        Self::of_kind(SettingKind::List(Some(Box::new(item))))
    }

    /// Accepts any mapping.
    #[must_use]
    pub fn dict() -> Self {
        Self::of_kind(SettingKind::Dict(None))
    }

    /// Accepts mappings valid under `spec`. The validated mapping replaces
    /// the input, so nested defaults are filled in.
    #[must_use]
    pub fn dict_of(spec: Arc<ConfigSpec>) -> Self {
        Self::of_kind(SettingKind::Dict(Some(spec)))
    }

    /// Accepts mappings valid under `schema`, sharing its spec.
    ///
    /// ```
    /// use serde_json::json;
    /// use stratum_config::{DictConfig, Setting, config_schema, layers};
    ///
    /// config_schema! {
    ///     pub struct DatabaseConfig {
    ///         host: String = Setting::string().with_default("localhost"),
    ///         port: i64 = Setting::int().with_default(5432),
    ///     }
    /// }
    ///
    /// config_schema! {
    ///     pub struct ServiceConfig {
    ///         database: serde_json::Value =
    ///             Setting::dict_of_schema(DatabaseConfig::schema().unwrap()).with_default(json!({})),
    ///     }
    /// }
    ///
    /// let file = DictConfig::from_value(json!({"database": {"port": 6543}})).unwrap();
    /// let config = ServiceConfig::load(layers![file]).unwrap();
    /// assert_eq!(config.database().unwrap(), json!({"host": "localhost", "port": 6543}));
    /// ```
    #[must_use]
    pub fn dict_of_schema(schema: &ConfigSchema) -> Self {
        Self::dict_of(Arc::clone(schema.spec()))
    }

    /// Set the name. Only needed when building a [`ConfigSpec`] by hand;
    /// schemas assign names from their field names.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Default used by [`MissingAction::UseDefault`]. A `null` default is
    /// stored as [`Slot::Null`].
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Slot::from(default.into());
        self
    }

    /// Use `null` as the default.
    #[must_use]
    pub fn with_null_default(mut self) -> Self {
        self.default = Slot::Null;
        self
    }

    /// Policy for a key that is absent from the config.
    #[must_use]
    pub fn on_missing(mut self, action: MissingAction) -> Self {
        self.on_missing = action;
        self
    }

    /// Policy for a key whose value is `null`.
    #[must_use]
    pub fn on_null(mut self, action: MissingAction) -> Self {
        self.on_null = action;
        self
    }

    /// Policy for an empty list. Ignored by other kinds.
    #[must_use]
    pub fn on_empty(mut self, action: MissingAction) -> Self {
        self.on_empty = action;
        self
    }

    /// Parse string input into this setting's kind before checking it, so
    /// `"8080"` satisfies an int setting. Lists and dicts parse JSON text.
    #[must_use]
    pub fn parse_strings(mut self) -> Self {
        self.parse_strings = true;
        self
    }

    /// Append a validator. Validators run in the order they were added.
    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// The setting's name, if assigned.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The default value.
    #[must_use]
    pub fn default_value(&self) -> &Slot {
        &self.default
    }

    /// The accepted kind.
    #[must_use]
    pub fn kind(&self) -> &SettingKind {
        &self.kind
    }

    /// Policy for absent keys.
    #[must_use]
    pub fn missing_action(&self) -> MissingAction {
        self.on_missing
    }

    /// Policy for `null` values.
    #[must_use]
    pub fn null_action(&self) -> MissingAction {
        self.on_null
    }

    /// Policy for empty lists.
    #[must_use]
    pub fn empty_action(&self) -> MissingAction {
        self.on_empty
    }

    /// The attached validators, in run order.
    #[must_use]
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Bind the setting to `name`. Assigning the name it already has is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DefinitionError`] if the setting already carries a
    /// different name.
    pub fn assign_name(&mut self, name: &str) -> ConfigResult<()> {
        match &self.name {
            Some(existing) if existing != name => Err(ConfigError::definition(format!(
                "Mismatch between setting's attribute {name} and its name {existing}"
            ))),
            Some(_) => Ok(()),
            None => {
                self.name = Some(name.to_owned());
                Ok(())
            },
        }
    }

    /// Apply the missing/null policy, the kind check and the validators.
    ///
    /// Returns [`Slot::Missing`] only when the key is absent and the policy
    /// is [`MissingAction::Leave`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first failure.
    pub fn validate_value(&self, slot: Slot) -> ConfigResult<Slot> {
        self.validate_as(self.name.as_deref().unwrap_or("<?>"), slot)
    }

    fn validate_as(&self, field: &str, slot: Slot) -> ConfigResult<Slot> {
        match slot {
            Slot::Missing => match self.on_missing {
                MissingAction::Error => Err(ConfigError::validation(field, "missing")),
                MissingAction::UseDefault => {
                    self.default_or(field, "missing and no default is provided")
                },
                MissingAction::Leave => Ok(Slot::Missing),
            },
            Slot::Null => match self.on_null {
                MissingAction::Error => Err(ConfigError::validation(field, "must not be null")),
                MissingAction::UseDefault => {
                    self.default_or(field, "is null and no default is provided")
                },
                MissingAction::Leave => Ok(Slot::Null),
            },
            Slot::Present(value) => {
                let value = self.coerce(field, value)?;
                // `on_empty` may substitute a null default; validators see it as null.
                let value = match self.check_kind(field, value)? {
                    Slot::Present(v) => v,
                    Slot::Null => Value::Null,
                    Slot::Missing => return Ok(Slot::Missing),
                };
                let ctx = ValidationContext::new(Some(field));
                let value = self
                    .validators
                    .iter()
                    .try_fold(value, |v, validator| validator.validate(&ctx, v))?;
                Ok(Slot::from(value))
            },
        }
    }

    fn default_or(&self, field: &str, message: &str) -> ConfigResult<Slot> {
        if self.default.is_missing() {
            Err(ConfigError::validation(field, message))
        } else {
            Ok(self.default.clone())
        }
    }

    fn coerce(&self, field: &str, value: Value) -> ConfigResult<Value> {
        if !self.parse_strings || matches!(self.kind, SettingKind::Any | SettingKind::String) {
            return Ok(value);
        }
        let parsed = match value.as_str() {
            Some(text) => self.parse_text(text.trim()),
            None => return Ok(value),
        };
        parsed.ok_or_else(|| {
            ConfigError::validation(field, format!("cannot parse {value} as the setting's type"))
        })
    }

    fn parse_text(&self, text: &str) -> Option<Value> {
        match &self.kind {
            SettingKind::Any | SettingKind::String => None,
            SettingKind::Int => text.parse::<i64>().ok().map(Value::from),
            SettingKind::Float => text
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            SettingKind::Bool => match text.to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            SettingKind::List(_) | SettingKind::Dict(_) => serde_json::from_str(text).ok(),
        }
    }

    fn check_kind(&self, field: &str, value: Value) -> ConfigResult<Slot> {
        match (&self.kind, value) {
            (SettingKind::List(item), Value::Array(items)) => {
                self.check_list(field, item.as_deref(), items)
            },
            (SettingKind::Dict(Some(spec)), Value::Object(map)) => {
                let validated = spec
                    .validate_config(&DictConfig::from(map))
                    .map_err(|e| e.nested_under(field))?;
                Ok(Slot::Present(Value::Object(validated)))
            },
            (kind, value) if kind.accepts(&value) => Ok(Slot::Present(value)),
            (kind, _) => Err(ConfigError::validation(field, kind.type_error())),
        }
    }

    fn check_list(
        &self,
        field: &str,
        item: Option<&Setting>,
        items: Vec<Value>,
    ) -> ConfigResult<Slot> {
        if items.is_empty() {
            return match self.on_empty {
                MissingAction::Error => Err(ConfigError::validation(field, "is empty")),
                MissingAction::UseDefault => {
                    self.default_or(field, "empty and no default is provided")
                },
                MissingAction::Leave => Ok(Slot::Present(Value::Array(items))),
            };
        }
        let Some(item) = item else {
            return Ok(Slot::Present(Value::Array(items)));
        };
        let mut validated = Vec::with_capacity(items.len());
        for (index, element) in items.into_iter().enumerate() {
            let slot = item.validate_as(&format!("{field}[{index}]"), Slot::from(element))?;
            validated.push(slot.into_value().unwrap_or(Value::Null));
        }
        Ok(Slot::Present(Value::Array(validated)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::validation::one_of;

    fn field_and_message(err: ConfigError) -> (String, String) {
        match err {
            ConfigError::ValidationError { field, message } => (field, message),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_policies() {
        let with_default = Setting::int().named("n").with_default(5);
        assert_eq!(
            with_default.validate_value(Slot::Missing).unwrap(),
            Slot::Present(json!(5))
        );

        let no_default = Setting::int().named("n");
        let (field, message) = field_and_message(no_default.validate_value(Slot::Missing).unwrap_err());
        assert_eq!(field, "n");
        assert_eq!(message, "missing and no default is provided");

        let strict = Setting::int().named("n").with_default(5).on_missing(MissingAction::Error);
        let (_, message) = field_and_message(strict.validate_value(Slot::Missing).unwrap_err());
        assert_eq!(message, "missing");

        let leave = Setting::int().on_missing(MissingAction::Leave);
        assert_eq!(leave.validate_value(Slot::Missing).unwrap(), Slot::Missing);
    }

    #[test]
    fn test_null_policies() {
        let leave = Setting::string().with_default("x");
        assert_eq!(leave.validate_value(Slot::Null).unwrap(), Slot::Null);

        let use_default = Setting::string()
            .with_default("x")
            .on_null(MissingAction::UseDefault);
        assert_eq!(
            use_default.validate_value(Slot::Null).unwrap(),
            Slot::Present(json!("x"))
        );

        let (_, message) = field_and_message(
            Setting::string()
                .on_null(MissingAction::UseDefault)
                .validate_value(Slot::Null)
                .unwrap_err(),
        );
        assert_eq!(message, "is null and no default is provided");

        let (_, message) = field_and_message(
            Setting::string()
                .on_null(MissingAction::Error)
                .validate_value(Slot::Null)
                .unwrap_err(),
        );
        assert_eq!(message, "must not be null");
    }

    #[test]
    fn test_null_default() {
        let setting = Setting::string().with_null_default();
        assert_eq!(setting.validate_value(Slot::Missing).unwrap(), Slot::Null);
    }

    #[test]
    fn test_exact_types() {
        assert!(Setting::string().validate_value(Slot::Present(json!(1))).is_err());
        assert!(Setting::bool().validate_value(Slot::Present(json!(1))).is_err());
        assert!(Setting::int().validate_value(Slot::Present(json!(true))).is_err());
        assert!(Setting::int().validate_value(Slot::Present(json!(1.0))).is_err());
        assert!(Setting::float().validate_value(Slot::Present(json!(1))).is_err());
        assert!(Setting::float().validate_value(Slot::Present(json!(1.5))).is_ok());
        assert!(Setting::any().validate_value(Slot::Present(json!([1]))).is_ok());
        assert!(Setting::dict().validate_value(Slot::Present(json!([]))).is_err());
    }

    #[test]
    fn test_empty_list_policies() {
        let empty = Slot::Present(json!([]));
        assert_eq!(
            Setting::list().validate_value(empty.clone()).unwrap(),
            empty
        );

        let (_, message) = field_and_message(
            Setting::list()
                .on_empty(MissingAction::Error)
                .validate_value(empty.clone())
                .unwrap_err(),
        );
        assert_eq!(message, "is empty");

        let with_default = Setting::list()
            .with_default(json!(["a"]))
            .on_empty(MissingAction::UseDefault);
        assert_eq!(
            with_default.validate_value(empty.clone()).unwrap(),
            Slot::Present(json!(["a"]))
        );

        let (_, message) = field_and_message(
            Setting::list()
                .on_empty(MissingAction::UseDefault)
                .validate_value(empty)
                .unwrap_err(),
        );
        assert_eq!(message, "empty and no default is provided");
    }

    #[test]
    fn test_validators_see_null_default_of_empty_list() {
        let setting = Setting::list()
            .named("tags")
            .with_null_default()
            .on_empty(MissingAction::UseDefault)
            .validator(Validator::new("non_null", |ctx, value| {
                if value.is_null() {
                    Err(ctx.fail("tags must be set"))
                } else {
                    Ok(value)
                }
            }));
        let (field, message) =
            field_and_message(setting.validate_value(Slot::Present(json!([]))).unwrap_err());
        assert_eq!(field, "tags");
        assert_eq!(message, "tags must be set");

        let to_empty = Setting::list()
            .with_null_default()
            .on_empty(MissingAction::UseDefault)
            .validator(Validator::new("null_to_empty", |_, value| {
                Ok(if value.is_null() { json!([]) } else { value })
            }));
        assert_eq!(
            to_empty.validate_value(Slot::Present(json!([]))).unwrap(),
            Slot::Present(json!([]))
        );
    }

    #[test]
    fn test_list_items_are_validated() {
        let setting = Setting::list_of(
            Setting::int()
                .with_default(0)
                .on_null(MissingAction::UseDefault),
        )
        .named("ports");
        assert_eq!(
            setting
                .validate_value(Slot::Present(json!([1, null, 3])))
                .unwrap(),
            Slot::Present(json!([1, 0, 3]))
        );

        let (field, _) = field_and_message(
            setting
                .validate_value(Slot::Present(json!([1, "two"])))
                .unwrap_err(),
        );
        assert_eq!(field, "ports[1]");
    }

    #[test]
    fn test_validators_run_in_order() {
        let setting = Setting::string()
            .named("level")
            .validator(one_of(["debug", "info"]));
        assert!(setting.validate_value(Slot::Present(json!("info"))).is_ok());
        let (field, _) =
            field_and_message(setting.validate_value(Slot::Present(json!("loud"))).unwrap_err());
        assert_eq!(field, "level");
    }

    #[test]
    fn test_parse_strings() {
        let port = Setting::int().parse_strings();
        assert_eq!(
            port.validate_value(Slot::Present(json!(" 8080 "))).unwrap(),
            Slot::Present(json!(8080))
        );
        assert!(port.validate_value(Slot::Present(json!("eighty"))).is_err());

        let flag = Setting::bool().parse_strings();
        assert_eq!(
            flag.validate_value(Slot::Present(json!("TRUE"))).unwrap(),
            Slot::Present(json!(true))
        );

        let ratio = Setting::float().parse_strings();
        assert_eq!(
            ratio.validate_value(Slot::Present(json!("0.5"))).unwrap(),
            Slot::Present(json!(0.5))
        );

        let tags = Setting::list().parse_strings();
        assert_eq!(
            tags.validate_value(Slot::Present(json!(r#"["a","b"]"#))).unwrap(),
            Slot::Present(json!(["a", "b"]))
        );

        // Without the flag strings are rejected.
        assert!(Setting::int().validate_value(Slot::Present(json!("1"))).is_err());
    }

    #[test]
    fn test_assign_name() {
        let mut setting = Setting::string();
        setting.assign_name("a").unwrap();
        setting.assign_name("a").unwrap();
        match setting.assign_name("b") {
            Err(ConfigError::DefinitionError { message }) => {
                assert_eq!(message, "Mismatch between setting's attribute b and its name a");
            },
            other => panic!("expected a definition error, got {other:?}"),
        }
    }
}
