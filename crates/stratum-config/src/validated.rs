use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{CompositeConfig, Config, IntoLayer, Readable, Reloadable};
use crate::error::{ConfigError, ConfigResult};
use crate::slot::Slot;
use crate::spec::ConfigSpec;

/// A stack of layers read through a [`ConfigSpec`].
///
/// Every read resolves the key across the layers (last layer wins) and then
/// validates it against its setting, so defaults, null handling and type
/// checks apply to each access. Layers can be added or replaced at any time;
/// the next read sees the new stack.
#[derive(Debug)]
pub struct SpecValidatedConfig {
    type_name: String,
    spec: Arc<ConfigSpec>,
    layers: CompositeConfig,
}

impl SpecValidatedConfig {
    /// Build over `layers` (lowest priority first) and validate the result.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, see
    /// [`ConfigSpec::validate_config`].
    pub fn new(spec: Arc<ConfigSpec>, layers: Vec<Box<dyn Config>>) -> ConfigResult<Self> {
        let config = Self::unvalidated(spec, layers);
        config.validate()?;
        Ok(config)
    }

    /// Build over `layers` without validating. Errors surface on access or
    /// from an explicit [`validate`](Self::validate).
    #[must_use]
    pub fn unvalidated(spec: Arc<ConfigSpec>, layers: Vec<Box<dyn Config>>) -> Self {
        Self {
            type_name: "SpecValidatedConfig".to_owned(),
            spec,
            layers: CompositeConfig::new(layers),
        }
    }

    /// Name used when displaying the config.
    #[must_use]
    pub fn with_type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = name.into();
        self
    }

    /// Name used when displaying the config.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The spec values are checked against.
    #[must_use]
    pub fn spec(&self) -> &Arc<ConfigSpec> {
        &self.spec
    }

    /// The layers, lowest priority first.
    #[must_use]
    pub fn layers(&self) -> &[Box<dyn Config>] {
        self.layers.layers()
    }

    /// Mutable access to the layer list.
    pub fn layers_mut(&mut self) -> &mut Vec<Box<dyn Config>> {
        self.layers.layers_mut()
    }

    /// Add a layer with the highest priority.
    pub fn push_layer(&mut self, layer: impl IntoLayer) {
        self.layers.push(layer);
    }

    /// Insert a layer at `index` (0 = lowest priority).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DefinitionError`] if `index` is past the end.
    pub fn insert_layer(&mut self, index: usize, layer: impl IntoLayer) -> ConfigResult<()> {
        self.layers.insert(index, layer)
    }

    /// The unvalidated merged view of the layers.
    #[must_use]
    pub fn composite(&self) -> &CompositeConfig {
        &self.layers
    }

    /// Validate the current stack and return every resolved value.
    ///
    /// # Errors
    ///
    /// Returns the first validation error.
    pub fn validate(&self) -> ConfigResult<Map<String, Value>> {
        let resolved = self.spec.validate_config(&self.layers)?;
        debug!(config = %self.type_name, layers = self.layers.layers().len(), "config validated");
        Ok(resolved)
    }

    /// The validated slot for `name`, which may be [`Slot::Missing`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSetting`] for undeclared names, or the
    /// setting's validation error.
    pub fn get_slot(&self, name: &str) -> ConfigResult<Slot> {
        self.spec.validate_setting(&self.layers, name)
    }

    /// The validated value for `name`.
    ///
    /// # Errors
    ///
    /// As [`get_slot`](Self::get_slot), plus [`ConfigError::KeyNotFound`]
    /// when the setting resolves to missing.
    pub fn get_setting(&self, name: &str) -> ConfigResult<Value> {
        self.get_slot(name)?
            .into_value()
            .ok_or_else(|| ConfigError::not_found(name))
    }

    /// The validated value for `name`, deserialized into `T`.
    ///
    /// A missing setting deserializes from `null`, so `Option<T>` yields
    /// `None`.
    ///
    /// # Errors
    ///
    /// As [`get_slot`](Self::get_slot), plus [`ConfigError::KeyNotFound`]
    /// for a missing setting `T` cannot represent and
    /// [`ConfigError::ConversionError`] when the value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> ConfigResult<T> {
        match self.get_slot(name)?.into_value() {
            Some(value) => serde_json::from_value(value).map_err(|source| ConfigError::ConversionError {
                field: name.to_owned(),
                source,
            }),
            None => serde_json::from_value(Value::Null).map_err(|_| ConfigError::not_found(name)),
        }
    }

    /// A string setting.
    ///
    /// # Errors
    ///
    /// See [`get_as`](Self::get_as).
    pub fn get_str(&self, name: &str) -> ConfigResult<String> {
        self.get_as(name)
    }

    /// A boolean setting.
    ///
    /// # Errors
    ///
    /// See [`get_as`](Self::get_as).
    pub fn get_bool(&self, name: &str) -> ConfigResult<bool> {
        self.get_as(name)
    }

    /// An integer setting.
    ///
    /// # Errors
    ///
    /// See [`get_as`](Self::get_as).
    pub fn get_i64(&self, name: &str) -> ConfigResult<i64> {
        self.get_as(name)
    }

    /// A float setting. Integer values are accepted.
    ///
    /// # Errors
    ///
    /// See [`get_as`](Self::get_as).
    pub fn get_f64(&self, name: &str) -> ConfigResult<f64> {
        self.get_as(name)
    }

    /// Validate the whole stack and deserialize it into `T`.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or [`ConfigError::ConversionError`]
    /// when the resolved map does not fit `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        let resolved = self.validate()?;
        serde_json::from_value(Value::Object(resolved)).map_err(|source| ConfigError::ConversionError {
            field: self.type_name.clone(),
            source,
        })
    }
}

impl Readable for SpecValidatedConfig {
    fn get(&self, key: &str) -> ConfigResult<Value> {
        self.get_setting(key)
    }

    /// Declared names whose setting does not resolve to missing. Names whose
    /// validation fails are kept so that reading them reports the failure.
    fn keys(&self) -> Vec<String> {
        self.spec
            .names()
            .filter(|name| !matches!(self.get_slot(name), Ok(Slot::Missing)))
            .map(str::to_owned)
            .collect()
    }
}

impl Reloadable for SpecValidatedConfig {
    fn reload(&mut self) -> ConfigResult<()> {
        self.layers.reload()
    }
}

impl Config for SpecValidatedConfig {}

impl fmt::Display for SpecValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.snapshot() {
            Ok(snapshot) => write!(f, "<{} {snapshot}>", self.type_name),
            Err(e) => write!(f, "<{} error: {e}>", self.type_name),
        }
    }
}
