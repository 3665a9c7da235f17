//! Named schemas and the `config_schema!` declaration macro.

use std::sync::{Arc, OnceLock};

use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::setting::Setting;
use crate::spec::ConfigSpec;
use crate::validated::SpecValidatedConfig;

/// A [`ConfigSpec`] bound to a config type name.
#[derive(Debug, Clone)]
pub struct ConfigSchema {
    name: String,
    spec: Arc<ConfigSpec>,
}

impl ConfigSchema {
    /// Start a schema for the config type `name`.
    pub fn builder(name: impl Into<String>) -> ConfigSchemaBuilder {
        ConfigSchemaBuilder {
            name: name.into(),
            settings: Vec::new(),
            allow_extra: false,
            error: None,
        }
    }

    /// The config type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying spec.
    #[must_use]
    pub fn spec(&self) -> &Arc<ConfigSpec> {
        &self.spec
    }

    /// Build a validated config over `layers`, lowest priority first.
    ///
    /// # Errors
    ///
    /// Returns the first validation error.
    pub fn load(&self, layers: Vec<Box<dyn Config>>) -> ConfigResult<SpecValidatedConfig> {
        let config = self.load_unvalidated(layers);
        config.validate()?;
        Ok(config)
    }

    /// Build a config over `layers` without validating it yet.
    #[must_use]
    pub fn load_unvalidated(&self, layers: Vec<Box<dyn Config>>) -> SpecValidatedConfig {
        SpecValidatedConfig::unvalidated(Arc::clone(&self.spec), layers)
            .with_type_name(self.name.clone())
    }
}

/// Builder for [`ConfigSchema`].
#[derive(Debug)]
pub struct ConfigSchemaBuilder {
    name: String,
    settings: Vec<Setting>,
    allow_extra: bool,
    error: Option<ConfigError>,
}

impl ConfigSchemaBuilder {
    /// Declare `field`. The setting takes the field's name; a setting that
    /// was already named differently makes [`build`](Self::build) fail.
    #[must_use]
    pub fn setting(mut self, field: &str, mut setting: Setting) -> Self {
        if self.error.is_none() {
            match setting.assign_name(field) {
                Ok(()) => self.settings.push(setting),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Whether layers may carry keys the schema does not declare.
    #[must_use]
    pub fn allow_extra(mut self, allow_extra: bool) -> Self {
        self.allow_extra = allow_extra;
        self
    }

    /// Finish the schema.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DefinitionError`] on a name mismatch or a duplicate
    /// field.
    pub fn build(self) -> ConfigResult<ConfigSchema> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let spec = ConfigSpec::new(self.settings)?.with_allow_extra(self.allow_extra);
        Ok(ConfigSchema {
            name: self.name,
            spec: Arc::new(spec),
        })
    }
}

#[doc(hidden)]
pub fn cached_schema(
    cell: &'static OnceLock<ConfigResult<ConfigSchema>>,
    init: impl FnOnce() -> ConfigResult<ConfigSchema>,
) -> ConfigResult<&'static ConfigSchema> {
    match cell.get_or_init(init) {
        Ok(schema) => Ok(schema),
        Err(ConfigError::DefinitionError { message }) => Err(ConfigError::definition(message.clone())),
        Err(other) => Err(ConfigError::definition(other.to_string())),
    }
}

/// Declare a config type backed by a [`SpecValidatedConfig`].
///
/// Each field becomes a setting of the same name and a typed accessor that
/// validates and converts on every call. The schema is built on first use.
///
/// ```
/// use stratum_config::{DictConfig, Setting, config_schema, layers};
/// use serde_json::json;
///
/// config_schema! {
///     /// Settings of the greeter.
///     pub struct GreeterConfig {
///         message: String = Setting::string().with_default("Hello!"),
///         config_file: Option<String> = Setting::string().with_null_default(),
///     }
/// }
///
/// let overrides = DictConfig::from_value(json!({"message": "Hi"})).unwrap();
/// let config = GreeterConfig::load(layers![overrides]).unwrap();
/// assert_eq!(config.message().unwrap(), "Hi");
/// assert_eq!(config.config_file().unwrap(), None);
/// ```
#[macro_export]
macro_rules! config_schema {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($field:ident : $ty:ty = $setting:expr),* $(,)?
        }
        $(allow_extra = $allow_extra:expr;)?
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis struct $name($crate::SpecValidatedConfig);

        #[allow(dead_code)]
        impl $name {
            /// The schema shared by every instance.
            ///
            /// # Errors
            ///
            /// Returns a definition error if the declaration is inconsistent.
            $vis fn schema() -> $crate::ConfigResult<&'static $crate::ConfigSchema> {
                static SCHEMA: ::std::sync::OnceLock<$crate::ConfigResult<$crate::ConfigSchema>> =
                    ::std::sync::OnceLock::new();
                $crate::schema::cached_schema(&SCHEMA, || {
                    $crate::ConfigSchema::builder(stringify!($name))
                        $(.setting(stringify!($field), $setting))*
                        $(.allow_extra($allow_extra))?
                        .build()
                })
            }

            /// Load and validate over `layers`, lowest priority first.
            ///
            /// # Errors
            ///
            /// Returns a definition or validation error.
            $vis fn load(
                layers: ::std::vec::Vec<::std::boxed::Box<dyn $crate::Config>>,
            ) -> $crate::ConfigResult<Self> {
                Ok(Self(Self::schema()?.load(layers)?))
            }

            /// Load over `layers` without validating.
            ///
            /// # Errors
            ///
            /// Returns a definition error if the declaration is inconsistent.
            $vis fn load_unvalidated(
                layers: ::std::vec::Vec<::std::boxed::Box<dyn $crate::Config>>,
            ) -> $crate::ConfigResult<Self> {
                Ok(Self(Self::schema()?.load_unvalidated(layers)))
            }

            /// The underlying validated config.
            $vis fn inner(&self) -> &$crate::SpecValidatedConfig {
                &self.0
            }

            /// Mutable access to the underlying validated config.
            $vis fn inner_mut(&mut self) -> &mut $crate::SpecValidatedConfig {
                &mut self.0
            }

            $(
                #[doc = concat!("The validated `", stringify!($field), "` setting.")]
                ///
                /// # Errors
                ///
                /// Returns a validation or conversion error.
                $vis fn $field(&self) -> $crate::ConfigResult<$ty> {
                    self.0.get_as(stringify!($field))
                }
            )*
        }

        impl ::std::ops::Deref for $name {
            type Target = $crate::SpecValidatedConfig;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}
