use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::Readable;
use crate::error::{ConfigError, ConfigResult};
use crate::setting::Setting;
use crate::slot::Slot;

/// An ordered set of uniquely named settings.
#[derive(Debug, Clone)]
pub struct ConfigSpec {
    settings: Vec<Setting>,
    allow_extra: bool,
}

impl ConfigSpec {
    /// Build a spec from named settings. Extra keys are rejected unless
    /// [`with_allow_extra`](Self::with_allow_extra) says otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DefinitionError`] if a setting has no name or two
    /// settings share one.
    pub fn new(settings: impl IntoIterator<Item = Setting>) -> ConfigResult<Self> {
        let settings: Vec<Setting> = settings.into_iter().collect();
        let mut seen = HashSet::with_capacity(settings.len());
        for setting in &settings {
            let Some(name) = setting.name() else {
                return Err(ConfigError::definition(format!(
                    "Setting name not set for {setting:?}"
                )));
            };
            if !seen.insert(name) {
                return Err(ConfigError::definition(format!(
                    "All settings must have unique names, '{name}' is declared twice"
                )));
            }
        }
        Ok(Self {
            settings,
            allow_extra: false,
        })
    }

    /// Whether keys without a setting are tolerated.
    #[must_use]
    pub fn with_allow_extra(mut self, allow_extra: bool) -> Self {
        self.allow_extra = allow_extra;
        self
    }

    /// Whether keys without a setting are tolerated.
    #[must_use]
    pub fn allow_extra(&self) -> bool {
        self.allow_extra
    }

    /// The settings in declaration order.
    #[must_use]
    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }

    /// The setting called `name`.
    #[must_use]
    pub fn setting(&self, name: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.name() == Some(name))
    }

    /// Declared names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.settings.iter().filter_map(Setting::name)
    }

    /// Validate one setting against `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSetting`] if `name` is not declared, a
    /// validation error if the value is invalid, or any non-not-found error
    /// raised while reading `config`.
    pub fn validate_setting<R>(&self, config: &R, name: &str) -> ConfigResult<Slot>
    where
        R: Readable + ?Sized,
    {
        let setting = self
            .setting(name)
            .ok_or_else(|| ConfigError::UnknownSetting {
                name: name.to_owned(),
            })?;
        setting.validate_value(Slot::lookup(config, name)?)
    }

    /// Validate every setting against `config`.
    ///
    /// Settings that resolve to [`Slot::Missing`] are left out of the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnexpectedFields`] listing undeclared keys
    /// (sorted) unless extras are allowed, then the first setting failure in
    /// declaration order.
    pub fn validate_config<R>(&self, config: &R) -> ConfigResult<Map<String, Value>>
    where
        R: Readable + ?Sized,
    {
        if !self.allow_extra {
            let declared: HashSet<&str> = self.names().collect();
            let mut extra: Vec<String> = config
                .keys()
                .into_iter()
                .filter(|key| !declared.contains(key.as_str()))
                .collect();
            if !extra.is_empty() {
                extra.sort_unstable();
                extra.dedup();
                return Err(ConfigError::UnexpectedFields { fields: extra });
            }
        }

        let mut resolved = Map::new();
        for setting in &self.settings {
            let Some(name) = setting.name() else {
                continue;
            };
            let slot = setting.validate_value(Slot::lookup(config, name)?)?;
            if let Some(value) = slot.into_value() {
                resolved.insert(name.to_owned(), value);
            }
        }
        debug!(settings = resolved.len(), "validated config");
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::config::DictConfig;
    use crate::setting::MissingAction;

    fn dict(value: Value) -> DictConfig {
        DictConfig::from_value(value).unwrap()
    }

    #[test]
    fn test_unnamed_and_duplicate_settings_are_rejected() {
        assert!(matches!(
            ConfigSpec::new([Setting::int()]),
            Err(ConfigError::DefinitionError { .. })
        ));
        assert!(matches!(
            ConfigSpec::new([Setting::int().named("a"), Setting::string().named("a")]),
            Err(ConfigError::DefinitionError { .. })
        ));
    }

    #[test]
    fn test_extra_fields() {
        let spec = ConfigSpec::new([Setting::int().named("x")]).unwrap();
        let config = dict(json!({"x": 1, "z": 3, "y": 2}));
        match spec.validate_config(&config) {
            Err(ConfigError::UnexpectedFields { fields }) => assert_eq!(fields, vec!["y", "z"]),
            other => panic!("expected unexpected fields, got {other:?}"),
        }

        let lenient = spec.with_allow_extra(true);
        assert_eq!(
            lenient.validate_config(&config).unwrap(),
            dict(json!({"x": 1})).into_map()
        );
    }

    #[test]
    fn test_result_omits_left_missing_settings() {
        let spec = ConfigSpec::new([
            Setting::int().named("a").with_default(5),
            Setting::int().named("b").on_missing(MissingAction::Leave),
            Setting::string().named("c").with_null_default(),
        ])
        .unwrap();
        let resolved = spec.validate_config(&DictConfig::new()).unwrap();
        assert_eq!(Value::Object(resolved), json!({"a": 5, "c": null}));
    }

    #[test]
    fn test_first_failure_aborts() {
        let spec = ConfigSpec::new([
            Setting::int().named("a"),
            Setting::int().named("b"),
        ])
        .unwrap();
        match spec.validate_config(&DictConfig::new()) {
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, "a"),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_setting() {
        let spec = ConfigSpec::new([Setting::int().named("n").with_default(1)]).unwrap();
        let config = dict(json!({"n": 7}));
        assert_eq!(
            spec.validate_setting(&config, "n").unwrap(),
            Slot::Present(json!(7))
        );
        assert!(matches!(
            spec.validate_setting(&config, "other"),
            Err(ConfigError::UnknownSetting { .. })
        ));
    }

    #[test]
    fn test_nested_dict_errors_are_dotted() {
        let inner = Arc::new(
            ConfigSpec::new([
                Setting::string().named("host").with_default("localhost"),
                Setting::int().named("port").on_missing(MissingAction::Error),
            ])
            .unwrap(),
        );
        let spec = ConfigSpec::new([Setting::dict_of(inner).named("server")]).unwrap();

        let ok = spec
            .validate_config(&dict(json!({"server": {"port": 80}})))
            .unwrap();
        assert_eq!(
            Value::Object(ok),
            json!({"server": {"host": "localhost", "port": 80}})
        );

        match spec.validate_config(&dict(json!({"server": {}}))) {
            Err(ConfigError::ValidationError { field, message }) => {
                assert_eq!(field, "server.port");
                assert_eq!(message, "missing");
            },
            other => panic!("expected a nested validation error, got {other:?}"),
        }
    }
}
