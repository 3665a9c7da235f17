//! Environment variables as a config source.
//!
//! [`EnvConfig`] exposes variables under their own names. Wrap it in an
//! [`EnvProjection`] (see [`EnvConfig::projected`]) to strip a common prefix
//! and fold case, so `EXAMPLE_MESSAGE` reads as `message`.

use std::collections::HashMap;
use std::env;

use serde_json::Value;
use stratum_config::{
    Config, ConfigError, ConfigProjection, ConfigResult, ProjectedConfig, Readable, Reloadable,
};
use tracing::debug;

#[derive(Debug, Clone)]
enum Vars {
    Process,
    Fixed(HashMap<String, String>),
}

/// Environment variables, read as strings.
///
/// The process environment is consulted on every access, so there is nothing
/// to reload. Variables whose name or value is not valid Unicode are skipped.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    vars: Vars,
}

impl EnvConfig {
    /// The live process environment.
    #[must_use]
    pub fn process() -> Self {
        Self { vars: Vars::Process }
    }

    /// A fixed set of variables.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Vars::Fixed(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Expose only variables starting with `prefix`, without the prefix.
    #[must_use]
    pub fn projected(
        self,
        prefix: impl Into<String>,
        case: KeyCase,
    ) -> ProjectedConfig<Self, EnvProjection> {
        ProjectedConfig::new(self, EnvProjection::new(prefix, case))
    }

    fn var(&self, name: &str) -> Option<String> {
        match &self.vars {
            Vars::Process => env::var_os(name)?.into_string().ok(),
            Vars::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}

impl Readable for EnvConfig {
    fn get(&self, key: &str) -> ConfigResult<Value> {
        self.var(key)
            .map(Value::String)
            .ok_or_else(|| ConfigError::not_found(key))
    }

    fn keys(&self) -> Vec<String> {
        match &self.vars {
            Vars::Process => env::vars_os()
                .filter_map(|(k, v)| {
                    v.to_str()?;
                    k.into_string().ok()
                })
                .collect(),
            Vars::Fixed(vars) => vars.keys().cloned().collect(),
        }
    }
}

impl Reloadable for EnvConfig {
    fn reload(&mut self) -> ConfigResult<()> {
        debug!("environment is read live, nothing to reload");
        Ok(())
    }
}

impl Config for EnvConfig {}

/// How [`EnvProjection`] maps the case of variable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCase {
    /// `PREFIX_FOO` is read as `foo`. Variables with lower-case letters after
    /// the prefix are ignored.
    #[default]
    Lower,
    /// `PREFIX_Foo` is read as `Foo`.
    Preserve,
}

/// Strips a variable name prefix and optionally lower-cases the rest.
#[derive(Debug, Clone)]
pub struct EnvProjection {
    prefix: String,
    case: KeyCase,
}

impl EnvProjection {
    /// Projection for variables named `{prefix}{KEY}`.
    pub fn new(prefix: impl Into<String>, case: KeyCase) -> Self {
        Self {
            prefix: prefix.into(),
            case,
        }
    }

    /// The variable name prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl ConfigProjection for EnvProjection {
    fn is_relevant_key(&self, key: &str) -> bool {
        !key.is_empty()
            && self.sourcekey_to_key(&self.key_to_sourcekey(key)) == key
            && self.is_relevant_sourcekey(&self.key_to_sourcekey(key))
    }

    fn is_relevant_sourcekey(&self, sourcekey: &str) -> bool {
        match sourcekey.strip_prefix(self.prefix.as_str()) {
            Some(rest) if !rest.is_empty() => {
                self.key_to_sourcekey(&self.sourcekey_to_key(sourcekey)) == sourcekey
            },
            _ => false,
        }
    }

    fn key_to_sourcekey(&self, key: &str) -> String {
        match self.case {
            KeyCase::Lower => format!("{}{}", self.prefix, key.to_uppercase()),
            KeyCase::Preserve => format!("{}{key}", self.prefix),
        }
    }

    fn sourcekey_to_key(&self, sourcekey: &str) -> String {
        let rest = sourcekey
            .strip_prefix(self.prefix.as_str())
            .unwrap_or(sourcekey);
        match self.case {
            KeyCase::Lower => rest.to_lowercase(),
            KeyCase::Preserve => rest.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stratum_config::{ConfigSchema, Setting, layers};

    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> EnvConfig {
        EnvConfig::from_vars(pairs.iter().copied())
    }

    #[test]
    fn test_raw_variables() {
        let env = make_env(&[("HOME", "/home/u"), ("EMPTY", "")]);
        assert_eq!(env.get("HOME").unwrap(), json!("/home/u"));
        assert_eq!(env.get("EMPTY").unwrap(), json!(""));
        assert!(env.get("home").unwrap_err().is_not_found());
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn test_prefix_lowercase_projection() {
        let env = make_env(&[
            ("EXAMPLE_MESSAGE", "hi"),
            ("EXAMPLE_CONFIG_FILE", "/tmp/a.json"),
            ("EXAMPLE_Mixed", "x"),
            ("EXAMPLE_", "bare"),
            ("OTHER", "y"),
        ])
        .projected("EXAMPLE_", KeyCase::Lower);

        assert_eq!(env.get("message").unwrap(), json!("hi"));
        assert_eq!(env.get("config_file").unwrap(), json!("/tmp/a.json"));
        assert!(env.get("MESSAGE").is_err());
        assert!(env.get("other").is_err());

        let mut keys = env.keys();
        keys.sort();
        assert_eq!(keys, vec!["config_file", "message"]);
    }

    #[test]
    fn test_preserve_case_projection() {
        let env = make_env(&[("APP_Name", "n"), ("NAME", "m")]).projected("APP_", KeyCase::Preserve);
        assert_eq!(env.get("Name").unwrap(), json!("n"));
        assert_eq!(env.keys(), vec!["Name"]);
    }

    #[test]
    fn test_empty_prefix() {
        let env = make_env(&[("PORT", "80"), ("lower", "x")]).projected("", KeyCase::Lower);
        assert_eq!(env.get("port").unwrap(), json!("80"));
        assert_eq!(env.keys(), vec!["port"]);
    }

    #[test]
    fn test_env_feeds_typed_schema() {
        let schema = ConfigSchema::builder("Env")
            .setting("port", Setting::int().with_default(80).parse_strings())
            .build()
            .unwrap();
        let env = make_env(&[("SVC_PORT", "8080")]).projected("SVC_", KeyCase::Lower);
        let config = schema.load(layers![env]).unwrap();
        assert_eq!(config.get_i64("port").unwrap(), 8080);
    }

    #[test]
    fn test_process_environment_is_readable() {
        let env = EnvConfig::process();
        for key in env.keys().into_iter().take(5) {
            assert!(env.get(&key).is_ok());
        }
    }
}
