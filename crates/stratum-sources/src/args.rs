//! Parsed command-line arguments as a config source.

use std::collections::HashSet;

use clap::{ArgMatches, Command};
use clap::parser::ValueSource;
use serde_json::{Map, Value};
use stratum_config::{
    Config, ConfigProjection, ConfigResult, DictConfig, ProjectedConfig, Readable, Reloadable,
    Writable,
};
use tracing::debug;

/// Values the user actually passed on the command line (or through an
/// argument's `env` fallback).
///
/// Arguments that only carry their clap default are treated as missing, so a
/// lower layer can still supply them. Flags become booleans, single values
/// strings and repeated values arrays of strings. Keys are clap argument ids,
/// which for derived parsers are the field names (`config_file` for
/// `--config-file`). Argument groups, including the one `#[derive(Parser)]`
/// adds for the struct, are not arguments and never become keys.
#[derive(Debug, Clone, Default)]
pub struct ArgsConfig {
    values: DictConfig,
}

impl ArgsConfig {
    /// Capture the explicitly provided values of `matches`, which must have
    /// been parsed by `command`.
    #[must_use]
    pub fn from_matches(command: &Command, matches: &ArgMatches) -> Self {
        let mut values = Map::new();
        for arg in command.get_arguments() {
            let name = arg.get_id().as_str();
            match matches.value_source(name) {
                Some(ValueSource::CommandLine | ValueSource::EnvVariable) => {},
                _ => continue,
            }
            if let Some(value) = extract(matches, name) {
                debug!(arg = name, "captured command-line value");
                values.insert(name.to_owned(), value);
            }
        }
        Self {
            values: DictConfig::from(values),
        }
    }

    /// Apply `projection` to the captured values.
    #[must_use]
    pub fn projected(self, projection: ArgsProjection) -> ProjectedConfig<Self, ArgsProjection> {
        ProjectedConfig::new(self, projection)
    }

    /// The captured values.
    #[must_use]
    pub fn values(&self) -> &DictConfig {
        &self.values
    }
}

fn extract(matches: &ArgMatches, name: &str) -> Option<Value> {
    if let Ok(Some(flag)) = matches.try_get_one::<bool>(name) {
        return Some(Value::Bool(*flag));
    }
    let raw = matches.try_get_raw(name).ok()??;
    let mut items: Vec<Value> = raw
        .map(|s| Value::String(s.to_string_lossy().into_owned()))
        .collect();
    match items.len() {
        0 => None,
        1 => items.pop(),
        _ => Some(Value::Array(items)),
    }
}

impl Readable for ArgsConfig {
    fn get(&self, key: &str) -> ConfigResult<Value> {
        self.values.get(key)
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys()
    }
}

impl Writable for ArgsConfig {
    fn set(&mut self, key: &str, value: Value) -> ConfigResult<()> {
        self.values.set(key, value)
    }

    fn remove(&mut self, key: &str) -> ConfigResult<Value> {
        self.values.remove(key)
    }
}

impl Reloadable for ArgsConfig {
    fn reload(&mut self) -> ConfigResult<()> {
        debug!("command-line arguments are fixed, nothing to reload");
        Ok(())
    }
}

impl Config for ArgsConfig {
    fn as_writable(&mut self) -> Option<&mut dyn Writable> {
        Some(self)
    }
}

/// Filters argument ids and optionally exposes them upper-cased.
///
/// With `uppercase`, the id `message` is read as `MESSAGE` and ids containing
/// upper-case letters are ignored. With `relevant_keys`, only the listed ids
/// are exposed.
#[derive(Debug, Clone, Default)]
pub struct ArgsProjection {
    uppercase: bool,
    relevant_keys: Option<HashSet<String>>,
}

impl ArgsProjection {
    /// Expose every id unchanged.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose ids upper-cased.
    #[must_use]
    pub fn uppercase(mut self, uppercase: bool) -> Self {
        self.uppercase = uppercase;
        self
    }

    /// Expose only these ids (given in their source, lower-case form).
    #[must_use]
    pub fn relevant_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relevant_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }
}

fn is_upper(s: &str) -> bool {
    s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase)
}

fn is_lower(s: &str) -> bool {
    s.chars().any(char::is_lowercase) && !s.chars().any(char::is_uppercase)
}

impl ConfigProjection for ArgsProjection {
    fn is_relevant_key(&self, key: &str) -> bool {
        if self.uppercase && !is_upper(key) {
            return false;
        }
        self.is_relevant_sourcekey(&self.key_to_sourcekey(key))
    }

    fn is_relevant_sourcekey(&self, sourcekey: &str) -> bool {
        if self.uppercase && !is_lower(sourcekey) {
            return false;
        }
        self.relevant_keys
            .as_ref()
            .is_none_or(|keys| keys.contains(sourcekey))
    }

    fn key_to_sourcekey(&self, key: &str) -> String {
        if self.uppercase {
            key.to_lowercase()
        } else {
            key.to_owned()
        }
    }

    fn sourcekey_to_key(&self, sourcekey: &str) -> String {
        if self.uppercase {
            sourcekey.to_uppercase()
        } else {
            sourcekey.to_owned()
        }
    }
}
