use std::fmt;

use serde_json::{Map, Value};

use super::{Config, Readable, Reloadable, Writable};
use crate::error::{ConfigError, ConfigResult};

/// A config backed by its own in-memory map.
///
/// This is the snapshot target for every other config and the usual home of
/// defaults and parsed files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DictConfig {
    entries: Map<String, Value>,
}

impl DictConfig {
    /// Create an empty config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DefinitionError`] if `value` is not an object.
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(ConfigError::definition(format!(
                "a DictConfig must be built from an object, got {other}"
            ))),
        }
    }

    /// Replace the whole contents with a snapshot of `other`.
    ///
    /// The snapshot is taken before anything is cleared, so a failed read
    /// leaves `self` untouched.
    ///
    /// # Errors
    ///
    /// Propagates read errors from `other`.
    pub fn replace<R: Readable + ?Sized>(&mut self, other: &R) -> ConfigResult<()> {
        let fresh = other.snapshot()?;
        self.entries = fresh.entries;
        Ok(())
    }

    /// Borrow the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    /// Consume the config, returning its map.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.entries
    }

    /// Consume the config, returning a JSON object.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.entries)
    }

    /// Iterate over entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

impl From<Map<String, Value>> for DictConfig {
    fn from(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}

impl FromIterator<(String, Value)> for DictConfig {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for DictConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.entries.clone()))
    }
}

impl Readable for DictConfig {
    fn get(&self, key: &str) -> ConfigResult<Value> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::not_found(key))
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn snapshot(&self) -> ConfigResult<DictConfig> {
        Ok(self.clone())
    }
}

impl Writable for DictConfig {
    fn set(&mut self, key: &str, value: Value) -> ConfigResult<()> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> ConfigResult<Value> {
        self.entries
            .remove(key)
            .ok_or_else(|| ConfigError::not_found(key))
    }
}

impl Reloadable for DictConfig {
    fn reload(&mut self) -> ConfigResult<()> {
        Ok(())
    }
}

impl Config for DictConfig {
    fn as_writable(&mut self) -> Option<&mut dyn Writable> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_snapshot_is_independent() {
        let mut original = DictConfig::from_value(json!({"a": 3, "b": 4})).unwrap();
        let snapshot = original.snapshot().unwrap();
        assert_eq!(snapshot, original);

        original.set("a", json!(9)).unwrap();
        assert_eq!(snapshot.get("a").unwrap(), json!(3));
        assert_ne!(snapshot, original);
    }

    #[test]
    fn test_remove_missing_key() {
        let mut cfg = DictConfig::new();
        assert!(matches!(
            cfg.remove("nope"),
            Err(ConfigError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_replace_copies_other() {
        let mut cfg = DictConfig::from_value(json!({"stale": true})).unwrap();
        let other = DictConfig::from_value(json!({"fresh": 1})).unwrap();
        cfg.replace(&other).unwrap();
        assert_eq!(cfg.keys(), vec!["fresh".to_owned()]);
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        assert!(matches!(
            DictConfig::from_value(json!([1, 2])),
            Err(ConfigError::DefinitionError { .. })
        ));
    }

    #[test]
    fn test_null_is_a_present_value() {
        let cfg = DictConfig::from_value(json!({"n": null})).unwrap();
        assert!(cfg.contains_key("n"));
        assert_eq!(cfg.get("n").unwrap(), Value::Null);
        assert_eq!(cfg.len(), 1);
    }
}
