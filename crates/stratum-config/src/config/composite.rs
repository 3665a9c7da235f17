use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use super::{Config, IntoLayer, Readable, Reloadable};
use crate::error::{ConfigError, ConfigResult, ReloadFailure};

/// A config backed by an ordered stack of layers.
///
/// Lookups scan from the last layer to the first, so the first layer has the
/// lowest priority and the last one overrides everything below it.
#[derive(Debug, Default)]
pub struct CompositeConfig {
    layers: Vec<Box<dyn Config>>,
}

impl CompositeConfig {
    /// Create a composite over `layers`, lowest priority first.
    #[must_use]
    pub fn new(layers: Vec<Box<dyn Config>>) -> Self {
        Self { layers }
    }

    /// The layers, lowest priority first.
    #[must_use]
    pub fn layers(&self) -> &[Box<dyn Config>] {
        &self.layers
    }

    /// Mutable access to the layer list. Changes are visible to the next read.
    pub fn layers_mut(&mut self) -> &mut Vec<Box<dyn Config>> {
        &mut self.layers
    }

    /// Add a layer with the highest priority.
    pub fn push(&mut self, layer: impl IntoLayer) {
        self.layers.push(layer.into_layer());
    }

    /// Insert a layer at `index` (0 = lowest priority).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DefinitionError`] if `index` is past the end.
    pub fn insert(&mut self, index: usize, layer: impl IntoLayer) -> ConfigResult<()> {
        if index > self.layers.len() {
            return Err(ConfigError::definition(format!(
                "layer index {index} out of range for {} layers",
                self.layers.len()
            )));
        }
        self.layers.insert(index, layer.into_layer());
        Ok(())
    }

    /// Remove and return the layer at `index`, if there is one.
    pub fn remove_layer(&mut self, index: usize) -> Option<Box<dyn Config>> {
        (index < self.layers.len()).then(|| self.layers.remove(index))
    }
}

/// Resolve `key` against `layers`, highest priority first.
///
/// A layer's not-found error moves on to the next layer; any other error is
/// returned immediately.
pub(crate) fn resolve(layers: &[Box<dyn Config>], key: &str) -> ConfigResult<Value> {
    for (index, layer) in layers.iter().enumerate().rev() {
        match layer.get(key) {
            Ok(value) => {
                debug!(key, layer = index, "resolved key");
                return Ok(value);
            },
            Err(e) if e.is_not_found() => {},
            Err(e) => return Err(e),
        }
    }
    Err(ConfigError::KeyNotFound {
        key: key.to_owned(),
    })
}

/// The union of every layer's keys, sorted.
pub(crate) fn union_keys(layers: &[Box<dyn Config>]) -> BTreeSet<String> {
    layers.iter().flat_map(|layer| layer.keys()).collect()
}

/// Reload every layer in order. A failing layer does not stop the others;
/// all failures are reported together.
pub(crate) fn reload_all(layers: &mut [Box<dyn Config>]) -> ConfigResult<()> {
    let mut failures = Vec::new();
    for (index, layer) in layers.iter_mut().enumerate() {
        if let Err(error) = layer.reload() {
            warn!(layer = index, %error, "layer reload failed");
            failures.push(ReloadFailure { index, error });
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ReloadError { failures })
    }
}

impl Readable for CompositeConfig {
    fn get(&self, key: &str) -> ConfigResult<Value> {
        resolve(&self.layers, key)
    }

    fn keys(&self) -> Vec<String> {
        union_keys(&self.layers).into_iter().collect()
    }

    fn len(&self) -> usize {
        union_keys(&self.layers).len()
    }
}

impl Reloadable for CompositeConfig {
    fn reload(&mut self) -> ConfigResult<()> {
        reload_all(&mut self.layers)
    }
}

impl Config for CompositeConfig {}

impl fmt::Display for CompositeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.snapshot() {
            Ok(snapshot) => write!(f, "<CompositeConfig {snapshot}>"),
            Err(e) => write!(f, "<CompositeConfig error: {e}>"),
        }
    }
}
