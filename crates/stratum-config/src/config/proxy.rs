use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::debug;

use super::{Config, Readable, Reloadable, Writable};
use crate::error::{ConfigError, ConfigResult};

/// The externally owned source behind a [`ProxyConfig`].
#[derive(Debug, Clone)]
pub enum ProxySource {
    /// A shared map the proxy may write through.
    Map(Rc<RefCell<Map<String, Value>>>),
    /// A shared map that is never written.
    Frozen(Rc<Map<String, Value>>),
    /// Another config, reloaded together with the proxy.
    Config(Rc<RefCell<dyn Config>>),
}

impl From<Rc<RefCell<Map<String, Value>>>> for ProxySource {
    fn from(map: Rc<RefCell<Map<String, Value>>>) -> Self {
        Self::Map(map)
    }
}

impl From<Rc<Map<String, Value>>> for ProxySource {
    fn from(map: Rc<Map<String, Value>>) -> Self {
        Self::Frozen(map)
    }
}

impl<C: Config + 'static> From<Rc<RefCell<C>>> for ProxySource {
    fn from(config: Rc<RefCell<C>>) -> Self {
        Self::Config(config)
    }
}

impl From<Rc<RefCell<dyn Config>>> for ProxySource {
    fn from(config: Rc<RefCell<dyn Config>>) -> Self {
        Self::Config(config)
    }
}

/// A config that reads from, and possibly writes to, a source it does not
/// own.
///
/// Whether the proxy is writable is decided once, when it is created, from
/// the source's capabilities at that moment.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    source: ProxySource,
    mutable: bool,
}

impl ProxyConfig {
    /// Create a proxy over `source`.
    pub fn new(source: impl Into<ProxySource>) -> Self {
        let source = source.into();
        let mutable = match &source {
            ProxySource::Map(_) => true,
            ProxySource::Frozen(_) => false,
            ProxySource::Config(config) => config.borrow_mut().as_writable().is_some(),
        };
        debug!(mutable, "created proxy config");
        Self { source, mutable }
    }

    /// The source this proxy delegates to.
    #[must_use]
    pub fn source(&self) -> &ProxySource {
        &self.source
    }

    /// Whether writes are accepted.
    #[must_use]
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    fn check_mutable(&self) -> ConfigResult<()> {
        if self.mutable {
            Ok(())
        } else {
            Err(ConfigError::not_mutable("ProxyConfig's source"))
        }
    }
}

impl Readable for ProxyConfig {
    fn get(&self, key: &str) -> ConfigResult<Value> {
        match &self.source {
            ProxySource::Map(map) => map
                .borrow()
                .get(key)
                .cloned()
                .ok_or_else(|| ConfigError::not_found(key)),
            ProxySource::Frozen(map) => map
                .get(key)
                .cloned()
                .ok_or_else(|| ConfigError::not_found(key)),
            ProxySource::Config(config) => config.borrow().get(key),
        }
    }

    fn keys(&self) -> Vec<String> {
        match &self.source {
            ProxySource::Map(map) => map.borrow().keys().cloned().collect(),
            ProxySource::Frozen(map) => map.keys().cloned().collect(),
            ProxySource::Config(config) => config.borrow().keys(),
        }
    }

    fn len(&self) -> usize {
        match &self.source {
            ProxySource::Map(map) => map.borrow().len(),
            ProxySource::Frozen(map) => map.len(),
            ProxySource::Config(config) => config.borrow().len(),
        }
    }
}

impl Writable for ProxyConfig {
    fn set(&mut self, key: &str, value: Value) -> ConfigResult<()> {
        self.check_mutable()?;
        match &self.source {
            ProxySource::Map(map) => {
                map.borrow_mut().insert(key.to_owned(), value);
                Ok(())
            },
            ProxySource::Frozen(_) => Err(ConfigError::not_mutable("ProxyConfig's source")),
            ProxySource::Config(config) => {
                let mut inner = config.borrow_mut();
                inner
                    .as_writable()
                    .ok_or_else(|| ConfigError::not_mutable("ProxyConfig's source"))?
                    .set(key, value)
            },
        }
    }

    fn remove(&mut self, key: &str) -> ConfigResult<Value> {
        self.check_mutable()?;
        match &self.source {
            ProxySource::Map(map) => map
                .borrow_mut()
                .remove(key)
                .ok_or_else(|| ConfigError::not_found(key)),
            ProxySource::Frozen(_) => Err(ConfigError::not_mutable("ProxyConfig's source")),
            ProxySource::Config(config) => {
                let mut inner = config.borrow_mut();
                inner
                    .as_writable()
                    .ok_or_else(|| ConfigError::not_mutable("ProxyConfig's source"))?
                    .remove(key)
            },
        }
    }
}

impl Reloadable for ProxyConfig {
    /// Reload the source if it is a config; maps have nothing to reload.
    fn reload(&mut self) -> ConfigResult<()> {
        match &self.source {
            ProxySource::Config(config) => config.borrow_mut().reload(),
            ProxySource::Map(_) | ProxySource::Frozen(_) => Ok(()),
        }
    }
}

impl Config for ProxyConfig {
    fn as_writable(&mut self) -> Option<&mut dyn Writable> {
        if self.mutable { Some(self) } else { None }
    }
}
