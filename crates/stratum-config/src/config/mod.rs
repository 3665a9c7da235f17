//! The config capability set and its in-memory implementations.
//!
//! A config is a mapping from string keys to untyped [`Value`]s. Capabilities
//! are split into three traits so that adapters only implement what their
//! source supports:
//!
//! - [`Readable`]: lookup, key listing, snapshots.
//! - [`Reloadable`]: re-read the backing store.
//! - [`Writable`]: insert and remove keys.
//!
//! [`Config`] joins the first two and answers the question "can I write to
//! you?" through [`Config::as_writable`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};

mod caching;
mod composite;
mod dict;
mod proxy;

pub use caching::CachingConfig;
pub use composite::CompositeConfig;
pub use dict::DictConfig;
pub use proxy::{ProxyConfig, ProxySource};

/// Read access to a config.
pub trait Readable {
    /// Look up `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::KeyNotFound`] (or another not-found variant)
    /// when the key is absent.
    fn get(&self, key: &str) -> ConfigResult<Value>;

    /// Every key currently present, each exactly once.
    fn keys(&self) -> Vec<String>;

    /// Number of keys.
    fn len(&self) -> usize {
        self.keys().len()
    }

    /// Whether the config has no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` is present.
    fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_ok()
    }

    /// Copy the current contents into an independent [`DictConfig`].
    ///
    /// Keys that disappear between listing and reading are skipped.
    ///
    /// # Errors
    ///
    /// Propagates any read error other than not-found.
    fn snapshot(&self) -> ConfigResult<DictConfig> {
        let mut entries = Map::new();
        for key in self.keys() {
            match self.get(&key) {
                Ok(value) => {
                    entries.insert(key, value);
                },
                Err(e) if e.is_not_found() => {},
                Err(e) => return Err(e),
            }
        }
        Ok(DictConfig::from(entries))
    }
}

/// Write access to a config.
pub trait Writable {
    /// Insert or overwrite `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be written (for example a
    /// projection rejecting it).
    fn set(&mut self, key: &str, value: Value) -> ConfigResult<()>;

    /// Remove `key`, returning its previous value.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the key is absent.
    fn remove(&mut self, key: &str) -> ConfigResult<Value>;
}

/// Refreshing a config from its backing store.
pub trait Reloadable {
    /// Re-read the backing store. Sources that cannot refresh, or that always
    /// read fresh data, treat this as a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be re-read.
    fn reload(&mut self) -> ConfigResult<()>;
}

/// A readable, reloadable config that may also be writable.
pub trait Config: Readable + Reloadable + fmt::Debug {
    /// The write capability of this config, if it has one.
    fn as_writable(&mut self) -> Option<&mut dyn Writable> {
        None
    }
}

/// Shared handles let several owners (a proxy, a cache, the caller) observe
/// the same config. Borrowing follows the single-threaded model: callers must
/// not hold a borrow across calls into the config.
impl<C: Config + ?Sized> Readable for Rc<RefCell<C>> {
    fn get(&self, key: &str) -> ConfigResult<Value> {
        self.borrow().get(key)
    }

    fn keys(&self) -> Vec<String> {
        self.borrow().keys()
    }

    fn len(&self) -> usize {
        self.borrow().len()
    }
}

impl<C: Config + ?Sized> Reloadable for Rc<RefCell<C>> {
    fn reload(&mut self) -> ConfigResult<()> {
        self.borrow_mut().reload()
    }
}

impl<C: Config + ?Sized> Writable for Rc<RefCell<C>> {
    fn set(&mut self, key: &str, value: Value) -> ConfigResult<()> {
        let mut inner = self.borrow_mut();
        let writable = inner
            .as_writable()
            .ok_or_else(|| ConfigError::not_mutable("shared config"))?;
        writable.set(key, value)
    }

    fn remove(&mut self, key: &str) -> ConfigResult<Value> {
        let mut inner = self.borrow_mut();
        let writable = inner
            .as_writable()
            .ok_or_else(|| ConfigError::not_mutable("shared config"))?;
        writable.remove(key)
    }
}

impl<C: Config + ?Sized> Config for Rc<RefCell<C>> {
    fn as_writable(&mut self) -> Option<&mut dyn Writable> {
        let writable = self.borrow_mut().as_writable().is_some();
        if writable { Some(self) } else { None }
    }
}

/// Wrap `config` in a shared handle.
pub fn shared<C: Config>(config: C) -> Rc<RefCell<C>> {
    Rc::new(RefCell::new(config))
}

/// Conversion into a boxed layer for a [`CompositeConfig`].
///
/// Configs are boxed as-is; raw maps become a [`DictConfig`].
pub trait IntoLayer {
    /// Box `self` as a layer.
    fn into_layer(self) -> Box<dyn Config>;
}

impl<C: Config + 'static> IntoLayer for C {
    fn into_layer(self) -> Box<dyn Config> {
        Box::new(self)
    }
}

impl IntoLayer for Map<String, Value> {
    fn into_layer(self) -> Box<dyn Config> {
        Box::new(DictConfig::from(self))
    }
}

impl IntoLayer for Box<dyn Config> {
    fn into_layer(self) -> Box<dyn Config> {
        self
    }
}

/// Build a `Vec<Box<dyn Config>>` from configs or raw maps, lowest priority
/// first.
///
/// ```
/// use serde_json::{Map, json};
/// use stratum_config::{DictConfig, layers};
///
/// let defaults = DictConfig::from_value(json!({"msg": "Hello!"})).unwrap();
/// let overrides: Map<String, serde_json::Value> = Map::new();
/// let stack = layers![defaults, overrides];
/// assert_eq!(stack.len(), 2);
/// ```
#[macro_export]
macro_rules! layers {
    ($($layer:expr),* $(,)?) => {
        vec![$($crate::IntoLayer::into_layer($layer)),*]
    };
}
