use serde_json::Value;
use tracing::debug;

use super::{Config, DictConfig, Readable, Reloadable, Writable};
use crate::error::ConfigResult;

/// A config that copies a wrapped config once and serves the copy until
/// [`reload`](Reloadable::reload) is called.
///
/// Staleness between reloads is intended: readers never trigger a refresh.
/// Writes land in the cached copy only. Wrap a shared handle
/// (`Rc<RefCell<_>>`) to keep access to the wrapped config elsewhere.
#[derive(Debug)]
pub struct CachingConfig<C> {
    wrapped: C,
    cache: DictConfig,
}

impl<C: Config> CachingConfig<C> {
    /// Wrap `wrapped`, copying its current contents.
    ///
    /// # Errors
    ///
    /// Propagates read errors from the wrapped config.
    pub fn new(wrapped: C) -> ConfigResult<Self> {
        let cache = wrapped.snapshot()?;
        Ok(Self { wrapped, cache })
    }

    /// The wrapped config.
    pub fn wrapped(&self) -> &C {
        &self.wrapped
    }

    /// Mutable access to the wrapped config. Changes become visible after the
    /// next reload.
    pub fn wrapped_mut(&mut self) -> &mut C {
        &mut self.wrapped
    }

    /// The cached copy.
    pub fn cached(&self) -> &DictConfig {
        &self.cache
    }
}

impl<C: Config> Readable for CachingConfig<C> {
    fn get(&self, key: &str) -> ConfigResult<Value> {
        self.cache.get(key)
    }

    fn keys(&self) -> Vec<String> {
        self.cache.keys()
    }

    fn len(&self) -> usize {
        self.cache.len()
    }

    fn snapshot(&self) -> ConfigResult<DictConfig> {
        Ok(self.cache.clone())
    }
}

impl<C: Config> Writable for CachingConfig<C> {
    fn set(&mut self, key: &str, value: Value) -> ConfigResult<()> {
        self.cache.set(key, value)
    }

    fn remove(&mut self, key: &str) -> ConfigResult<Value> {
        self.cache.remove(key)
    }
}

impl<C: Config> Reloadable for CachingConfig<C> {
    /// Reload the wrapped config, then refresh the cache from it.
    fn reload(&mut self) -> ConfigResult<()> {
        self.wrapped.reload()?;
        self.cache.replace(&self.wrapped)?;
        debug!(keys = self.cache.len(), "refreshed cached config");
        Ok(())
    }
}

impl<C: Config> Config for CachingConfig<C> {
    fn as_writable(&mut self) -> Option<&mut dyn Writable> {
        Some(self)
    }
}
