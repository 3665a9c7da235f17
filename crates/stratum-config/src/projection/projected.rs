use serde_json::Value;

use super::{ConfigProjection, verify_projection};
use crate::config::{Config, Readable, Reloadable, Writable};
use crate::error::{ConfigError, ConfigResult};

/// A config that renames and filters the keys of a subconfig.
///
/// Only keys the projection calls relevant are visible. Reads, writes and
/// removals of any other key fail with [`ConfigError::KeyNotRelevant`]
/// without reaching the subconfig.
#[derive(Debug)]
pub struct ProjectedConfig<C, P> {
    subconfig: C,
    projection: P,
}

impl<C: Config, P: ConfigProjection> ProjectedConfig<C, P> {
    /// Project `subconfig` through `projection`.
    pub fn new(subconfig: C, projection: P) -> Self {
        Self {
            subconfig,
            projection,
        }
    }

    /// Like [`new`](Self::new), but first verifies the projection against the
    /// subconfig's current keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DefinitionError`] if a relevant source key does not
    /// round-trip through the projection.
    pub fn checked(subconfig: C, projection: P) -> ConfigResult<Self> {
        let sourcekeys = subconfig.keys();
        verify_projection(&projection, sourcekeys.iter().map(String::as_str))?;
        Ok(Self::new(subconfig, projection))
    }

    /// The wrapped config.
    pub fn subconfig(&self) -> &C {
        &self.subconfig
    }

    /// Mutable access to the wrapped config.
    pub fn subconfig_mut(&mut self) -> &mut C {
        &mut self.subconfig
    }

    /// The projection in use.
    pub fn projection(&self) -> &P {
        &self.projection
    }

    fn sourcekey_for(&self, key: &str) -> ConfigResult<String> {
        if self.projection.is_relevant_key(key) {
            Ok(self.projection.key_to_sourcekey(key))
        } else {
            Err(ConfigError::KeyNotRelevant {
                key: key.to_owned(),
            })
        }
    }

    fn writable_subconfig(&mut self) -> ConfigResult<&mut dyn Writable> {
        self.subconfig
            .as_writable()
            .ok_or_else(|| ConfigError::not_mutable("ProjectedConfig's subconfig"))
    }

    fn relevant_sourcekeys(&self) -> impl Iterator<Item = String> + '_ {
        self.subconfig
            .keys()
            .into_iter()
            .filter(|sk| self.projection.is_relevant_sourcekey(sk))
    }
}

impl<C: Config, P: ConfigProjection> Readable for ProjectedConfig<C, P> {
    fn get(&self, key: &str) -> ConfigResult<Value> {
        let sourcekey = self.sourcekey_for(key)?;
        self.subconfig.get(&sourcekey)
    }

    fn keys(&self) -> Vec<String> {
        self.relevant_sourcekeys()
            .map(|sk| self.projection.sourcekey_to_key(&sk))
            .collect()
    }

    fn len(&self) -> usize {
        self.relevant_sourcekeys().count()
    }
}

impl<C: Config, P: ConfigProjection> Writable for ProjectedConfig<C, P> {
    fn set(&mut self, key: &str, value: Value) -> ConfigResult<()> {
        let sourcekey = self.sourcekey_for(key);
        self.writable_subconfig()?.set(&sourcekey?, value)
    }

    fn remove(&mut self, key: &str) -> ConfigResult<Value> {
        let sourcekey = self.sourcekey_for(key);
        self.writable_subconfig()?.remove(&sourcekey?)
    }
}

impl<C: Config, P: ConfigProjection> Reloadable for ProjectedConfig<C, P> {
    fn reload(&mut self) -> ConfigResult<()> {
        self.subconfig.reload()
    }
}

impl<C, P> Config for ProjectedConfig<C, P>
where
    C: Config,
    P: ConfigProjection + std::fmt::Debug,
{
    fn as_writable(&mut self) -> Option<&mut dyn Writable> {
        if self.subconfig.as_writable().is_some() {
            Some(self)
        } else {
            None
        }
    }
}
