//! Key renaming and filtering between a config and its source.
//!
//! A projection maps between two key spaces: the *key* space seen by users of
//! a [`ProjectedConfig`] and the *sourcekey* space of the wrapped config. It
//! must be consistent on its relevant domain:
//!
//! - `sourcekey_to_key(key_to_sourcekey(k)) == k` for every relevant key `k`
//! - `key_to_sourcekey(sourcekey_to_key(sk)) == sk` for every relevant
//!   sourcekey `sk`
//! - `is_relevant_key(k)` iff `is_relevant_sourcekey(key_to_sourcekey(k))`
//!
//! Keys that would break the round trip must be classified as not relevant.
//! [`BasicProjection`] does that automatically.

mod basic;
mod projected;

pub use basic::BasicProjection;
pub use projected::ProjectedConfig;

use tracing::warn;

use crate::error::{ConfigError, ConfigResult};

/// A bidirectional key mapping with relevance filters.
pub trait ConfigProjection {
    /// Should a projected key be accepted?
    fn is_relevant_key(&self, key: &str) -> bool;

    /// Should a source key be exposed?
    fn is_relevant_sourcekey(&self, sourcekey: &str) -> bool;

    /// Map a projected key to the source key space.
    fn key_to_sourcekey(&self, key: &str) -> String;

    /// Map a source key to the projected key space.
    fn sourcekey_to_key(&self, sourcekey: &str) -> String;
}

impl<P: ConfigProjection + ?Sized> ConfigProjection for Box<P> {
    fn is_relevant_key(&self, key: &str) -> bool {
        (**self).is_relevant_key(key)
    }

    fn is_relevant_sourcekey(&self, sourcekey: &str) -> bool {
        (**self).is_relevant_sourcekey(sourcekey)
    }

    fn key_to_sourcekey(&self, key: &str) -> String {
        (**self).key_to_sourcekey(key)
    }

    fn sourcekey_to_key(&self, sourcekey: &str) -> String {
        (**self).sourcekey_to_key(sourcekey)
    }
}

/// Check `projection` against concrete source keys.
///
/// Every sourcekey the projection calls relevant must round-trip through the
/// key space and map to a key the projection also accepts.
///
/// # Errors
///
/// Returns [`ConfigError::DefinitionError`] naming the first inconsistent key.
pub fn verify_projection<'a, P, I>(projection: &P, sourcekeys: I) -> ConfigResult<()>
where
    P: ConfigProjection + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    for sourcekey in sourcekeys {
        if !projection.is_relevant_sourcekey(sourcekey) {
            continue;
        }
        let key = projection.sourcekey_to_key(sourcekey);
        let back = projection.key_to_sourcekey(&key);
        if back != sourcekey {
            warn!(sourcekey, key = %key, back = %back, "projection round trip mismatch");
            return Err(ConfigError::definition(format!(
                "projection maps source key '{sourcekey}' to '{key}', which maps back to '{back}'"
            )));
        }
        if !projection.is_relevant_key(&key) {
            return Err(ConfigError::definition(format!(
                "projection exposes source key '{sourcekey}' as '{key}' but rejects that key"
            )));
        }
    }
    Ok(())
}
