//! The missing / null / present tri-state.
//!
//! A config key can be absent entirely, present with a `null` value, or
//! present with a concrete value. Settings treat the first two differently
//! (`on_missing` vs `on_null`), so the distinction is carried explicitly
//! instead of folding both into `Option`.

use serde_json::Value;

use crate::config::Readable;
use crate::error::ConfigResult;

/// The value stored under a key, or the lack of one.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Slot {
    /// The key is not present at all.
    #[default]
    Missing,
    /// The key is present and holds `null`.
    Null,
    /// The key holds a non-null value.
    Present(Value),
}

impl Slot {
    /// Look `key` up in `config`. A not-found error becomes [`Slot::Missing`];
    /// every other error is propagated.
    ///
    /// # Errors
    ///
    /// Returns any error from `config.get` other than a not-found error.
    pub fn lookup<R: Readable + ?Sized>(config: &R, key: &str) -> ConfigResult<Self> {
        match config.get(key) {
            Ok(value) => Ok(Self::from(value)),
            Err(e) if e.is_not_found() => Ok(Self::Missing),
            Err(e) => Err(e),
        }
    }

    /// Whether the key is absent.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Whether the key holds `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the concrete value, if any.
    #[must_use]
    pub fn as_present(&self) -> Option<&Value> {
        match self {
            Self::Present(v) => Some(v),
            Self::Missing | Self::Null => None,
        }
    }

    /// `None` for a missing key, `Some(Value::Null)` for a null one.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Missing => None,
            Self::Null => Some(Value::Null),
            Self::Present(v) => Some(v),
        }
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        if value.is_null() {
            Self::Null
        } else {
            Self::Present(value)
        }
    }
}

impl From<Option<Value>> for Slot {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Missing, Self::from)
    }
}
