use std::fmt;
use std::io;

use thiserror::Error;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The key is absent from every layer that was consulted.
    #[error("Key '{key}' not found")]
    KeyNotFound {
        /// Key that was looked up.
        key: String,
    },

    /// The key was rejected by a projection before reaching its source.
    #[error("Key '{key}' not relevant")]
    KeyNotRelevant {
        /// Key that the projection rejected.
        key: String,
    },

    /// The name is not declared by the config spec.
    #[error("Unknown setting, not in config spec: {name}")]
    UnknownSetting {
        /// Setting name that was requested.
        name: String,
    },

    /// A write or delete hit a config whose source cannot be mutated.
    #[error("{target} is not mutable")]
    NotMutable {
        /// Description of the read-only config.
        target: String,
    },

    /// A setting value failed its missing/null policy, type check or a validator.
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// Field that failed validation (dotted for nested settings).
        field: String,
        /// Validation failure description.
        message: String,
    },

    /// The config contains keys the spec does not declare.
    #[error("Unexpected fields in the config: {}", .fields.join(","))]
    UnexpectedFields {
        /// Undeclared keys, sorted.
        fields: Vec<String>,
    },

    /// A validated value could not be converted to the requested Rust type.
    #[error("Cannot convert setting '{field}': {source}")]
    ConversionError {
        /// Setting that was being converted.
        field: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A spec, schema or projection was defined inconsistently.
    #[error("Invalid configuration definition: {message}")]
    DefinitionError {
        /// What is wrong with the definition.
        message: String,
    },

    /// One or more layers failed to reload.
    #[error("Failed to reload {} layer(s): {}", .failures.len(), ReloadSummary(.failures))]
    ReloadError {
        /// Every failing layer, in layer order.
        failures: Vec<ReloadFailure>,
    },

    /// Failed to read a configuration file.
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// Path to the config file that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to parse a configuration file.
    #[error("Failed to parse config file at {path}: {message}")]
    ParseError {
        /// Path to the config file that failed to parse.
        path: String,
        /// Parser error description.
        message: String,
    },
}

/// A layer that failed during a composite reload.
#[derive(Debug)]
pub struct ReloadFailure {
    /// Position of the layer in the composite (0 = lowest priority).
    pub index: usize,
    /// The layer's reload error.
    pub error: ConfigError,
}

struct ReloadSummary<'a>(&'a [ReloadFailure]);

impl fmt::Display for ReloadSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "layer {}: {}", failure.index, failure.error)?;
        }
        Ok(())
    }
}

impl ConfigError {
    /// Shorthand for a [`ConfigError::KeyNotFound`].
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Shorthand for a [`ConfigError::ValidationError`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`ConfigError::DefinitionError`].
    pub fn definition(message: impl Into<String>) -> Self {
        Self::DefinitionError {
            message: message.into(),
        }
    }

    /// Shorthand for a [`ConfigError::NotMutable`].
    pub fn not_mutable(target: impl Into<String>) -> Self {
        Self::NotMutable {
            target: target.into(),
        }
    }

    /// Whether this error means "the key is absent" and callers may fall back.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound { .. } | Self::KeyNotRelevant { .. } | Self::UnknownSetting { .. }
        )
    }

    /// Whether this error came from setting validation.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError { .. } | Self::UnexpectedFields { .. })
    }

    /// Re-root a validation error raised inside a nested dict setting under
    /// `parent`, so the reported field reads `parent.child`.
    #[must_use]
    pub fn nested_under(self, parent: &str) -> Self {
        match self {
            Self::ValidationError { field, message } => Self::ValidationError {
                field: format!("{parent}.{field}"),
                message,
            },
            Self::UnexpectedFields { fields } => Self::ValidationError {
                field: parent.to_owned(),
                message: format!("unexpected fields: {}", fields.join(",")),
            },
            other => other,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
