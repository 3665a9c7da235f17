#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration with key projection, caching and schema validation.
//!
//! Configuration values come from several sources (defaults, environment,
//! files, command line). Each source is a [`Config`]: a string-keyed mapping
//! of JSON values that can be reloaded. Sources are stacked in a
//! [`CompositeConfig`] where the last layer wins, optionally renamed through a
//! [`ProjectedConfig`] or frozen by a [`CachingConfig`].
//!
//! A [`ConfigSchema`] (or the [`config_schema!`] macro) declares the expected
//! settings. Reading through a [`SpecValidatedConfig`] resolves a key across
//! the layers, then applies the setting's default, null policy, type check
//! and validators.
//!
//! # Usage
//!
//! ```rust
//! use serde_json::json;
//! use stratum_config::{ConfigSchema, DictConfig, Setting, layers};
//!
//! let schema = ConfigSchema::builder("ExampleToolConfig")
//!     .setting("message", Setting::string().with_default("Hello!"))
//!     .setting("config_file", Setting::string().with_null_default())
//!     .build()
//!     .unwrap();
//!
//! let file = DictConfig::from_value(json!({"message": "Hi"})).unwrap();
//! let cli = DictConfig::new();
//! let config = schema.load(layers![file, cli]).unwrap();
//! assert_eq!(config.get_str("message").unwrap(), "Hi");
//! ```
//!
//! # Precedence
//!
//! Layers are listed lowest priority first. A layer that does not have a key
//! defers to the layers below it; a layer holding `null` shadows them. Whether
//! that `null` then becomes the setting's default is the setting's `on_null`
//! policy.

/// Config capabilities and in-memory configs.
pub mod config;
/// Configuration error types.
pub mod error;
/// Thread-local application-wide config holder.
pub mod initializable;
/// Key renaming between a config and its source.
pub mod projection;
/// Named schemas and the declaration macro.
pub mod schema;
/// Field specifications.
pub mod setting;
/// The missing / null / present tri-state.
pub mod slot;
/// Setting collections.
pub mod spec;
/// Schema-checked config stacks.
pub mod validated;
/// Value validators.
pub mod validation;

// Re-export primary types at the crate root.
pub use config::{
    CachingConfig, CompositeConfig, Config, DictConfig, IntoLayer, ProxyConfig, ProxySource,
    Readable, Reloadable, Writable, shared,
};
pub use error::{ConfigError, ConfigResult, ReloadFailure};
pub use initializable::InitializableConfig;
pub use projection::{BasicProjection, ConfigProjection, ProjectedConfig, verify_projection};
pub use schema::{ConfigSchema, ConfigSchemaBuilder};
pub use setting::{MissingAction, Setting, SettingKind};
pub use slot::Slot;
pub use spec::ConfigSpec;
pub use validated::SpecValidatedConfig;
pub use validation::{ValidationContext, Validator, ValueType};
