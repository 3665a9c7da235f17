#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Config sources backed by the outside world.
//!
//! - [`EnvConfig`]: environment variables, usually behind an
//!   [`EnvProjection`] that strips an application prefix.
//! - [`ArgsConfig`]: values explicitly passed on a `clap` command line.
//! - [`FileConfig`]: a JSON or TOML file, re-read on reload.
//!
//! Each one is a [`stratum_config::Config`] and can be stacked in a
//! composite or fed to a schema.

/// Command-line arguments.
pub mod args;
/// Environment variables.
pub mod env;
/// Configuration files.
pub mod file;

pub use args::{ArgsConfig, ArgsProjection};
pub use env::{EnvConfig, EnvProjection, KeyCase};
pub use file::{FileConfig, FileFormat, FileOptions};
