//! The example tool's settings and how its layers are assembled.

use anyhow::Context;
use clap::{ArgMatches, Command};
use stratum_config::{Setting, config_schema, layers};
use stratum_sources::{ArgsConfig, ArgsProjection, EnvConfig, FileConfig, KeyCase};
use tracing::{debug, info};

/// Prefix of the environment variables the tool reads.
pub(crate) const ENV_PREFIX: &str = "EXAMPLE_";

/// Command-line arguments that are settings (as opposed to actions like
/// `--show`).
const SETTING_ARGS: [&str; 2] = ["message", "config_file"];

config_schema! {
    /// Settings of the example tool.
    pub(crate) struct ExampleToolConfig {
        message: String = Setting::string().with_default("Hello!"),
        config_file: Option<String> = Setting::string().with_null_default(),
    }
}

/// Build the tool's config from `matches`, as parsed by `command`. Priority
/// from low to high: environment, config file (if `config_file` resolves to a
/// path), command line.
pub(crate) fn resolve(
    env: EnvConfig,
    command: &Command,
    matches: &ArgMatches,
) -> anyhow::Result<ExampleToolConfig> {
    let args = ArgsConfig::from_matches(command, matches)
        .projected(ArgsProjection::new().relevant_keys(SETTING_ARGS));
    let mut config = ExampleToolConfig::load_unvalidated(layers![
        env.projected(ENV_PREFIX, KeyCase::Lower),
        args,
    ])?;

    if let Some(path) = config.config_file()? {
        let file = FileConfig::load(&path)
            .with_context(|| format!("failed to load config file {path}"))?;
        config.insert_layer(1, file)?;
        debug!(path = %path, "config file layered below the command line");
    }

    config.validate().context("invalid configuration")?;
    info!(config = %config, "configuration resolved");
    Ok(config)
}
