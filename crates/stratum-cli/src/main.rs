//! Stratum example tool.
//!
//! Prints a message taken, from lowest to highest priority, from the
//! built-in default, `EXAMPLE_*` environment variables, a JSON or TOML config
//! file and the command line.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;

use clap::{CommandFactory, FromArgMatches, Parser};
use serde_json::Value;
use stratum_sources::EnvConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Command-line interface of the example tool.
#[derive(Parser, Debug)]
#[command(name = "stratum-example")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Path to a JSON or TOML config file.
    #[arg(long)]
    config_file: Option<String>,

    /// The message that will be printed.
    #[arg(long)]
    message: Option<String>,

    /// Print the resolved configuration as JSON before the message.
    #[arg(long)]
    show: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let command = Cli::command();
    let matches = command.clone().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    debug!(
        config_file = ?cli.config_file,
        message = ?cli.message,
        show = cli.show,
        "parsed command line"
    );

    let config = config::resolve(EnvConfig::process(), &command, &matches)?;

    if cli.show {
        let resolved = Value::Object(config.validate()?);
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    }
    println!("{}", config.message()?);
    Ok(())
}
