mod commands;
mod config;

use anyhow::{Result, bail};
use clap::Parser;
use spillway::{LocalAdapter, SystemClock};

use crate::commands::Runner;
use crate::config::{Args, Config};

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_env_vars {
        Config::print_env_vars();
        return Ok(());
    }

    // Parse configuration from CLI arguments, environment variables and the settings file
    let config = Config::load(&args)?;

    // Initialize logging on stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("spillway={}", config.log_level.to_lowercase()).parse()?),
        )
        .init();

    let Some(command) = &args.command else {
        bail!("no command given, run `spillway --help` for usage");
    };

    tracing::debug!("Using bucket directory {}", config.storage.dir.display());

    let adapter = LocalAdapter::new(&config.storage.dir);
    let runner = Runner::new(adapter, SystemClock, &config.bucket, !args.no_leak)?;

    let output = runner.execute(command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
