//! CLI configuration and argument parsing
//!
//! Settings are resolved with this precedence:
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (with SPILLWAY_ prefix)
//! 3. Settings file given with `--config` (TOML, JSON or YAML)
//! 4. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Using CLI arguments
//! spillway --dir /var/lib/buckets --capacity 20 fill login:alice
//!
//! # Using environment variables
//! export SPILLWAY_DIR=/var/lib/buckets
//! export SPILLWAY_LEAK=30
//! spillway status login:alice
//!
//! # Using a settings file
//! spillway --config spillway.toml fill login:alice 2
//! ```
//!
//! A settings file looks like:
//!
//! ```toml
//! log_level = "debug"
//!
//! [storage]
//! dir = "/var/lib/buckets"
//!
//! [bucket]
//! capacity = 20
//! leak = 30
//! ```

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Directory used when no storage directory is configured
pub const DEFAULT_DIR: &str = "./buckets";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Resolved configuration for one CLI invocation
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Where bucket records are stored
    pub storage: StorageConfig,
    /// Bucket settings, passed as-is to the library for validation
    #[serde(default)]
    pub bucket: Map<String, Value>,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// Local storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `bucket-<id>.json` files
    pub dir: PathBuf,
}

/// Command-line arguments
///
/// Global options can also be set through environment variables with the
/// SPILLWAY_ prefix. CLI arguments take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(
    name = "spillway",
    about = "Inspect and operate persisted leaky buckets",
    long_about = "Inspect and operate leaky buckets stored as JSON files in a local directory.\n\nCommands that change drops leak the bucket first unless --no-leak is given, then save it.\n\nEnvironment variables with SPILLWAY_ prefix are supported. CLI arguments take precedence over environment variables, which take precedence over the settings file."
)]
pub struct Args {
    #[arg(
        long,
        value_name = "PATH",
        help = "Settings file (TOML, JSON or YAML)",
        env = "SPILLWAY_CONFIG"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory holding bucket files [default: ./buckets]",
        env = "SPILLWAY_DIR"
    )]
    pub dir: Option<PathBuf>,

    // Bucket configuration
    #[arg(
        long,
        value_name = "DROPS",
        help = "Bucket capacity [default: 10]",
        env = "SPILLWAY_CAPACITY"
    )]
    pub capacity: Option<u64>,
    #[arg(
        long,
        value_name = "DROPS",
        help = "Drops leaked per minute [default: 10]",
        env = "SPILLWAY_LEAK"
    )]
    pub leak: Option<u64>,

    #[arg(long, help = "Do not leak the bucket before changing it")]
    pub no_leak: bool,

    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace [default: info]",
        env = "SPILLWAY_LOG_LEVEL"
    )]
    pub log_level: Option<String>,

    // Utility options
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Bucket operations
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show the bucket without changing it
    Status { id: String },
    /// Add drops to the bucket
    Fill {
        id: String,
        #[arg(default_value_t = 1, allow_negative_numbers = true)]
        drops: i64,
        /// Accept the drops even if the bucket overflows
        #[arg(long)]
        allow_overflow: bool,
    },
    /// Drain the drops owed since the last update
    Leak { id: String },
    /// Remove drops from the bucket
    Spill {
        id: String,
        #[arg(default_value_t = 1, allow_negative_numbers = true)]
        drops: i64,
    },
    /// Clamp the bucket level down to its capacity
    Overflow { id: String },
    /// Empty the bucket
    Dump { id: String },
    /// Refresh the bucket timestamp
    Touch { id: String },
    /// Remove the stored bucket
    Delete { id: String },
    /// Read or change attached data
    Data {
        #[command(subcommand)]
        action: DataCommand,
    },
}

/// Attached data operations, keys are dot-separated paths
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum DataCommand {
    /// Print the value at KEY, or all data
    Get { id: String, key: Option<String> },
    /// Store a JSON VALUE at KEY (plain text is stored as a string)
    Set {
        id: String,
        key: String,
        value: String,
    },
    /// Remove the value at KEY, or all data
    Forget { id: String, key: Option<String> },
}

impl Config {
    /// Build configuration from parsed arguments, their environment
    /// fallbacks, and the optional settings file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The settings file cannot be read or parsed
    /// - The log level is not recognized
    pub fn load(args: &Args) -> Result<Self> {
        let mut builder = ::config::Config::builder()
            .set_default("storage.dir", DEFAULT_DIR)?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?;

        if let Some(path) = &args.config {
            builder = builder.add_source(::config::File::from(path.as_path()).required(true));
        }

        // Values from clap already include the environment fallback
        let builder = builder
            .set_override_option(
                "storage.dir",
                args.dir.as_ref().map(|dir| dir.display().to_string()),
            )?
            .set_override_option("bucket.capacity", args.capacity)?
            .set_override_option("bucket.leak", args.leak)?
            .set_override_option("log_level", args.log_level.clone())?;

        let config: Config = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .context("failed to load settings")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.storage.dir.as_os_str().is_empty() {
            return Err(anyhow!("Storage directory must not be empty"));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(anyhow!(
                "Invalid log level: {}. Valid options are: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }

        Ok(())
    }

    /// Print all available environment variables and their descriptions
    pub fn print_env_vars() {
        println!("Spillway Environment Variables");
        println!("==============================");
        println!();
        println!("All environment variables use the SPILLWAY_ prefix.");
        println!("CLI arguments take precedence over environment variables.");
        println!("Environment variables take precedence over the settings file.");
        println!();

        println!("General Configuration:");
        println!("  SPILLWAY_CONFIG=<path>        Settings file (TOML, JSON or YAML)");
        println!("  SPILLWAY_DIR=<dir>            Directory holding bucket files [default: {DEFAULT_DIR}]");
        println!(
            "  SPILLWAY_LOG_LEVEL=<level>    Log level: error, warn, info, debug, trace [default: {DEFAULT_LOG_LEVEL}]"
        );
        println!();

        println!("Bucket Configuration:");
        println!("  SPILLWAY_CAPACITY=<drops>     Bucket capacity [default: 10]");
        println!("  SPILLWAY_LEAK=<drops>         Drops leaked per minute [default: 10]");
        println!();

        println!("Examples:");
        println!("  # Keep buckets under /var/lib/buckets with room for 20 drops");
        println!("  export SPILLWAY_DIR=/var/lib/buckets");
        println!("  export SPILLWAY_CAPACITY=20");
        println!();
        println!("  # Run a command (CLI args override env vars)");
        println!("  spillway --capacity 5 fill login:alice  # Will use capacity 5, not 20");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn args(argv: &[&str]) -> Args {
        let mut full = vec!["spillway"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::load(&args(&["status", "a"])).unwrap();
        assert_eq!(config.storage.dir, PathBuf::from(DEFAULT_DIR));
        assert_eq!(config.log_level, "info");
        assert!(config.bucket.is_empty());
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::load(&args(&[
            "--dir",
            "/tmp/buckets",
            "--capacity",
            "25",
            "--leak",
            "5",
            "--log-level",
            "debug",
            "status",
            "a",
        ]))
        .unwrap();

        assert_eq!(config.storage.dir, PathBuf::from("/tmp/buckets"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.bucket.get("capacity"), Some(&json!(25)));
        assert_eq!(config.bucket.get("leak"), Some(&json!(5)));
    }

    #[test]
    fn test_settings_file_with_cli_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spillway.toml");
        fs::write(
            &path,
            "log_level = \"warn\"\n\n[storage]\ndir = \"/srv/buckets\"\n\n[bucket]\ncapacity = 40\nleak = 12\n",
        )
        .unwrap();

        let config = Config::load(&args(&[
            "--config",
            path.to_str().unwrap(),
            "--leak",
            "90",
            "status",
            "a",
        ]))
        .unwrap();

        assert_eq!(config.storage.dir, PathBuf::from("/srv/buckets"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.bucket.get("capacity"), Some(&json!(40)));
        assert_eq!(config.bucket.get("leak"), Some(&json!(90)));
    }

    #[test]
    fn test_non_integer_file_setting_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spillway.toml");
        fs::write(&path, "[bucket]\ncapacity = \"lots\"\n").unwrap();

        let config =
            Config::load(&args(&["--config", path.to_str().unwrap(), "status", "a"])).unwrap();
        assert!(spillway::BucketConfig::from_settings(&config.bucket).is_err());
    }

    #[test]
    fn test_missing_settings_file() {
        let result = Config::load(&args(&["--config", "/definitely/not/here.toml", "status", "a"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let result = Config::load(&args(&["--log-level", "loud", "status", "a"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            args(&["fill", "k"]).command,
            Some(Command::Fill {
                id: "k".to_string(),
                drops: 1,
                allow_overflow: false
            })
        );
        assert_eq!(
            args(&["fill", "k", "3", "--allow-overflow"]).command,
            Some(Command::Fill {
                id: "k".to_string(),
                drops: 3,
                allow_overflow: true
            })
        );
        assert_eq!(
            args(&["spill", "k", "-2"]).command,
            Some(Command::Spill {
                id: "k".to_string(),
                drops: -2
            })
        );
        assert_eq!(
            args(&["data", "set", "k", "user.id", "42"]).command,
            Some(Command::Data {
                action: DataCommand::Set {
                    id: "k".to_string(),
                    key: "user.id".to_string(),
                    value: "42".to_string()
                }
            })
        );
        assert_eq!(
            args(&["data", "get", "k"]).command,
            Some(Command::Data {
                action: DataCommand::Get {
                    id: "k".to_string(),
                    key: None
                }
            })
        );
        assert!(args(&["--no-leak", "leak", "k"]).no_leak);
    }
}
