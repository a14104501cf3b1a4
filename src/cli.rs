//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Tradeboard - composite BI dashboard feed
///
/// Serves the dashboard document built from the template, the shipment
/// and customer datasets, and the external analysis scripts.
///
/// Examples:
///   tradeboard
///   tradeboard --port 8080 --interpreter python3
///   tradeboard --config deploy/tradeboard.toml --verbose
///   tradeboard --init-config
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .tradeboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, env = "TRADEBOARD_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "TRADEBOARD_PORT")]
    pub port: Option<u16>,

    /// Directory served as static assets
    #[arg(long, value_name = "DIR")]
    pub static_dir: Option<PathBuf>,

    /// Program used to run the analysis scripts
    #[arg(long, value_name = "PROGRAM", env = "TRADEBOARD_PYTHON")]
    pub interpreter: Option<String>,

    /// Deadline for each analysis script, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .tradeboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.port == Some(0) {
            return Err("Port must be between 1 and 65535".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(ref interpreter) = self.interpreter {
            if interpreter.trim().is_empty() {
                return Err("Interpreter must not be empty".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref dir) = self.static_dir {
            if !dir.is_dir() {
                return Err(format!("Static directory does not exist: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "tradeboard",
            "--port",
            "8080",
            "--interpreter",
            "python3",
            "--timeout",
            "15",
        ])
        .unwrap();

        assert_eq!(args.port, Some(8080));
        assert_eq!(args.interpreter.as_deref(), Some("python3"));
        assert_eq!(args.timeout, Some(15));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_values() {
        let args = Args {
            port: Some(0),
            ..Args::default()
        };
        assert!(args.validate().is_err());

        let args = Args {
            timeout: Some(0),
            ..Args::default()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = Args {
            verbose: true,
            quiet: true,
            ..Args::default()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = Args::default();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = crate::config::Config::default();
        let args = Args {
            port: Some(9000),
            interpreter: Some("python3".to_string()),
            ..Args::default()
        };

        config.merge_with_args(&args);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.analysis.interpreter, "python3");
        assert_eq!(config.analysis.timeout_seconds, 120);
    }
}
