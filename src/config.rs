//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tradeboard.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".tradeboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Data file locations.
    #[serde(default)]
    pub data: DataConfig,

    /// External analysis process settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served as static assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Page returned for `GET /`, relative to `static_dir`.
    #[serde(default = "default_landing_page")]
    pub landing_page: String,

    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            landing_page: default_landing_page(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_landing_page() -> String {
    "landing.html".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024 // 10MB
}

/// Locations of the template document and the two datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Persisted template document (JSON).
    #[serde(default = "default_template")]
    pub template: PathBuf,

    /// Shipments dataset (CSV).
    #[serde(default = "default_shipments")]
    pub shipments: PathBuf,

    /// Customers dataset (CSV).
    #[serde(default = "default_customers")]
    pub customers: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            shipments: default_shipments(),
            customers: default_customers(),
        }
    }
}

fn default_template() -> PathBuf {
    PathBuf::from("import_export_bi_data.json")
}

fn default_shipments() -> PathBuf {
    PathBuf::from("shipment.csv")
}

fn default_customers() -> PathBuf {
    PathBuf::from("customer.csv")
}

/// External analysis process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Program used to run the analysis scripts.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Script producing the news analysis.
    #[serde(default = "default_news_script")]
    pub news_script: PathBuf,

    /// Script producing the customer insights.
    #[serde(default = "default_customer_script")]
    pub customer_script: PathBuf,

    /// Deadline for a single script run, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Cap on captured bytes per output stream.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            news_script: default_news_script(),
            customer_script: default_customer_script(),
            timeout_seconds: default_timeout(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

fn default_interpreter() -> String {
    "python".to_string()
}

fn default_news_script() -> PathBuf {
    PathBuf::from("newsanalyzer.py")
}

fn default_customer_script() -> PathBuf {
    PathBuf::from("customer_analyzer.py")
}

fn default_timeout() -> u64 {
    120 // sentiment models can take a while to load
}

fn default_max_output_bytes() -> usize {
    16 * 1024 * 1024 // 16MB
}

impl AnalysisConfig {
    /// Deadline for a single script run.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(ref dir) = args.static_dir {
            self.server.static_dir = dir.clone();
        }
        if let Some(ref interpreter) = args.interpreter {
            self.analysis.interpreter = interpreter.clone();
        }
        if let Some(timeout) = args.timeout {
            self.analysis.timeout_seconds = timeout;
        }
    }

    /// Address the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
