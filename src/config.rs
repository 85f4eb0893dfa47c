//! Configuration management for slide-sync.
//!
//! Command-line arguments are parsed with clap. Every option of the `serve`
//! command can also be set through an environment variable with the
//! `SLIDESYNC_` prefix.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use slide_sync::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Apply(config) => println!("Applying {}", config.payload.display()),
//!     Command::Validate(config) => println!("Validating {}", config.payload.display()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `SLIDESYNC_HOST` - Server bind address (default: 0.0.0.0)
//! - `SLIDESYNC_PORT` - Server port (default: 3000)
//! - `SLIDESYNC_DOCUMENT` - JSON file the document is loaded from and saved to
//! - `SLIDESYNC_CORS_ORIGINS` - Allowed CORS origins, comma-separated
//! - `SLIDESYNC_MAX_SLIDES` - Maximum slides per payload (default: 100)
//! - `SLIDESYNC_MAX_BLOCKS` - Maximum blocks per slide (default: 50)
//! - `SLIDESYNC_MAX_TEXT_CHARS` - Text truncation limit (default: 100000)
//! - `SLIDESYNC_ALLOWED_HOSTS` - Link and image allow-list, comma-separated

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::payload::{
    ValidatorConfig, DEFAULT_MAX_BLOCKS, DEFAULT_MAX_SLIDES, DEFAULT_MAX_TEXT_CHARS,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// CLI Arguments
// =============================================================================

/// slide-sync - Reconciles a slide deck against a desired list of slides.
#[derive(Parser, Debug, Clone)]
#[command(name = "slide-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeConfig),

    /// Reconcile a document file against a payload file once.
    Apply(ApplyConfig),

    /// Validate and sanitize a payload file without rendering it.
    Validate(ValidateConfig),
}

// =============================================================================
// Payload Limits
// =============================================================================

/// Validator limits shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct LimitsConfig {
    /// Maximum number of slides in one payload.
    #[arg(long, default_value_t = DEFAULT_MAX_SLIDES, env = "SLIDESYNC_MAX_SLIDES")]
    pub max_slides: usize,

    /// Maximum number of blocks in one slide.
    #[arg(long, default_value_t = DEFAULT_MAX_BLOCKS, env = "SLIDESYNC_MAX_BLOCKS")]
    pub max_blocks: usize,

    /// Text fields longer than this many characters are truncated.
    #[arg(long, default_value_t = DEFAULT_MAX_TEXT_CHARS, env = "SLIDESYNC_MAX_TEXT_CHARS")]
    pub max_text_chars: usize,

    /// Hosts that links and remote images may point to (comma-separated).
    ///
    /// Subdomains of a listed host are allowed too. If not specified, a
    /// built-in list is used.
    #[arg(long, env = "SLIDESYNC_ALLOWED_HOSTS", value_delimiter = ',')]
    pub allowed_hosts: Option<Vec<String>>,
}

impl LimitsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_slides == 0 {
            return Err("max_slides must be greater than 0".to_string());
        }
        if self.max_blocks == 0 {
            return Err("max_blocks must be greater than 0".to_string());
        }
        if self.max_text_chars == 0 {
            return Err("max_text_chars must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Build the validator configuration these options describe.
    pub fn validator_config(&self) -> ValidatorConfig {
        let config = ValidatorConfig {
            max_slides: self.max_slides,
            max_blocks: self.max_blocks,
            max_text_chars: self.max_text_chars,
            ..ValidatorConfig::default()
        };

        match &self.allowed_hosts {
            Some(hosts) => config.with_allowed_hosts(hosts),
            None => config,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_slides: DEFAULT_MAX_SLIDES,
            max_blocks: DEFAULT_MAX_BLOCKS,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            allowed_hosts: None,
        }
    }
}

// =============================================================================
// Serve Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "SLIDESYNC_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "SLIDESYNC_PORT")]
    pub port: u16,

    /// Document file to start from.
    ///
    /// Slides tagged in this document are reattached on the first run, and the
    /// document is written back after every successful run.
    #[arg(long, env = "SLIDESYNC_DOCUMENT")]
    pub document: Option<PathBuf>,

    #[command(flatten)]
    pub limits: LimitsConfig,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "SLIDESYNC_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("host must not be empty".to_string());
        }
        self.limits.validate()
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Apply Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ApplyConfig {
    /// JSON file with a `generate-slides` message or a bare slide list.
    #[arg(long)]
    pub payload: PathBuf,

    /// Document file to reconcile. Created if it does not exist.
    #[arg(long)]
    pub document: PathBuf,

    #[command(flatten)]
    pub limits: LimitsConfig,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ApplyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.payload == self.document {
            return Err("payload and document must be different files".to_string());
        }
        self.limits.validate()
    }
}

// =============================================================================
// Validate Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ValidateConfig {
    /// JSON file with a `generate-slides` message or a bare slide list.
    #[arg(long)]
    pub payload: PathBuf,

    #[command(flatten)]
    pub limits: LimitsConfig,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_config() -> ServeConfig {
        ServeConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            document: None,
            limits: LimitsConfig::default(),
            cors_origins: None,
            verbose: false,
            no_tracing: false,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(serve_config().validate().is_ok());
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(serve_config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_limits() {
        let mut config = serve_config();
        config.limits.max_slides = 0;
        assert!(config.validate().unwrap_err().contains("max_slides"));

        let mut config = serve_config();
        config.limits.max_blocks = 0;
        assert!(config.validate().is_err());

        let mut config = serve_config();
        config.limits.max_text_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validator_config_from_limits() {
        let limits = LimitsConfig {
            max_slides: 10,
            allowed_hosts: Some(vec![" Example.COM ".to_string()]),
            ..LimitsConfig::default()
        };

        let config = limits.validator_config();
        assert_eq!(config.max_slides, 10);
        assert_eq!(config.max_blocks, DEFAULT_MAX_BLOCKS);
        assert_eq!(config.allowed_hosts, vec!["example.com".to_string()]);

        let config = LimitsConfig::default().validator_config();
        assert_eq!(config, ValidatorConfig::default());
    }

    #[test]
    fn test_apply_rejects_same_file() {
        let config = ApplyConfig {
            payload: PathBuf::from("deck.json"),
            document: PathBuf::from("deck.json"),
            limits: LimitsConfig::default(),
            verbose: false,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from([
            "slide-sync",
            "serve",
            "--port",
            "4000",
            "--cors-origins",
            "https://a.example,https://b.example",
        ])
        .unwrap();
        let Command::Serve(config) = cli.into_command() else {
            panic!("expected serve");
        };
        assert_eq!(config.port, 4000);
        assert_eq!(config.cors_origins.map(|o| o.len()), Some(2));

        let cli = Cli::try_parse_from([
            "slide-sync",
            "apply",
            "--payload",
            "payload.json",
            "--document",
            "deck.json",
            "--max-slides",
            "5",
        ])
        .unwrap();
        let Command::Apply(config) = cli.into_command() else {
            panic!("expected apply");
        };
        assert_eq!(config.limits.max_slides, 5);
        assert_eq!(config.document, PathBuf::from("deck.json"));
    }
}
