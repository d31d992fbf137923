use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::model::RootTruthinessPolicy;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Server configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server host address
    #[validate(length(min = 1, message = "HTTP host cannot be empty"))]
    pub http_host: String,

    /// HTTP server port (1-65535)
    #[validate(range(
        min = 1,
        max = 65535,
        message = "HTTP port must be between 1 and 65535"
    ))]
    pub http_port: u16,

    /// SPARQL protocol endpoint used by endpoints without their own
    #[validate(custom(function = "validate_endpoint_url"))]
    pub sparql_endpoint: String,

    /// YAML file with model and endpoint definitions
    pub definitions_file: PathBuf,

    /// Timeout for one HTTP request, including the SPARQL round trips
    #[validate(range(
        min = 1,
        max = 600,
        message = "Request timeout must be between 1 and 600 seconds"
    ))]
    pub request_timeout_secs: u64,

    /// Largest accepted page size
    #[validate(range(
        min = 1,
        max = 10000,
        message = "Max page size must be between 1 and 10000"
    ))]
    pub max_page_size: i64,

    pub root_truthiness_policy: RootTruthinessPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            sparql_endpoint: "http://localhost:3030/sparql".to_string(),
            definitions_file: PathBuf::from("definitions.yaml"),
            request_timeout_secs: 30,
            max_page_size: 10_000,
            root_truthiness_policy: RootTruthinessPolicy::Reject,
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            http_host: env::var("SPARQLTREE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_env_var("SPARQLTREE_PORT", "8080")?,
            sparql_endpoint: env::var("SPARQLTREE_SPARQL_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:3030/sparql".to_string()),
            definitions_file: parse_env_var("SPARQLTREE_DEFINITIONS", "definitions.yaml")?,
            request_timeout_secs: parse_env_var("SPARQLTREE_REQUEST_TIMEOUT", "30")?,
            max_page_size: parse_env_var("SPARQLTREE_MAX_PAGE_SIZE", "10000")?,
            root_truthiness_policy: parse_env_var("SPARQLTREE_ROOT_TRUTHINESS", "reject")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            http_host: cli.http_host,
            http_port: cli.http_port,
            sparql_endpoint: cli.sparql_endpoint,
            definitions_file: cli.definitions_file,
            request_timeout_secs: cli.request_timeout_secs,
            max_page_size: cli.max_page_size,
            root_truthiness_policy: cli.root_truthiness_policy,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file; absent keys take their defaults
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub http_host: String,
    pub http_port: u16,
    pub sparql_endpoint: String,
    pub definitions_file: PathBuf,
    pub request_timeout_secs: u64,
    pub max_page_size: i64,
    pub root_truthiness_policy: RootTruthinessPolicy,
}

fn validate_endpoint_url(url: &str) -> Result<(), ValidationError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        let mut error = ValidationError::new("endpoint_url");
        error.message = Some("SPARQL endpoint must be an http(s) URL".into());
        Err(error)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
