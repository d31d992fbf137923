use std::path::PathBuf;

use clap::Parser;
use sparqltree::{config, model::RootTruthinessPolicy, server};

/// sparqltree - paginated, nested JSON views over SPARQL endpoints
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// HTTP server host address
    #[arg(long, default_value = "0.0.0.0")]
    http_host: String,

    /// HTTP server port
    #[arg(long, default_value_t = 8080)]
    http_port: u16,

    /// SPARQL endpoint used by definitions without their own
    #[arg(long, default_value = "http://localhost:3030/sparql")]
    sparql_endpoint: String,

    /// YAML file with model and endpoint definitions
    #[arg(long, default_value = "definitions.yaml")]
    definitions: PathBuf,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    request_timeout: u64,

    /// Largest accepted page size
    #[arg(long, default_value_t = 10_000)]
    max_page_size: i64,

    /// Only warn about truthiness rules on root models instead of failing
    #[arg(long)]
    lenient_root_truthiness: bool,

    /// Read the server configuration from a YAML file instead of arguments
    #[arg(long, conflicts_with = "from_env")]
    config: Option<PathBuf>,

    /// Read the server configuration from SPARQLTREE_* environment variables
    #[arg(long)]
    from_env: bool,
}

impl From<Cli> for config::CliConfig {
    fn from(cli: Cli) -> Self {
        config::CliConfig {
            http_host: cli.http_host,
            http_port: cli.http_port,
            sparql_endpoint: cli.sparql_endpoint,
            definitions_file: cli.definitions,
            request_timeout_secs: cli.request_timeout,
            max_page_size: cli.max_page_size,
            root_truthiness_policy: if cli.lenient_root_truthiness {
                RootTruthinessPolicy::Warn
            } else {
                RootTruthinessPolicy::Reject
            },
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    log::info!("sparqltree v{}", env!("CARGO_PKG_VERSION"));

    let result = if cli.from_env {
        server::run().await
    } else {
        let config = match &cli.config {
            Some(path) => config::ServerConfig::from_yaml_file(path),
            None => config::ServerConfig::from_cli(cli.into()),
        };
        match config {
            Ok(config) => server::run_with_config(config).await,
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
