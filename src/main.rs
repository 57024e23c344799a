use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use gleam_docs_mcp::cache::{Cache, InMemoryCache};
use gleam_docs_mcp::hex_client::{HEX_API_URL, HEXDOCS_URL, HexClient};
use gleam_docs_mcp::mcp::{DocsService, TokioSpawner};
use gleam_docs_mcp::server;

#[derive(Parser, Debug)]
#[command(version, about = "Gleam Package Documentation MCP Server")]
struct Cli {
    /// Type of server to run
    #[arg(
        short,
        long,
        value_enum,
        env = "GLEAM_DOCS_SERVER_TYPE",
        default_value_t = ServerType::Http
    )]
    server_type: ServerType,

    /// Address for the HTTP server
    #[arg(short, long, env = "GLEAM_DOCS_ADDRESS", default_value = "127.0.0.1:8080")]
    address: String,

    /// Directory the cache is loaded from and saved to
    #[arg(long, env = "GLEAM_DOCS_CACHE_DIR", default_value = ".gleam-docs-cache")]
    cache_dir: PathBuf,

    /// Base URL of the hex.pm API
    #[arg(long, env = "GLEAM_DOCS_HEX_API_URL", default_value = HEX_API_URL)]
    hex_api_url: String,

    /// Base URL of hexdocs.pm
    #[arg(long, env = "GLEAM_DOCS_HEXDOCS_URL", default_value = HEXDOCS_URL)]
    hexdocs_url: String,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "GLEAM_DOCS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Maximum number of cached documents
    #[arg(long, env = "GLEAM_DOCS_MAX_CACHE_ENTRIES")]
    max_cache_entries: Option<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ServerType {
    /// Start an HTTP server
    Http,
    /// Start a stdio server
    Stdio,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    server::init_tracing(&cli.log_level)?;

    let mut cache = InMemoryCache::new(cli.cache_dir.clone());
    if let Some(max_entries) = cli.max_cache_entries {
        cache = cache.with_max_entries(max_entries);
    }
    let cache = Arc::new(cache);
    if let Err(err) = cache.load().await {
        tracing::warn!("Failed to load cache from {:?}: {}", cli.cache_dir, err);
    }

    let client = HexClient::new_with_base_urls(&cli.hex_api_url, &cli.hexdocs_url);
    let service = Arc::new(DocsService::new(
        Arc::new(client),
        cache.clone(),
        Arc::new(TokioSpawner),
    ));

    let served = match cli.server_type {
        ServerType::Http => server::start_http_server(&cli.address, service).await,
        ServerType::Stdio => server::start_stdio_server(service).await,
    };

    if let Err(err) = cache.save().await {
        tracing::error!("Failed to save cache to {:?}: {}", cli.cache_dir, err);
    }

    served
}
