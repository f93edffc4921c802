//! # VectorShelf
//!
//! A semantic search service for retrieval-augmented generation: ingest
//! documents into named libraries, chunk and embed them, and answer
//! k-nearest-neighbor queries by embedding similarity within a library.
//!
//! ## Modules
//!
//! - [`vectorshelf::config`] — TOML configuration parsing and validation
//! - [`vectorshelf::embedding`] — embedding provider implementations
//! - [`vectorshelf::documents`] — document record bookkeeping
//! - [`vectorshelf::http`] — the JSON HTTP surface (Axum)
//! - [`vectorshelf::logging`] — structured logging setup
//!
//! Library indexing, chunk storage, and the reader-writer concurrency
//! discipline all live in `vectorshelf-core`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vectorshelf::config::load_config;
use vectorshelf::{build_state, logging};

#[derive(Parser)]
#[command(name = "vectorshelf", about = "Semantic search over per-library vector indexes", version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./vectorshelf.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    logging::init(&config.logging);

    match cli.command {
        Commands::Serve => serve(config).await,
    }
}

async fn serve(config: vectorshelf::config::Config) -> anyhow::Result<()> {
    let state = build_state(&config)?;
    let app = vectorshelf::http::build_router(state, &config);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(%bind_addr, "vectorshelf listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
