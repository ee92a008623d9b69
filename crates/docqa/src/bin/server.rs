//! docqa server binary
//!
//! Run with: cargo run -p docqa --bin docqa-server -- --documents-dir ./documents

use clap::Parser;
use docqa::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "docqa-server", version, about = "Document question answering server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory of documents indexed at startup (overrides config)
    #[arg(short, long)]
    documents_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.documents_dir {
        config.documents.dir = dir;
    }
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Documents: {}", config.documents.dir.display());

    let (server, summary) = RagServer::prepare(config).await?;

    for (path, reason) in &summary.files_failed {
        tracing::warn!("Skipped {}: {}", path.display(), reason);
    }
    tracing::info!(
        "Indexed {} files ({} failed), {} chunks in index",
        summary.files_processed,
        summary.files_failed.len(),
        server.state().knowledge().len()
    );

    println!("\nServer starting...");
    println!("  Ask:    POST http://{}/ask", server.address());
    println!("  Stream: ws://{}/ws", server.address());
    println!("  Upload: POST http://{}/upload", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
