//! Ingestion and retrieval server binary
//!
//! Run with: cargo run --bin notebook-rag-server

use notebook_rag::{config::Config, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notebook_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                    Notebook RAG Server                    ║
║         Document Ingestion & Passage Retrieval            ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration
    let config = Config::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embedding.model);
    tracing::info!("  - Embedding dimensions: {}", config.embedding.dimensions);
    tracing::info!(
        "  - Chunk size: {} (overlap: {})",
        config.ingestion.chunk_size,
        config.ingestion.chunk_overlap
    );
    tracing::info!("  - Vector collection: {}", config.vector_index.collection);
    tracing::info!("  - Object bucket: {}", config.object_store.bucket);

    let dimensions = config.embedding.dimensions;
    let server = RagServer::new(config)?;
    let state = server.state().clone();

    // Probe the embedding service; the server starts either way
    match state.embedder().health_check().await {
        Ok(true) => tracing::info!("Embedding service is running"),
        _ => {
            tracing::warn!(
                "Embedding service not available at {}",
                state.config().embedding.base_url
            );
            tracing::warn!("Please start Ollama:");
            tracing::warn!("  1. Install: brew install ollama");
            tracing::warn!("  2. Start: ollama serve");
            tracing::warn!("  3. Pull the model: ollama pull mxbai-embed-large");
        }
    }

    // Provision the bucket and collection before the listener binds
    if let Err(e) = state.object_store().ensure_bucket().await {
        tracing::warn!("Object store provisioning failed: {}", e);
    }
    if let Err(e) = state.vector_index().ensure_collection(dimensions).await {
        tracing::warn!("Vector index provisioning failed: {}", e);
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  Ready: http://{}/ready", server.address());
    println!("\nEndpoints:");
    println!("  POST   /api/users/:user_id/documents     - Upload a document");
    println!("  GET    /api/users/:user_id/documents     - List documents");
    println!("  DELETE /api/users/:user_id/documents/:id - Delete a document");
    println!("  POST   /api/users/:user_id/retrieve      - Retrieve passages");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
