use anyhow::Result;
use axum::Router;
use clap::Parser;
use rag_core::chat::OpenAiChat;
use rag_core::config::OpenAiConfig;
use rag_core::embedding::OpenAiEmbedder;
use rag_core::pipeline::QaPipeline;
use rag_core::store::SledVectorStore;
use rag_core::DEFAULT_COLLECTION;
use server::build_app;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Vector store directory written by the indexer
    #[arg(long, default_value = "./vector_db")]
    db: String,
    /// Collection name
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let config = OpenAiConfig::from_env()?;
    let http = reqwest::Client::new();
    let pipeline = QaPipeline::from_services(
        Arc::new(OpenAiEmbedder::new(http.clone(), &config)),
        Arc::new(SledVectorStore::open(&args.db)?),
        Arc::new(OpenAiChat::new(http, &config)),
        args.collection.clone(),
    );
    let app: Router = build_app(Arc::new(pipeline));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, db = %args.db, collection = %args.collection, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
