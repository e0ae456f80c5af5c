use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use rag_core::config::OpenAiConfig;
use rag_core::embedding::OpenAiEmbedder;
use rag_core::indexer::Indexer;
use rag_core::store::{SledVectorStore, VectorStore};
use rag_core::{Document, DEFAULT_COLLECTION};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Embed extracted articles into the vector collection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed documents from JSON/JSONL files (or a directory of them) and upsert them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Vector store directory
        #[arg(long, default_value = "./vector_db")]
        db: String,
        /// Collection name
        #[arg(long, default_value = DEFAULT_COLLECTION)]
        collection: String,
    },
    /// Print collection metadata and record count
    Stats {
        #[arg(long, default_value = "./vector_db")]
        db: String,
        #[arg(long, default_value = DEFAULT_COLLECTION)]
        collection: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, db, collection } => build(&input, &db, &collection).await,
        Commands::Stats { db, collection } => stats(&db, &collection).await,
    }
}

async fn build(input: &str, db: &str, collection: &str) -> Result<()> {
    // Credentials are checked before any input is read.
    let config = OpenAiConfig::from_env()?;
    let documents = read_documents(Path::new(input))?;
    tracing::info!(count = documents.len(), input, "loaded documents");

    let embedder = Arc::new(OpenAiEmbedder::new(reqwest::Client::new(), &config));
    let store = Arc::new(SledVectorStore::open(db)?);
    let indexed = Indexer::new(embedder, store.clone(), collection).index(documents).await?;

    tracing::info!(indexed, total = store.count(collection)?, db, collection, "index build complete");
    Ok(())
}

async fn stats(db: &str, collection: &str) -> Result<()> {
    let store = SledVectorStore::open(db)?;
    let info = store
        .collection_info(collection)
        .await?
        .ok_or_else(|| anyhow!("collection '{collection}' does not exist in {db}"))?;
    let summary = serde_json::json!({
        "collection": info.name,
        "metric": info.metric,
        "dimensions": info.dimensions,
        "created_at": info.created_at,
        "records": store.count(collection)?,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn read_documents(input_path: &Path) -> Result<Vec<Document>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        return Err(anyhow!("input {} does not exist", input_path.display()));
    }

    let mut docs = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut docs)?;
        } else {
            read_json(&file, &mut docs)?;
        }
    }
    Ok(docs)
}

fn read_jsonl(file: &Path, docs: &mut Vec<Document>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: Document =
            serde_json::from_str(&line).map_err(|e| anyhow!("{}:{}: {e}", file.display(), n + 1))?;
        docs.push(doc);
    }
    Ok(())
}

fn read_json(file: &Path, docs: &mut Vec<Document>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                docs.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => docs.push(serde_json::from_value(json)?),
        _ => tracing::warn!(file = %file.display(), "ignoring JSON that is neither an object nor an array"),
    }
    Ok(())
}
