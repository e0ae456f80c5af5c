use anyhow::{anyhow, Result};
use clap::Parser;
use crawler::{Extractor, HttpFetcher, SiteProfile, DEFAULT_LISTING_URL};
use reqwest::{Client, Url};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Extract articles linked from a listing page to JSONL")]
struct Cli {
    /// Listing page whose resource links are extracted
    #[arg(long, default_value = DEFAULT_LISTING_URL)]
    listing_url: String,
    /// Output JSONL file path
    #[arg(long, default_value = "./data/articles.jsonl")]
    output: String,
    /// Optional JSONL report of links that could not be extracted
    #[arg(long)]
    failures: Option<String>,
    /// Pause between article requests, in milliseconds (politeness)
    #[arg(long, default_value_t = 1000)]
    delay_ms: u64,
    /// Maximum number of links to extract
    #[arg(long)]
    max_docs: Option<usize>,
    /// Request timeout seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    /// User-Agent string
    #[arg(long, default_value = "article-qa-bot/0.1")]
    user_agent: String,
    /// CSS selector for article links on the listing page
    #[arg(long)]
    link_selector: Option<String>,
    /// CSS selector for the article title
    #[arg(long)]
    title_selector: Option<String>,
    /// CSS selector for the article body container
    #[arg(long)]
    content_selector: Option<String>,
}

#[derive(Serialize)]
struct OutDoc<'a> {
    url: &'a str,
    title: &'a str,
    content: &'a str,
    extracted_at: &'a str,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let defaults = SiteProfile::default();
    let profile = SiteProfile {
        link: args.link_selector.clone().unwrap_or(defaults.link),
        title: args.title_selector.clone().unwrap_or(defaults.title),
        content: args.content_selector.clone().unwrap_or(defaults.content),
    };

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;
    let extractor = Extractor::new(Arc::new(HttpFetcher::new(client)), &profile, Duration::from_millis(args.delay_ms))?;

    let listing = Url::parse(&args.listing_url).map_err(|e| anyhow!("invalid listing url {}: {e}", args.listing_url))?;
    let mut links = extractor.list_links(&listing).await?;
    if let Some(max) = args.max_docs {
        links.truncate(max);
    }
    tracing::info!(links = links.len(), listing = %listing, "found article links");

    let report = extractor.extract_all(&links).await;

    let extracted_at = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    let mut out = create_writer(&args.output)?;
    for doc in &report.documents {
        let rec = OutDoc { url: &doc.url, title: &doc.title, content: &doc.content, extracted_at: &extracted_at };
        serde_json::to_writer(&mut out, &rec)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    if let Some(path) = &args.failures {
        let mut f = create_writer(path)?;
        for failure in &report.failures {
            serde_json::to_writer(&mut f, failure)?;
            f.write_all(b"\n")?;
        }
        f.flush()?;
    }

    tracing::info!(
        extracted = report.documents.len(),
        failed = report.failures.len(),
        output = %args.output,
        "done"
    );
    Ok(())
}

fn create_writer(path: &str) -> Result<BufWriter<File>> {
    if let Some(dir) = Path::new(path).parent() {
        fs::create_dir_all(dir).ok();
    }
    Ok(BufWriter::new(File::create(path)?))
}
