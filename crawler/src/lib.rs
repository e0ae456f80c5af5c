use async_trait::async_trait;
use lazy_static::lazy_static;
use rag_core::{Document, RagError, Result};
use regex::Regex;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use unicode_normalization::UnicodeNormalization;

pub const NO_TITLE: &str = "No title found";
pub const NO_CONTENT: &str = "No content found";
pub const PDF_TITLE: &str = "PDF Document";

pub const DEFAULT_LISTING_URL: &str = "https://www.coto.org/resources/?lang=en&view=grid&term=&resource-audience=&resource-topic=&resource-type=practice-guidance";

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// CSS selectors describing where a site keeps its links, titles and article bodies.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub link: String,
    pub title: String,
    pub content: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            link: "a.resource-link.resource-item".into(),
            title: "h1".into(),
            content: "div.entry-content.wp-block-post-content".into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Selectors {
    link: Selector,
    title: Selector,
    content: Selector,
}

impl Selectors {
    fn compile(profile: &SiteProfile) -> Result<Self> {
        let parse = |css: &str| Selector::parse(css).map_err(|e| RagError::Config(format!("invalid selector {css:?}: {e}")));
        Ok(Self { link: parse(&profile.link)?, title: parse(&profile.title)?, content: parse(&profile.content)? })
    }
}

/// How a link is read, decided once from its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    HtmlPage(Url),
    PdfDocument(Url),
}

impl DocumentSource {
    pub fn classify(url: Url) -> Self {
        if url.path().to_ascii_lowercase().ends_with(".pdf") {
            DocumentSource::PdfDocument(url)
        } else {
            DocumentSource::HtmlPage(url)
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Raw body of a successful (2xx) GET.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;

    /// Body of a successful (2xx) GET decoded with the charset the response declares.
    async fn fetch_text(&self, url: &Url) -> Result<String>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        let resp = self.client.get(url.clone()).send().await.map_err(|e| fetch_error(url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(fetch_error(url, format!("HTTP {status}")));
        }
        Ok(resp)
    }
}

fn fetch_error(url: &Url, message: impl ToString) -> RagError {
    RagError::Fetch { url: url.to_string(), message: message.to_string() }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let bytes = self.get(url).await?.bytes().await.map_err(|e| fetch_error(url, e))?;
        Ok(bytes.to_vec())
    }

    async fn fetch_text(&self, url: &Url) -> Result<String> {
        self.get(url).await?.text().await.map_err(|e| fetch_error(url, e))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionFailure {
    pub url: String,
    pub error: String,
}

/// Outcome of a batch run: what was extracted and what was skipped.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub documents: Vec<Document>,
    pub failures: Vec<ExtractionFailure>,
}

pub struct Extractor {
    fetcher: Arc<dyn Fetcher>,
    selectors: Selectors,
    delay: Duration,
}

impl Extractor {
    /// `delay` is awaited between consecutive article requests.
    pub fn new(fetcher: Arc<dyn Fetcher>, profile: &SiteProfile, delay: Duration) -> Result<Self> {
        Ok(Self { fetcher, selectors: Selectors::compile(profile)?, delay })
    }

    /// Article links of a listing page in document order. Any fetch failure is returned.
    pub async fn list_links(&self, listing: &Url) -> Result<Vec<Url>> {
        let body = self.fetcher.fetch_text(listing).await?;
        Ok(parse_links(&body, listing, &self.selectors.link))
    }

    pub async fn extract_document(&self, url: &Url) -> Result<Document> {
        match DocumentSource::classify(url.clone()) {
            DocumentSource::PdfDocument(url) => {
                let bytes = self.fetcher.fetch(&url).await?;
                let text = pdf_text(&url, bytes).await?;
                Ok(pdf_document(&url, &text))
            }
            DocumentSource::HtmlPage(url) => {
                let body = self.fetcher.fetch_text(&url).await?;
                Ok(html_document(&url, &body, &self.selectors))
            }
        }
    }

    /// Sequential, continue-on-error extraction. A failing link is logged, recorded and skipped.
    pub async fn extract_all(&self, links: &[Url]) -> ExtractionReport {
        let mut report = ExtractionReport::default();
        for (i, link) in links.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            tracing::info!(url = %link, n = i + 1, total = links.len(), "extracting");
            match self.extract_document(link).await {
                Ok(doc) => report.documents.push(doc),
                Err(e) => {
                    tracing::warn!(url = %link, error = %e, "skipping link");
                    report.failures.push(ExtractionFailure { url: link.to_string(), error: e.to_string() });
                }
            }
        }
        report
    }
}

pub fn parse_links(html: &str, base: &Url, selector: &Selector) -> Vec<Url> {
    let doc = Html::parse_document(html);
    doc.select(selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|h| base.join(h.trim()).ok())
        .filter(|u| u.scheme().starts_with("http"))
        .collect()
}

fn html_document(url: &Url, html: &str, selectors: &Selectors) -> Document {
    let doc = Html::parse_document(html);
    let text_of = |sel: &Selector| {
        doc.select(sel)
            .next()
            .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
            .filter(|t| !t.is_empty())
    };
    Document {
        url: url.to_string(),
        title: text_of(&selectors.title).unwrap_or_else(|| NO_TITLE.to_string()),
        content: text_of(&selectors.content).unwrap_or_else(|| NO_CONTENT.to_string()),
    }
}

/// Parses `html` with the default site profile.
pub fn parse_article(url: &Url, html: &str) -> Result<Document> {
    Ok(html_document(url, html, &Selectors::compile(&SiteProfile::default())?))
}

pub fn pdf_document(url: &Url, text: &str) -> Document {
    let content = clean_text(text);
    Document {
        url: url.to_string(),
        title: PDF_TITLE.to_string(),
        content: if content.is_empty() { NO_CONTENT.to_string() } else { content },
    }
}

/// NFKC-folds (ligatures from PDFs), collapses whitespace runs and trims.
pub fn clean_text(raw: &str) -> String {
    let folded: String = raw.nfkc().collect();
    WHITESPACE.replace_all(&folded, " ").trim().to_string()
}

/// Text of every page, concatenated. Runs off the async workers; a parser panic is an extraction error.
async fn pdf_text(url: &Url, bytes: Vec<u8>) -> Result<String> {
    let extract_err = |message: String| RagError::Extract { url: url.to_string(), message };
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| extract_err(format!("pdf parser aborted: {e}")))?
        .map_err(|e| extract_err(e.to_string()))
}
