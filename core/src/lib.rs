pub mod chat;
pub mod composer;
pub mod config;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod pipeline;
pub mod retriever;
pub mod store;

pub use error::{RagError, Result};

use serde::{Deserialize, Serialize};

/// Collection name used by the indexer and the server unless overridden.
pub const DEFAULT_COLLECTION: &str = "articles";

/// A scraped article. `url` is the identity; re-extracting the same url supersedes the old copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub content: String,
}

impl Document {
    /// Text submitted for embedding and stored as the record body.
    pub fn embedding_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.content)
    }
}

/// A user question. `top_k` defaults to 3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub question: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    retriever::DEFAULT_TOP_K
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub title: String,
    pub url: String,
}

/// One entry of the vector collection, keyed by the document url.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: RecordMetadata,
}

impl IndexedRecord {
    pub fn from_document(doc: &Document, embedding: Vec<f32>) -> Self {
        Self {
            id: doc.url.clone(),
            embedding,
            document: doc.embedding_text(),
            metadata: RecordMetadata { title: doc.title.clone(), url: doc.url.clone() },
        }
    }
}

/// A nearest-neighbour hit, as returned by the store (ascending distance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedMatch {
    pub id: String,
    pub content: String,
    pub metadata: RecordMetadata,
    pub distance: f32,
}

/// Cited article in a chat response. `content` is a display preview only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub content: String,
    pub relevance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub relevant_articles: Vec<Article>,
}

/// Distance metric a collection was built with.
///
/// Only cosine distance (`1 - cosine_similarity`, range `[0, 2]`) is supported, since
/// relevance is derived as `1 - distance`. A collection recorded with any other metric
/// fails to load instead of producing meaningless relevance values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Cosine,
}

impl DistanceMetric {
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 1.0;
                }
                1.0 - dot / (norm_a * norm_b)
            }
        }
    }

    /// Not clamped: a negative relevance marks a dissimilar match.
    pub fn relevance(self, distance: f32) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - distance,
        }
    }
}
