use std::sync::Arc;
use tracing::debug;

use crate::embedding::Embedder;
use crate::store::VectorStore;
use crate::{DistanceMetric, RagError, Result, RetrievedMatch};

pub const DEFAULT_TOP_K: usize = 3;
pub const MAX_TOP_K: usize = 100;

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    collection: String,
    metric: DistanceMetric,
}

impl Retriever {
    /// `embedder` must be the one the collection was indexed with.
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, collection: impl Into<String>) -> Self {
        Self { embedder, store, collection: collection.into(), metric: DistanceMetric::Cosine }
    }

    /// Metric whose distances this retriever hands out.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Up to `k` (capped at [`MAX_TOP_K`]) matches, most similar first.
    pub async fn search(&self, question: &str, k: usize) -> Result<Vec<RetrievedMatch>> {
        let k = k.min(MAX_TOP_K);
        let info = self.store.collection_info(&self.collection).await?.ok_or_else(|| {
            RagError::Query(format!("collection '{}' does not exist; run the indexer first", self.collection))
        })?;
        if info.metric != self.metric {
            return Err(RagError::Query(format!(
                "collection '{}' uses {:?} distance, expected {:?}",
                self.collection, info.metric, self.metric
            )));
        }

        let embedding = self.embedder.embed_one(question).await?;
        let matches = self.store.query(&self.collection, &embedding, k).await?;
        debug!(collection = %self.collection, top_k = k, hits = matches.len(), "retrieved matches");
        Ok(matches)
    }
}
