use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::embedding::Embedder;
use crate::store::VectorStore;
use crate::{Document, IndexedRecord, Result};

/// Offline job turning documents into collection records.
///
/// Runs must not overlap on the same collection; the binary is the only writer.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, collection: impl Into<String>) -> Self {
        Self { embedder, store, collection: collection.into() }
    }

    /// Embeds every document in one call, then writes all records in one batch.
    /// Any embedding failure aborts the run before anything is written.
    pub async fn index(&self, documents: Vec<Document>) -> Result<usize> {
        let documents = latest_per_url(documents);
        if documents.is_empty() {
            info!(collection = %self.collection, "no documents to index");
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(Document::embedding_text).collect();
        let embeddings = self.embedder.embed(&texts).await?;

        let records: Vec<IndexedRecord> = documents
            .iter()
            .zip(embeddings)
            .map(|(doc, embedding)| IndexedRecord::from_document(doc, embedding))
            .collect();
        self.store.upsert(&self.collection, &records).await?;
        info!(collection = %self.collection, count = records.len(), "indexed documents");
        Ok(records.len())
    }
}

/// Keeps the last occurrence of each url, in first-seen order.
fn latest_per_url(documents: Vec<Document>) -> Vec<Document> {
    let mut slot: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Document> = Vec::with_capacity(documents.len());
    for doc in documents {
        match slot.get(&doc.url) {
            Some(&i) => out[i] = doc,
            None => {
                slot.insert(doc.url.clone(), out.len());
                out.push(doc);
            }
        }
    }
    out
}
