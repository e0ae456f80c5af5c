use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

use crate::{DistanceMetric, IndexedRecord, RagError, Result, RetrievedMatch};

/// Tree holding one JSON `CollectionInfo` per collection name.
const COLLECTIONS_TREE: &str = "__collections";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub metric: DistanceMetric,
    pub dimensions: usize,
    pub created_at: String,
}

/// Nearest-neighbour store with upsert-by-id.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Writes all records in one atomic batch, creating the collection on first use.
    async fn upsert(&self, collection: &str, records: &[IndexedRecord]) -> Result<()>;

    /// At most `k` matches ordered by ascending distance. Fails if the collection is absent.
    async fn query(&self, collection: &str, embedding: &[f32], k: usize) -> Result<Vec<RetrievedMatch>>;

    async fn collection_info(&self, collection: &str) -> Result<Option<CollectionInfo>>;
}

/// Persistent collection store on top of sled. Records are bincode-encoded and keyed by url.
#[derive(Clone)]
pub struct SledVectorStore {
    db: sled::Db,
}

impl SledVectorStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        Ok(Self { db })
    }

    /// Number of records stored in `collection`; 0 when it does not exist.
    pub fn count(&self, collection: &str) -> Result<usize> {
        if self.load_info(collection)?.is_none() {
            return Ok(0);
        }
        Ok(self.db.open_tree(collection)?.len())
    }

    fn load_info(&self, collection: &str) -> Result<Option<CollectionInfo>> {
        let infos = self.db.open_tree(COLLECTIONS_TREE)?;
        match infos.get(collection.as_bytes())? {
            Some(raw) => {
                let info = serde_json::from_slice(&raw)
                    .map_err(|e| RagError::Store(format!("collection '{collection}' metadata unreadable: {e}")))?;
                Ok(Some(info))
            }
            None => Ok(None),
        }
    }

    fn create_info(&self, collection: &str, dimensions: usize) -> Result<CollectionInfo> {
        let info = CollectionInfo {
            name: collection.to_string(),
            metric: DistanceMetric::Cosine,
            dimensions,
            created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        };
        let raw = serde_json::to_vec(&info).map_err(|e| RagError::Store(e.to_string()))?;
        self.db.open_tree(COLLECTIONS_TREE)?.insert(collection.as_bytes(), raw)?;
        info!(collection, dimensions, "created collection");
        Ok(info)
    }
}

#[async_trait]
impl VectorStore for SledVectorStore {
    async fn upsert(&self, collection: &str, records: &[IndexedRecord]) -> Result<()> {
        let Some(first) = records.first() else { return Ok(()) };
        let dimensions = first.embedding.len();
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != dimensions) {
            return Err(RagError::Store(format!(
                "record {} has {} dimensions, batch uses {dimensions}",
                bad.id,
                bad.embedding.len()
            )));
        }

        let info = match self.load_info(collection)? {
            Some(info) => info,
            None => self.create_info(collection, dimensions)?,
        };
        if info.dimensions != dimensions {
            return Err(RagError::Store(format!(
                "collection '{collection}' stores {}-dimensional vectors, got {dimensions}",
                info.dimensions
            )));
        }

        let mut batch = sled::Batch::default();
        for record in records {
            batch.insert(record.id.as_bytes(), bincode::serialize(record)?);
        }
        let tree = self.db.open_tree(collection)?;
        tree.apply_batch(batch)?;
        tree.flush()?;
        debug!(collection, count = records.len(), "upserted records");
        Ok(())
    }

    async fn query(&self, collection: &str, embedding: &[f32], k: usize) -> Result<Vec<RetrievedMatch>> {
        let info = self
            .load_info(collection)?
            .ok_or_else(|| RagError::Query(format!("collection '{collection}' does not exist; run the indexer first")))?;
        if info.dimensions != embedding.len() {
            return Err(RagError::Query(format!(
                "query has {} dimensions, collection '{collection}' stores {}",
                embedding.len(),
                info.dimensions
            )));
        }

        let tree = self.db.open_tree(collection)?;
        let mut scored: Vec<RetrievedMatch> = Vec::with_capacity(tree.len());
        for entry in tree.iter() {
            let (_, raw) = entry?;
            let record: IndexedRecord = bincode::deserialize(&raw)?;
            let distance = info.metric.distance(&record.embedding, embedding);
            scored.push(RetrievedMatch {
                id: record.id,
                content: record.document,
                metadata: record.metadata,
                distance,
            });
        }
        scored.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn collection_info(&self, collection: &str) -> Result<Option<CollectionInfo>> {
        self.load_info(collection)
    }
}
