use std::sync::Arc;
use tracing::info;

use crate::chat::ChatModel;
use crate::composer::AnswerComposer;
use crate::embedding::Embedder;
use crate::retriever::Retriever;
use crate::store::VectorStore;
use crate::{AnswerResult, Query, Result};

/// Request-time path: embed, search, compose. Holds no per-request state.
pub struct QaPipeline {
    retriever: Retriever,
    composer: AnswerComposer,
}

impl QaPipeline {
    pub fn new(retriever: Retriever, composer: AnswerComposer) -> Self {
        Self { retriever, composer }
    }

    pub fn from_services(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        chat: Arc<dyn ChatModel>,
        collection: impl Into<String>,
    ) -> Self {
        let retriever = Retriever::new(embedder, store, collection);
        let composer = AnswerComposer::new(chat, retriever.metric());
        Self::new(retriever, composer)
    }

    pub async fn answer(&self, query: &Query) -> Result<AnswerResult> {
        let matches = self.retriever.search(&query.question, query.top_k).await?;
        let result = self.composer.compose(&query.question, &matches).await?;
        info!(top_k = query.top_k, articles = result.relevant_articles.len(), "answered question");
        Ok(result)
    }
}
