use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rag_core::chat::{ChatMessage, ChatModel};
use rag_core::embedding::Embedder;
use rag_core::indexer::Indexer;
use rag_core::pipeline::QaPipeline;
use rag_core::store::SledVectorStore;
use rag_core::{Document, RagError, Result};
use serde_json::Value;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

/// Two-dimensional "topic" vectors: consent-ish text points right, records-ish text points up.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                let x = t.matches("consent").count() as f32;
                let y = t.matches("record").count() as f32;
                vec![x + 0.01, y + 0.01]
            })
            .collect())
    }
}

struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(RagError::Embedding("connection refused".into()))
    }
}

struct CitingChat;

#[async_trait]
impl ChatModel for CitingChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        assert_eq!(messages.len(), 2);
        Ok("Obtain informed consent before treatment [Source 1].\n\nSource 1: [Consent](https://example.org/consent)".into())
    }
}

struct DownChat;

#[async_trait]
impl ChatModel for DownChat {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(RagError::Completion("model overloaded".into()))
    }
}

async fn indexed_store(dir: &TempDir) -> Arc<SledVectorStore> {
    let store = Arc::new(SledVectorStore::open(dir.path()).unwrap());
    let docs = vec![
        Document {
            url: "https://example.org/consent".into(),
            title: "Consent".into(),
            content: "Consent must be informed. Ask for consent again when treatment changes.".into(),
        },
        Document {
            url: "https://example.org/records".into(),
            title: "Record keeping".into(),
            content: "Keep a record of every session.".into(),
        },
    ];
    Indexer::new(Arc::new(KeywordEmbedder), store.clone(), "articles").index(docs).await.unwrap();
    store
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn post_chat(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri).header(header::CONTENT_TYPE, "application/json").body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn chat_returns_ranked_articles_and_cited_answer() {
    let dir = tempdir().unwrap();
    let store = indexed_store(&dir).await;
    let pipeline = QaPipeline::from_services(Arc::new(KeywordEmbedder), store, Arc::new(CitingChat), "articles");
    let app = server::build_app(Arc::new(pipeline));

    let (status, json) = call(app, post_chat("/chat", r#"{"question":"When do I need consent?","top_k":2}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["answer"].as_str().unwrap().contains("[Source 1]"));

    let arts = json["relevant_articles"].as_array().unwrap();
    assert_eq!(arts.len(), 2);
    assert_eq!(arts[0]["url"], "https://example.org/consent");
    assert_eq!(arts[1]["url"], "https://example.org/records");
    assert_eq!(arts[0]["title"], "Consent");
    assert!(arts[0]["relevance"].as_f64().unwrap() > arts[1]["relevance"].as_f64().unwrap());
    assert!(arts[0]["content"].as_str().unwrap().ends_with("..."));
}

#[tokio::test]
async fn top_k_defaults_to_three() {
    let dir = tempdir().unwrap();
    let store = indexed_store(&dir).await;
    let pipeline = QaPipeline::from_services(Arc::new(KeywordEmbedder), store, Arc::new(CitingChat), "articles");
    let app = server::build_app(Arc::new(pipeline));

    let (status, json) = call(app, post_chat("/api/chat", r#"{"question":"record keeping"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    let arts = json["relevant_articles"].as_array().unwrap();
    assert_eq!(arts.len(), 2, "only two documents are indexed");
    assert_eq!(arts[0]["url"], "https://example.org/records");
}

#[tokio::test]
async fn failures_collapse_to_500_with_detail() {
    let dir = tempdir().unwrap();
    let store = indexed_store(&dir).await;
    let pipeline = QaPipeline::from_services(Arc::new(KeywordEmbedder), store, Arc::new(DownChat), "articles");
    let (status, json) = call(server::build_app(Arc::new(pipeline)), post_chat("/chat", r#"{"question":"consent?"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["detail"].as_str().unwrap().contains("model overloaded"));

    let empty = tempdir().unwrap();
    let store = Arc::new(SledVectorStore::open(empty.path()).unwrap());
    let pipeline = QaPipeline::from_services(Arc::new(KeywordEmbedder), store, Arc::new(CitingChat), "articles");
    let (status, json) = call(server::build_app(Arc::new(pipeline)), post_chat("/chat", r#"{"question":"consent?"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["detail"].as_str().unwrap().contains("does not exist"));
}

#[tokio::test]
async fn health_ignores_dependencies() {
    let empty = tempdir().unwrap();
    let store = Arc::new(SledVectorStore::open(empty.path()).unwrap());
    let pipeline = Arc::new(QaPipeline::from_services(Arc::new(DownEmbedder), store, Arc::new(DownChat), "articles"));

    for uri in ["/health", "/api/health"] {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let (status, json) = call(server::build_app(pipeline.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({ "status": "healthy" }));
    }
}
