use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::Router;
use crawler::{Extractor, HttpFetcher, SiteProfile};
use rag_core::RagError;
use reqwest::{Client, Url};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const LISTING_HTML: &str = r#"<html><body>
  <a class="resource-link resource-item" href="/latin1/">Café</a>
  <a class="resource-link resource-item" href="/missing/">Gone</a>
</body></html>"#;

/// Latin-1 page: 0xE9 is "é" and is not valid UTF-8 on its own.
fn latin1_page() -> Vec<u8> {
    let mut body = b"<html><body><h1>Caf".to_vec();
    body.push(0xE9);
    body.extend_from_slice(b"</h1><div class=\"entry-content wp-block-post-content\">Cr");
    body.push(0xE8);
    body.extend_from_slice(b"me br");
    body.push(0xFB);
    body.extend_from_slice(b"l\xE9e</div></body></html>");
    body
}

async fn spawn_site() -> SocketAddr {
    let app = Router::new()
        .route("/broken-listing", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route("/resources/", get(|| async { ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], LISTING_HTML) }))
        .route(
            "/latin1/",
            get(|| async { ([(header::CONTENT_TYPE, "text/html; charset=iso-8859-1")], latin1_page()) }),
        )
        .route("/missing/", get(|| async { (StatusCode::NOT_FOUND, "not here") }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn extractor() -> Extractor {
    let fetcher = HttpFetcher::new(Client::builder().timeout(Duration::from_secs(5)).build().unwrap());
    Extractor::new(Arc::new(fetcher), &SiteProfile::default(), Duration::ZERO).unwrap()
}

#[tokio::test]
async fn error_status_on_listing_is_fetch_error() {
    let addr = spawn_site().await;
    let listing = Url::parse(&format!("http://{addr}/broken-listing")).unwrap();

    let err = extractor().list_links(&listing).await.unwrap_err();
    match err {
        RagError::Fetch { url, message } => {
            assert_eq!(url, listing.as_str());
            assert!(message.contains("500"), "{message}");
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn batch_over_http_records_error_status_and_decodes_charset() {
    let addr = spawn_site().await;
    let ex = extractor();
    let links = ex.list_links(&Url::parse(&format!("http://{addr}/resources/")).unwrap()).await.unwrap();
    assert_eq!(links.len(), 2);

    let report = ex.extract_all(&links).await;

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.documents[0].url, format!("http://{addr}/latin1/"));
    assert_eq!(report.documents[0].title, "Café");
    assert_eq!(report.documents[0].content, "Crème brûlée");

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].url, format!("http://{addr}/missing/"));
    assert!(report.failures[0].error.contains("404"), "{}", report.failures[0].error);
}
