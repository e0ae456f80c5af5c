use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// Bad HTTP status or network failure while scraping.
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// The payload was fetched but its text could not be read (e.g. a corrupt PDF).
    #[error("extraction failed for {url}: {message}")]
    Extract { url: String, message: String },

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("completion error: {0}")]
    Completion(String),

    #[error("vector store error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sled::Error> for RagError {
    fn from(e: sled::Error) -> Self {
        RagError::Store(e.to_string())
    }
}

impl From<bincode::Error> for RagError {
    fn from(e: bincode::Error) -> Self {
        RagError::Store(format!("record encoding: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
