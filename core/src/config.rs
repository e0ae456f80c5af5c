use crate::{RagError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Settings shared by the embedding and chat clients.
///
/// The api key is mandatory: both the indexer and the server refuse to start without it.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
}

impl OpenAiConfig {
    /// Reads `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `EMBEDDING_MODEL`, `CHAT_MODEL` and `CHAT_TEMPERATURE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| RagError::Config("OPENAI_API_KEY not set".into()))?;
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let temperature = match non_empty("CHAT_TEMPERATURE") {
            Some(raw) => raw
                .trim()
                .parse::<f32>()
                .map_err(|e| RagError::Config(format!("CHAT_TEMPERATURE={raw:?}: {e}")))?,
            None => DEFAULT_TEMPERATURE,
        };

        Ok(Self {
            api_key,
            base_url: non_empty("OPENAI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            embedding_model: non_empty("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            chat_model: non_empty("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            temperature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn missing_key_is_fatal() {
        let err = OpenAiConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
        let err = OpenAiConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn defaults_apply() {
        let cfg = OpenAiConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.embedding_model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(cfg.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(cfg.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn overrides_and_bad_temperature() {
        let cfg = OpenAiConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:1234/v1/"),
            ("CHAT_TEMPERATURE", "0"),
        ]))
        .unwrap();
        assert_eq!(cfg.base_url, "http://localhost:1234/v1");
        assert_eq!(cfg.temperature, 0.0);

        let err = OpenAiConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk"), ("CHAT_TEMPERATURE", "warm")])).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }
}
