use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_MODEL_ID: &str = "mistralai/mistral-small-3.2-24b-instruct:free";
const DEFAULT_LOCAL_MODEL_ID: &str = "TinyLlama/TinyLlama-1.1B-Chat-v1.0";
const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:8501,http://localhost:8502,http://127.0.0.1:8501,http://127.0.0.1:8502";

/// Embedder used when no `EMBEDDING_API_URL` is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalEmbedder {
    /// all-MiniLM-L6-v2 sentence embeddings (needs the `minilm` cargo feature).
    MiniLm,
    /// Word feature hashing; no model download, lexical matches only.
    Hashing,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub openrouter_api_key: String,
    pub openrouter_base_url: String,
    pub model_id: String,
    /// Local OpenAI-compatible server used when the hosted call fails.
    pub local_llm_url: Option<String>,
    pub local_model_id: String,
    pub enable_local_llm: bool,
    /// Unset means the local embedder is used.
    pub embedding_api_url: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    /// Dimension of the hashing and HTTP embedders; MiniLM is always 384.
    pub embedding_dimension: usize,
    pub local_embedder: LocalEmbedder,
    /// Upper bound on memoised LLM replies.
    pub llm_cache_entries: usize,
    pub youtube_api_key: Option<String>,
    pub static_dir: PathBuf,
    pub data_dir: PathBuf,
    pub public_base_url: String,
    pub max_file_size_bytes: usize,
    pub max_similar_resumes: usize,
    pub processing_timeout: Duration,
    pub cors_origins: Vec<String>,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_file_size_mb: usize = parse_or(&get, "MAX_FILE_SIZE", 10)?;
        let processing_timeout_secs: u64 = parse_or(&get, "PROCESSING_TIMEOUT", 300)?;
        let max_file_size_bytes = max_file_size_mb
            .checked_mul(1024 * 1024)
            .with_context(|| format!("MAX_FILE_SIZE is too large: {max_file_size_mb} MB"))?;

        let embedding_dimension: usize = parse_or(&get, "EMBEDDING_DIMENSION", 384)?;
        if embedding_dimension == 0 {
            bail!("EMBEDDING_DIMENSION must be greater than zero");
        }
        let local_embedder = match get("LOCAL_EMBEDDER") {
            Some(raw) => parse_local_embedder(&raw)?,
            None => LocalEmbedder::MiniLm,
        };

        Ok(Config {
            openrouter_api_key: get("OPENROUTER_API_KEY").with_context(|| {
                "Required environment variable 'OPENROUTER_API_KEY' is not set"
            })?,
            openrouter_base_url: get("OPENROUTER_BASE_URL")
                .unwrap_or_else(|| "https://openrouter.ai/api/v1".to_string()),
            model_id: get("MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            local_llm_url: get("LOCAL_LLM_URL"),
            local_model_id: get("LOCAL_MODEL_ID")
                .unwrap_or_else(|| DEFAULT_LOCAL_MODEL_ID.to_string()),
            enable_local_llm: get("ENABLE_LOCAL_LLM")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            embedding_api_url: get("EMBEDDING_API_URL"),
            embedding_api_key: get("EMBEDDING_API_KEY"),
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| "all-MiniLM-L6-v2".to_string()),
            embedding_dimension,
            local_embedder,
            llm_cache_entries: parse_or(&get, "LLM_CACHE_ENTRIES", 256)?,
            youtube_api_key: get("YOUTUBE_API_KEY"),
            static_dir: PathBuf::from(get("STATIC_DIR").unwrap_or_else(|| "static".to_string())),
            data_dir: PathBuf::from(get("DATA_DIR").unwrap_or_else(|| ".".to_string())),
            public_base_url: get("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8000".to_string()),
            max_file_size_bytes,
            max_similar_resumes: parse_or(&get, "MAX_SIMILAR_RESUMES", 3)?,
            processing_timeout: Duration::from_secs(processing_timeout_secs),
            cors_origins: get("CORS_ORIGINS")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 8000)?,
            log_level: get("LOG_LEVEL")
                .unwrap_or_else(|| "info".to_string())
                .to_lowercase(),
        })
    }

    /// Directory uploaded resumes are written to (and served from).
    pub fn uploads_dir(&self) -> PathBuf {
        self.static_dir.join("resumes")
    }

    /// The local fallback endpoint, if one is configured and enabled.
    pub fn local_llm(&self) -> Option<&str> {
        if self.enable_local_llm {
            self.local_llm_url.as_deref()
        } else {
            None
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

fn parse_local_embedder(value: &str) -> Result<LocalEmbedder> {
    match value.trim().to_lowercase().as_str() {
        "minilm" | "all-minilm-l6-v2" => Ok(LocalEmbedder::MiniLm),
        "hashing" => Ok(LocalEmbedder::Hashing),
        other => bail!("LOCAL_EMBEDDER must be 'minilm' or 'hashing', got '{other}'"),
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults_apply_with_only_api_key() {
        let config = config_from(&[("OPENROUTER_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.model_id, DEFAULT_MODEL_ID);
        assert_eq!(config.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_similar_resumes, 3);
        assert_eq!(config.processing_timeout, Duration::from_secs(300));
        assert_eq!(config.embedding_dimension, 384);
        assert_eq!(config.local_embedder, LocalEmbedder::MiniLm);
        assert_eq!(config.llm_cache_entries, 256);
        assert_eq!(config.cors_origins.len(), 4);
        assert!(config.youtube_api_key.is_none());
        assert_eq!(config.uploads_dir(), PathBuf::from("static").join("resumes"));
    }

    #[test]
    fn test_missing_api_key_fails() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let err = config_from(&[("OPENROUTER_API_KEY", "   ")]).unwrap_err();
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));

        let config =
            config_from(&[("OPENROUTER_API_KEY", "k"), ("YOUTUBE_API_KEY", "")]).unwrap();
        assert!(config.youtube_api_key.is_none());
    }

    #[test]
    fn test_invalid_port_names_the_key() {
        let err = config_from(&[("OPENROUTER_API_KEY", "k"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_oversized_file_limit_is_rejected() {
        let err = config_from(&[
            ("OPENROUTER_API_KEY", "k"),
            ("MAX_FILE_SIZE", &usize::MAX.to_string()),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("MAX_FILE_SIZE"));
    }

    #[test]
    fn test_zero_embedding_dimension_is_rejected() {
        let err = config_from(&[("OPENROUTER_API_KEY", "k"), ("EMBEDDING_DIMENSION", "0")])
            .unwrap_err();
        assert!(err.to_string().contains("EMBEDDING_DIMENSION"));
    }

    #[test]
    fn test_local_embedder_selection() {
        let config =
            config_from(&[("OPENROUTER_API_KEY", "k"), ("LOCAL_EMBEDDER", "Hashing")]).unwrap();
        assert_eq!(config.local_embedder, LocalEmbedder::Hashing);

        let err = config_from(&[("OPENROUTER_API_KEY", "k"), ("LOCAL_EMBEDDER", "word2vec")])
            .unwrap_err();
        assert!(err.to_string().contains("LOCAL_EMBEDDER"));
    }

    #[test]
    fn test_local_llm_respects_flag() {
        let config = config_from(&[
            ("OPENROUTER_API_KEY", "k"),
            ("LOCAL_LLM_URL", "http://127.0.0.1:8080/v1"),
            ("ENABLE_LOCAL_LLM", "false"),
        ])
        .unwrap();
        assert!(config.local_llm().is_none());

        let config = config_from(&[
            ("OPENROUTER_API_KEY", "k"),
            ("LOCAL_LLM_URL", "http://127.0.0.1:8080/v1"),
        ])
        .unwrap();
        assert_eq!(config.local_llm(), Some("http://127.0.0.1:8080/v1"));
    }

    #[test]
    fn test_cors_origins_are_trimmed() {
        let config = config_from(&[
            ("OPENROUTER_API_KEY", "k"),
            ("CORS_ORIGINS", " http://a.test , ,http://b.test"),
        ])
        .unwrap();
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    }
}
