//! Configuration and data directory management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default embedding dimension (nomic-embed-text-v1.5).
pub const DEFAULT_EMBEDDING_DIM: usize = 768;

/// Default OpenAI-compatible embeddings base URL (LM Studio).
pub const DEFAULT_EMBEDDING_API_URL: &str = "http://localhost:1234/v1";

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-nomic-embed-text-v1.5@q8_0";

/// Input text is cut to this many characters before it reaches the provider.
pub const MAX_EMBED_INPUT_CHARS: usize = 8000;

/// Characters of source text kept alongside a cache entry for diagnostics.
pub const CACHE_TEXT_PREVIEW_CHARS: usize = 1000;

pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Paths to all Supermatch data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Vector database directory (`data/vectordb/`).
    pub vectordb: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            vectordb: root.join("vectordb"),
            root,
        };
        std::fs::create_dir_all(&paths.vectordb)?;
        Ok(paths)
    }
}

/// Settings for the remote embedding endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Base URL; `/embeddings` is appended.
    pub api_url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Fixed vector length for this deployment. Must match the store.
    pub dimension: usize,
    /// Per-call timeout for the provider.
    pub timeout: Duration,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_EMBEDDING_API_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            api_key: None,
            dimension: DEFAULT_EMBEDDING_DIM,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Top-level Supermatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupermatchConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    pub embedding: EmbeddingSettings,
    /// Upper bound on a single search or index request.
    pub request_timeout: Duration,
}

impl SupermatchConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        let port = env_parse("PORT")?.unwrap_or(3000);

        let data_paths = DataPaths::new(data_dir)?;

        let api_url = std::env::var("EMBEDDING_API_URL")
            .or_else(|_| std::env::var("LM_STUDIO_API_URL"))
            .unwrap_or_else(|_| DEFAULT_EMBEDDING_API_URL.into());
        let model =
            std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.into());
        let api_key = std::env::var("EMBEDDING_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let dimension = env_parse("EMBEDDING_DIMENSION")?.unwrap_or(DEFAULT_EMBEDDING_DIM);
        let embed_timeout = env_parse("EMBEDDING_TIMEOUT_SECS")?.unwrap_or(30u64);
        let request_timeout = env_parse("REQUEST_TIMEOUT_SECS")?.unwrap_or(60u64);

        let config = Self {
            port,
            data_paths,
            embedding: EmbeddingSettings {
                api_url,
                model,
                api_key,
                dimension,
                timeout: Duration::from_secs(embed_timeout),
            },
            request_timeout: Duration::from_secs(request_timeout),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot produce a working deployment.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(Error::Config("EMBEDDING_DIMENSION must be positive".into()));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(Error::Config("EMBEDDING_MODEL must not be empty".into()));
        }
        if !(self.embedding.api_url.starts_with("http://")
            || self.embedding.api_url.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "EMBEDDING_API_URL must be an http(s) URL, got {}",
                self.embedding.api_url
            )));
        }
        if self.request_timeout.is_zero() || self.embedding.timeout.is_zero() {
            return Err(Error::Config("timeouts must be positive".into()));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(None),
    }
}
