use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{Config, LocalEmbedder};
use crate::courses::recommender::CourseSources;
use crate::courses::youtube::YouTubeClient;
use crate::llm_client::{Endpoint, LlmClient};
use crate::resume::storage::ResumeStorage;
use crate::vector::embedder::{Embedder, HashingEmbedder, HttpEmbedder};
use crate::vector::store::VectorStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub vectors: Arc<VectorStore>,
    pub storage: ResumeStorage,
    /// Absent when `YOUTUBE_API_KEY` is unset.
    pub youtube: Option<YouTubeClient>,
    pub config: Config,
}

impl AppState {
    /// Wires every collaborator from the configuration.
    pub async fn build(config: Config) -> Result<Self> {
        let primary = Endpoint {
            label: "openrouter".to_string(),
            base_url: config.openrouter_base_url.clone(),
            api_key: Some(config.openrouter_api_key.clone()),
            model: config.model_id.clone(),
        };
        let fallback = config.local_llm().map(|url| Endpoint {
            label: "local".to_string(),
            base_url: url.to_string(),
            api_key: None,
            model: config.local_model_id.clone(),
        });
        let llm = LlmClient::new(primary, fallback)
            .context("Failed to build LLM client")?
            .with_cache_capacity(config.llm_cache_entries);
        info!(
            "LLM client initialized (model: {}, local fallback: {})",
            llm.model(),
            llm.has_fallback()
        );

        let embedder: Arc<dyn Embedder> = match &config.embedding_api_url {
            Some(url) => Arc::new(
                HttpEmbedder::new(
                    url.clone(),
                    config.embedding_api_key.clone(),
                    config.embedding_model.clone(),
                    config.embedding_dimension,
                )
                .context("Failed to build embedding client")?,
            ),
            None => local_embedder(&config).await,
        };
        info!("Embedder: {} ({} dims)", embedder.name(), embedder.dimension());

        let vectors = Arc::new(VectorStore::new(config.data_dir.clone(), embedder));
        let storage = ResumeStorage::init(config.uploads_dir(), &config.public_base_url).await?;

        let youtube = match &config.youtube_api_key {
            Some(key) => Some(YouTubeClient::new(key.clone()).context("Failed to build YouTube client")?),
            None => {
                info!("YOUTUBE_API_KEY not set; YouTube course search disabled");
                None
            }
        };

        Ok(Self {
            llm,
            vectors,
            storage,
            youtube,
            config,
        })
    }

    pub fn course_sources(&self) -> CourseSources<'_> {
        CourseSources {
            llm: &self.llm,
            vectors: &self.vectors,
            youtube: self.youtube.as_ref(),
        }
    }
}

async fn local_embedder(config: &Config) -> Arc<dyn Embedder> {
    match config.local_embedder {
        LocalEmbedder::MiniLm => minilm_or_hashing(config).await,
        LocalEmbedder::Hashing => Arc::new(HashingEmbedder::new(config.embedding_dimension)),
    }
}

#[cfg(feature = "minilm")]
async fn minilm_or_hashing(config: &Config) -> Arc<dyn Embedder> {
    match crate::vector::minilm::MiniLmEmbedder::load().await {
        Ok(model) => Arc::new(model),
        Err(e) => {
            warn!("Could not load all-MiniLM-L6-v2 ({e}); falling back to the hashing embedder");
            Arc::new(HashingEmbedder::new(config.embedding_dimension))
        }
    }
}

#[cfg(not(feature = "minilm"))]
async fn minilm_or_hashing(config: &Config) -> Arc<dyn Embedder> {
    warn!("Built without the `minilm` feature; using the hashing embedder");
    Arc::new(HashingEmbedder::new(config.embedding_dimension))
}
