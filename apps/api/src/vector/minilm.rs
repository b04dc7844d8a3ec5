//! all-MiniLM-L6-v2 sentence embeddings computed in-process with rust-bert.
//!
//! The model is fetched into the rust-bert cache on first load. Encoding is
//! CPU-bound, so it runs on the blocking pool behind a mutex.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_bert::pipelines::sentence_embeddings::{
    SentenceEmbeddingsBuilder, SentenceEmbeddingsModel, SentenceEmbeddingsModelType,
};
use tracing::{debug, info};

use super::embedder::{EmbedError, Embedder};

pub const MINILM_NAME: &str = "all-MiniLM-L6-v2";
pub const MINILM_DIMENSION: usize = 384;

pub struct MiniLmEmbedder {
    model: Arc<Mutex<SentenceEmbeddingsModel>>,
}

impl MiniLmEmbedder {
    pub async fn load() -> Result<Self, EmbedError> {
        let model = tokio::task::spawn_blocking(|| {
            SentenceEmbeddingsBuilder::remote(SentenceEmbeddingsModelType::AllMiniLmL6V2)
                .create_model()
        })
        .await
        .map_err(|e| EmbedError::Model(format!("model loader panicked: {e}")))?
        .map_err(|e| EmbedError::Model(e.to_string()))?;

        info!("Loaded {} sentence-embedding model", MINILM_NAME);
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl Embedder for MiniLmEmbedder {
    fn name(&self) -> &str {
        MINILM_NAME
    }

    fn dimension(&self) -> usize {
        MINILM_DIMENSION
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let vectors = tokio::task::spawn_blocking(move || {
            let model = model
                .lock()
                .map_err(|_| EmbedError::Model("model mutex poisoned".to_string()))?;
            model
                .encode(&texts)
                .map_err(|e| EmbedError::Model(e.to_string()))
        })
        .await
        .map_err(|e| EmbedError::Model(format!("encoder panicked: {e}")))??;

        debug!("Embedded {} texts with {}", vectors.len(), MINILM_NAME);
        Ok(vectors)
    }
}
