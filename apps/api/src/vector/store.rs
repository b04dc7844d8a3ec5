//! Named vector collections persisted as JSON.
//!
//! Each collection is an ordered list of `(text, meta, vector)` records kept in
//! memory and rewritten to `<base_dir>/vectors_<name>.json` after every change.
//! Search is a brute-force cosine scan, which is plenty for a few thousand
//! resumes and courses.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::embedder::{cosine_similarity, EmbedError, Embedder};

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("Empty text, cannot embed")]
    EmptyText,

    #[error("Embedding failed: {0}")]
    Embed(#[from] EmbedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Collection '{collection}' expects dimension {expected}, found {found}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid collection name: '{0}'")]
    InvalidCollection(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub text: String,
    #[serde(default)]
    pub meta: Value,
    pub vector: Vec<f32>,
    pub added_at: DateTime<Utc>,
}

/// On-disk layout of one collection.
#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile {
    embedder: String,
    dimension: usize,
    records: Vec<VectorRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub meta: Value,
    pub similarity: f32,
}

type Collection = Arc<RwLock<Vec<VectorRecord>>>;

pub struct VectorStore {
    base_dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    collections: Mutex<HashMap<String, Collection>>,
}

impl VectorStore {
    pub fn new(base_dir: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            base_dir: base_dir.into(),
            embedder,
            collections: Mutex::new(HashMap::new()),
        }
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    /// Embeds `text` and appends it to `collection`, then persists the collection.
    pub async fn add(&self, collection: &str, text: &str, meta: Value) -> Result<(), VectorStoreError> {
        self.add_batch(collection, vec![(text.to_string(), meta)])
            .await
            .map(|_| ())
    }

    /// Adds several records with a single embedding call and a single write.
    /// Rejects the whole batch if any text is blank.
    pub async fn add_batch(
        &self,
        collection: &str,
        items: Vec<(String, Value)>,
    ) -> Result<usize, VectorStoreError> {
        if items.is_empty() {
            return Ok(0);
        }
        if items.iter().any(|(text, _)| text.trim().is_empty()) {
            return Err(VectorStoreError::EmptyText);
        }

        let handle = self.collection(collection).await?;
        let texts: Vec<String> = items.iter().map(|(text, _)| text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        let expected = self.embedder.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(VectorStoreError::DimensionMismatch {
                collection: collection.to_string(),
                expected,
                found: bad.len(),
            });
        }

        let now = Utc::now();
        let mut records = handle.write().await;
        let before = records.len();
        records.extend(
            items
                .into_iter()
                .zip(vectors)
                .map(|((text, meta), vector)| VectorRecord {
                    text,
                    meta,
                    vector,
                    added_at: now,
                }),
        );

        if let Err(e) = self.persist(collection, &records).await {
            records.truncate(before);
            return Err(e);
        }

        let added = records.len() - before;
        info!("Stored {} record(s) in '{}' ({} total)", added, collection, records.len());
        Ok(added)
    }

    /// Top `top_k` records by cosine similarity, most similar first.
    pub async fn search(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        self.search_where(collection, query, top_k, |_| true).await
    }

    /// Like `search`, but only records whose metadata satisfies `filter` are
    /// considered. The filter runs before truncation to `top_k`.
    pub async fn search_where<F>(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
        filter: F,
    ) -> Result<Vec<SearchHit>, VectorStoreError>
    where
        F: Fn(&Value) -> bool,
    {
        let handle = self.collection(collection).await?;
        if top_k == 0 || query.trim().is_empty() || handle.read().await.is_empty() {
            return Ok(Vec::new());
        }

        // Embedding may be a network call; no lock is held while it runs.
        let query_vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let records = handle.read().await;
        let mut hits: Vec<SearchHit> = records
            .iter()
            .filter(|r| filter(&r.meta))
            .map(|r| SearchHit {
                text: r.text.clone(),
                meta: r.meta.clone(),
                similarity: cosine_similarity(&query_vector, &r.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        debug!("Search in '{}' returned {} hit(s)", collection, hits.len());
        Ok(hits)
    }

    /// Every `(text, meta)` pair in insertion order.
    pub async fn corpus(&self, collection: &str) -> Result<Vec<(String, Value)>, VectorStoreError> {
        let handle = self.collection(collection).await?;
        let records = handle.read().await;
        Ok(records
            .iter()
            .map(|r| (r.text.clone(), r.meta.clone()))
            .collect())
    }

    pub async fn len(&self, collection: &str) -> Result<usize, VectorStoreError> {
        let handle = self.collection(collection).await?;
        let len = handle.read().await.len();
        Ok(len)
    }

    /// Drops every record of `collection` and persists the empty collection.
    pub async fn clear(&self, collection: &str) -> Result<(), VectorStoreError> {
        let handle = self.collection(collection).await?;
        let mut records = handle.write().await;
        let previous = std::mem::take(&mut *records);
        if let Err(e) = self.persist(collection, &records).await {
            *records = previous;
            return Err(e);
        }
        info!("Cleared collection '{}'", collection);
        Ok(())
    }

    fn file_path(&self, collection: &str) -> PathBuf {
        self.base_dir.join(format!("vectors_{collection}.json"))
    }

    /// Returns the in-memory collection, loading it from disk on first use.
    async fn collection(&self, name: &str) -> Result<Collection, VectorStoreError> {
        validate_name(name)?;

        let mut collections = self.collections.lock().await;
        if let Some(existing) = collections.get(name) {
            return Ok(existing.clone());
        }

        let records = self.load(name).await?;
        let handle: Collection = Arc::new(RwLock::new(records));
        collections.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    async fn load(&self, name: &str) -> Result<Vec<VectorRecord>, VectorStoreError> {
        let path = self.file_path(name);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored vectors for '{}', starting empty", name);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let file: CollectionFile = serde_json::from_slice(&raw)?;
        if file.embedder != self.embedder.name() {
            return self.reembed(name, file).await;
        }

        let expected = self.embedder.dimension();
        if file.dimension != expected {
            return Err(VectorStoreError::DimensionMismatch {
                collection: name.to_string(),
                expected,
                found: file.dimension,
            });
        }
        if let Some(bad) = file.records.iter().find(|r| r.vector.len() != expected) {
            return Err(VectorStoreError::DimensionMismatch {
                collection: name.to_string(),
                expected,
                found: bad.vector.len(),
            });
        }
        info!("Loaded {} record(s) for '{}' from {}", file.records.len(), name, path.display());
        Ok(file.records)
    }

    /// Rebuilds vectors written by another embedder from the stored texts and
    /// rewrites the collection file.
    async fn reembed(
        &self,
        name: &str,
        file: CollectionFile,
    ) -> Result<Vec<VectorRecord>, VectorStoreError> {
        warn!(
            "Collection '{}' was built with '{}'; re-embedding {} record(s) with '{}'",
            name,
            file.embedder,
            file.records.len(),
            self.embedder.name()
        );

        let texts: Vec<String> = file.records.iter().map(|r| r.text.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed(&texts).await?
        };
        let expected = self.embedder.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(VectorStoreError::DimensionMismatch {
                collection: name.to_string(),
                expected,
                found: bad.len(),
            });
        }

        let records: Vec<VectorRecord> = file
            .records
            .into_iter()
            .zip(vectors)
            .map(|(record, vector)| VectorRecord { vector, ..record })
            .collect();
        self.persist(name, &records).await?;
        Ok(records)
    }

    async fn persist(&self, name: &str, records: &[VectorRecord]) -> Result<(), VectorStoreError> {
        let payload = serde_json::to_vec(&CollectionFile {
            embedder: self.embedder.name().to_string(),
            dimension: self.embedder.dimension(),
            records: records.to_vec(),
        })?;
        let dir = self.base_dir.clone();
        let path = self.file_path(name);

        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &payload))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
        Ok(())
    }
}

/// Writes to a temp file in `dir`, then renames it over `path`.
fn write_atomic(dir: &Path, path: &Path, payload: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(payload)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn validate_name(name: &str) -> Result<(), VectorStoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(VectorStoreError::InvalidCollection(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::vector::embedder::HashingEmbedder;

    fn store_in(dir: &Path) -> VectorStore {
        VectorStore::new(dir, Arc::new(HashingEmbedder::new(64)))
    }

    #[tokio::test]
    async fn test_add_and_search_orders_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        store
            .add("resume", "rust backend engineer tokio axum", json!({"filename": "a.pdf"}))
            .await
            .unwrap();
        store
            .add("resume", "pastry chef croissants bakery", json!({"filename": "b.pdf"}))
            .await
            .unwrap();

        let hits = store.search("resume", "senior rust engineer axum", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].meta["filename"], "a.pdf");
        assert!(hits[0].similarity >= hits[1].similarity);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_and_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let err = store.add("resume", "   ", json!({})).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::EmptyText));
        assert_eq!(store.len("resume").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_on_empty_collection_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.search("coursera", "anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filter_applies_before_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store
            .add("resume", "rust engineer", json!({"filename": "self.pdf"}))
            .await
            .unwrap();
        store
            .add("resume", "go engineer", json!({"filename": "other.pdf"}))
            .await
            .unwrap();

        let hits = store
            .search_where("resume", "rust engineer", 1, |meta| meta["filename"] != "self.pdf")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta["filename"], "other.pdf");
    }

    #[tokio::test]
    async fn test_collections_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = store_in(dir.path());
            store
                .add_batch(
                    "coursera",
                    vec![
                        ("Deep Learning Stanford".into(), json!({"title": "Deep Learning"})),
                        ("SQL for Data Science UC Davis".into(), json!({"title": "SQL"})),
                    ],
                )
                .await
                .unwrap();
        }
        assert!(dir.path().join("vectors_coursera.json").exists());

        let reopened = store_in(dir.path());
        let corpus = reopened.corpus("coursera").await.unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus[0].1["title"], "Deep Learning");
        // other collections stay independent
        assert_eq!(reopened.len("resume").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_empties_collection_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.add("resume", "some resume text", json!({})).await.unwrap();
        store.clear("resume").await.unwrap();
        assert_eq!(store.len("resume").await.unwrap(), 0);

        let reopened = store_in(dir.path());
        assert_eq!(reopened.len("resume").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_collection_from_other_embedder_is_reembedded() {
        let dir = tempfile::tempdir().unwrap();
        store_in(dir.path())
            .add("resume", "rust engineer", json!({"filename": "a.pdf"}))
            .await
            .unwrap();

        let other = VectorStore::new(dir.path(), Arc::new(HashingEmbedder::new(32)));
        let hits = other.search("resume", "rust engineer", 1).await.unwrap();
        assert_eq!(hits[0].meta["filename"], "a.pdf");
        assert!(hits[0].similarity > 0.99);

        let raw = std::fs::read(dir.path().join("vectors_resume.json")).unwrap();
        let file: CollectionFile = serde_json::from_slice(&raw).unwrap();
        assert_eq!(file.embedder, "hashing-fnv1a-32");
        assert_eq!(file.records[0].vector.len(), 32);
    }

    #[tokio::test]
    async fn test_corrupt_vector_dimension_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = CollectionFile {
            embedder: "hashing-fnv1a-64".to_string(),
            dimension: 64,
            records: vec![VectorRecord {
                text: "text".into(),
                meta: json!({}),
                vector: vec![0.0; 12],
                added_at: Utc::now(),
            }],
        };
        std::fs::write(
            dir.path().join("vectors_resume.json"),
            serde_json::to_vec(&file).unwrap(),
        )
        .unwrap();

        let err = store_in(dir.path()).len("resume").await.unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch { expected: 64, found: 12, .. }
        ));
    }

    /// Counts embed calls and blocks each one until released.
    struct GatedEmbedder {
        inner: HashingEmbedder,
        gate: tokio::sync::Semaphore,
    }

    #[async_trait::async_trait]
    impl Embedder for GatedEmbedder {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            self.gate.acquire().await.unwrap().forget();
            self.inner.embed(texts).await
        }
    }

    #[tokio::test]
    async fn test_no_lock_is_held_while_query_embeds() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(GatedEmbedder {
            inner: HashingEmbedder::new(64),
            gate: tokio::sync::Semaphore::new(1),
        });
        let store = Arc::new(VectorStore::new(dir.path(), embedder.clone()));
        store.add("resume", "rust engineer", json!({})).await.unwrap();

        // The search's embedding call parks on the gate.
        let searching = {
            let store = store.clone();
            tokio::spawn(async move { store.search("resume", "rust", 1).await })
        };
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        // A writer must still get the write lock meanwhile.
        let handle = store.collection("resume").await.unwrap();
        let write = tokio::time::timeout(std::time::Duration::from_secs(1), handle.write()).await;
        assert!(write.is_ok(), "write lock blocked by a pending search");
        drop(write);

        embedder.gate.add_permits(1);
        let hits = searching.await.unwrap().unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_collection_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(matches!(
            store.len("../etc").await,
            Err(VectorStoreError::InvalidCollection(_))
        ));
    }
}
