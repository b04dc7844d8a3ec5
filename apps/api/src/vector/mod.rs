// Embeddings and the JSON-backed similarity store.

pub mod embedder;
#[cfg(feature = "minilm")]
pub mod minilm;
pub mod store;

/// Uploaded resumes, keyed by `meta.filename`.
pub const RESUME_COLLECTION: &str = "resume";
/// Course catalog entries.
pub const COURSE_COLLECTION: &str = "coursera";
