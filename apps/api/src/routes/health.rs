use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;
use crate::vector::{COURSE_COLLECTION, RESUME_COLLECTION};

/// GET /health
/// Returns service status, version, the active model and index sizes.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let mut indexes = serde_json::Map::new();
    for collection in [RESUME_COLLECTION, COURSE_COLLECTION] {
        let size = match state.vectors.len(collection).await {
            Ok(n) => json!(n),
            Err(e) => {
                warn!("Health check could not load '{collection}': {e}");
                Value::Null
            }
        };
        indexes.insert(collection.to_string(), size);
    }

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME"),
        "model": state.llm.model(),
        "embedder": state.vectors.embedder_name(),
        "youtube_enabled": state.youtube.is_some(),
        "indexes": indexes,
    }))
}
