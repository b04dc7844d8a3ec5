//! Course discovery and ranking.
//!
//! Candidates come from the local catalog (vector collection `coursera`) and,
//! when a key is configured, YouTube search. The recommender ranks them with
//! the LLM and degrades to a plain list when ranking yields nothing.

use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod handlers;
pub mod prompts;
pub mod ranking;
pub mod recommender;
pub mod youtube;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseSource {
    Coursera,
    YouTube,
}

/// A course considered for recommendation, regardless of where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseCandidate {
    pub title: String,
    pub url: String,
    /// Institution for catalog courses, channel name for videos.
    pub institution: String,
    pub rating: String,
    pub description: String,
    pub source: CourseSource,
    /// Retrieval similarity in `[0, 1]`; fixed for YouTube results.
    pub similarity: f32,
}

/// `" - Rating: 4.8"` or nothing.
pub(crate) fn rating_suffix(rating: &str) -> String {
    if rating.trim().is_empty() {
        String::new()
    } else {
        format!(" - Rating: {}", rating.trim())
    }
}
