//! Similar-resume matching against previously processed uploads.

use tracing::{info, warn};

use super::prompts::{MATCH_PROMPT, MATCH_SYSTEM};
use crate::llm_client::cleanup::clean_markdown;
use crate::llm_client::LlmClient;
use crate::resume::storage::{display_name, ResumeStorage};
use crate::vector::store::{SearchHit, VectorStore, VectorStoreError};
use crate::vector::RESUME_COLLECTION;

pub const NO_MATCHES_MESSAGE: &str = "No similar resumes found in the database.";
/// Matched resume text sent to the model is cut to this many characters.
const MATCH_EXCERPT_CHARS: usize = 2000;

/// A stored resume similar to the query.
#[derive(Debug, Clone)]
pub struct ResumeMatch {
    pub filename: String,
    pub text: String,
    pub similarity: f32,
}

impl ResumeMatch {
    fn from_hit(hit: SearchHit, position: usize) -> Self {
        let filename = hit
            .meta
            .get("filename")
            .and_then(|f| f.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("resume_{position}.pdf"));
        Self {
            filename,
            text: hit.text,
            similarity: hit.similarity,
        }
    }
}

/// The `top_k` stored resumes closest to `text`, never including `exclude`.
pub async fn find_similar_resumes(
    vectors: &VectorStore,
    text: &str,
    exclude: Option<&str>,
    top_k: usize,
) -> Result<Vec<ResumeMatch>, VectorStoreError> {
    let hits = vectors
        .search_where(RESUME_COLLECTION, text, top_k, |meta| {
            exclude.map_or(true, |name| {
                meta.get("filename").and_then(|f| f.as_str()) != Some(name)
            })
        })
        .await?;

    Ok(hits
        .into_iter()
        .enumerate()
        .map(|(i, hit)| ResumeMatch::from_hit(hit, i + 1))
        .collect())
}

/// Markdown section describing the closest stored resumes.
///
/// The model scores and explains each match; if it fails, a plain numbered
/// list of links is returned instead.
pub async fn match_similar_resumes(
    text: &str,
    exclude: Option<&str>,
    top_k: usize,
    vectors: &VectorStore,
    storage: &ResumeStorage,
    llm: &LlmClient,
) -> Result<String, VectorStoreError> {
    let matches = find_similar_resumes(vectors, text, exclude, top_k).await?;
    if matches.is_empty() {
        return Ok(NO_MATCHES_MESSAGE.to_string());
    }
    info!("Found {} similar resume(s)", matches.len());

    let listing = matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            format!(
                "Resume {}: [{}]({}) (vector similarity {:.2})\n{}",
                i + 1,
                display_name(&m.filename),
                storage.public_url(&m.filename),
                m.similarity,
                excerpt(&m.text)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = MATCH_PROMPT
        .replace("{count}", &matches.len().to_string())
        .replace("{example_link}", &storage.public_url("john-doe.pdf"))
        .replace("{query_text}", excerpt(text))
        .replace("{matches}", &listing);

    match llm.call(MATCH_SYSTEM, &prompt, 3000).await {
        Ok(reply) => Ok(clean_markdown(&reply)),
        Err(e) => {
            warn!("LLM-powered resume matching failed: {e}");
            Ok(link_list(&matches, storage))
        }
    }
}

/// Plain numbered list of links, used when the model is unavailable.
pub fn link_list(matches: &[ResumeMatch], storage: &ResumeStorage) -> String {
    let mut out = String::from("**Top Resume Matches:**\n\n");
    for (i, m) in matches.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}]({})\n",
            i + 1,
            display_name(&m.filename),
            storage.public_url(&m.filename)
        ));
    }
    out.trim().to_string()
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(MATCH_EXCERPT_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
