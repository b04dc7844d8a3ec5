//! End-to-end course recommendation for one resume.

use tracing::{info, warn};

use super::catalog::{format_catalog_courses, search_catalog};
use super::prompts::{ROLE_PROMPT, ROLE_SYSTEM};
use super::ranking::{format_recommendations, rank_courses};
use super::youtube::{format_youtube_courses, YouTubeClient};
use super::CourseCandidate;
use crate::llm_client::LlmClient;
use crate::resume::core_info::DEFAULT_ROLE;
use crate::resume::parser::extract_skills;
use crate::vector::store::VectorStore;

pub const NO_COURSES_MESSAGE: &str = "No courses found for your profile. Please try again later.";
pub const DEFAULT_SKILLS: [&str; 2] = ["general programming", "problem solving"];
/// Entries shown per source in the unranked fallback list.
const BASIC_LIST_LEN: usize = 3;

/// Everything the recommender reads from.
#[derive(Clone, Copy)]
pub struct CourseSources<'a> {
    pub llm: &'a LlmClient,
    pub vectors: &'a VectorStore,
    /// `None` when no YouTube key is configured.
    pub youtube: Option<&'a YouTubeClient>,
}

/// Produces the markdown course section of an analysis report.
///
/// `known_skills` skips skill extraction when the caller already has them.
/// When no role is known one is inferred from the skills. Candidates from the
/// catalog (`2 * max_results`) and YouTube (`max_results`) are ranked by the
/// LLM; if nothing survives ranking a plain per-source list is returned, and
/// if there are no candidates at all, `NO_COURSES_MESSAGE`.
pub async fn recommend_courses(
    sources: CourseSources<'_>,
    resume_text: &str,
    role: Option<&str>,
    known_skills: &[String],
    max_results: usize,
) -> String {
    let skills = resolve_skills(sources.llm, resume_text, known_skills).await;

    let role = match role.map(str::trim).filter(|r| !r.is_empty()) {
        Some(role) => Some(role.to_string()),
        None => infer_role(&skills, sources.llm).await,
    };
    let query = role.clone().unwrap_or_else(|| skills.join(" "));
    let role_label = role.as_deref().unwrap_or(DEFAULT_ROLE);

    let catalog = match search_catalog(sources.vectors, &query, max_results * 2).await {
        Ok(found) => found,
        Err(e) => {
            warn!("Catalog search failed: {e}");
            Vec::new()
        }
    };
    let videos = match sources.youtube {
        Some(youtube) => youtube
            .search_courses(&query, max_results)
            .await
            .unwrap_or_else(|e| {
                warn!("YouTube search failed: {e}");
                Vec::new()
            }),
        None => Vec::new(),
    };

    if catalog.is_empty() && videos.is_empty() {
        info!("No course candidates for '{}'", query);
        return NO_COURSES_MESSAGE.to_string();
    }

    let candidates: Vec<CourseCandidate> = catalog.iter().chain(&videos).cloned().collect();
    let ranked = rank_courses(candidates, &skills, role_label, max_results, sources.llm).await;
    if !ranked.is_empty() {
        info!("Recommending {} ranked course(s) for '{}'", ranked.len(), role_label);
        return format_recommendations(&ranked, &skills, role_label);
    }

    info!("No course passed relevance ranking, returning the basic list");
    basic_list(
        role_label,
        &catalog[..catalog.len().min(BASIC_LIST_LEN)],
        &videos[..videos.len().min(BASIC_LIST_LEN)],
        sources.youtube.is_some(),
    )
}

async fn resolve_skills(llm: &LlmClient, resume_text: &str, known: &[String]) -> Vec<String> {
    let skills = if known.is_empty() {
        extract_skills(resume_text, llm).await
    } else {
        known.to_vec()
    };
    if skills.is_empty() {
        DEFAULT_SKILLS.iter().map(|s| s.to_string()).collect()
    } else {
        skills
    }
}

async fn infer_role(skills: &[String], llm: &LlmClient) -> Option<String> {
    let prompt = ROLE_PROMPT.replace("{skills}", &skills.join(", "));
    match llm.call(ROLE_SYSTEM, &prompt, 50).await {
        Ok(reply) => {
            let role = reply.lines().next().unwrap_or_default().trim().trim_matches(['"', '*', '.']);
            (!role.is_empty()).then(|| role.to_string())
        }
        Err(e) => {
            warn!("Role inference failed: {e}");
            None
        }
    }
}

fn basic_list(
    role: &str,
    catalog: &[CourseCandidate],
    videos: &[CourseCandidate],
    youtube_enabled: bool,
) -> String {
    let mut sections = vec![
        format!("**Recommended Job Role**: {role}"),
        format_catalog_courses(catalog),
    ];
    if youtube_enabled {
        sections.push(format_youtube_courses(videos));
    }
    sections.push(
        "*Note: Using basic course recommendations as the ranked recommendations were unavailable or found no matches.*"
            .to_string(),
    );
    sections.join("\n\n")
}
