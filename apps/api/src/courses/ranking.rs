//! LLM relevance analysis and ranking of course candidates.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::prompts::{ANALYSIS_PROMPT, ANALYSIS_SYSTEM};
use super::{rating_suffix, CourseCandidate};
use crate::llm_client::LlmClient;
use crate::resume::core_info::string_or_list;

/// Courses scoring below this are not recommended.
pub const MIN_RELEVANCE: u8 = 5;
const DEFAULT_SCORE: u8 = 5;
/// Concurrent analysis calls per ranking.
const ANALYSIS_CONCURRENCY: usize = 4;

/// The model's verdict on one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseAnalysis {
    #[serde(default = "default_score", deserialize_with = "score_from_any")]
    pub relevance_score: u8,
    #[serde(default, deserialize_with = "string_or_list")]
    pub skill_gaps_covered: Vec<String>,
    #[serde(default = "unknown")]
    pub learning_level: String,
    #[serde(default)]
    pub career_impact: String,
    #[serde(default = "consider")]
    pub recommendation: String,
    #[serde(default)]
    pub reasoning: String,
}

impl CourseAnalysis {
    /// Neutral verdict used when the model could not be asked or answered nonsense.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            relevance_score: 1,
            skill_gaps_covered: Vec::new(),
            learning_level: unknown(),
            career_impact: "Moderate".to_string(),
            recommendation: consider(),
            reasoning: reason.to_string(),
        }
    }
}

fn default_score() -> u8 {
    DEFAULT_SCORE
}

fn unknown() -> String {
    "Unknown".to_string()
}

fn consider() -> String {
    "Consider".to_string()
}

/// Accepts `8`, `8.5`, `"8"` or `"8/10"`; clamps to 1..=10. Anything else
/// scores the default.
fn score_from_any<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let score = match &raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .split('/')
            .next()
            .and_then(|head| head.trim().parse::<f64>().ok()),
        _ => None,
    };
    Ok(score
        .map(|s| s.round().clamp(1.0, 10.0) as u8)
        .unwrap_or(DEFAULT_SCORE))
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedCourse {
    pub course: CourseCandidate,
    pub analysis: CourseAnalysis,
}

/// Asks the model how well `course` fits the profile. Never fails.
pub async fn analyze_course(
    course: &CourseCandidate,
    skills: &[String],
    role: &str,
    llm: &LlmClient,
) -> CourseAnalysis {
    let prompt = ANALYSIS_PROMPT
        .replace("{skills}", &skills.join(", "))
        .replace("{role}", role)
        .replace("{title}", &course.title)
        .replace("{institution}", &course.institution)
        .replace("{rating}", &course.rating)
        .replace("{description}", &course.description);

    let reply = match llm.call_json::<Value>(ANALYSIS_SYSTEM, &prompt, 500).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Course analysis failed for '{}': {e}", course.title);
            return CourseAnalysis::unavailable("Analysis failed or was unavailable.");
        }
    };

    // Some models wrap the object in a one-element array.
    let reply = match reply {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    };
    if !reply.is_object() {
        warn!("Course analysis for '{}' was not an object", course.title);
        return CourseAnalysis::unavailable("Analysis returned an invalid format.");
    }

    serde_json::from_value(reply).unwrap_or_else(|e| {
        warn!("Course analysis for '{}' did not parse: {e}", course.title);
        CourseAnalysis::unavailable("Analysis returned an invalid format.")
    })
}

/// Analyzes every candidate, then keeps the best `max_results` that clear
/// `MIN_RELEVANCE`.
pub async fn rank_courses(
    courses: Vec<CourseCandidate>,
    skills: &[String],
    role: &str,
    max_results: usize,
    llm: &LlmClient,
) -> Vec<RankedCourse> {
    let analyzed: Vec<RankedCourse> = stream::iter(courses)
        .map(|course| async move {
            let analysis = analyze_course(&course, skills, role, llm).await;
            RankedCourse { course, analysis }
        })
        .buffered(ANALYSIS_CONCURRENCY)
        .collect()
        .await;

    debug!("Analyzed {} course candidate(s)", analyzed.len());
    select_ranked(analyzed, max_results)
}

/// Stable sort by score, highest first; drop low scores; truncate.
pub fn select_ranked(mut analyzed: Vec<RankedCourse>, max_results: usize) -> Vec<RankedCourse> {
    analyzed.sort_by(|a, b| b.analysis.relevance_score.cmp(&a.analysis.relevance_score));
    analyzed.retain(|r| r.analysis.relevance_score >= MIN_RELEVANCE);
    analyzed.truncate(max_results);
    analyzed
}

pub fn format_recommendations(ranked: &[RankedCourse], skills: &[String], role: &str) -> String {
    if ranked.is_empty() {
        return "No relevant courses found for your profile.".to_string();
    }

    let mut out = format!(
        "**Course Recommendations for {role}**\n\n**Your Skills:** {}\n\n",
        skills.join(", ")
    );

    for (i, RankedCourse { course, analysis }) in ranked.iter().enumerate() {
        out.push_str(&format!(
            "**{}. [{}]({})**\n   {}{} - **{}/10 Relevance**\n   **{}** - Level: {}\n",
            i + 1,
            course.title,
            course.url,
            course.institution,
            rating_suffix(&course.rating),
            analysis.relevance_score,
            analysis.recommendation,
            analysis.learning_level
        ));
        if !analysis.skill_gaps_covered.is_empty() {
            out.push_str(&format!(
                "   **Skills Covered:** {}\n",
                analysis.skill_gaps_covered.join(", ")
            ));
        }
        if !analysis.reasoning.is_empty() {
            out.push_str(&format!("   **Why:** {}\n", analysis.reasoning));
        }
        out.push('\n');
    }

    out.trim().to_string()
}
