//! Full resume analysis: one core-info call, then every report section
//! concurrently, then indexing for future matches.
//!
//! Individual sections degrade to a short notice instead of failing the
//! whole report.

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::matching::match_similar_resumes;
use super::writers::{
    enhance_resume, generate_cover_letter, generate_interview_questions, recommend_career_paths,
};
use crate::courses::recommender::recommend_courses;
use crate::llm_client::LlmError;
use crate::resume::core_info::{extract_core_info, ResumeCoreInfo};
use crate::state::AppState;
use crate::vector::RESUME_COLLECTION;

/// Courses shown in the report.
const MAX_COURSES: usize = 5;

pub const DAILY_LIMIT_NOTICE: &str =
    "Daily API limit reached for the language model. Please try again tomorrow.";

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub structured_resume: ResumeCoreInfo,
    pub matched_resumes: String,
    pub enhanced_resume: String,
    pub career_paths: String,
    pub courses: String,
    pub cover_letter: String,
    pub interview_questions: String,
    pub filename: String,
}

/// A resume to analyze.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub text: &'a str,
    /// Stored file name, also used to keep the resume out of its own matches.
    pub filename: &'a str,
    /// Add the resume to the match index once the report is built.
    pub index: bool,
}

pub async fn analyze_resume(state: &AppState, submission: Submission<'_>) -> AnalysisReport {
    let Submission {
        text,
        filename,
        index,
    } = submission;
    info!("Analyzing resume {} ({} chars)", filename, text.len());

    let core = extract_core_info(text, &state.llm).await;
    let role = core.role_or_default();
    let skills = &core.skills;

    let (matched, enhanced, careers, courses, cover_letter, interview) = tokio::join!(
        match_similar_resumes(
            text,
            Some(filename),
            state.config.max_similar_resumes,
            &state.vectors,
            &state.storage,
            &state.llm,
        ),
        enhance_resume(text, &core, &state.llm),
        recommend_career_paths(skills, &state.llm),
        recommend_courses(
            state.course_sources(),
            text,
            core.target_role(),
            skills,
            MAX_COURSES,
        ),
        generate_cover_letter(skills, role, text, &state.llm),
        generate_interview_questions(skills, role, &state.llm),
    );

    let matched_resumes = matched.unwrap_or_else(|e| {
        warn!("Resume matching failed: {e}");
        "Resume matching is currently unavailable.".to_string()
    });

    if index {
        let meta = json!({
            "filename": filename,
            "job_title": core.target_role(),
        });
        match state.vectors.add(RESUME_COLLECTION, text, meta).await {
            Ok(()) => info!("Indexed {} for future matching", filename),
            Err(e) => warn!("Failed to index {}: {e}", filename),
        }
    }

    AnalysisReport {
        matched_resumes,
        enhanced_resume: degrade("Resume enhancement", enhanced),
        career_paths: degrade("Career path suggestions", careers),
        courses,
        cover_letter: degrade("Cover letter generation", cover_letter),
        interview_questions: degrade("Interview question generation", interview),
        filename: filename.to_string(),
        structured_resume: core,
    }
}

/// Replaces a failed section with a notice the UI can show as-is.
fn degrade(section: &str, result: Result<String, LlmError>) -> String {
    match result {
        Ok(text) => text,
        Err(LlmError::DailyLimit(_)) => DAILY_LIMIT_NOTICE.to_string(),
        Err(e) => {
            warn!("{section} failed: {e}");
            format!("{section} is currently unavailable. Please try again later.")
        }
    }
}
