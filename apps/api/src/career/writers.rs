//! Text artifacts written by the model: enhanced resume, career paths,
//! cover letter and interview questions.

use tracing::debug;

use super::prompts::{
    CAREER_PROMPT, CAREER_SYSTEM, COVER_LETTER_PROMPT, COVER_LETTER_SYSTEM, ENHANCE_PROMPT,
    ENHANCE_SYSTEM, INTERVIEW_PROMPT, INTERVIEW_SYSTEM,
};
use crate::courses::recommender::DEFAULT_SKILLS;
use crate::llm_client::cleanup::clean_markdown;
use crate::llm_client::prompts::MARKDOWN_FORMAT_INSTRUCTION;
use crate::llm_client::{LlmClient, LlmError};
use crate::resume::core_info::ResumeCoreInfo;
use crate::resume::parser::extract_experience;

/// Full markdown rewrite of the resume aimed at the inferred role, opening
/// with the extracted headline and summary.
pub async fn enhance_resume(
    resume_text: &str,
    core: &ResumeCoreInfo,
    llm: &LlmClient,
) -> Result<String, LlmError> {
    let prompt = ENHANCE_PROMPT
        .replace("{role}", core.role_or_default())
        .replace("{headline}", &core.headline)
        .replace("{summary}", &core.summary)
        .replace("{skills}", &core.skills.join(", "))
        .replace("{resume_text}", resume_text);

    let reply = llm.call(ENHANCE_SYSTEM, &prompt, 1500).await?;
    debug!("Enhanced resume: {} chars", reply.len());
    Ok(clean_markdown(&reply))
}

/// Three suggested roles with details.
pub async fn recommend_career_paths(skills: &[String], llm: &LlmClient) -> Result<String, LlmError> {
    let prompt = CAREER_PROMPT
        .replace("{skills}", &skills_or_default(skills))
        .replace("{format}", MARKDOWN_FORMAT_INSTRUCTION);

    let reply = llm.call(CAREER_SYSTEM, &prompt, 300).await?;
    Ok(clean_markdown(&reply))
}

/// Plain-text business letter; no markdown.
///
/// The work-experience section is quoted to the model when one can be found,
/// otherwise the whole resume.
pub async fn generate_cover_letter(
    skills: &[String],
    role: &str,
    resume_text: &str,
    llm: &LlmClient,
) -> Result<String, LlmError> {
    let experience = extract_experience(resume_text);
    let background = if experience.is_empty() {
        resume_text.to_string()
    } else {
        experience.join("\n")
    };

    let prompt = COVER_LETTER_PROMPT
        .replace("{role}", role)
        .replace("{skills}", &skills_or_default(skills))
        .replace("{experience}", &background);

    let reply = llm.call(COVER_LETTER_SYSTEM, &prompt, 700).await?;
    Ok(clean_markdown(&reply))
}

/// Five technical and five behavioral questions as markdown.
pub async fn generate_interview_questions(
    skills: &[String],
    role: &str,
    llm: &LlmClient,
) -> Result<String, LlmError> {
    let prompt = INTERVIEW_PROMPT
        .replace("{role}", role)
        .replace("{skills}", &skills_or_default(skills))
        .replace("{format}", MARKDOWN_FORMAT_INSTRUCTION);

    let reply = llm.call(INTERVIEW_SYSTEM, &prompt, 500).await?;
    Ok(clean_markdown(&reply))
}

fn skills_or_default(skills: &[String]) -> String {
    if skills.is_empty() {
        DEFAULT_SKILLS.join(", ")
    } else {
        skills.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer};

    use super::*;
    use crate::llm_client::test_support::{client, reply};

    #[tokio::test]
    async fn test_career_paths_default_skills() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("general programming, problem solving"))
            .and(body_string_contains("\"max_tokens\":300"))
            .respond_with(reply("## Software Engineer\\n- Builds things"))
            .expect(1)
            .mount(&server)
            .await;

        let out = recommend_career_paths(&[], &client(&server.uri())).await.unwrap();
        assert_eq!(out, "## Software Engineer\n- Builds things");
    }

    #[tokio::test]
    async fn test_enhance_resume_injects_core_info() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("target the job role of 'Data Scientist'"))
            .and(body_string_contains("headline: Turning data into decisions"))
            .and(body_string_contains("skills: Python, SQL"))
            .respond_with(reply("# Jane Doe\n\n\n\n## Experience"))
            .mount(&server)
            .await;

        let core = ResumeCoreInfo {
            skills: vec!["Python".into(), "SQL".into()],
            job_title: "Data Scientist".into(),
            headline: "Turning data into decisions".into(),
            summary: "Analyst with five years of experience.".into(),
        };
        let out = enhance_resume("resume text", &core, &client(&server.uri()))
            .await
            .unwrap();
        assert_eq!(out, "# Jane Doe\n\n## Experience");
    }

    #[tokio::test]
    async fn test_interview_questions_use_role() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("job title 'SRE'"))
            .and(body_string_contains("## Behavioral Questions"))
            .respond_with(reply("## Technical Questions\n- Q1"))
            .mount(&server)
            .await;

        let out = generate_interview_questions(&["Linux".into()], "SRE", &client(&server.uri()))
            .await
            .unwrap();
        assert_eq!(out, "## Technical Questions\n- Q1");
    }

    #[tokio::test]
    async fn test_cover_letter_quotes_experience_section() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Led the payments team"))
            .and(body_string_contains("job title 'Engineering Manager'"))
            .respond_with(reply("Dear Hiring Manager,\n\nI am writing..."))
            .expect(1)
            .mount(&server)
            .await;

        let resume = "Jane Doe\nExperience\nLed the payments team\nEducation\nMBA";
        let out = generate_cover_letter(
            &["Leadership".into()],
            "Engineering Manager",
            resume,
            &client(&server.uri()),
        )
        .await
        .unwrap();
        assert!(out.starts_with("Dear Hiring Manager,\n\nI am writing"));
    }

    #[tokio::test]
    async fn test_cover_letter_errors_propagate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = generate_cover_letter(&[], "SRE", "text", &client(&server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 401, .. }));
    }
}
