//! Resume text extraction and skill detection.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::resume::prompts::{SKILLS_PROMPT, SKILLS_SYSTEM};

/// Headers that open a skills section.
const SKILL_HEADERS: &[&str] = &["skills", "technologies", "tools"];
/// Headers that close a skills section.
const SKILL_SECTION_END: &[&str] = &[
    "experience",
    "employment",
    "work history",
    "education",
    "projects",
];
const EXPERIENCE_HEADERS: &[&str] = &["experience", "employment", "work history"];
const EXPERIENCE_SECTION_END: &[&str] = &["education", "skills", "projects"];

/// Last-resort vocabulary for the keyword scan.
const SKILL_VOCABULARY: &[&str] = &[
    "python", "java", "c++", "c#", "javascript", "typescript", "html", "css", "sql", "nosql",
    "machine learning", "deep learning", "data science", "natural language processing", "nlp",
    "computer vision", "data analysis", "data visualization", "statistics",
    "cloud computing", "aws", "azure", "google cloud", "gcp",
    "docker", "kubernetes", "git", "linux", "bash", "shell",
    "react", "angular", "vue.js", "node.js", "express.js",
    "django", "flask", "fastapi", "spring", "langchain", "langgraph",
    "pandas", "numpy", "scikit-learn", "matplotlib", "seaborn",
    "tensorflow", "pytorch", "keras",
    "agile", "scrum", "jira",
];

/// Extracts the full text of a PDF held in memory.
///
/// PDF decoding is CPU-bound, so it runs on the blocking pool.
pub async fn extract_text_from_pdf(bytes: Bytes) -> Result<String, AppError> {
    // The PDF header may follow a few bytes of junk, but must be near the start.
    if !bytes.windows(5).take(1024).any(|w| w == b"%PDF-") {
        return Err(AppError::Validation(
            "Could not read the PDF: missing PDF header".to_string(),
        ));
    }

    let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in PDF extraction: {e}")))?
        .map_err(|e| AppError::Validation(format!("Could not read the PDF: {e}")))?;

    Ok(normalize_extracted_text(&raw))
}

/// Strips trailing whitespace per line, drops page-break characters and
/// keeps at most one blank line between blocks.
pub fn normalize_extracted_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0usize;

    for line in raw.replace('\u{c}', "\n").lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}

/// Extracts technical skills from resume text.
///
/// Tries the LLM first; on failure or an empty answer falls back to parsing a
/// skills section, and finally to a keyword scan.
pub async fn extract_skills(text: &str, llm: &LlmClient) -> Vec<String> {
    let prompt = SKILLS_PROMPT.replace("{resume_text}", text);
    match llm.call(SKILLS_SYSTEM, &prompt, 250).await {
        Ok(reply) => {
            let skills = split_skill_list(&reply);
            if !skills.is_empty() {
                return skills;
            }
            warn!("LLM returned no skills, falling back to section parsing");
        }
        Err(e) => warn!("LLM skill extraction failed: {e}. Falling back to section parsing"),
    }

    let from_section = skills_from_section(text);
    if !from_section.is_empty() {
        debug!("Extracted {} skills from the skills section", from_section.len());
        return from_section;
    }

    debug!("Falling back to keyword scan");
    scan_known_skills(text)
}

/// Splits a comma/newline separated model answer into distinct skills,
/// preserving first-seen order and dropping case-insensitive duplicates.
pub fn split_skill_list(reply: &str) -> Vec<String> {
    let reply = reply.trim();
    let reply = reply
        .strip_prefix("Skills:")
        .or_else(|| reply.strip_prefix("skills:"))
        .unwrap_or(reply);

    let items = reply.split([',', '\n']).map(|s| {
        s.trim()
            .trim_start_matches(['-', '*', '•'])
            .trim()
            .trim_end_matches('.')
            .to_string()
    });
    dedup_case_insensitive(items)
}

/// Collects the items listed under a skills/technologies/tools header.
pub fn skills_from_section(text: &str) -> Vec<String> {
    let mut in_section = false;
    let mut collected = String::new();

    for line in text.lines() {
        let lower = line.to_lowercase();
        if SKILL_HEADERS.iter().any(|h| lower.contains(h)) {
            in_section = true;
            if let Some((_, rest)) = line.split_once(':') {
                collected.push_str(rest);
                collected.push('\n');
            }
            continue;
        }
        if in_section && SKILL_SECTION_END.iter().any(|h| lower.contains(h)) {
            in_section = false;
            continue;
        }
        if in_section {
            collected.push_str(line.trim());
            collected.push('\n');
        }
    }

    let items = collected
        .split([',', ';', '|', '•', '·', '\n'])
        .map(|s| s.trim().trim_start_matches(['-', '*']).trim().to_lowercase())
        .filter(|s| s.chars().count() > 1);
    dedup_case_insensitive(items)
}

/// Finds vocabulary terms that appear as whole terms in the text.
pub fn scan_known_skills(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    SKILL_VOCABULARY
        .iter()
        .filter(|term| contains_term(&lower, term))
        .map(|term| term.to_string())
        .collect()
}

/// Lines of the work-experience section.
pub fn extract_experience(text: &str) -> Vec<String> {
    let mut in_section = false;
    let mut lines = Vec::new();

    for line in text.lines() {
        let lower = line.to_lowercase();
        if EXPERIENCE_HEADERS.iter().any(|h| lower.contains(h)) {
            in_section = true;
            continue;
        }
        if EXPERIENCE_SECTION_END.iter().any(|h| lower.contains(h)) {
            in_section = false;
            continue;
        }
        if in_section && !line.trim().is_empty() {
            lines.push(line.trim().to_string());
        }
    }
    lines
}

/// `term` occurs in `haystack` without alphanumeric characters on either side.
fn contains_term(haystack: &str, term: &str) -> bool {
    haystack.match_indices(term).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + term.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn dedup_case_insensitive(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}


#[cfg(test)]
mod tests {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::llm_client::test_support::{client, reply};

    const RESUME: &str = "Jane Doe\n\
        Technical Skills: Rust, PostgreSQL; Kubernetes | gRPC\n\
        Docker, Terraform\n\
        Work Experience\n\
        Senior Engineer, Acme Corp (2020-2024)\n\
        Built payment services in Rust\n\
        \n\
        Education\n\
        BSc Computer Science";

    #[test]
    fn test_split_skill_list_dedups_and_trims() {
        let skills = split_skill_list("Skills: Rust, rust , SQL,\n- Docker.\n");
        assert_eq!(skills, vec!["Rust", "SQL", "Docker"]);
    }

    #[test]
    fn test_split_skill_list_empty_reply() {
        assert!(split_skill_list("   ").is_empty());
    }

    #[test]
    fn test_skills_from_section_reads_until_next_header() {
        let skills = skills_from_section(RESUME);
        assert_eq!(
            skills,
            vec!["rust", "postgresql", "kubernetes", "grpc", "docker", "terraform"]
        );
    }

    #[test]
    fn test_skills_from_section_without_header() {
        assert!(skills_from_section("Just a paragraph about cooking.").is_empty());
    }

    #[test]
    fn test_scan_known_skills_matches_whole_terms() {
        let found = scan_known_skills("Used Python, C++ and Docker. Javascripting is not a skill.");
        assert!(found.contains(&"python".to_string()));
        assert!(found.contains(&"c++".to_string()));
        assert!(found.contains(&"docker".to_string()));
        assert!(!found.contains(&"javascript".to_string()));
        // "git" inside "digital" must not count
        assert!(!scan_known_skills("digital marketing").contains(&"git".to_string()));
    }

    #[test]
    fn test_extract_experience_section() {
        let lines = extract_experience(RESUME);
        assert_eq!(
            lines,
            vec!["Senior Engineer, Acme Corp (2020-2024)", "Built payment services in Rust"]
        );
    }

    #[tokio::test]
    async fn test_extract_text_rejects_non_pdf_bytes() {
        let err = extract_text_from_pdf(Bytes::from_static(b"plain text, not a pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_normalize_extracted_text() {
        let raw = "Name   \n\n\n\nSkills\u{c}Page two  \n";
        assert_eq!(normalize_extracted_text(raw), "Name\n\nSkills\nPage two");
    }

    #[tokio::test]
    async fn test_extract_skills_prefers_llm() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("Rust, Kubernetes, gRPC"))
            .mount(&server)
            .await;

        let skills = extract_skills(RESUME, &client(&server.uri())).await;
        assert_eq!(skills, vec!["Rust", "Kubernetes", "gRPC"]);
    }

    #[tokio::test]
    async fn test_extract_skills_falls_back_when_llm_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let skills = extract_skills(RESUME, &client(&server.uri())).await;
        assert!(skills.contains(&"postgresql".to_string()));

        let skills = extract_skills("Worked with python and aws daily.", &client(&server.uri())).await;
        assert_eq!(skills, vec!["python", "aws"]);
    }

    #[tokio::test]
    async fn test_extract_text_from_valid_pdf() {
        let pdf = test_support::minimal_pdf("Skills: Rust, Go");
        let text = extract_text_from_pdf(Bytes::from(pdf)).await.unwrap();
        assert_eq!(text, "Skills: Rust, Go");
    }
}
