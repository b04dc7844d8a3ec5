//! Core profile extraction: skills, job title, headline and summary in one LLM call.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use crate::llm_client::LlmClient;
use crate::resume::prompts::{CORE_INFO_PROMPT, CORE_INFO_SYSTEM};

/// Used by the writers when no job title could be inferred.
pub const DEFAULT_ROLE: &str = "Professional";

/// Structured profile distilled from a resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeCoreInfo {
    #[serde(default, deserialize_with = "string_or_list")]
    pub skills: Vec<String>,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: String,
}

impl ResumeCoreInfo {
    /// The inferred job title, or `None` when the model could not tell.
    pub fn target_role(&self) -> Option<&str> {
        let title = self.job_title.trim();
        if title.is_empty() || title.eq_ignore_ascii_case("unknown") {
            None
        } else {
            Some(title)
        }
    }

    pub fn role_or_default(&self) -> &str {
        self.target_role().unwrap_or(DEFAULT_ROLE)
    }

    fn normalized(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.skills = self
            .skills
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
            .collect();
        self.job_title = self.job_title.trim().to_string();
        self.headline = self.headline.trim().to_string();
        self.summary = self.summary.trim().to_string();
        self
    }
}

/// Extracts the core profile. Never fails: an unusable reply yields an empty record.
pub async fn extract_core_info(resume_text: &str, llm: &LlmClient) -> ResumeCoreInfo {
    let prompt = CORE_INFO_PROMPT.replace("{resume_text}", resume_text);
    match llm
        .call_json::<ResumeCoreInfo>(CORE_INFO_SYSTEM, &prompt, 500)
        .await
    {
        Ok(info) => {
            let info = info.normalized();
            info!(
                "Core info extracted: job_title={:?}, {} skills",
                info.job_title,
                info.skills.len()
            );
            info
        }
        Err(e) => {
            warn!("Core info extraction failed: {e}");
            ResumeCoreInfo::default()
        }
    }
}

/// Accepts `["a", "b"]`, `"a, b"` or `null`.
pub(crate) fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Skills {
        List(Vec<String>),
        Text(String),
        Missing(()),
    }

    Ok(match Skills::deserialize(deserializer)? {
        Skills::List(list) => list,
        Skills::Text(text) => text.split(',').map(|s| s.trim().to_string()).collect(),
        Skills::Missing(()) => Vec::new(),
    })
}
