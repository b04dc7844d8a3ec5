// Resume module LLM prompt templates.

pub const SKILLS_SYSTEM: &str = "You are an expert resume parser. Your task is to identify \
    technical skills and respond with ONLY a single line of comma-separated values.";

/// Replace `{resume_text}` before sending.
pub const SKILLS_PROMPT: &str = r#"Based on the following resume text, extract the key technical skills, tools, and technologies.

Instructions:
- List only the skills, separated by commas.
- Do not add any introductory text, explanations, or labels like "Skills:".

Resume Text:
---
{resume_text}
---"#;

pub const CORE_INFO_SYSTEM: &str = "You are an expert resume parser and branding coach. \
    Extract all requested fields and return only valid JSON.";

/// Replace `{resume_text}` before sending.
pub const CORE_INFO_PROMPT: &str = r#"You are an expert resume parser and branding coach. Given the following resume, extract:
1. Key technical skills (as a JSON list of strings, e.g. ["Python", "Machine Learning"]). If no skills are found, return an empty list.
2. The most likely job title (as a short string, e.g. "Data Scientist"). If not found, return "Unknown".
3. A professional headline (max 12 words).
4. A 2-3 line professional summary (max 60 words).

Respond ONLY in valid JSON as:
{
  "skills": [...],
  "job_title": "...",
  "headline": "...",
  "summary": "..."
}

Resume:
{resume_text}"#;
