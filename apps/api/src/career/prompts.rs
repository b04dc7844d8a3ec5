// Career module LLM prompt templates.
// Placeholders in braces are replaced with `str::replace` before sending.

pub const MATCH_SYSTEM: &str =
    "You are an expert recruiter and resume matcher. Output only markdown as described.";

/// `{count}`, `{example_link}`, `{query_text}`, `{matches}`.
pub const MATCH_PROMPT: &str = r#"You are an expert recruiter. Given the following user resume and {count} matched resumes, analyze and score each match (1-10) for similarity and relevance.
For each match, provide:
- A clickable markdown link to the matched resume (use exactly the URL given for it)
- The similarity score (1-10)
- A brief explanation of why it is a good match
Format your output as a markdown list. Example:
1. [John Doe Resume]({example_link}) - **Score: 9/10**
   - Reason: Strong match in data science experience.
---
**User Resume:**
{query_text}
**Matched Resumes:**
{matches}
Respond ONLY in markdown as shown in the example."#;

pub const ENHANCE_SYSTEM: &str = "You are a professional resume editor.";

/// `{role}`, `{headline}`, `{summary}`, `{skills}`, `{resume_text}`.
pub const ENHANCE_PROMPT: &str = r#"Act as a professional resume editor. Rewrite and enhance the following resume to target the job role of '{role}'.

**Instructions:**
1. **Integrate Headline & Summary:** Start with this professional headline: {headline} and summary: {summary}.
2. **Inject Skills:** Seamlessly incorporate these key skills: {skills}.
3. **Full Rewrite:** Rewrite the entire resume, not just parts of it. Ensure all original sections (Experience, Education, etc.) are present and improved.
4. **Professional Tone:** Use action verbs and quantifiable achievements.
5. **Formatting:** Use clean markdown with clear headers (e.g., `## Experience`) and bullet points (`-`). Do not use any escape characters like \n.

**Original Resume to Enhance:**
{resume_text}

**Return the complete, enhanced resume.**"#;

pub const CAREER_SYSTEM: &str = "You are a career strategist.";

/// `{skills}`, `{format}`.
pub const CAREER_PROMPT: &str = "Suggest 3 job roles based on the following skills: {skills}. \
{format} Structure your response with job titles as headers and details as bullet points.";

pub const COVER_LETTER_SYSTEM: &str = "You are a professional cover letter writer.";

/// `{role}`, `{skills}`, `{experience}`.
pub const COVER_LETTER_PROMPT: &str = r#"You are a professional cover letter writer. Write a cover letter for the job title '{role}' using the following skills: {skills}. The letter should:
- Be in standard business letter format
- Include a formal greeting (e.g., 'Dear Hiring Manager,')
- Have an engaging opening paragraph
- Highlight relevant experience, skills, and motivation for the role
- End with a strong closing paragraph and a professional sign-off (e.g., 'Sincerely, [Your Name]')
Do NOT use markdown formatting, bullet points, or section headers. Write as a real letter.

Candidate background to draw on:
{experience}"#;

pub const INTERVIEW_SYSTEM: &str = "You are an interview coach.";

/// `{role}`, `{skills}`, `{format}`.
pub const INTERVIEW_PROMPT: &str = r#"You are an interview coach. Generate 5 technical and 5 behavioral interview questions for the job title '{role}' based on the following skills: {skills}. {format}
Use this structure:
## Technical Questions
- Question 1
- Question 2
...
## Behavioral Questions
- Question 1
- Question 2
..."#;
