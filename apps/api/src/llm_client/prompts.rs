// Shared prompt fragments.
// Each module that calls the LLM keeps its own prompts.rs alongside it;
// only cross-cutting instructions live here.

/// Appended by `LlmClient::call_json` to every structured-output prompt.
pub const JSON_ONLY_SUFFIX: &str = "IMPORTANT: Respond with valid JSON only. \
    Do not include any text before or after the JSON object or array.";

/// Formatting rules for every markdown-producing prompt.
pub const MARKDOWN_FORMAT_INSTRUCTION: &str = "Format your response in clean markdown with \
    clear section headers and bullet points. Use only markdown formatting (## for headers, \
    - for bullets). Do not use any escape characters like \\n, \\t, or \\r.";
