//! Post-processing for raw model output.

use once_cell::sync::Lazy;
use regex::Regex;

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());
static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```(?:json)?\s*([\[{].*?[\]}])\s*```").unwrap());

/// Normalises model-produced markdown.
///
/// Models frequently return escaped control characters (`\\n` as two
/// characters) and tab-indented `+`/`-`/`*` bullets. Both are rewritten into
/// plain markdown, then blank-line and space runs are collapsed.
pub fn clean_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = text
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\r", "\r")
        .replace("\t+", "- ")
        .replace("\t-", "- ")
        .replace("\t*", "- ");

    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
    let text = SPACE_RUNS.replace_all(&text, " ");
    text.trim().to_string()
}

/// Locates the JSON payload inside a model reply.
///
/// Order: a fenced ```json block, then the span from the first `{` or `[`
/// (whichever comes first) to the last matching closer, then the trimmed text.
pub fn extract_json_payload(text: &str) -> &str {
    let text = text.trim();

    if let Some(inner) = FENCED_JSON.captures(text).and_then(|c| c.get(1)) {
        return inner.as_str();
    }

    let first_brace = text.find('{');
    let first_bracket = text.find('[');
    let start = match (first_brace, first_bracket) {
        (Some(b), Some(k)) => Some(b.min(k)),
        (Some(b), None) => Some(b),
        (None, Some(k)) => Some(k),
        (None, None) => None,
    };

    let Some(start) = start else {
        return text;
    };

    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    match text.rfind(closer) {
        Some(end) if end > start => &text[start..=end],
        _ => &text[start..],
    }
}
