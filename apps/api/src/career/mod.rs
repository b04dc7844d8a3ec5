// Career analysis: similar-resume matching, LLM writers and the pipeline
// that assembles them into one report.

pub mod handlers;
pub mod matching;
pub mod pipeline;
pub mod prompts;
pub mod writers;
