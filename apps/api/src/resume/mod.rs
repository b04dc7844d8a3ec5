// Resume intake: PDF text extraction, skill detection, core profile extraction
// and upload storage. All LLM calls go through llm_client.

pub mod core_info;
pub mod parser;
pub mod prompts;
pub mod storage;
