// Document intake and the skill extraction pipeline.
// All LLM calls go through llm_client::CompletionBackend.

pub mod extraction;
pub mod handlers;
pub mod prompts;
pub mod worker;
