// Resume generation: request validation, AI rewrite, and the PDF pipeline.
// All LLM calls go through llm_client; no direct Anthropic calls here.

pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod rewrite;
