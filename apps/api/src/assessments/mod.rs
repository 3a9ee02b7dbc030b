// Career assessments: suggestion generation and the dashboard read side.
// All provider calls go through llm_client via the ChatProvider seam.

pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod store;
