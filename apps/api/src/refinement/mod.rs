// Refinement core: draft → critique → revise for a cover letter and a CV.
// Every model call goes through llm_client::ModelRoles; nothing here talks to a backend directly.

pub mod engine;
pub mod handlers;
pub mod policy;
pub mod prompts;
pub mod stages;
pub mod state;

pub use engine::WorkflowEngine;
pub use policy::FixedIterationPolicy;
