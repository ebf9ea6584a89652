// Shared prompt fragments.
// Stage-specific templates live in refinement::prompts.

/// System prompt for backends that take one separately (Anthropic).
pub const WRITER_SYSTEM: &str = "You are an experienced career coach and professional editor. \
    You write and review job application documents. \
    Reply with the requested text only: no preamble, no closing remarks, no markdown code fences.";

/// Appended to every prompt that produces or critiques candidate-facing text.
pub const TRUTHFULNESS_INSTRUCTION: &str = "\
CRITICAL: Use only facts present in the candidate's CV. Do NOT invent employers, titles, \
dates, degrees, metrics, or skills. If the CV does not support a claim, leave it out.";
