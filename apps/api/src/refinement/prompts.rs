// Prompt templates for each refinement stage.
// Placeholders are substituted with `str::replace`; `{truthfulness}` always comes from
// llm_client::prompts so every stage shares the same no-fabrication rule.

/// Initialize → first cover letter. Replace: {truthfulness}, {job_description}, {cv}
pub const DRAFT_COVER_LETTER_TEMPLATE: &str = r#"Using the CV and job description below, write a concise, tailored cover letter.
Focus on the most relevant experiences and quantify impact where the CV provides numbers.
Keep it to a single page. Output only the letter.

{truthfulness}

JOB:
{job_description}

CV:
{cv}"#;

/// Initialize → first CV rewrite. Replace: {truthfulness}, {format_instruction}, {job_description}, {cv}
pub const DRAFT_CV_TEMPLATE: &str = r#"Rewrite the CV content to better match this job description.
Keep it truthful; highlight the most relevant roles, skills, and results.
Output the full CV text only.

{truthfulness}

{format_instruction}

JOB:
{job_description}

CV:
{cv}"#;

/// CritiqueCoverLetter. Replace: {job_description}, {cv}, {cover_letter}
pub const CRITIQUE_COVER_LETTER_TEMPLATE: &str = r#"Review the cover letter against the job description and CV.
List concrete, actionable bullet-point suggestions to:
- Improve relevance to the role's stated requirements
- Improve clarity and impact
- Back claims with evidence from the CV (and flag any claim the CV does not support)
- Remove repetition
- Keep the tone professional and the length to one page at most
Reply with bullet points only.

JOB:
{job_description}

CV:
{cv}

COVER LETTER:
{cover_letter}"#;

/// ReviseCoverLetter. Replace: {truthfulness}, {job_description}, {cv}, {cover_letter}, {feedback}
pub const REVISE_COVER_LETTER_TEMPLATE: &str = r#"Apply the reviewer feedback to rewrite the cover letter.
The result must fit on a single page.
Output only the final improved letter.

{truthfulness}

JOB:
{job_description}

CV:
{cv}

CURRENT LETTER:
{cover_letter}

FEEDBACK:
{feedback}"#;

/// CritiqueCV. Replace: {job_description}, {cv_draft}
pub const CRITIQUE_CV_TEMPLATE: &str = r#"Review the CV against the job description.
Suggest:
- Role reordering to emphasize relevance
- Bullet improvements with metrics (only where the CV already states them)
- Skills alignment with the job's requirements
- Anything that may be misleading: flag it so the CV stays truthful
Do NOT suggest adding experience, skills, or results the candidate does not have.
Reply with clear bullet points.

JOB:
{job_description}

CV (current):
{cv_draft}"#;

/// ReviseCV. Replace: {truthfulness}, {format_instruction}, {job_description}, {cv_draft}, {feedback}
pub const REVISE_CV_TEMPLATE: &str = r#"Rewrite the CV text applying the feedback.
Preserve factual accuracy: every role, date, and achievement must remain as stated.
Output the full CV text only.

{truthfulness}

{format_instruction}

JOB:
{job_description}

CURRENT CV:
{cv_draft}

FEEDBACK:
{feedback}"#;

/// CV instructions for a `.tex` source: the output is written to disk verbatim.
pub const TEX_FORMAT_INSTRUCTION: &str = "FORMAT: The CV is a LaTeX document. Return a complete, \
compilable LaTeX document. Keep the original preamble, document class, packages, and custom \
macros unchanged; edit only the content.";

/// CV instructions for a `.docx` source: rendered one paragraph per line.
pub const PLAIN_FORMAT_INSTRUCTION: &str = "FORMAT: Return plain text, one paragraph or bullet per \
line. Do not use markdown syntax.";
