//! Stage functions: each reads the state, makes its model call(s), and writes its own
//! fields. A failed call leaves the state exactly as it was.

use tracing::{debug, info};

use crate::documents::CvFormat;
use crate::errors::AppError;
use crate::llm_client::prompts::TRUTHFULNESS_INSTRUCTION;
use crate::llm_client::{ModelRole, ModelRoles};
use crate::refinement::engine::Stage;
use crate::refinement::prompts::{
    CRITIQUE_COVER_LETTER_TEMPLATE, CRITIQUE_CV_TEMPLATE, DRAFT_COVER_LETTER_TEMPLATE,
    DRAFT_CV_TEMPLATE, PLAIN_FORMAT_INSTRUCTION, REVISE_COVER_LETTER_TEMPLATE,
    REVISE_CV_TEMPLATE, TEX_FORMAT_INSTRUCTION,
};
use crate::refinement::state::ArtifactState;

/// First drafts of both artifacts from the job description and source CV.
/// The two draft-role calls are independent and run concurrently.
pub async fn initialize(models: &ModelRoles, state: &mut ArtifactState) -> Result<(), AppError> {
    let letter_prompt = fill(
        DRAFT_COVER_LETTER_TEMPLATE,
        &[
            ("truthfulness", TRUTHFULNESS_INSTRUCTION),
            ("job_description", state.job_description()),
            ("cv", state.source_cv_text()),
        ],
    );
    let cv_prompt = fill(
        DRAFT_CV_TEMPLATE,
        &[
            ("truthfulness", TRUTHFULNESS_INSTRUCTION),
            ("format_instruction", format_instruction(state.source_cv_format())),
            ("job_description", state.job_description()),
            ("cv", state.source_cv_text()),
        ],
    );

    let (letter, cv) = tokio::try_join!(
        models.generate(ModelRole::Draft, &letter_prompt),
        models.generate(ModelRole::Draft, &cv_prompt),
    )
    .map_err(|e| AppError::generation(Stage::Initialize, e))?;

    state.cover_letter_draft = letter;
    state.cv_draft = cv;
    state.reset_iteration();

    info!(
        "Initial drafts ready: cover_letter_chars={}, cv_chars={}",
        state.cover_letter_draft.len(),
        state.cv_draft.len()
    );
    Ok(())
}

/// Writes `cover_letter_feedback`. The draft is read, never changed.
pub async fn critique_cover_letter(
    models: &ModelRoles,
    state: &mut ArtifactState,
) -> Result<(), AppError> {
    let prompt = fill(
        CRITIQUE_COVER_LETTER_TEMPLATE,
        &[
            ("job_description", state.job_description()),
            ("cv", state.source_cv_text()),
            ("cover_letter", state.cover_letter_draft.as_str()),
        ],
    );

    let feedback = models
        .generate(ModelRole::Revise, &prompt)
        .await
        .map_err(|e| AppError::generation(Stage::CritiqueCoverLetter, e))?;

    debug!("Cover letter feedback: {} chars", feedback.len());
    state.cover_letter_feedback = feedback;
    Ok(())
}

/// Rewrites the letter from its latest feedback and completes one iteration.
pub async fn revise_cover_letter(
    models: &ModelRoles,
    state: &mut ArtifactState,
) -> Result<(), AppError> {
    let prompt = fill(
        REVISE_COVER_LETTER_TEMPLATE,
        &[
            ("truthfulness", TRUTHFULNESS_INSTRUCTION),
            ("job_description", state.job_description()),
            ("cv", state.source_cv_text()),
            ("cover_letter", state.cover_letter_draft.as_str()),
            ("feedback", state.cover_letter_feedback.as_str()),
        ],
    );

    let revised = models
        .generate(ModelRole::Revise, &prompt)
        .await
        .map_err(|e| AppError::generation(Stage::ReviseCoverLetter, e))?;

    state.cover_letter_draft = revised;
    state.advance_iteration();
    info!("Cover letter revised (iteration {})", state.iteration());
    Ok(())
}

/// Writes `cv_feedback` for the current CV draft.
pub async fn critique_cv(models: &ModelRoles, state: &mut ArtifactState) -> Result<(), AppError> {
    let prompt = fill(
        CRITIQUE_CV_TEMPLATE,
        &[
            ("job_description", state.job_description()),
            ("cv_draft", state.cv_draft.as_str()),
        ],
    );

    let feedback = models
        .generate(ModelRole::Revise, &prompt)
        .await
        .map_err(|e| AppError::generation(Stage::CritiqueCv, e))?;

    debug!("CV feedback: {} chars", feedback.len());
    state.cv_feedback = feedback;
    Ok(())
}

pub async fn revise_cv(models: &ModelRoles, state: &mut ArtifactState) -> Result<(), AppError> {
    let prompt = fill(
        REVISE_CV_TEMPLATE,
        &[
            ("truthfulness", TRUTHFULNESS_INSTRUCTION),
            ("format_instruction", format_instruction(state.source_cv_format())),
            ("job_description", state.job_description()),
            ("cv_draft", state.cv_draft.as_str()),
            ("feedback", state.cv_feedback.as_str()),
        ],
    );

    let revised = models
        .generate(ModelRole::Revise, &prompt)
        .await
        .map_err(|e| AppError::generation(Stage::ReviseCv, e))?;

    state.cv_draft = revised;
    info!("CV revised (iteration {})", state.iteration());
    Ok(())
}

fn format_instruction(format: CvFormat) -> &'static str {
    match format {
        CvFormat::Tex => TEX_FORMAT_INSTRUCTION,
        CvFormat::Docx => PLAIN_FORMAT_INSTRUCTION,
    }
}

/// Single-pass `{key}` substitution. Inserted values are never re-scanned, so a job
/// description that happens to contain `{cv}` stays literal.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replacement = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (*value, close))
        });
        match replacement {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm_client::testing::ScriptedGenerator;
    use crate::refinement::state::RunInput;

    fn state(format: CvFormat) -> ArtifactState {
        ArtifactState::from_input(RunInput {
            job_description: "Senior backend engineer, Go, distributed systems".to_string(),
            cv_text: "Software Engineer at X Corp, 2019-2023, built internal tools".to_string(),
            cv_format: format,
            cv_filename: String::new(),
        })
        .unwrap()
    }

    fn roles() -> (Arc<ScriptedGenerator>, Arc<ScriptedGenerator>, ModelRoles) {
        let draft = Arc::new(ScriptedGenerator::numbered("draft"));
        let revise = Arc::new(ScriptedGenerator::numbered("revise"));
        let roles = ModelRoles::new(draft.clone(), revise.clone());
        (draft, revise, roles)
    }

    #[test]
    fn test_fill_substitutes_known_keys_once() {
        let out = fill(
            "JOB: {job_description}\nCV: {cv} {unknown}",
            &[("job_description", "needs {cv} skills"), ("cv", "Rust")],
        );
        assert_eq!(out, "JOB: needs {cv} skills\nCV: Rust {unknown}");
    }

    #[test]
    fn test_fill_tolerates_unclosed_brace() {
        assert_eq!(fill("a { b", &[("b", "x")]), "a { b");
    }

    #[tokio::test]
    async fn test_initialize_uses_draft_role_twice_and_resets_iteration() {
        let (draft, revise, roles) = roles();
        let mut state = state(CvFormat::Docx);
        state.advance_iteration();

        initialize(&roles, &mut state).await.unwrap();

        assert_eq!(draft.call_count(), 2);
        assert_eq!(revise.call_count(), 0);
        assert_eq!(state.iteration(), 0);
        assert!(!state.cover_letter_draft.is_empty());
        assert!(!state.cv_draft.is_empty());
        assert_ne!(state.cover_letter_draft, state.cv_draft);
    }

    #[tokio::test]
    async fn test_tex_cv_prompts_demand_latex() {
        let (draft, _, roles) = roles();
        let mut state = state(CvFormat::Tex);
        initialize(&roles, &mut state).await.unwrap();

        let prompts = draft.prompts();
        assert!(prompts.iter().any(|p| p.contains(TEX_FORMAT_INSTRUCTION)));
        assert!(!prompts.iter().any(|p| p.contains(PLAIN_FORMAT_INSTRUCTION)));
    }

    #[tokio::test]
    async fn test_critique_cover_letter_only_writes_feedback() {
        let (_, revise, roles) = roles();
        let mut state = state(CvFormat::Docx);
        state.cover_letter_draft = "Dear team, I love Go.".to_string();
        state.cv_draft = "cv draft".to_string();

        critique_cover_letter(&roles, &mut state).await.unwrap();

        assert_eq!(state.cover_letter_feedback, "revise output #1");
        assert_eq!(state.cover_letter_draft, "Dear team, I love Go.");
        assert_eq!(state.cv_draft, "cv draft");
        assert_eq!(state.iteration(), 0);

        let prompt = &revise.prompts()[0];
        assert!(prompt.contains("Dear team, I love Go."));
        assert!(prompt.contains("built internal tools"));
        assert!(prompt.contains("distributed systems"));
    }

    #[tokio::test]
    async fn test_revise_cover_letter_increments_and_leaves_cv_alone() {
        let (_, revise, roles) = roles();
        let mut state = state(CvFormat::Docx);
        state.cover_letter_draft = "letter v0".to_string();
        state.cover_letter_feedback = "- mention Go".to_string();
        state.cv_draft = "cv v0".to_string();
        state.cv_feedback = "- reorder roles".to_string();

        revise_cover_letter(&roles, &mut state).await.unwrap();

        assert_eq!(state.iteration(), 1);
        assert_eq!(state.cover_letter_draft, "revise output #1");
        assert_eq!(state.cv_draft, "cv v0");
        assert_eq!(state.cv_feedback, "- reorder roles");
        assert!(revise.prompts()[0].contains("- mention Go"));
    }

    #[tokio::test]
    async fn test_critique_cv_leaves_cover_letter_alone() {
        let (_, revise, roles) = roles();
        let mut state = state(CvFormat::Docx);
        state.cover_letter_draft = "letter".to_string();
        state.cover_letter_feedback = "letter feedback".to_string();
        state.cv_draft = "cv current".to_string();

        critique_cv(&roles, &mut state).await.unwrap();

        assert_eq!(state.cv_feedback, "revise output #1");
        assert_eq!(state.cover_letter_draft, "letter");
        assert_eq!(state.cover_letter_feedback, "letter feedback");
        let prompt = &revise.prompts()[0];
        assert!(prompt.contains("cv current"));
        assert!(prompt.contains("Do NOT suggest adding experience"));
    }

    #[tokio::test]
    async fn test_revise_cv_does_not_touch_iteration() {
        let (_, _, roles) = roles();
        let mut state = state(CvFormat::Docx);
        state.cv_draft = "cv v0".to_string();
        state.cv_feedback = "- add metrics".to_string();

        revise_cv(&roles, &mut state).await.unwrap();

        assert_eq!(state.cv_draft, "revise output #1");
        assert_eq!(state.iteration(), 0);
    }

    #[tokio::test]
    async fn test_failed_call_leaves_state_untouched() {
        let draft = Arc::new(ScriptedGenerator::numbered("draft"));
        let revise = Arc::new(ScriptedGenerator::numbered("revise").failing_on(1));
        let roles = ModelRoles::new(draft, revise);
        let mut state = state(CvFormat::Docx);
        state.cover_letter_draft = "letter v0".to_string();

        let err = revise_cover_letter(&roles, &mut state).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Generation {
                stage: Stage::ReviseCoverLetter,
                ..
            }
        ));
        assert_eq!(state.cover_letter_draft, "letter v0");
        assert_eq!(state.iteration(), 0);
    }
}
