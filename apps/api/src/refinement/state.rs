//! The record threaded through every stage of one refinement run.

use crate::documents::CvFormat;
use crate::errors::AppError;

/// Inputs for one run, as produced by the upload parser and the front-end.
#[derive(Debug, Clone)]
pub struct RunInput {
    pub job_description: String,
    pub cv_text: String,
    pub cv_format: CvFormat,
    pub cv_filename: String,
}

/// Mutable state of a single run. Owned by the engine for the duration of the run and
/// dropped afterwards; never shared between runs.
///
/// Source fields are private so they cannot change after construction.
#[derive(Debug, Clone)]
pub struct ArtifactState {
    job_description: String,
    source_cv_text: String,
    source_cv_format: CvFormat,
    source_cv_filename: String,

    pub cover_letter_draft: String,
    pub cover_letter_feedback: String,
    cover_letter_final: Option<String>,

    pub cv_draft: String,
    pub cv_feedback: String,
    cv_final: Option<String>,

    /// Completed cover-letter revisions. Only moves forward.
    iteration: u32,
}

impl ArtifactState {
    /// Validates the inputs and builds a fresh state. No model call has happened yet.
    pub fn from_input(input: RunInput) -> Result<Self, AppError> {
        if input.job_description.trim().is_empty() {
            return Err(AppError::Validation(
                "Please paste the job description.".to_string(),
            ));
        }
        if input.cv_text.trim().is_empty() {
            return Err(AppError::Validation(
                "The uploaded CV contains no text.".to_string(),
            ));
        }

        let source_cv_filename = if input.cv_filename.trim().is_empty() {
            input.cv_format.default_filename().to_string()
        } else {
            input.cv_filename
        };

        Ok(Self {
            job_description: input.job_description,
            source_cv_text: input.cv_text,
            source_cv_format: input.cv_format,
            source_cv_filename,
            cover_letter_draft: String::new(),
            cover_letter_feedback: String::new(),
            cover_letter_final: None,
            cv_draft: String::new(),
            cv_feedback: String::new(),
            cv_final: None,
            iteration: 0,
        })
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    pub fn source_cv_text(&self) -> &str {
        &self.source_cv_text
    }

    pub fn source_cv_format(&self) -> CvFormat {
        self.source_cv_format
    }

    pub fn source_cv_filename(&self) -> &str {
        &self.source_cv_filename
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn cover_letter_final(&self) -> Option<&str> {
        self.cover_letter_final.as_deref()
    }

    pub fn cv_final(&self) -> Option<&str> {
        self.cv_final.as_deref()
    }

    pub fn is_finalized(&self) -> bool {
        self.cover_letter_final.is_some() && self.cv_final.is_some()
    }

    /// Called by Initialize: the counter starts over with the first drafts.
    pub(crate) fn reset_iteration(&mut self) {
        self.iteration = 0;
    }

    /// Called by ReviseCoverLetter, exactly once per revision.
    pub(crate) fn advance_iteration(&mut self) {
        self.iteration += 1;
    }

    /// Freezes the current drafts as the final artifacts. A second call is a no-op:
    /// finals are written once and never overwritten.
    pub fn finalize(&mut self) {
        if self.is_finalized() {
            return;
        }
        self.cover_letter_final = Some(self.cover_letter_draft.clone());
        self.cv_final = Some(self.cv_draft.clone());
    }
}
