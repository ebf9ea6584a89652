//! Axum route handlers for the refinement workflow.

use axum::{
    extract::{Multipart, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::documents::{parse_cv_upload, CvFormat, RenderedDocument};
use crate::errors::AppError;
use crate::refinement::state::RunInput;
use crate::state::AppState;

/// A rendered file inlined into a JSON response.
#[derive(Debug, Serialize)]
pub struct DownloadPayload {
    pub filename: String,
    pub content_type: String,
    pub data_base64: String,
}

impl From<RenderedDocument> for DownloadPayload {
    fn from(document: RenderedDocument) -> Self {
        Self {
            filename: document.filename,
            content_type: document.content_type.to_string(),
            data_base64: STANDARD.encode(&document.bytes),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    pub run_id: Uuid,
    /// Editable in the front-end; re-render edits via POST /api/v1/render.
    pub cover_letter: String,
    pub cv: String,
    pub cv_format: CvFormat,
    pub cv_filename: String,
    pub iterations: u32,
    pub cover_letter_file: DownloadPayload,
    /// Same format as the uploaded CV.
    pub cv_file: DownloadPayload,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

struct Submission {
    job_description: String,
    cv: Option<(String, Bytes)>,
}

/// POST /api/v1/applications
///
/// Multipart form: `job_description` (text) and `cv` (.docx or .tex file).
/// Runs the full draft → critique → revise workflow and returns both final artifacts,
/// as text and as ready-to-download files.
pub async fn handle_create_application(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApplicationResponse>, AppError> {
    let submission = read_submission(multipart).await?;

    if submission.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Please paste the job description.".to_string(),
        ));
    }
    let (filename, bytes) = submission.cv.ok_or_else(|| {
        AppError::Validation("Please upload your CV in .docx or .tex format.".to_string())
    })?;

    let parsed = parse_cv_upload(&filename, &bytes)?;
    info!(
        "Received application: cv={} ({}), jd_chars={}",
        parsed.filename,
        parsed.format,
        submission.job_description.len()
    );

    let started_at = Utc::now();
    let artifacts = state
        .engine
        .run(RunInput {
            job_description: submission.job_description,
            cv_text: parsed.text,
            cv_format: parsed.format,
            cv_filename: parsed.filename,
        })
        .await?;
    let finished_at = Utc::now();

    let cover_letter_file: DownloadPayload = artifacts.render_cover_letter()?.into();
    let cv_file: DownloadPayload = artifacts.render_cv()?.into();

    Ok(Json(ApplicationResponse {
        run_id: artifacts.run_id,
        cover_letter: artifacts.cover_letter,
        cv: artifacts.cv,
        cv_format: artifacts.cv_format,
        cv_filename: artifacts.cv_filename,
        iterations: artifacts.iterations,
        cover_letter_file,
        cv_file,
        started_at,
        finished_at,
    }))
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission, AppError> {
    let mut submission = Submission {
        job_description: String::new(),
        cv: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed form data: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("job_description") => {
                submission.job_description = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable job description: {e}")))?;
            }
            Some("cv") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable CV upload: {e}")))?;
                // Browsers send an empty, nameless part when no file was chosen.
                if !filename.is_empty() || !bytes.is_empty() {
                    submission.cv = Some((filename, bytes));
                }
            }
            _ => {}
        }
    }

    Ok(submission)
}
