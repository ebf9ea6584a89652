//! Axum route handlers for document downloads.

use axum::{
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::documents::{render_document, CvFormat, RenderedDocument};
use crate::errors::AppError;

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub text: String,
    pub format: CvFormat,
    #[serde(default)]
    pub filename: Option<String>,
}

/// POST /api/v1/render
///
/// Renders (possibly user-edited) text as a downloadable .docx or .tex file.
pub async fn handle_render(Json(request): Json<RenderRequest>) -> Result<Response, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    let filename = request
        .filename
        .as_deref()
        .unwrap_or(request.format.default_filename());
    let document = render_document(&request.text, request.format, filename)?;

    Ok(into_download(document))
}

fn into_download(document: RenderedDocument) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        document.filename.replace(['"', '\r', '\n'], "_")
    );
    (
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response()
}
