//! Question answering and PDF summarization endpoints

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    response::IntoResponse,
};
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    generator::{PromptPart, TextGenerator},
    middleware::AuthUser,
    models::{AskRequest, AskResponse, SummaryResponse, assistant::SUMMARY_PROMPT},
    state::AppState,
};

const PDF_MIME_TYPE: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF-";

fn generator(state: &AppState) -> ApiResult<Arc<dyn TextGenerator>> {
    state
        .generator
        .clone()
        .ok_or_else(|| ApiError::ServiceUnavailable("AI service is not configured".to_string()))
}

async fn run(generator: &dyn TextGenerator, parts: Vec<PromptPart>) -> ApiResult<String> {
    generator.generate(parts).await.map_err(|e| {
        warn!("Text generation failed: {}", e);
        ApiError::BadGateway(e.to_string())
    })
}

/// Answer a free-form study question
pub async fn ask(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AskRequest>,
) -> ApiResult<impl IntoResponse> {
    let question = payload.validated_question().map_err(ApiError::Validation)?;
    let generator = generator(&state)?;

    info!("User {} asked a question", user.id);
    let answer = run(generator.as_ref(), vec![PromptPart::Text(question.clone())]).await?;

    Ok(Json(AskResponse { question, answer }))
}

/// Summarize an uploaded PDF
pub async fn summarize_pdf(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let mut multipart = multipart.map_err(|e| {
        warn!("Rejected summarize request: {}", e);
        ApiError::Validation("file is required".to_string())
    })?;

    let pdf = read_pdf_field(&mut multipart, state.pdf_max_bytes).await?;
    let generator = generator(&state)?;

    info!("User {} requested a summary of {} bytes", user.id, pdf.len());
    let summary = run(
        generator.as_ref(),
        vec![
            PromptPart::Text(SUMMARY_PROMPT.to_string()),
            PromptPart::InlineData {
                mime_type: PDF_MIME_TYPE.to_string(),
                data: pdf,
            },
        ],
    )
    .await?;

    Ok(Json(SummaryResponse { summary }))
}

/// Find the `file` field and check that it holds a PDF within the size limit
async fn read_pdf_field(multipart: &mut Multipart, max_bytes: usize) -> ApiResult<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        if field.content_type() != Some(PDF_MIME_TYPE) {
            return Err(ApiError::BadRequest(
                "Only PDF files are supported".to_string(),
            ));
        }

        let data = field.bytes().await.map_err(|e| {
            if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
                too_large(max_bytes)
            } else {
                ApiError::BadRequest(format!("Failed to read upload: {}", e))
            }
        })?;

        if data.len() > max_bytes {
            return Err(too_large(max_bytes));
        }
        if !data.starts_with(PDF_MAGIC) {
            return Err(ApiError::BadRequest(
                "Uploaded file is not a valid PDF".to_string(),
            ));
        }

        return Ok(data.to_vec());
    }

    Err(ApiError::Validation("file is required".to_string()))
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::PayloadTooLarge(format!("PDF must be at most {} bytes", max_bytes))
}
