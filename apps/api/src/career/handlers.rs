//! Axum route handlers for resume upload and analysis.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::career::pipeline::{analyze_resume, AnalysisReport, Submission};
use crate::errors::AppError;
use crate::resume::parser::extract_text_from_pdf;
use crate::resume::storage::{ensure_pdf, StoredResume};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ProcessTextRequest {
    pub resume_text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /upload
///
/// Stores a PDF resume without analyzing it.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let (stored, _) = store_upload(&state, multipart).await?;
    Ok(Json(UploadResponse {
        filename: stored.filename,
        message: "Resume uploaded successfully.".to_string(),
    }))
}

/// POST /process_resume
///
/// Stores a PDF resume, extracts its text and returns the full analysis.
/// The resume is indexed afterwards so later uploads can match against it.
pub async fn handle_process_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalysisReport>, AppError> {
    let (stored, bytes) = store_upload(&state, multipart).await?;

    let extracted = extract_text_from_pdf(bytes).await.and_then(|text| {
        if text.trim().is_empty() {
            Err(AppError::Validation(
                "Could not extract text from the PDF.".to_string(),
            ))
        } else {
            Ok(text)
        }
    });
    let text = match extracted {
        Ok(text) => text,
        Err(e) => {
            state.storage.discard(&stored).await;
            return Err(e);
        }
    };

    let report = run_with_timeout(
        &state,
        Submission {
            text: &text,
            filename: &stored.filename,
            index: true,
        },
    )
    .await?;
    Ok(Json(report))
}

/// POST /process_text
///
/// Analyzes pasted resume text. Nothing is stored or indexed.
pub async fn handle_process_text(
    State(state): State<AppState>,
    Json(request): Json<ProcessTextRequest>,
) -> Result<Json<AnalysisReport>, AppError> {
    let text = request.resume_text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("resume_text cannot be empty".to_string()));
    }

    let filename = format!("text_{}.txt", Uuid::new_v4());
    let report = run_with_timeout(
        &state,
        Submission {
            text,
            filename: &filename,
            index: false,
        },
    )
    .await?;
    Ok(Json(report))
}

async fn run_with_timeout(
    state: &AppState,
    submission: Submission<'_>,
) -> Result<AnalysisReport, AppError> {
    let limit = state.config.processing_timeout;
    tokio::time::timeout(limit, analyze_resume(state, submission))
        .await
        .map_err(|_| {
            AppError::Timeout(format!(
                "Resume analysis did not finish within {} seconds",
                limit.as_secs()
            ))
        })
}

/// Reads the `file` field, checks it is a non-empty PDF and stores it.
async fn store_upload(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<(StoredResume, Bytes), AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        ensure_pdf(&original_name)?;
        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty.".to_string()));
        }

        let stored = state.storage.save(&original_name, &data).await?;
        info!(
            "Received upload {} ({} bytes) -> {}",
            original_name,
            data.len(),
            stored.path.display()
        );
        return Ok((stored, data));
    }

    Err(AppError::Validation(
        "Missing multipart field 'file'".to_string(),
    ))
}
