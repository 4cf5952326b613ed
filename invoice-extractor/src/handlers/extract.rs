use crate::services::ExtractionError;
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use metrics::counter;
use serde::Serialize;
use service_core::error::AppError;
use service_core::llm::Recovered;
use service_core::models::Invoice;

const NO_STORE_HEADERS: [(header::HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-store, no-cache, max-age=0"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

#[derive(Debug, Serialize)]
pub struct ExtractionResponse {
    #[serde(rename = "Extraction")]
    pub extraction: Recovered<Invoice>,
}

struct Upload {
    file_name: String,
    data: Bytes,
}

pub async fn extract_invoice(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let result = run_extraction(&state, multipart).await;

    let outcome = match &result {
        Ok(Recovered::Parsed(_)) => "parsed",
        Ok(Recovered::Fallback(_)) => "fallback",
        Err(e) if e.status_code().is_client_error() => "rejected",
        Err(_) => "failed",
    };
    counter!("invoice_extractions_total", "outcome" => outcome).increment(1);

    let extraction = result?;
    Ok((
        StatusCode::OK,
        NO_STORE_HEADERS,
        Json(ExtractionResponse { extraction }),
    ))
}

async fn run_extraction(
    state: &AppState,
    multipart: Multipart,
) -> Result<Recovered<Invoice>, AppError> {
    let max_bytes = state.config.upload.max_bytes;
    let upload = read_upload(multipart, max_bytes).await?;

    if !upload.file_name.ends_with(".pdf") {
        return Err(AppError::bad_request("Only PDF files are supported"));
    }
    if upload.data.is_empty() {
        return Err(AppError::bad_request("Empty file uploaded"));
    }
    if upload.data.len() > max_bytes {
        return Err(too_large(max_bytes));
    }

    tracing::info!(
        file_name = %upload.file_name,
        size = upload.data.len(),
        "Received invoice upload"
    );

    state.archive.save(&upload.data).await?;

    let text = state
        .text_extractor
        .extract_text(upload.data)
        .await
        .map_err(|e| AppError::bad_request(format!("Failed to read PDF file: {}", e)))?;

    if text.trim().is_empty() {
        return Err(AppError::bad_request(
            "Could not extract text from PDF. The PDF may be image-based or empty.",
        ));
    }

    state.extractor.extract(&text).await.map_err(|e| match e {
        ExtractionError::EmptyDocument => AppError::bad_request(e.to_string()),
        ExtractionError::Backend(_) => AppError::internal(e.to_string()),
    })
}

/// Pull the `file` part out of the form; other parts are skipped.
async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?;

        return Ok(Upload { file_name, data });
    }

    Err(AppError::bad_request(
        "No PDF file provided. Use 'file' field in multipart form.",
    ))
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return too_large(max_bytes);
    }
    AppError::bad_request(format!("Failed to read multipart field: {}", err.body_text()))
}

fn too_large(max_bytes: usize) -> AppError {
    AppError::bad_request(format!("File too large (max {} bytes)", max_bytes))
}
