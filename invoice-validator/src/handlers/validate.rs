//! `POST /api/validate_invoice`.
//!
//! [`validate`] holds the request semantics; [`validate_invoice`] and
//! [`validate_invoice_function`] only differ in how they render results.

use crate::models::{UserInvoice, ValidationReport};
use crate::services::ValidationError;
use crate::startup::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::Serialize;
use serde_json::{json, Value};
use service_core::error::AppError;
use service_core::llm::Recovered;
use service_core::middleware::RequestId;
use service_core::models::Invoice;

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    #[serde(rename = "Extraction")]
    pub extraction: Invoice,
    #[serde(rename = "Validation")]
    pub validation: Recovered<ValidationReport>,
}

#[derive(Default)]
struct ValidationForm {
    file: Option<(String, Vec<u8>)>,
    data: Option<String>,
}

/// HTTP service adapter: errors as `{"detail": msg}`.
pub async fn validate_invoice(
    State(state): State<AppState>,
    request_id: RequestId,
    multipart: Multipart,
) -> Result<Json<ValidationResponse>, AppError> {
    validate(&state, &request_id, multipart).await.map(Json)
}

/// Functions custom-handler adapter: errors as `{"error": msg}`, success
/// body pretty-printed.
pub async fn validate_invoice_function(
    State(state): State<AppState>,
    request_id: RequestId,
    multipart: Multipart,
) -> Response {
    let result = validate(&state, &request_id, multipart)
        .await
        .and_then(|response| {
            serde_json::to_string_pretty(&response)
                .map_err(|e| AppError::internal(format!("Validation failed: {}", e)))
        });

    match result {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() {
                tracing::error!(error = %e, "Request failed");
            }
            (status, Json(json!({ "error": e.message() }))).into_response()
        }
    }
}

/// Shared request semantics for both adapters.
pub async fn validate(
    state: &AppState,
    request_id: &RequestId,
    multipart: Multipart,
) -> Result<ValidationResponse, AppError> {
    let result = run_validation(state, request_id, multipart).await;

    let outcome = match &result {
        Ok(response) => match &response.validation {
            Recovered::Parsed(report) if report.is_valid => "valid",
            Recovered::Parsed(_) => "invalid",
            Recovered::Fallback(_) => "fallback",
        },
        Err(e) if e.status_code().is_client_error() => "rejected",
        Err(_) => "failed",
    };
    counter!("invoice_validations_total", "outcome" => outcome).increment(1);

    result
}

async fn run_validation(
    state: &AppState,
    request_id: &RequestId,
    multipart: Multipart,
) -> Result<ValidationResponse, AppError> {
    let max_bytes = state.config.max_upload_bytes;
    let form = read_form(multipart, max_bytes).await?;

    let (file_name, file_bytes) = form.file.ok_or_else(|| {
        AppError::bad_request("No PDF file provided. Use 'file' field in multipart form.")
    })?;
    if !file_name.ends_with(".pdf") {
        return Err(AppError::bad_request("Only PDF files are supported"));
    }
    if file_bytes.len() > max_bytes {
        return Err(too_large(max_bytes));
    }

    let data = form.data.filter(|d| !d.is_empty()).ok_or_else(|| {
        AppError::bad_request("No invoice data provided. Use 'data' field with JSON string.")
    })?;
    let data: Value = serde_json::from_str(&data)
        .map_err(|_| AppError::bad_request("Invalid JSON in 'data' field"))?;
    let user_invoice =
        UserInvoice::from_request_data(data).map_err(|e| AppError::bad_request(e.to_string()))?;

    tracing::info!(file_name = %file_name, "Calling invoice extractor");
    let extraction = state
        .extractor
        .fetch_extraction(file_bytes, &file_name, Some(&request_id.0))
        .await
        .map_err(|e| AppError::internal(format!("Validation failed: {}", e)))?;

    let extracted_invoice = match extraction {
        Recovered::Parsed(invoice) => invoice,
        Recovered::Fallback(fallback) => {
            return Err(AppError::internal(format!(
                "Extraction failed: {}",
                fallback.error
            )));
        }
    };

    tracing::info!("Validating invoice");
    let validation = state
        .validator
        .validate(&user_invoice, &extracted_invoice)
        .await
        .map_err(|e| match e {
            ValidationError::Backend(e) => {
                AppError::internal(format!("AI validation failed: {}", e))
            }
            other => AppError::internal(format!("Validation failed: {}", other)),
        })?;

    Ok(ValidationResponse {
        extraction: extracted_invoice,
        validation,
    })
}

async fn read_form(mut multipart: Multipart, max_bytes: usize) -> Result<ValidationForm, AppError> {
    let mut form = ValidationForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_bytes))?;
                form.file = Some((file_name, bytes.to_vec()));
            }
            Some("data") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, max_bytes))?;
                form.data = Some(text);
            }
            _ => {}
        }
    }

    Ok(form)
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
