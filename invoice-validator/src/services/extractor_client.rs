//! HTTP client for the invoice-extractor service.

use serde_json::Value;
use service_core::llm::Recovered;
use service_core::models::Invoice;
use service_core::observability::TracedClientExt;

const ENVELOPE_KEY: &str = "Extraction";
const PDF_MIME: &str = "application/pdf";

/// Error type for extractor calls.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Failed to reach invoice extractor: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invoice extractor returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invoice extractor returned an unexpected payload: {0}")]
    InvalidPayload(String),
}

/// Sends uploaded PDFs to the extractor's `/extract` endpoint.
///
/// One attempt per call and no timeout beyond reqwest's defaults.
#[derive(Clone)]
pub struct ExtractorClient {
    client: reqwest::Client,
    url: String,
}

impl ExtractorClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Upload `file_bytes` and return the extractor's payload, unwrapped from
    /// its `Extraction` envelope when present.
    #[tracing::instrument(skip(self, file_bytes), fields(size = file_bytes.len(), url = %self.url))]
    pub async fn fetch_extraction(
        &self,
        file_bytes: Vec<u8>,
        file_name: &str,
        request_id: Option<&str>,
    ) -> Result<Recovered<Invoice>, UpstreamError> {
        let part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(file_name.to_string())
            .mime_str(PDF_MIME)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .traced_post(&self.url)
            .request_id(request_id)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "Extractor call failed");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        unwrap_envelope(body)
    }
}

/// `{"Extraction": payload}` yields `payload`; any other body is taken whole.
pub fn unwrap_envelope(body: Value) -> Result<Recovered<Invoice>, UpstreamError> {
    let payload = match body {
        Value::Object(mut obj) if obj.contains_key(ENVELOPE_KEY) => obj
            .remove(ENVELOPE_KEY)
            .unwrap_or(Value::Null),
        other => other,
    };

    Recovered::<Invoice>::from_value(payload)
        .map(|extraction| extraction.map(Invoice::normalize))
        .map_err(|e| UpstreamError::InvalidPayload(e.to_string()))
}
