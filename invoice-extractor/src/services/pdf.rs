//! PDF text extraction.

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfReadError {
    #[error("{0}")]
    Parse(String),

    #[error("PDF parser aborted: {0}")]
    Aborted(String),
}

/// Turns document bytes into best-effort plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, document: Bytes) -> Result<String, PdfReadError>;
}

/// `pdf-extract` backed reader.
///
/// Parsing is CPU-bound and the library can panic on malformed input, so it
/// runs on the blocking pool and a panic surfaces as [`PdfReadError::Aborted`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, document: Bytes) -> Result<String, PdfReadError> {
        let size = document.len();
        let result =
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&document))
                .await;

        match result {
            Ok(Ok(text)) => {
                tracing::info!(size, text_length = text.len(), "PDF text extracted");
                Ok(text)
            }
            Ok(Err(e)) => Err(PdfReadError::Parse(e.to_string())),
            Err(join_err) => Err(PdfReadError::Aborted(join_err.to_string())),
        }
    }
}

/// Returns the same text for every document. Used in tests.
#[derive(Debug, Clone)]
pub struct FixedTextExtractor(pub String);

#[async_trait]
impl TextExtractor for FixedTextExtractor {
    async fn extract_text(&self, _document: Bytes) -> Result<String, PdfReadError> {
        Ok(self.0.clone())
    }
}
