mod common;

use common::{sample_pdf, TestApp};
use invoice_extractor::services::{FixedTextExtractor, PdfTextExtractor, TextExtractor};
use service_core::axum::body::Bytes;
use service_core::llm::{CompletionError, MockCompletionClient};
use std::sync::Arc;

const INVOICE_REPLY: &str = r#"```json
{"InvoiceNumber": "123", "InvoiceWithTaxAmount": 50, "LineItems": []}
```"#;

fn fixed_text(text: &str) -> Arc<FixedTextExtractor> {
    Arc::new(FixedTextExtractor(text.to_string()))
}

#[tokio::test]
async fn pdf_reader_finds_text_in_generated_pdf() {
    let text = PdfTextExtractor
        .extract_text(Bytes::from(sample_pdf("Invoice #123, Total: $50")))
        .await
        .expect("Failed to read generated PDF");

    assert!(text.contains("Invoice #123"), "unexpected text: {:?}", text);
}

#[tokio::test]
async fn extract_returns_invoice_with_no_store_headers() {
    let mock = Arc::new(MockCompletionClient::replying(INVOICE_REPLY));
    let app = TestApp::spawn(mock.clone(), Arc::new(PdfTextExtractor)).await;

    let response = app
        .post_file("invoice.pdf", sample_pdf("Invoice #123, Total: $50"))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let headers = response.headers();
    assert_eq!(headers["cache-control"], "no-store, no-cache, max-age=0");
    assert_eq!(headers["pragma"], "no-cache");
    assert_eq!(headers["expires"], "0");

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let extraction = &body["Extraction"];
    assert_eq!(extraction["InvoiceNumber"], "123");
    assert_eq!(extraction["InvoiceWithTaxAmount"], 50.0);
    assert_eq!(extraction["OrderNumber"], serde_json::Value::Null);
    assert_eq!(extraction["InvoiceBaseAmount"], 0.0);
    assert_eq!(extraction["LineItems"], serde_json::json!([]));

    assert_eq!(mock.call_count(), 1);
    let prompt = mock.last_prompt().expect("No prompt recorded");
    assert!(prompt.user_prompt.contains("Invoice #123"));
    assert_eq!(app.archived_files().await, 1);

    app.cleanup().await;
}

#[tokio::test]
async fn unparseable_model_reply_is_returned_as_fallback() {
    let mock = Arc::new(MockCompletionClient::replying("not json at all"));
    let app = TestApp::spawn(mock, fixed_text("Invoice #9")).await;

    let response = app.post_file("invoice.pdf", b"%PDF-1.5".to_vec()).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["Extraction"]["raw_response"], "not json at all");
    assert!(body["Extraction"]["error"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Failed to parse JSON from AI response"));

    app.cleanup().await;
}

#[tokio::test]
async fn non_pdf_file_name_is_rejected() {
    let mock = Arc::new(MockCompletionClient::replying(INVOICE_REPLY));
    let app = TestApp::spawn(mock.clone(), fixed_text("Invoice")).await;

    let response = app.post_file("invoice.txt", b"hello".to_vec()).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["detail"], "Only PDF files are supported");
    assert_eq!(mock.call_count(), 0);
    assert_eq!(app.archived_files().await, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn empty_file_is_rejected() {
    let mock = Arc::new(MockCompletionClient::replying(INVOICE_REPLY));
    let app = TestApp::spawn(mock.clone(), fixed_text("Invoice")).await;

    let response = app.post_file("invoice.pdf", Vec::new()).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["detail"], "Empty file uploaded");
    assert_eq!(mock.call_count(), 0);

    app.cleanup().await;
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let mock = Arc::new(MockCompletionClient::replying(INVOICE_REPLY));
    let app = TestApp::spawn(mock, fixed_text("Invoice")).await;

    let form = reqwest::multipart::Form::new().text("other", "value");
    let response = app.post_form(form).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(
        body["detail"],
        "No PDF file provided. Use 'file' field in multipart form."
    );

    app.cleanup().await;
}

#[tokio::test]
async fn oversized_file_is_rejected() {
    let mock = Arc::new(MockCompletionClient::replying(INVOICE_REPLY));
    let app = TestApp::spawn_with_limit(mock.clone(), fixed_text("Invoice"), 16).await;

    let response = app.post_file("invoice.pdf", vec![b'x'; 64]).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert!(body["detail"]
        .as_str()
        .unwrap_or_default()
        .starts_with("File too large"));
    assert_eq!(mock.call_count(), 0);

    app.cleanup().await;
}

#[tokio::test]
async fn unreadable_pdf_is_rejected() {
    let mock = Arc::new(MockCompletionClient::replying(INVOICE_REPLY));
    let app = TestApp::spawn(mock.clone(), Arc::new(PdfTextExtractor)).await;

    let response = app
        .post_file("invoice.pdf", b"this is not a pdf".to_vec())
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert!(body["detail"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Failed to read PDF file"));
    assert_eq!(mock.call_count(), 0);

    app.cleanup().await;
}

#[tokio::test]
async fn pdf_without_text_is_rejected() {
    let mock = Arc::new(MockCompletionClient::replying(INVOICE_REPLY));
    let app = TestApp::spawn(mock.clone(), fixed_text("  \n ")).await;

    let response = app.post_file("scan.pdf", b"%PDF-1.5".to_vec()).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(
        body["detail"],
        "Could not extract text from PDF. The PDF may be image-based or empty."
    );
    assert_eq!(mock.call_count(), 0);

    app.cleanup().await;
}

#[tokio::test]
async fn backend_failure_is_a_server_error() {
    let mock = Arc::new(MockCompletionClient::failing(CompletionError::Auth(
        "401".to_string(),
    )));
    let app = TestApp::spawn(mock, fixed_text("Invoice #1")).await;

    let response = app.post_file("invoice.pdf", b"%PDF-1.5".to_vec()).await;

    assert_eq!(response.status().as_u16(), 500);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert!(body["detail"]
        .as_str()
        .unwrap_or_default()
        .contains("authentication failed"));

    app.cleanup().await;
}
