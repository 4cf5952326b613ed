//! Invoice extraction: document text in, structured [`Invoice`] out.

use service_core::llm::{recover, CompletionClient, CompletionError, CompletionParams, Recovered};
use service_core::models::Invoice;
use std::sync::Arc;
use thiserror::Error;

pub const SYSTEM_PROMPT: &str = r#"You are an expert invoice data extraction assistant. Extract the fields below from the provided invoice PDF text and return them as a single JSON object:
{
    "OrderNumber": "string or null",
    "InvoiceNumber": "string or null",
    "InvoiceDate": "string or null",
    "InvoiceBaseAmount": "number or 0",
    "InvoiceWithTaxAmount": "number or 0",
    "LineItems": [
      {
        "LineItemNo": "number",
        "Product": "string or null",
        "Quantity": "number or 0",
        "UnitPrice": "number or 0",
        "Amount": "number or 0"
      }
    ]
}
Documents label these fields in different ways:
- OrderNumber: ORDER NUMBER, Order No., Order #, PO, Purchase Order, PO Number
- InvoiceNumber: INVOICE NUMBER, INVOICE#, INV NO, Invoice No., Invoice #
- InvoiceDate: INVOICE DATE, Invoice Date, Invoice Dt., Invoice Dt
- InvoiceBaseAmount: Sub total, Subtotal, Sub Total, Total before tax
- InvoiceWithTaxAmount: TOTAL AMOUNT, Total Amount, Invoice Total, Total Due, Amount Due
Rules:
- If a field is not found, use null.
- Copy dates exactly as printed; do not convert their format.
- If there are no line items, return an empty LineItems array.
- Return ONLY the JSON object, no additional text.
"#;

pub const EXTRACTION_PROMPT: &str =
    "Extract the following details from the invoice pdf text and return in JSON format:\n";

/// Fallback label when the model reply is not a parseable invoice.
pub const PARSE_FAILURE: &str = "Failed to parse JSON from AI response";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Could not extract text from PDF")]
    EmptyDocument,

    #[error("{0}")]
    Backend(#[from] CompletionError),
}

#[derive(Clone)]
pub struct InvoiceExtractor {
    client: Arc<dyn CompletionClient>,
    params: CompletionParams,
}

impl InvoiceExtractor {
    pub fn new(client: Arc<dyn CompletionClient>, params: CompletionParams) -> Self {
        Self { client, params }
    }

    /// Ask the model for an invoice.
    ///
    /// Whitespace-only text is rejected before any model call. A reply that
    /// does not parse is returned as [`Recovered::Fallback`], not an error.
    #[tracing::instrument(skip_all, fields(text_length = document_text.len()))]
    pub async fn extract(
        &self,
        document_text: &str,
    ) -> Result<Recovered<Invoice>, ExtractionError> {
        if document_text.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }

        let user_prompt = format!("{}{}", EXTRACTION_PROMPT, document_text);
        let reply = self
            .client
            .complete(SYSTEM_PROMPT, &user_prompt, &self.params)
            .await?;

        let extraction = recover::<Invoice>(&reply, PARSE_FAILURE).map(Invoice::normalize);
        if let Recovered::Parsed(invoice) = &extraction {
            tracing::info!(
                invoice_number = ?invoice.invoice_number,
                line_items = invoice.line_items.len(),
                "Invoice extracted"
            );
        }

        Ok(extraction)
    }
}
