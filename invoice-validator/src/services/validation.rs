//! Invoice validation: user data and extracted data in, model verdict out.
//!
//! All comparison logic lives in the prompt; nothing here compares fields.

use crate::models::{UserInvoice, ValidationReport};
use service_core::llm::{recover, CompletionClient, CompletionError, CompletionParams, Recovered};
use service_core::models::Invoice;
use std::sync::Arc;
use thiserror::Error;

pub const SYSTEM_PROMPT: &str = r#"You are an invoice validation assistant. Compare the user-provided invoice data with the extracted invoice data and identify any discrepancies.

Apply these comparison rules:
- Compare numbers numerically, regardless of representation ("42.35" equals 42.35, 100 equals 100.0).
- Compare amounts as floats (500.0 equals 500).
- Compare dates semantically ("March 29, 2025" equals "29/03/2025").
- Ignore fields that are null or empty in the user data; never report them as mismatches.
- Match line items by product name, not by position. For each user line item, check whether its product exists in the extracted data; if it does, compare its other fields.

Return a JSON object with this structure:
{
    "is_valid": true if every compared field matches, otherwise false,
    "field_analysis": {
        "<field name>": {
            "status": "MATCH" or "MISMATCH",
            "expected": "value from the user data",
            "actual": "value from the extracted data"
        }
    },
    "line_items_analysis": [
        {
            "line_number": 1,
            "status": "MATCH" if every field of this line item matches, otherwise "MISMATCH",
            "field_analysis": {
                "<line item field name>": {
                    "status": "MATCH" or "MISMATCH",
                    "expected": "value from the user data",
                    "actual": "value from the extracted data"
                }
            }
        }
    ],
    "summary": "Brief summary of the validation result, under 20 words"
}

Invoice field names are InvoiceNumber, OrderNumber, InvoiceDate, InvoiceBaseAmount and InvoiceWithTaxAmount.
Line item field names are Product, Quantity, UnitPrice and Amount; line_number is the 1-based row index of the user's line item.

Return ONLY the JSON object, no additional text.
"#;

const VALIDATION_PROMPT_HEAD: &str = "Please validate the following invoice data:\n\nUSER PROVIDED DATA:\n";
const VALIDATION_PROMPT_MIDDLE: &str = "\n\nEXTRACTED DATA:\n";
const VALIDATION_PROMPT_TAIL: &str =
    "\n\nCompare these two datasets and identify any discrepancies.\n";

/// Fallback label when the model reply is not a parseable report.
pub const PARSE_FAILURE: &str = "Failed to parse validation response";

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{0}")]
    Backend(#[from] CompletionError),

    #[error("Failed to serialize invoice data: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct InvoiceValidator {
    client: Arc<dyn CompletionClient>,
    params: CompletionParams,
}

impl InvoiceValidator {
    pub fn new(client: Arc<dyn CompletionClient>, params: CompletionParams) -> Self {
        Self { client, params }
    }

    #[tracing::instrument(skip_all, fields(user_fields = user_invoice.fields().len()))]
    pub async fn validate(
        &self,
        user_invoice: &UserInvoice,
        extracted_invoice: &Invoice,
    ) -> Result<Recovered<ValidationReport>, ValidationError> {
        let user_prompt = validation_prompt(user_invoice, extracted_invoice)?;
        let reply = self
            .client
            .complete(SYSTEM_PROMPT, &user_prompt, &self.params)
            .await?;

        let report = recover::<ValidationReport>(&reply, PARSE_FAILURE);
        if let Recovered::Parsed(report) = &report {
            tracing::info!(
                is_valid = report.is_valid,
                fields = report.field_analysis.len(),
                line_items = report.line_items_analysis.len(),
                "Invoice validated"
            );
        }

        Ok(report)
    }
}

/// Both invoices pretty-printed into the comparison template.
pub fn validation_prompt(
    user_invoice: &UserInvoice,
    extracted_invoice: &Invoice,
) -> Result<String, serde_json::Error> {
    let user_data = serde_json::to_string_pretty(user_invoice)?;
    let extracted_data = serde_json::to_string_pretty(extracted_invoice)?;

    Ok(format!(
        "{}{}{}{}{}",
        VALIDATION_PROMPT_HEAD,
        user_data,
        VALIDATION_PROMPT_MIDDLE,
        extracted_data,
        VALIDATION_PROMPT_TAIL
    ))
}
