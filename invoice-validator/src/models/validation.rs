//! Validation report returned by the model, and the user's invoice as sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Match,
    Mismatch,
    /// Any status label the model invents beyond the two we ask for.
    #[serde(other)]
    Unknown,
}

/// Expected (user) and actual (extracted) values for one field. Values are
/// kept as the model wrote them: string, number or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldComparison {
    pub status: MatchStatus,
    #[serde(default)]
    pub expected: Value,
    #[serde(default)]
    pub actual: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemAnalysis {
    /// 1-based position of the user's line item.
    pub line_number: u32,
    pub status: MatchStatus,
    #[serde(default)]
    pub field_analysis: BTreeMap<String, FieldComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    #[serde(default)]
    pub field_analysis: BTreeMap<String, FieldComparison>,
    #[serde(default)]
    pub line_items_analysis: Vec<LineItemAnalysis>,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum InvoiceInputError {
    #[error("Missing 'Invoice' object in request data")]
    Missing,
}

/// Invoice data as supplied by the caller.
///
/// Kept as an untyped object so that fields the user left out stay out of
/// the comparison prompt instead of appearing as null/0 defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UserInvoice(Map<String, Value>);

impl UserInvoice {
    /// Take the `Invoice` object out of the request's `data` document.
    /// Absent, null, empty and non-object values are all rejected.
    pub fn from_request_data(data: Value) -> Result<Self, InvoiceInputError> {
        match data {
            Value::Object(mut obj) => match obj.remove("Invoice") {
                Some(Value::Object(invoice)) if !invoice.is_empty() => Ok(UserInvoice(invoice)),
                _ => Err(InvoiceInputError::Missing),
            },
            _ => Err(InvoiceInputError::Missing),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}
