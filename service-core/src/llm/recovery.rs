//! Recovery of structured JSON from free-form model output.
//!
//! Models often wrap JSON in markdown fences or surround it with prose. Fence
//! handling is first-match: only the first fenced
//! block is considered, and an unclosed fence yields everything after the
//! opening marker. Parse failures are not errors; they come back as
//! [`Recovered::Fallback`] carrying the raw text.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Sentinel returned when model output cannot be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackPayload {
    pub raw_response: String,
    pub error: String,
}

/// Outcome of recovering a `T` from model output.
///
/// Serializes as whichever payload it holds, so HTTP callers see either the
/// object itself or `{"raw_response", "error"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Recovered<T> {
    Parsed(T),
    Fallback(FallbackPayload),
}

impl<T> Recovered<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Recovered::Fallback(_))
    }

    pub fn parsed(&self) -> Option<&T> {
        match self {
            Recovered::Parsed(value) => Some(value),
            Recovered::Fallback(_) => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> Recovered<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Recovered::Parsed(value) => Recovered::Parsed(f(value)),
            Recovered::Fallback(fallback) => Recovered::Fallback(fallback),
        }
    }
}

impl<T: DeserializeOwned> Recovered<T> {
    /// Interpret an already-parsed JSON value. Any object carrying an `error`
    /// key is a fallback payload; everything else must deserialize as `T`.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if let Some(obj) = value.as_object()
            && let Some(error) = obj.get("error")
        {
            let raw_response = obj
                .get("raw_response")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let error = match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Ok(Recovered::Fallback(FallbackPayload {
                raw_response,
                error,
            }));
        }

        serde_json::from_value(value).map(Recovered::Parsed)
    }
}

/// Slice out the JSON candidate from `text`.
///
/// 1. text after the first "```json" up to the next "```";
/// 2. else text between the first pair of "```";
/// 3. else the text unchanged.
pub fn strip_fences(text: &str) -> &str {
    let after_open = match text.split_once(JSON_FENCE) {
        Some((_, rest)) => rest,
        None => match text.split_once(FENCE) {
            Some((_, rest)) => rest,
            None => return text,
        },
    };

    after_open
        .split_once(FENCE)
        .map_or(after_open, |(body, _)| body)
}

/// Recover a `T` from raw model output.
///
/// `label` prefixes the diagnostic stored in the fallback's `error` field.
pub fn recover<T: DeserializeOwned>(text: &str, label: &str) -> Recovered<T> {
    let candidate = strip_fences(text).trim();

    match serde_json::from_str::<T>(candidate) {
        Ok(value) => Recovered::Parsed(value),
        Err(e) => {
            tracing::error!(error = %e, response_len = text.len(), "{}", label);
            tracing::debug!(raw_response = %text, "Unparseable model response");
            Recovered::Fallback(FallbackPayload {
                raw_response: text.to_string(),
                error: format!("{}: {}", label, e),
            })
        }
    }
}
