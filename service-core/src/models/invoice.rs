//! Invoice as extracted from a document.
//!
//! Every field is always present after deserialization: strings default to
//! null, amounts to 0, line items to an empty list. Amounts tolerate the
//! shapes models tend to emit (numeric strings, currency symbols, null), and
//! identifiers may arrive as bare numbers.

use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Invoice {
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub invoice_number: Option<String>,
    /// Kept verbatim; date formats are compared by the model, not parsed here.
    #[serde(default, deserialize_with = "lenient_string")]
    pub invoice_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub invoice_base_amount: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub invoice_with_tax_amount: f64,
    #[serde(default, alias = "InvoiceLineItems", deserialize_with = "nullable_items")]
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineItem {
    #[serde(default, deserialize_with = "lenient_line_no")]
    pub line_item_no: u32,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub unit_price: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
}

impl Invoice {
    /// Number line items that arrived without a `LineItemNo` (or with 0) by
    /// their 1-based position.
    pub fn normalize(mut self) -> Self {
        for (idx, item) in self.line_items.iter_mut().enumerate() {
            if item.line_item_no == 0 {
                item.line_item_no = (idx + 1) as u32;
            }
        }
        self
    }
}

/// Parse an amount written as text.
///
/// Strips whitespace and common currency symbols, then resolves the decimal
/// separator: `1,250.50` and `1.250,50` both give 1250.5, `12,50` gives 12.5
/// and `1,234` gives 1234. Separators that fit neither convention (`1,2,3`,
/// `12,5`) yield `None` rather than a guess.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '€' | '£' | '¥' | '₹'))
        .collect();
    if cleaned.is_empty() {
        return Some(0.0);
    }
    normalize_separators(&cleaned)?.parse().ok()
}

/// Rewrite `raw` so that `.` is the only separator left and marks the decimals.
fn normalize_separators(raw: &str) -> Option<String> {
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw),
    };

    let normalized = match (digits.rfind(','), digits.rfind('.')) {
        (None, _) => digits.to_string(),
        // 1,234.56
        (Some(comma), Some(dot)) if dot > comma => {
            let (int_part, frac) = digits.split_at(dot);
            if !thousands_grouped(int_part, ',') {
                return None;
            }
            format!("{}{}", int_part.replace(',', ""), frac)
        }
        // 1.234,56
        (Some(comma), Some(_)) => {
            let (int_part, frac) = (&digits[..comma], &digits[comma + 1..]);
            if !thousands_grouped(int_part, '.') {
                return None;
            }
            format!("{}.{}", int_part.replace('.', ""), frac)
        }
        // 12,50
        (Some(comma), None) if digits.matches(',').count() == 1 && digits.len() - comma == 3 => {
            digits.replacen(',', ".", 1)
        }
        // 1,234 or 1,234,567
        (Some(_), None) => {
            if !thousands_grouped(digits, ',') {
                return None;
            }
            digits.replace(',', "")
        }
    };

    Some(format!("{}{}", sign, normalized))
}

/// True when `int_part` reads as 1-3 leading digits followed by groups of
/// exactly three, split on `sep`.
fn thousands_grouped(int_part: &str, sep: char) -> bool {
    let mut groups = int_part.split(sep);
    let leading_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) || !int_part.contains(sep));
    leading_ok && groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Accept text, or a bare number rendered as text; null stays `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!("expected text, got {}", other))),
    }
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom(format!("amount out of range: {}", n))),
        Value::String(s) => parse_amount(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid amount: {:?}", s))),
        other => Err(de::Error::custom(format!("invalid amount: {}", other))),
    }
}

fn lenient_line_no<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = lenient_amount(deserializer)?;
    if amount < 0.0 || amount.fract() != 0.0 || amount > f64::from(u32::MAX) {
        return Err(de::Error::custom(format!("invalid line item number: {}", amount)));
    }
    Ok(amount as u32)
}

fn nullable_items<'de, D>(deserializer: D) -> Result<Vec<LineItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<LineItem>>::deserialize(deserializer)?.unwrap_or_default())
}
