use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ApiError;

pub type Participant = String;

pub const DEFAULT_CURRENCY: &str = "CAD";

/// The whole dataset of one event, stored as a single document.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Ledger {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub event: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Ledger {
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            participants: vec![],
            expenses: vec![],
            event: String::new(),
            currency: default_currency(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    pub id: String,
    pub payer: Participant,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "optional_date")]
    pub date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct EventSettings {
    pub event: String,
    pub currency: String,
}

/// Body of an expense creation request. The amount stays a raw JSON value so
/// that both numbers and numeric strings are accepted.
#[derive(Clone, Debug, Deserialize)]
pub struct ExpenseDraft {
    pub payer: Participant,
    pub amount: serde_json::Value,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExpensePatch {
    pub payer: Option<Participant>,
    pub amount: Option<serde_json::Value>,
    pub description: Option<String>,
    pub date: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SettingsPatch {
    pub event: Option<String>,
    pub currency: Option<String>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Parses an ISO `YYYY-MM-DD` date, an empty string meaning "no date".
pub fn parse_date(raw: &str) -> Result<Option<NaiveDate>, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ApiError::InvalidDate(raw.to_string()))
}

// Older documents store a missing date as "".
fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        Some(raw) => parse_date(&raw).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_date_string_reads_as_none() {
        let expense: Expense = serde_json::from_value(json!({
            "id": "e1",
            "payer": "Alice",
            "amount": 12.5,
            "description": "",
            "date": ""
        }))
        .unwrap();
        assert_eq!(expense.date, None);
    }

    #[test]
    fn ledger_defaults_missing_fields() {
        let ledger: Ledger = serde_json::from_value(json!({ "_id": "default" })).unwrap();
        assert_eq!(ledger, Ledger::empty("default"));
        assert_eq!(ledger.currency, "CAD");
    }

    #[test]
    fn rejects_malformed_dates() {
        assert_eq!(
            parse_date("2025-01-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1)
        );
        assert!(matches!(
            parse_date("01/02/2025"),
            Err(ApiError::InvalidDate(_))
        ));
    }
}
