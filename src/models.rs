// 💳 Transaction data model
// Request, range and response shapes for the transaction flow

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Institution queried when the caller does not name one
pub const DEFAULT_INSTITUTION_ID: &str = "ins_1";

// ============================================================================
// TRANSACTION
// ============================================================================

/// A single bank transaction as produced by the fallback data provider.
///
/// Live aggregator records are not forced into this shape; they are relayed
/// verbatim as [`TransactionRecord::Live`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    #[serde(rename = "transaction_id")]
    pub id: String,

    pub amount: f64,

    pub name: String,

    /// Serialized as `YYYY-MM-DD`
    pub date: NaiveDate,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Vec<String>>,
}

/// One entry of the `transactions` array returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TransactionRecord {
    /// Record from the aggregator, trusted as-is
    Live(Value),
    /// Synthetic record from the fallback data provider
    Sample(Transaction),
}

// ============================================================================
// QUERY & RANGE
// ============================================================================

/// Body of `POST /fetchTransaction`.
///
/// Fields are kept as raw JSON: non-string dates are rejected with the same
/// message as malformed strings, a non-string institution id falls back to
/// the default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionQuery {
    #[serde(default)]
    pub institution_id: Option<Value>,

    #[serde(default)]
    pub start_date: Option<Value>,

    #[serde(default)]
    pub end_date: Option<Value>,
}

impl TransactionQuery {
    /// Build a query from plain strings (CLI entry point)
    pub fn new(institution_id: Option<String>, start_date: Option<String>, end_date: Option<String>) -> Self {
        TransactionQuery {
            institution_id: institution_id.map(Value::String),
            start_date: start_date.map(Value::String),
            end_date: end_date.map(Value::String),
        }
    }

    pub fn institution_id(&self) -> &str {
        self.institution_id
            .as_ref()
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_INSTITUTION_ID)
    }
}

/// Validated date range; built once per request and never modified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

/// Uniform response of the transaction endpoint, whichever path produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_wire_shape() {
        let tx = Transaction {
            id: "7".to_string(),
            amount: 12.5,
            name: "Coffee".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            category: None,
        };

        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(
            value,
            json!({"transaction_id": "7", "amount": 12.5, "name": "Coffee", "date": "2024-05-01"})
        );
    }

    #[test]
    fn test_live_record_serializes_verbatim() {
        let raw = json!({"transaction_id": "abc", "amount": 1, "merchant_name": null, "extra": [1, 2]});
        let response = TransactionsResponse {
            transactions: vec![TransactionRecord::Live(raw.clone())],
        };

        assert_eq!(serde_json::to_value(&response).unwrap(), json!({"transactions": [raw]}));
    }

    #[test]
    fn test_query_defaults() {
        let query: TransactionQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.institution_id(), "ins_1");
        assert!(query.start_date.is_none());
        assert!(query.end_date.is_none());

        let query: TransactionQuery =
            serde_json::from_value(json!({"institution_id": "ins_109508", "start_date": 20240101})).unwrap();
        assert_eq!(query.institution_id(), "ins_109508");
        assert_eq!(query.start_date, Some(json!(20240101)));
    }

    #[test]
    fn test_non_string_institution_id_uses_default() {
        for raw in [json!(7), json!(null), json!(["ins_2"]), json!("")] {
            let query: TransactionQuery = serde_json::from_value(json!({"institution_id": raw})).unwrap();
            assert_eq!(query.institution_id(), "ins_1", "input {raw}");
        }
    }
}
