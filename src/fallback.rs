// 🛟 Fallback Data Provider
// Deterministic transactions served when live data is unavailable

use crate::models::Transaction;
use chrono::NaiveDate;

/// Which synthetic data set to serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackVariant {
    /// Single "Error" record: the aggregator answered but gave up
    ErrorMarker,
    /// Five realistic records: the aggregator could not be reached at all
    RichSample,
}

impl FallbackVariant {
    pub fn name(&self) -> &'static str {
        match self {
            FallbackVariant::ErrorMarker => "error_marker",
            FallbackVariant::RichSample => "rich_sample",
        }
    }
}

/// Build the records for a variant
pub fn sample(variant: FallbackVariant) -> Vec<Transaction> {
    match variant {
        FallbackVariant::ErrorMarker => vec![record("1", 75.50, "Error", (2024, 5, 15), &[])],
        FallbackVariant::RichSample => vec![
            record("1", 5.75, "Starbucks", (2024, 5, 10), &["Food and Drink", "Coffee Shop"]),
            record("2", 89.99, "Amazon", (2024, 5, 12), &["Shops", "Online Marketplaces"]),
            record("3", 24.50, "Uber", (2024, 5, 13), &["Travel", "Ride Share"]),
            record("4", 1500.00, "Rent Payment", (2024, 5, 1), &["Payment", "Rent"]),
            record("5", 112.34, "Grocery Store", (2024, 5, 14), &["Shops", "Supermarkets and Groceries"]),
        ],
    }
}

fn record(id: &str, amount: f64, name: &str, (y, m, d): (i32, u32, u32), category: &[&str]) -> Transaction {
    Transaction {
        id: id.to_string(),
        amount,
        name: name.to_string(),
        // literals above are all valid calendar dates
        date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN),
        category: if category.is_empty() {
            None
        } else {
            Some(category.iter().map(|c| c.to_string()).collect())
        },
    }
}
