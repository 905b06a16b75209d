// 📨 Transaction Service - request handler for the transaction flow
// Only a ValidationError ever reaches the caller

use crate::dates;
use crate::error::ValidationError;
use crate::fetcher::{FallbackReason, FetchOutcome, TransactionFetcher};
use crate::models::{TransactionQuery, TransactionsResponse};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tokio::task::AbortHandle;
use tracing::{error, info, warn};

pub struct TransactionService {
    fetcher: Arc<TransactionFetcher>,
}

/// Aborts the fetch task if the request future is dropped first
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl TransactionService {
    pub fn new(fetcher: TransactionFetcher) -> Self {
        TransactionService {
            fetcher: Arc::new(fetcher),
        }
    }

    pub async fn handle(&self, query: &TransactionQuery) -> Result<TransactionsResponse, ValidationError> {
        self.handle_at(Utc::now().date_naive(), query).await
    }

    /// Handle a query with an explicit notion of "today"
    pub async fn handle_at(
        &self,
        today: NaiveDate,
        query: &TransactionQuery,
    ) -> Result<TransactionsResponse, ValidationError> {
        let range = dates::resolve_json_at(today, query.start_date.as_ref(), query.end_date.as_ref())
            .map_err(|e| {
                warn!(error = %e, "Rejecting transaction query");
                e
            })?;

        info!(start_date = %range.start, end_date = %range.end, "Resolved date range");

        // The fetch runs as its own task so a panic inside it still ends in
        // sample data instead of a failed request.
        let fetcher = Arc::clone(&self.fetcher);
        let institution_id = query.institution_id().to_string();
        let task = tokio::spawn(async move { fetcher.fetch(&range, &institution_id).await });
        let _guard = AbortOnDrop(task.abort_handle());

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Transaction fetch task failed");
                FetchOutcome::Fallback(FallbackReason::Aborted(e.to_string()))
            }
        };

        match &outcome {
            FetchOutcome::Live(items) => info!(count = items.len(), "Serving live transactions"),
            FetchOutcome::Fallback(reason) => warn!(
                reason = ?reason,
                variant = reason.variant().name(),
                "Serving fallback transactions"
            ),
        }

        Ok(TransactionsResponse {
            transactions: outcome.into_records(),
        })
    }
}
